//! Report assembly: the per-item summary table and the checklist.
//!
//! This is a projection of the extracted invoice and of the engines'
//! results. No verdict is computed here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::amount::{cents, checked_sum, round_half_up};
use super::check::{CheckId, CheckKind, CheckResult, Scope, Status};
use super::types::*;

/// Name of the summary sheet.
pub const SUMMARY_SHEET: &str = "QuadroResumo";
/// Name of the checklist sheet.
pub const CHECKLIST_SHEET: &str = "Checklist";

/// Summary sheet columns, in display order.
pub const SUMMARY_COLUMNS: &[&str] = &[
    "Ordem",
    "Código do produto",
    "NCM",
    "CFOP",
    "CST ICMS",
    "BC ICMS",
    "ALÍQUOTA ICMS",
    "VALOR ICMS",
    "CST PIS",
    "BASE PIS",
    "ALÍQUOTA PIS",
    "VALOR PIS",
    "CST COFINS",
    "BASE COFINS",
    "ALÍQUOTA COFINS",
    "VALOR COFINS",
    "CST IBS",
    "CLASSETRIB (IBS)",
    "BASE IBS",
    "VALOR IBS",
    "CST CBS",
    "CLASSETRIB (CBS)",
    "BASE CBS",
    "VALOR CBS",
    "BASE IPI",
    "VALOR IPI",
    "TOTAL ITEM (NT)",
];

/// Checklist sheet columns, in display order.
pub const CHECKLIST_COLUMNS: &[&str] = &[
    "Grupo",
    "Verificação",
    "Campo",
    "Regra",
    "Status",
    "Encontrado",
    "Esperado",
    "Mensagem",
];

/// One cell of an exported table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Integer(u32),
    Amount(Decimal),
    Text(String),
    Empty,
}

impl Cell {
    fn text(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Self::Text(v.to_string()),
            _ => Self::Empty,
        }
    }

    fn amount(value: Option<Decimal>) -> Self {
        value.map_or(Self::Empty, Self::Amount)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Amount(d) => write!(f, "{d}"),
            Self::Text(s) => f.write_str(s),
            Self::Empty => Ok(()),
        }
    }
}

/// Per-item row of the summary table.
///
/// CBS shares the CST, classification and base of the IBS/CBS group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub order: u32,
    pub product_code: Option<String>,
    pub ncm: Option<String>,
    pub cfop: Option<String>,
    pub icms: TaxColumns,
    pub pis: TaxColumns,
    pub cofins: TaxColumns,
    pub ibs_cst: Option<String>,
    pub class_code: Option<String>,
    pub ibs_cbs_base: Option<Decimal>,
    pub ibs_value: Option<Decimal>,
    pub cbs_value: Option<Decimal>,
    pub ipi_base: Option<Decimal>,
    pub ipi_value: Option<Decimal>,
    pub item_total: Option<Decimal>,
}

/// CST, base, rate and value of a classic tax.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxColumns {
    pub cst: Option<String>,
    pub base: Option<Decimal>,
    pub rate: Option<Decimal>,
    pub value: Option<Decimal>,
}

impl From<Option<&ClassicTax>> for TaxColumns {
    fn from(tax: Option<&ClassicTax>) -> Self {
        tax.map(|t| Self {
            cst: t.cst.clone(),
            base: t.base,
            rate: t.rate,
            value: t.value,
        })
        .unwrap_or_default()
    }
}

impl TaxColumns {
    fn cells(&self) -> [Cell; 4] {
        [
            Cell::text(self.cst.as_deref()),
            Cell::amount(self.base),
            Cell::amount(self.rate),
            Cell::amount(self.value),
        ]
    }
}

impl SummaryRow {
    pub fn from_item(item: &LineItem) -> Self {
        let g = item.ibs_cbs.as_ref();
        Self {
            order: item.number,
            product_code: item.product_code.clone(),
            ncm: item.ncm.clone(),
            cfop: item.cfop.clone(),
            icms: item.icms.as_ref().into(),
            pis: item.pis.as_ref().into(),
            cofins: item.cofins.as_ref().into(),
            ibs_cst: g.and_then(|g| g.cst.clone()),
            class_code: g.and_then(|g| g.class_code.clone()),
            ibs_cbs_base: g.and_then(|g| g.base),
            ibs_value: g.and_then(|g| g.ibs_value),
            cbs_value: g.and_then(|g| g.cbs_value),
            ipi_base: item.ipi.as_ref().and_then(|t| t.base),
            ipi_value: item.ipi.as_ref().and_then(|t| t.value),
            item_total: item.total(),
        }
    }

    /// Cells in [`SUMMARY_COLUMNS`] order.
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells = vec![
            Cell::Integer(self.order),
            Cell::text(self.product_code.as_deref()),
            Cell::text(self.ncm.as_deref()),
            Cell::text(self.cfop.as_deref()),
        ];
        cells.extend(self.icms.cells());
        cells.extend(self.pis.cells());
        cells.extend(self.cofins.cells());
        cells.extend([
            Cell::text(self.ibs_cst.as_deref()),
            Cell::text(self.class_code.as_deref()),
            Cell::amount(self.ibs_cbs_base),
            Cell::amount(self.ibs_value),
            Cell::text(self.ibs_cst.as_deref()),
            Cell::text(self.class_code.as_deref()),
            Cell::amount(self.ibs_cbs_base),
            Cell::amount(self.cbs_value),
            Cell::amount(self.ipi_base),
            Cell::amount(self.ipi_value),
            Cell::amount(self.item_total),
        ]);
        cells
    }
}

/// The TOTAL line under the summary table: column sums, rounded to cents.
///
/// Display only; the reconciliation engine owns the verdicts on totals.
/// A column whose sum leaves the decimal range is `None` (an empty cell).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub icms: [Option<Decimal>; 3],
    pub pis: [Option<Decimal>; 3],
    pub cofins: [Option<Decimal>; 3],
    pub ibs_base: Option<Decimal>,
    pub ibs_value: Option<Decimal>,
    pub cbs_base: Option<Decimal>,
    pub cbs_value: Option<Decimal>,
    pub ipi_base: Option<Decimal>,
    pub ipi_value: Option<Decimal>,
    pub item_total: Option<Decimal>,
}

impl SummaryTotals {
    fn from_rows(rows: &[SummaryRow]) -> Self {
        let sum = |f: &dyn Fn(&SummaryRow) -> Option<Decimal>| -> Option<Decimal> {
            checked_sum(rows.iter().filter_map(f)).map(|s| round_half_up(s, 2))
        };
        let tax = |f: fn(&SummaryRow) -> &TaxColumns| -> [Option<Decimal>; 3] {
            [
                sum(&|r| f(r).base),
                sum(&|r| f(r).rate),
                sum(&|r| f(r).value),
            ]
        };
        let ibs_base = sum(&|r| r.ibs_cbs_base);
        Self {
            icms: tax(|r| &r.icms),
            pis: tax(|r| &r.pis),
            cofins: tax(|r| &r.cofins),
            ibs_base,
            ibs_value: sum(&|r| r.ibs_value),
            cbs_base: ibs_base,
            cbs_value: sum(&|r| r.cbs_value),
            ipi_base: sum(&|r| r.ipi_base),
            ipi_value: sum(&|r| r.ipi_value),
            item_total: sum(&|r| r.item_total),
        }
    }

    /// Cells in [`SUMMARY_COLUMNS`] order, labelled "TOTAL".
    pub fn cells(&self) -> Vec<Cell> {
        let tax = |t: &[Option<Decimal>; 3]| {
            [
                Cell::Empty,
                Cell::amount(t[0]),
                Cell::amount(t[1]),
                Cell::amount(t[2]),
            ]
        };
        let mut cells = vec![
            Cell::Text("TOTAL".into()),
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
        ];
        cells.extend(tax(&self.icms));
        cells.extend(tax(&self.pis));
        cells.extend(tax(&self.cofins));
        cells.extend([
            Cell::Empty,
            Cell::Empty,
            Cell::amount(self.ibs_base),
            Cell::amount(self.ibs_value),
            Cell::Empty,
            Cell::Empty,
            Cell::amount(self.cbs_base),
            Cell::amount(self.cbs_value),
            Cell::amount(self.ipi_base),
            Cell::amount(self.ipi_value),
            Cell::amount(self.item_total),
        ]);
        cells
    }
}

/// A rendered table: column names plus rows of cells in column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Rows as ordered (column, cell) mappings.
    pub fn mappings(&self) -> Vec<Vec<(&'static str, Cell)>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().copied().zip(row.iter().cloned()).collect())
            .collect()
    }
}

/// Count of results per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pass: usize,
    pub warning: usize,
    pub fail: usize,
}

/// Everything handed to the export sink and the display layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportBundle {
    /// Identification of the document, for display.
    pub header: Header,
    /// Summary rows, sorted by item number.
    pub summary: Vec<SummaryRow>,
    pub summary_totals: SummaryTotals,
    /// Rule-engine results followed by reconciliation results.
    pub checklist: Vec<CheckResult>,
    /// Declared `vNF`, for display.
    pub declared_invoice_total: Option<Decimal>,
}

impl ReportBundle {
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for r in &self.checklist {
            match r.status {
                Status::Pass => counts.pass += 1,
                Status::Warning => counts.warning += 1,
                Status::Fail => counts.fail += 1,
            }
        }
        counts
    }

    pub fn has_failures(&self) -> bool {
        self.checklist.iter().any(|r| r.status == Status::Fail)
    }

    /// Results of one check family, in checklist order.
    pub fn results_of(&self, kind: CheckKind) -> impl Iterator<Item = &CheckResult> {
        self.checklist.iter().filter(move |r| r.kind() == kind)
    }

    /// Summary table with the TOTAL line appended.
    pub fn summary_table(&self) -> Table {
        let mut rows: Vec<Vec<Cell>> = self.summary.iter().map(SummaryRow::cells).collect();
        rows.push(self.summary_totals.cells());
        Table {
            name: SUMMARY_SHEET,
            columns: SUMMARY_COLUMNS,
            rows,
        }
    }

    pub fn checklist_table(&self) -> Table {
        Table {
            name: CHECKLIST_SHEET,
            columns: CHECKLIST_COLUMNS,
            rows: self.checklist.iter().map(checklist_cells).collect(),
        }
    }
}

/// Checklist group label, as in the exported sheet.
pub fn group_label(result: &CheckResult) -> String {
    match (result.scope, result.kind()) {
        (Scope::Item(n), _) => format!("Item {n}"),
        (Scope::Document, CheckKind::Header) if result.check == CheckId::Environment => {
            "Cabeçalho".into()
        }
        (Scope::Document, CheckKind::Header) => "Partes".into(),
        (Scope::Document, CheckKind::Reconciliation) => "Totais".into(),
        (Scope::Document, _) => "Documento".into(),
    }
}

fn checklist_cells(r: &CheckResult) -> Vec<Cell> {
    let found = match (r.actual, r.found.as_deref()) {
        (Some(a), _) => Cell::Amount(cents(a)),
        (None, f) => Cell::text(f),
    };
    let expected = r.expected.map_or(Cell::Empty, |e| Cell::Amount(cents(e)));
    vec![
        Cell::Text(group_label(r)),
        Cell::Text(r.check.code().into()),
        Cell::Text(r.field.clone()),
        Cell::Text(r.rule.clone()),
        Cell::Text(r.status.symbol().into()),
        found,
        expected,
        Cell::Text(r.message.clone()),
    ]
}

/// Merge the invoice projection and both engines' results into a bundle.
///
/// Checklist order is fixed: rule-engine results first, then
/// reconciliation results, each in the order the engine produced them.
pub fn assemble_report(
    invoice: &Invoice,
    rule_results: Vec<CheckResult>,
    reconciliation_results: Vec<CheckResult>,
) -> ReportBundle {
    let mut summary: Vec<SummaryRow> = invoice.items.iter().map(SummaryRow::from_item).collect();
    summary.sort_by_key(|r| r.order);
    let summary_totals = SummaryTotals::from_rows(&summary);

    let mut checklist = rule_results;
    checklist.extend(reconciliation_results);

    let bundle = ReportBundle {
        header: invoice.header.clone(),
        summary,
        summary_totals,
        checklist,
        declared_invoice_total: invoice.totals.invoice,
    };
    let counts = bundle.status_counts();
    info!(
        items = bundle.summary.len(),
        pass = counts.pass,
        warning = counts.warning,
        fail = counts.fail,
        "report assembled"
    );
    bundle
}
