use rust_decimal::Decimal;
use tracing::debug;

use super::amount::{classify_deviation, deviation, format_amount};
use super::check::{CheckId, CheckResult, Scope, Status};
use super::config::ValidationConfig;
use super::types::*;

/// What one item contributes to a document-level sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contribution {
    Value(Decimal),
    /// Absent, and the layout allows it to be absent.
    Zero,
    /// Absent where a value was expected; summed as zero but flagged.
    Missing,
    /// Present but not representable (the item total left the decimal range).
    OutOfRange,
}

impl Contribution {
    fn from_required(value: Option<Decimal>) -> Self {
        value.map_or(Self::Missing, Self::Value)
    }

    fn from_optional(value: Option<Decimal>) -> Self {
        value.map_or(Self::Zero, Self::Value)
    }
}

struct ReconciledField {
    check: CheckId,
    field: &'static str,
    item_tag: &'static str,
    item_value: fn(&LineItem, &ValidationConfig) -> Contribution,
    declared: fn(&DocumentTotals) -> Option<Decimal>,
}

/// Value tag inside a mandatory classic group: a missing group is partial
/// data, a missing value inside a present group (e.g. ICMS40) is zero.
fn classic(group: Option<&ClassicTax>) -> Contribution {
    match group {
        None => Contribution::Missing,
        Some(t) => Contribution::from_optional(t.value),
    }
}

/// IBS/CBS tag: untaxed CSTs legitimately carry no amounts.
fn reform(item: &LineItem, config: &ValidationConfig, pick: fn(&IbsCbs) -> Option<Decimal>) -> Contribution {
    match &item.ibs_cbs {
        None => Contribution::Missing,
        Some(g) => match pick(g) {
            Some(v) => Contribution::Value(v),
            None if g.cst.as_deref().is_some_and(|c| config.is_untaxed_cst(c)) => {
                Contribution::Zero
            }
            None => Contribution::Missing,
        },
    }
}

const FIELDS: &[ReconciledField] = &[
    ReconciledField {
        check: CheckId::IcmsTotal,
        field: "ICMSTot/vICMS",
        item_tag: "vICMS",
        item_value: |i, _| classic(i.icms.as_ref()),
        declared: |t| t.icms,
    },
    ReconciledField {
        check: CheckId::PisTotal,
        field: "ICMSTot/vPIS",
        item_tag: "vPIS",
        item_value: |i, _| classic(i.pis.as_ref()),
        declared: |t| t.pis,
    },
    ReconciledField {
        check: CheckId::CofinsTotal,
        field: "ICMSTot/vCOFINS",
        item_tag: "vCOFINS",
        item_value: |i, _| classic(i.cofins.as_ref()),
        declared: |t| t.cofins,
    },
    ReconciledField {
        check: CheckId::IpiTotal,
        field: "ICMSTot/vIPI",
        item_tag: "vIPI",
        item_value: |i, _| Contribution::from_optional(i.ipi.as_ref().and_then(|t| t.value)),
        declared: |t| t.ipi,
    },
    ReconciledField {
        check: CheckId::ProductTotal,
        field: "ICMSTot/vProd",
        item_tag: "vProd",
        item_value: |i, _| Contribution::from_required(i.values.product),
        declared: |t| t.products,
    },
    ReconciledField {
        check: CheckId::IbsCbsBaseTotal,
        field: "IBSCBSTot/vBCIBSCBS",
        item_tag: "IBSCBS vBC",
        item_value: |i, c| reform(i, c, |g| g.base),
        declared: |t| t.ibs_cbs_base,
    },
    ReconciledField {
        check: CheckId::IbsTotal,
        field: "IBSCBSTot/gIBS/vIBS",
        item_tag: "vIBS",
        item_value: |i, c| reform(i, c, |g| g.ibs_value),
        declared: |t| t.ibs,
    },
    ReconciledField {
        check: CheckId::CbsTotal,
        field: "IBSCBSTot/gCBS/vCBS",
        item_tag: "vCBS",
        item_value: |i, c| reform(i, c, |g| g.cbs_value),
        declared: |t| t.cbs,
    },
    ReconciledField {
        check: CheckId::InvoiceTotal,
        field: "ICMSTot/vNF",
        item_tag: "item total",
        item_value: |i, _| match (i.values.product, i.total()) {
            (Some(_), None) => Contribution::OutOfRange,
            (_, total) => Contribution::from_required(total),
        },
        declared: |t| t.invoice,
    },
];

/// Recompute every document total from the items and compare it with the
/// declared total. One document-scoped result per reconciled field.
///
/// Absent item values and absent declared totals are summed as zero; when
/// that happens a passing comparison is downgraded to a warning so partial
/// data never passes silently.
pub fn reconcile(invoice: &Invoice, config: &ValidationConfig) -> Vec<CheckResult> {
    let results: Vec<CheckResult> = FIELDS
        .iter()
        .map(|f| reconcile_field(f, invoice, config))
        .collect();
    debug!(results = results.len(), "reconciliation finished");
    results
}

fn reconcile_field(f: &ReconciledField, invoice: &Invoice, config: &ValidationConfig) -> CheckResult {
    let rule = format!("Σ {} of items", f.item_tag);
    let mut sum = Some(Decimal::ZERO);
    let mut missing = 0usize;
    for item in &invoice.items {
        match (f.item_value)(item, config) {
            Contribution::Value(v) => sum = sum.and_then(|s| s.checked_add(v)),
            Contribution::Zero => {}
            Contribution::Missing => missing += 1,
            Contribution::OutOfRange => sum = None,
        }
    }

    let declared = (f.declared)(&invoice.totals);
    let actual = declared.unwrap_or(Decimal::ZERO);
    let Some(sum) = sum else {
        return CheckResult::new(
            f.check,
            Scope::Document,
            Status::Fail,
            f.field,
            rule,
            format!("Σ {} of items exceeds the decimal range", f.item_tag),
        )
        .with_actual(actual);
    };
    let mut status = classify_deviation(sum, actual, config);

    let mut message = match status {
        Status::Pass => format!(
            "Σ items {} matches declared {}",
            format_amount(sum),
            format_amount(actual)
        ),
        _ => format!(
            "declared {} differs from Σ items {} by {}",
            format_amount(actual),
            format_amount(sum),
            deviation(sum, actual).map_or_else(|| "an unrepresentable amount".into(), format_amount)
        ),
    };

    let mut notes = Vec::new();
    if missing > 0 {
        notes.push(format!(
            "{missing} item(s) lack {}, counted as zero",
            f.item_tag
        ));
    }
    if declared.is_none() {
        notes.push(format!("{} is absent, counted as zero", f.field));
    }
    if !notes.is_empty() {
        if status == Status::Pass {
            status = Status::Warning;
        }
        message = format!("{message}; partial data: {}", notes.join("; "));
    }

    CheckResult::new(
        f.check,
        Scope::Document,
        status,
        f.field,
        rule,
        message,
    )
    .with_amounts(sum, actual)
}
