use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::amount::{checked_sum, tax_amount};
use super::types::*;

/// Builder for in-memory invoices, for callers that already hold the data
/// (ERP integrations, tests) and want to run the checks without XML.
///
/// ```
/// use nfe_rtc::core::*;
/// use rust_decimal_macros::dec;
///
/// let invoice = InvoiceBuilder::new()
///     .number("1234")
///     .add_item(LineItemBuilder::new(1, dec!(1000.00))
///         .icms("00", dec!(1000.00), dec!(18))
///         .ibs_cbs_pilot("000", "000001")
///         .build())
///     .derive_totals()
///     .build();
///
/// assert_eq!(invoice.totals.ibs, Some(dec!(1.00)));
/// assert_eq!(invoice.totals.cbs, Some(dec!(9.00)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InvoiceBuilder {
    header: Header,
    issuer: Party,
    recipient: Party,
    items: Vec<LineItem>,
    totals: Option<DocumentTotals>,
    derive_totals: bool,
}

impl InvoiceBuilder {
    pub fn new() -> Self {
        Self {
            header: Header {
                layout_version: Some("4.00".into()),
                model: Some("55".into()),
                environment: Some("2".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn number(mut self, number: impl Into<String>) -> Self {
        self.header.number = Some(number.into());
        self
    }

    pub fn environment(mut self, tp_amb: impl Into<String>) -> Self {
        self.header.environment = Some(tp_amb.into());
        self
    }

    pub fn issuer(mut self, party: Party) -> Self {
        self.issuer = party;
        self
    }

    pub fn recipient(mut self, party: Party) -> Self {
        self.recipient = party;
        self
    }

    pub fn add_item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    /// Declare these totals verbatim.
    pub fn totals(mut self, totals: DocumentTotals) -> Self {
        self.totals = Some(totals);
        self.derive_totals = false;
        self
    }

    /// Declare totals equal to the sums of the items.
    pub fn derive_totals(mut self) -> Self {
        self.derive_totals = true;
        self
    }

    pub fn build(self) -> Invoice {
        let totals = if self.derive_totals {
            derive_totals(&self.items)
        } else {
            self.totals.unwrap_or_default()
        };
        Invoice {
            header: self.header,
            issuer: self.issuer,
            recipient: self.recipient,
            items: self.items,
            totals,
            invalid_fields: Vec::new(),
        }
    }
}

/// Totals an issuer would declare for these items.
///
/// The `IBSCBSTot` figures are only set when at least one item carries an
/// IBS/CBS group. A sum that leaves the decimal range is left unset.
pub fn derive_totals(items: &[LineItem]) -> DocumentTotals {
    fn sum(items: &[LineItem], f: impl Fn(&LineItem) -> Option<Decimal>) -> Option<Decimal> {
        checked_sum(items.iter().filter_map(f))
    }

    let has_reform = items.iter().any(|i| i.ibs_cbs.is_some());
    let reform = |f: fn(&IbsCbs) -> Option<Decimal>| {
        if has_reform {
            sum(items, |i| i.ibs_cbs.as_ref().and_then(f))
        } else {
            None
        }
    };

    DocumentTotals {
        icms_base: sum(items, |i| i.icms.as_ref().and_then(|t| t.base)),
        icms: sum(items, |i| i.icms.as_ref().and_then(|t| t.value)),
        products: sum(items, |i| i.values.product),
        ipi: sum(items, |i| i.ipi.as_ref().and_then(|t| t.value)),
        pis: sum(items, |i| i.pis.as_ref().and_then(|t| t.value)),
        cofins: sum(items, |i| i.cofins.as_ref().and_then(|t| t.value)),
        invoice: sum(items, LineItem::total),
        ibs_cbs_base: reform(|g| g.base),
        ibs: reform(|g| g.ibs_value),
        cbs: reform(|g| g.cbs_value),
    }
}

/// Builder for a single `det` line.
#[derive(Debug)]
pub struct LineItemBuilder {
    item: LineItem,
}

impl LineItemBuilder {
    /// Item `n_item` with `vProd` = `product_value`.
    pub fn new(n_item: u32, product_value: Decimal) -> Self {
        Self {
            item: LineItem {
                number: n_item,
                product_code: Some(format!("P{n_item:04}")),
                ncm: Some("84713012".into()),
                cfop: Some("5102".into()),
                values: ItemValues {
                    product: Some(product_value),
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }

    pub fn product_code(mut self, code: impl Into<String>) -> Self {
        self.item.product_code = Some(code.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.item.description = Some(text.into());
        self
    }

    pub fn ncm(mut self, ncm: impl Into<String>) -> Self {
        self.item.ncm = Some(ncm.into());
        self
    }

    pub fn cfop(mut self, cfop: impl Into<String>) -> Self {
        self.item.cfop = Some(cfop.into());
        self
    }

    pub fn freight(mut self, value: Decimal) -> Self {
        self.item.values.freight = Some(value);
        self
    }

    pub fn insurance(mut self, value: Decimal) -> Self {
        self.item.values.insurance = Some(value);
        self
    }

    pub fn discount(mut self, value: Decimal) -> Self {
        self.item.values.discount = Some(value);
        self
    }

    pub fn other(mut self, value: Decimal) -> Self {
        self.item.values.other = Some(value);
        self
    }

    /// ICMS with value = base × rate.
    pub fn icms(mut self, cst: &str, base: Decimal, rate: Decimal) -> Self {
        self.item.icms = Some(classic(format!("ICMS{cst}"), cst, base, rate));
        self
    }

    pub fn pis(mut self, cst: &str, base: Decimal, rate: Decimal) -> Self {
        self.item.pis = Some(classic("PISAliq".into(), cst, base, rate));
        self
    }

    pub fn cofins(mut self, cst: &str, base: Decimal, rate: Decimal) -> Self {
        self.item.cofins = Some(classic("COFINSAliq".into(), cst, base, rate));
        self
    }

    pub fn ipi(mut self, cst: &str, base: Decimal, rate: Decimal) -> Self {
        self.item.ipi = Some(classic("IPITrib".into(), cst, base, rate));
        self
    }

    /// IBS/CBS group with explicit base and values, no rates or shares.
    pub fn ibs_cbs(
        mut self,
        cst: &str,
        class_code: &str,
        base: Decimal,
        ibs_value: Decimal,
        cbs_value: Decimal,
    ) -> Self {
        self.item.ibs_cbs = Some(IbsCbs {
            cst: Some(cst.into()),
            class_code: Some(class_code.into()),
            base: Some(base),
            ibs_value: Some(ibs_value),
            cbs_value: Some(cbs_value),
            ..Default::default()
        });
        self
    }

    /// IBS/CBS group as issued during the 2026 test phase: base = vProd,
    /// IBS 0.10 % (all state share), CBS 0.90 %.
    pub fn ibs_cbs_pilot(self, cst: &str, class_code: &str) -> Self {
        self.ibs_cbs_at(cst, class_code, dec!(0.10), dec!(0.90))
    }

    /// IBS/CBS group with base = vProd and values computed at the given rates.
    pub fn ibs_cbs_at(mut self, cst: &str, class_code: &str, ibs_rate: Decimal, cbs_rate: Decimal) -> Self {
        let base = self.item.values.product.unwrap_or(Decimal::ZERO);
        let ibs = tax_amount(base, ibs_rate);
        self.item.ibs_cbs = Some(IbsCbs {
            cst: Some(cst.into()),
            class_code: Some(class_code.into()),
            base: Some(base),
            ibs_state_rate: Some(ibs_rate),
            ibs_state_value: ibs,
            ibs_municipal_rate: Some(Decimal::ZERO),
            ibs_municipal_value: Some(Decimal::ZERO),
            ibs_value: ibs,
            cbs_rate: Some(cbs_rate),
            cbs_value: tax_amount(base, cbs_rate),
        });
        self
    }

    /// IBS/CBS group carrying only CST and classification (untaxed CSTs).
    pub fn ibs_cbs_codes_only(mut self, cst: &str, class_code: &str) -> Self {
        self.item.ibs_cbs = Some(IbsCbs {
            cst: Some(cst.into()),
            class_code: Some(class_code.into()),
            ..Default::default()
        });
        self
    }

    pub fn build(self) -> LineItem {
        self.item
    }
}

fn classic(group: String, cst: &str, base: Decimal, rate: Decimal) -> ClassicTax {
    ClassicTax {
        group,
        cst: Some(cst.into()),
        base: Some(base),
        rate: Some(rate),
        value: tax_amount(base, rate),
    }
}
