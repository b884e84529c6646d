use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::InvalidField;
use super::round_half_up;

/// NF-e document as extracted from `nfeProc`/`NFe`.
///
/// Constructed once per uploaded document and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Identification block (`ide`) and `infNFe` attributes.
    pub header: Header,
    /// `emit`: issuer.
    pub issuer: Party,
    /// `dest`: recipient.
    pub recipient: Party,
    /// `det`: line items in document order.
    pub items: Vec<LineItem>,
    /// `total`: declared document totals.
    pub totals: DocumentTotals,
    /// Numeric tags that were present but unreadable.
    pub invalid_fields: Vec<InvalidField>,
}

impl Invoice {
    /// Look up an item by its `nItem` number.
    pub fn item(&self, number: u32) -> Option<&LineItem> {
        self.items.iter().find(|i| i.number == number)
    }

    /// True when no item carries an `IBSCBS` group (pre-rollout issuer).
    pub fn is_pre_rollout(&self) -> bool {
        self.items.iter().all(|i| i.ibs_cbs.is_none())
    }
}

/// `ide` metadata. Captured for display; only checked when header checks
/// are enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// `infNFe/@Id` (e.g. "NFe3525...").
    pub access_key: Option<String>,
    /// `infNFe/@versao` (e.g. "4.00").
    pub layout_version: Option<String>,
    /// `mod`: 55 (NF-e) or 65 (NFC-e).
    pub model: Option<String>,
    /// `serie`.
    pub series: Option<String>,
    /// `nNF`.
    pub number: Option<String>,
    /// `dhEmi`.
    pub issued_at: Option<DateTime<FixedOffset>>,
    /// `tpAmb`: 1 = production, 2 = homologation.
    pub environment: Option<String>,
}

/// `emit` / `dest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Party {
    /// CNPJ (legal entity).
    pub cnpj: Option<String>,
    /// CPF (natural person).
    pub cpf: Option<String>,
    /// State registration (IE).
    pub state_registration: Option<String>,
    /// `xNome`.
    pub name: Option<String>,
    /// `UF` of the party address.
    pub uf: Option<String>,
    /// `indIEDest` (recipient only).
    pub ie_indicator: Option<String>,
}

/// `det`: one product/service line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// `@nItem`.
    pub number: u32,
    /// `prod/cProd`.
    pub product_code: Option<String>,
    /// `prod/xProd`.
    pub description: Option<String>,
    /// `prod/NCM`.
    pub ncm: Option<String>,
    /// `prod/CFOP`.
    pub cfop: Option<String>,
    /// Commercial values of `prod`.
    pub values: ItemValues,
    /// `imposto/ICMS/*`.
    pub icms: Option<ClassicTax>,
    /// `imposto/PIS/*`.
    pub pis: Option<ClassicTax>,
    /// `imposto/COFINS/*`.
    pub cofins: Option<ClassicTax>,
    /// `imposto/IPI/IPITrib` or `IPINT`.
    pub ipi: Option<ClassicTax>,
    /// `imposto/IBSCBS`.
    pub ibs_cbs: Option<IbsCbs>,
}

impl LineItem {
    /// vIPI, treating an absent group as zero.
    pub fn ipi_value(&self) -> Decimal {
        self.ipi
            .as_ref()
            .and_then(|t| t.value)
            .unwrap_or(Decimal::ZERO)
    }

    /// Item total in the technical-note sense:
    /// vProd + vFrete + vSeg + vOutro − vDesc + vIPI, rounded to cents.
    ///
    /// `None` when vProd is absent or the sum leaves the decimal range.
    pub fn total(&self) -> Option<Decimal> {
        let v = &self.values;
        let z = Decimal::ZERO;
        let total = v
            .product?
            .checked_add(v.freight.unwrap_or(z))?
            .checked_add(v.insurance.unwrap_or(z))?
            .checked_add(v.other.unwrap_or(z))?
            .checked_sub(v.discount.unwrap_or(z))?
            .checked_add(self.ipi_value())?;
        Some(round_half_up(total, 2))
    }

    pub fn ibs_cbs_cst(&self) -> Option<&str> {
        self.ibs_cbs.as_ref().and_then(|g| g.cst.as_deref())
    }
}

/// Commercial values declared in `prod`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemValues {
    /// `vProd`.
    pub product: Option<Decimal>,
    /// `vFrete`.
    pub freight: Option<Decimal>,
    /// `vSeg`.
    pub insurance: Option<Decimal>,
    /// `vDesc`.
    pub discount: Option<Decimal>,
    /// `vOutro`.
    pub other: Option<Decimal>,
}

/// A pre-reform tax group (ICMS, PIS, COFINS, IPI).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassicTax {
    /// Name of the concrete group element (e.g. "ICMS00", "PISAliq", "IPITrib").
    pub group: String,
    /// CST, or CSOSN for Simples Nacional ICMS groups.
    pub cst: Option<String>,
    /// `vBC`.
    pub base: Option<Decimal>,
    /// `pICMS` / `pPIS` / `pCOFINS` / `pIPI`, in percent.
    pub rate: Option<Decimal>,
    /// `vICMS` / `vPIS` / `vCOFINS` / `vIPI`.
    pub value: Option<Decimal>,
}

/// `IBSCBS`: tax-reform group introduced by NT 2025.002-RTC.
///
/// CBS shares the CST, classification and base of the group; only its rate
/// and value live in `gCBS`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IbsCbs {
    /// `CST`.
    pub cst: Option<String>,
    /// `cClassTrib`.
    pub class_code: Option<String>,
    /// `gIBSCBS/vBC`.
    pub base: Option<Decimal>,
    /// `gIBSUF/pIBSUF`.
    pub ibs_state_rate: Option<Decimal>,
    /// `gIBSUF/vIBSUF`.
    pub ibs_state_value: Option<Decimal>,
    /// `gIBSMun/pIBSMun`.
    pub ibs_municipal_rate: Option<Decimal>,
    /// `gIBSMun/vIBSMun`.
    pub ibs_municipal_value: Option<Decimal>,
    /// `gIBSCBS/vIBS`.
    pub ibs_value: Option<Decimal>,
    /// `gCBS/pCBS`.
    pub cbs_rate: Option<Decimal>,
    /// `gCBS/vCBS`.
    pub cbs_value: Option<Decimal>,
}

impl IbsCbs {
    /// Declared IBS rate: state plus municipal share. `None` unless at
    /// least one share is declared.
    pub fn ibs_rate(&self) -> Option<Decimal> {
        match (self.ibs_state_rate, self.ibs_municipal_rate) {
            (None, None) => None,
            (s, m) => s.unwrap_or(Decimal::ZERO).checked_add(m.unwrap_or(Decimal::ZERO)),
        }
    }
}

/// `total`: declared document totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTotals {
    /// `ICMSTot/vBC`.
    pub icms_base: Option<Decimal>,
    /// `ICMSTot/vICMS`.
    pub icms: Option<Decimal>,
    /// `ICMSTot/vProd`.
    pub products: Option<Decimal>,
    /// `ICMSTot/vIPI`.
    pub ipi: Option<Decimal>,
    /// `ICMSTot/vPIS`.
    pub pis: Option<Decimal>,
    /// `ICMSTot/vCOFINS`.
    pub cofins: Option<Decimal>,
    /// `ICMSTot/vNF`.
    pub invoice: Option<Decimal>,
    /// `IBSCBSTot/vBCIBSCBS`.
    pub ibs_cbs_base: Option<Decimal>,
    /// `IBSCBSTot/gIBS/vIBS`.
    pub ibs: Option<Decimal>,
    /// `IBSCBSTot/gCBS/vCBS`.
    pub cbs: Option<Decimal>,
}
