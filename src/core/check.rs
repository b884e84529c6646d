use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Warning,
    Fail,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warning => "warning",
            Self::Fail => "fail",
        }
    }

    /// Symbol used in the exported checklist.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Pass => "✅",
            Self::Warning => "⚠️",
            Self::Fail => "❌",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What a check is about: the whole document or one line item (`nItem`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "item", rename_all = "lowercase")]
pub enum Scope {
    Document,
    Item(u32),
}

/// Family a check belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// Issuance metadata.
    Header,
    /// Unreadable numeric text.
    Format,
    /// Tag presence (missing-field findings).
    Presence,
    /// Item-level arithmetic (arithmetic-mismatch findings).
    Arithmetic,
    /// Sum of items against declared totals.
    Reconciliation,
}

/// Stable identifiers of every check the engines can emit.
///
/// Serialized as its [`code`](CheckId::code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum CheckId {
    Environment,
    IssuerCnpj,
    IssuerIe,
    RecipientCnpj,
    RecipientIe,
    RecipientUf,
    RecipientIeIndicator,
    NumericFormat,
    IbsCbsGroup,
    IbsCbsCst,
    IbsCbsClassTrib,
    IbsCbsBase,
    IbsValue,
    CbsValue,
    IbsArithmetic,
    CbsArithmetic,
    IbsComposition,
    IbsDeclaredRate,
    CbsDeclaredRate,
    IcmsTotal,
    PisTotal,
    CofinsTotal,
    IpiTotal,
    ProductTotal,
    IbsCbsBaseTotal,
    IbsTotal,
    CbsTotal,
    InvoiceTotal,
}

impl CheckId {
    pub const ALL: [CheckId; 28] = [
        Self::Environment,
        Self::IssuerCnpj,
        Self::IssuerIe,
        Self::RecipientCnpj,
        Self::RecipientIe,
        Self::RecipientUf,
        Self::RecipientIeIndicator,
        Self::NumericFormat,
        Self::IbsCbsGroup,
        Self::IbsCbsCst,
        Self::IbsCbsClassTrib,
        Self::IbsCbsBase,
        Self::IbsValue,
        Self::CbsValue,
        Self::IbsArithmetic,
        Self::CbsArithmetic,
        Self::IbsComposition,
        Self::IbsDeclaredRate,
        Self::CbsDeclaredRate,
        Self::IcmsTotal,
        Self::PisTotal,
        Self::CofinsTotal,
        Self::IpiTotal,
        Self::ProductTotal,
        Self::IbsCbsBaseTotal,
        Self::IbsTotal,
        Self::CbsTotal,
        Self::InvoiceTotal,
    ];

    /// Look a check up by its stable code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Stable kebab-case name, suitable for filtering and export.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::IssuerCnpj => "issuer-cnpj",
            Self::IssuerIe => "issuer-ie",
            Self::RecipientCnpj => "recipient-cnpj",
            Self::RecipientIe => "recipient-ie",
            Self::RecipientUf => "recipient-uf",
            Self::RecipientIeIndicator => "recipient-ie-indicator",
            Self::NumericFormat => "numeric-format",
            Self::IbsCbsGroup => "ibscbs-group",
            Self::IbsCbsCst => "ibscbs-cst",
            Self::IbsCbsClassTrib => "ibscbs-cclasstrib",
            Self::IbsCbsBase => "ibscbs-vbc",
            Self::IbsValue => "ibs-value",
            Self::CbsValue => "cbs-value",
            Self::IbsArithmetic => "ibs-arithmetic",
            Self::CbsArithmetic => "cbs-arithmetic",
            Self::IbsComposition => "ibs-composition",
            Self::IbsDeclaredRate => "ibs-declared-rate",
            Self::CbsDeclaredRate => "cbs-declared-rate",
            Self::IcmsTotal => "icms-total",
            Self::PisTotal => "pis-total",
            Self::CofinsTotal => "cofins-total",
            Self::IpiTotal => "ipi-total",
            Self::ProductTotal => "product-total",
            Self::IbsCbsBaseTotal => "ibscbs-base-total",
            Self::IbsTotal => "ibs-total",
            Self::CbsTotal => "cbs-total",
            Self::InvoiceTotal => "invoice-total",
        }
    }

    pub fn kind(&self) -> CheckKind {
        match self {
            Self::Environment
            | Self::IssuerCnpj
            | Self::IssuerIe
            | Self::RecipientCnpj
            | Self::RecipientIe
            | Self::RecipientUf
            | Self::RecipientIeIndicator => CheckKind::Header,
            Self::NumericFormat => CheckKind::Format,
            Self::IbsCbsGroup
            | Self::IbsCbsCst
            | Self::IbsCbsClassTrib
            | Self::IbsCbsBase
            | Self::IbsValue
            | Self::CbsValue => CheckKind::Presence,
            Self::IbsArithmetic
            | Self::CbsArithmetic
            | Self::IbsComposition
            | Self::IbsDeclaredRate
            | Self::CbsDeclaredRate => CheckKind::Arithmetic,
            Self::IcmsTotal
            | Self::PisTotal
            | Self::CofinsTotal
            | Self::IpiTotal
            | Self::ProductTotal
            | Self::IbsCbsBaseTotal
            | Self::IbsTotal
            | Self::CbsTotal
            | Self::InvoiceTotal => CheckKind::Reconciliation,
        }
    }
}

impl std::fmt::Display for CheckId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl From<CheckId> for &'static str {
    fn from(id: CheckId) -> Self {
        id.code()
    }
}

impl TryFrom<String> for CheckId {
    type Error = String;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::from_code(&code).ok_or_else(|| format!("unknown check code '{code}'"))
    }
}

/// One validation outcome. Produced once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: CheckId,
    pub scope: Scope,
    pub status: Status,
    /// Tag path the check looked at (e.g. "IBSCBS/gIBSCBS/vIBS").
    pub field: String,
    /// Rule in words (e.g. "vBC × 0.10% (2 places)").
    pub rule: String,
    pub message: String,
    /// Value the rule derived, when the verdict is numeric.
    pub expected: Option<Decimal>,
    /// Value found in the document, when the verdict is numeric.
    pub actual: Option<Decimal>,
    /// Non-numeric value found in the document (codes, identifiers).
    pub found: Option<String>,
}

impl CheckResult {
    pub fn new(
        check: CheckId,
        scope: Scope,
        status: Status,
        field: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            check,
            scope,
            status,
            field: field.into(),
            rule: rule.into(),
            message: message.into(),
            expected: None,
            actual: None,
            found: None,
        }
    }

    /// Attach the expected and declared amounts behind the verdict.
    pub fn with_amounts(mut self, expected: Decimal, actual: Decimal) -> Self {
        self.expected = Some(expected);
        self.actual = Some(actual);
        self
    }

    /// Attach the declared amount alone, when nothing could be derived.
    pub fn with_actual(mut self, actual: Decimal) -> Self {
        self.actual = Some(actual);
        self
    }

    pub fn with_found(mut self, found: impl Into<String>) -> Self {
        self.found = Some(found.into());
        self
    }

    pub fn kind(&self) -> CheckKind {
        self.check.kind()
    }

    pub fn is_pass(&self) -> bool {
        self.status == Status::Pass
    }
}

impl std::fmt::Display for CheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.scope {
            Scope::Document => write!(f, "[{}] {}: {}", self.status, self.check, self.message),
            Scope::Item(n) => write!(
                f,
                "[{}] item {n} {}: {}",
                self.status, self.check, self.message
            ),
        }
    }
}
