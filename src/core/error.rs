use thiserror::Error;

/// Errors that abort processing of a document.
///
/// Validation findings are never errors: they are returned as
/// [`CheckResult`](super::CheckResult)s so a best-effort report is always
/// available for a structurally parseable document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RtcError {
    /// The input is not well-formed XML.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Well-formed XML that is not a recognizable NF-e tax-reform layout.
    #[error("unsupported layout: {0}")]
    UnsupportedLayout(String),

    /// The input exceeds the configured size bound.
    #[error("document is {size} bytes, limit is {limit}")]
    DocumentTooLarge { size: usize, limit: usize },

    /// Invalid or unreadable validation configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Report export failure.
    #[error("export error: {0}")]
    Export(String),
}

impl RtcError {
    /// True for the errors raised while reading the uploaded document.
    pub fn is_extraction_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedDocument(_) | Self::UnsupportedLayout(_) | Self::DocumentTooLarge { .. }
        )
    }
}

/// A numeric tag whose text could not be read as a decimal.
///
/// The extractor leaves the corresponding field absent and records the raw
/// text here; the rule engine reports each one as a failed check.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InvalidField {
    /// Item number (`nItem`) or `None` for document-level tags.
    pub item: Option<u32>,
    /// Slash-separated tag path relative to the item or the totals block
    /// (e.g. "IBSCBS/gIBSCBS/vBC").
    pub path: String,
    /// The text as found in the document.
    pub raw: String,
}

impl std::fmt::Display for InvalidField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.item {
            Some(n) => write!(f, "item {n}: {} = '{}' is not a decimal", self.path, self.raw),
            None => write!(f, "{} = '{}' is not a decimal", self.path, self.raw),
        }
    }
}
