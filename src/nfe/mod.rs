//! NF-e XML extraction (layout 4.00 with the NT 2025.002-RTC groups).
//!
//! # Example
//!
//! ```no_run
//! use nfe_rtc::core::ValidationConfig;
//! use nfe_rtc::nfe;
//!
//! let xml = std::fs::read("nota.xml").unwrap();
//! let report = nfe::check_nfe_xml(&xml, &ValidationConfig::pilot_2026()).unwrap();
//! for result in &report.checklist {
//!     println!("{result}");
//! }
//! ```

mod parse;

use tracing::{info, warn};

use crate::core::{Invoice, ReportBundle, RtcError, ValidationConfig, check_invoice};

pub use parse::from_nfe_xml;

/// NF-e namespace URI.
pub const NFE_NAMESPACE: &str = "http://www.portalfiscal.inf.br/nfe";

/// XML digital signature namespace URI (present in signed documents).
pub const DSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Oldest `infNFe/@versao` accepted.
pub const MIN_LAYOUT_VERSION: &str = "4.00";

/// Extract an invoice, rejecting documents above `config.max_document_bytes`
/// before any parsing happens.
pub fn extract(xml: &[u8], config: &ValidationConfig) -> Result<Invoice, RtcError> {
    if xml.len() > config.max_document_bytes {
        warn!(
            bytes = xml.len(),
            limit = config.max_document_bytes,
            "document rejected: too large"
        );
        return Err(RtcError::DocumentTooLarge {
            size: xml.len(),
            limit: config.max_document_bytes,
        });
    }
    let invoice = from_nfe_xml(xml)?;
    info!(
        bytes = xml.len(),
        items = invoice.items.len(),
        pre_rollout = invoice.is_pre_rollout(),
        "NF-e extracted"
    );
    Ok(invoice)
}

/// Full pipeline for one uploaded document: extract, check, assemble.
///
/// Only extraction failures are returned as errors; every validation
/// finding is part of the returned report.
pub fn check_nfe_xml(xml: &[u8], config: &ValidationConfig) -> Result<ReportBundle, RtcError> {
    let invoice = extract(xml, config)?;
    Ok(check_invoice(&invoice, config))
}
