//! # nfe-rtc
//!
//! Conformance checks for NF-e documents carrying the consumption-tax reform
//! fields (IBS, CBS) introduced by NT 2025.002-RTC.
//!
//! A single uploaded XML document is extracted into an [`Invoice`], checked
//! by a rule engine (tag presence, item arithmetic) and a reconciliation
//! engine (sum of items against declared totals), and merged into a
//! [`ReportBundle`] ready for display or spreadsheet export.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use nfe_rtc::core::*;
//! use rust_decimal_macros::dec;
//!
//! let invoice = InvoiceBuilder::new()
//!     .add_item(LineItemBuilder::new(1, dec!(1000.00))
//!         .icms("00", dec!(1000.00), dec!(18))
//!         .pis("01", dec!(1000.00), dec!(1.65))
//!         .cofins("01", dec!(1000.00), dec!(7.60))
//!         .ibs_cbs_pilot("000", "000001")
//!         .build())
//!     .derive_totals()
//!     .build();
//!
//! let report = check_invoice(&invoice, &ValidationConfig::pilot_2026());
//! assert!(!report.has_failures());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Invoice model, rule engine, reconciliation, report |
//! | `nfe` (default) | NF-e XML extraction and the full upload pipeline |
//! | `export` (default) | CSV / JSON export of the report |
//! | `cli` | `nfe-rtc` command-line tool |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "nfe")]
pub mod nfe;

#[cfg(feature = "export")]
pub mod export;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
