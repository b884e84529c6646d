//! Invoice model, validation configuration, and the checking engines.
//!
//! The pipeline is [`evaluate_rules`] and [`reconcile`] over an
//! [`Invoice`], merged by [`assemble_report`] into a [`ReportBundle`].
//! [`check_invoice`] runs all three.

mod amount;
mod builder;
mod check;
mod config;
mod error;
mod reconcile;
pub mod report;
mod rules;
mod types;

pub use amount::{
    cents, checked_sum, classify_deviation, deviation, format_amount, round_half_up, tax_amount,
};
pub use builder::*;
pub use check::*;
pub use config::*;
pub use error::*;
pub use reconcile::reconcile;
pub use report::{Cell, ReportBundle, StatusCounts, SummaryRow, SummaryTotals, Table, assemble_report};
pub use rules::evaluate_rules;
pub use types::*;

/// Run the rule engine and the reconciliation engine and assemble the report.
pub fn check_invoice(invoice: &Invoice, config: &ValidationConfig) -> ReportBundle {
    let rule_results = evaluate_rules(invoice, config);
    let reconciliation_results = reconcile(invoice, config);
    assemble_report(invoice, rule_results, reconciliation_results)
}
