//! Validation parameters for a rollout phase.
//!
//! Nothing here is ambient: the rule and reconciliation engines take a
//! `&ValidationConfig`, so several phases can be evaluated side by side.

use std::path::Path;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::RtcError;

/// Verdict assigned to a missing tax-reform tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The tag is mandatory in this phase.
    Fail,
    /// The tag is optional in this phase but expected eventually.
    Warning,
}

/// Parameters shared by the rule engine and the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// IBS rate in percent (0.10 during the 2026 test phase).
    pub ibs_rate: Decimal,
    /// CBS rate in percent (0.90 during the 2026 test phase).
    pub cbs_rate: Decimal,
    /// Absolute deviation, in currency units, accepted as a pass.
    pub tolerance: Decimal,
    /// Absolute deviation up to which a mismatch is only a warning.
    pub warning_tolerance: Decimal,
    /// Verdict for a missing IBS/CBS tag on a taxed item.
    pub missing_tag_severity: Severity,
    /// IBS/CBS CST codes that carry no base or value (exemption, immunity).
    pub untaxed_csts: Vec<String>,
    /// Evaluate issuance metadata (environment, parties).
    pub header_checks: bool,
    /// Expected `tpAmb` for header checks.
    pub expected_environment: String,
    /// Expected `indIEDest` for header checks.
    pub expected_recipient_indicator: String,
    /// Upper bound on the size of an uploaded document.
    pub max_document_bytes: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::pilot_2026()
    }
}

impl ValidationConfig {
    /// 2026 test phase: IBS 0.10 %, CBS 0.90 %, missing tags are warnings.
    pub fn pilot_2026() -> Self {
        Self {
            ibs_rate: dec!(0.10),
            cbs_rate: dec!(0.90),
            tolerance: dec!(0.01),
            warning_tolerance: dec!(0.05),
            missing_tag_severity: Severity::Warning,
            untaxed_csts: vec!["400".into(), "410".into()],
            header_checks: false,
            expected_environment: "2".into(),
            expected_recipient_indicator: "1".into(),
            max_document_bytes: 10 * 1024 * 1024,
        }
    }

    /// A phase in which the IBS/CBS group is mandatory on every taxed item.
    pub fn mandatory(ibs_rate: Decimal, cbs_rate: Decimal) -> Self {
        Self {
            ibs_rate,
            cbs_rate,
            missing_tag_severity: Severity::Fail,
            ..Self::pilot_2026()
        }
    }

    pub fn with_rates(mut self, ibs_rate: Decimal, cbs_rate: Decimal) -> Self {
        self.ibs_rate = ibs_rate;
        self.cbs_rate = cbs_rate;
        self
    }

    pub fn with_tolerance(mut self, tolerance: Decimal, warning_tolerance: Decimal) -> Self {
        self.tolerance = tolerance;
        self.warning_tolerance = warning_tolerance;
        self
    }

    pub fn with_header_checks(mut self, enabled: bool) -> Self {
        self.header_checks = enabled;
        self
    }

    /// True when items with this IBS/CBS CST need no base or value.
    pub fn is_untaxed_cst(&self, cst: &str) -> bool {
        self.untaxed_csts.iter().any(|c| c == cst)
    }

    /// Reject parameter combinations the engines cannot interpret.
    pub fn validate(&self) -> Result<(), RtcError> {
        if self.ibs_rate.is_sign_negative() || self.cbs_rate.is_sign_negative() {
            return Err(RtcError::Config("tax rates must not be negative".into()));
        }
        if self.ibs_rate > dec!(100) || self.cbs_rate > dec!(100) {
            return Err(RtcError::Config("tax rates are percentages (0-100)".into()));
        }
        if self.tolerance.is_sign_negative() {
            return Err(RtcError::Config("tolerance must not be negative".into()));
        }
        if self.warning_tolerance < self.tolerance {
            return Err(RtcError::Config(format!(
                "warning tolerance {} is narrower than tolerance {}",
                self.warning_tolerance, self.tolerance
            )));
        }
        if self.max_document_bytes == 0 {
            return Err(RtcError::Config("max_document_bytes must be positive".into()));
        }
        Ok(())
    }

    /// Load configuration from a JSON file. Missing keys take the 2026
    /// pilot defaults.
    pub fn from_file(path: &Path) -> Result<Self, RtcError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RtcError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| RtcError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), RtcError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| RtcError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| RtcError::Config(format!("{}: {e}", path.display())))
    }
}
