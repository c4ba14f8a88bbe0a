//! Validation configuration and results.
//!
//! A [`ValidationResult`] is data, not an error: a payment that timed out or
//! paid the wrong amount produces an invalid result the caller can inspect.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Network finality a transaction must reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationLevel {
    Processed,
    Confirmed,
    Finalized,
}

impl ConfirmationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationLevel::Processed => "processed",
            ConfirmationLevel::Confirmed => "confirmed",
            ConfirmationLevel::Finalized => "finalized",
        }
    }
}

impl fmt::Display for ConfirmationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("Unknown confirmation level {0:?}, expected processed, confirmed or finalized")]
pub struct UnknownConfirmationLevel(pub String);

impl FromStr for ConfirmationLevel {
    type Err = UnknownConfirmationLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(ConfirmationLevel::Processed),
            "confirmed" => Ok(ConfirmationLevel::Confirmed),
            "finalized" => Ok(ConfirmationLevel::Finalized),
            _ => Err(UnknownConfirmationLevel(s.to_string())),
        }
    }
}

/// Observed confirmation state of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Processed,
    Confirmed,
    Finalized,
    #[default]
    Unknown,
    NotFound,
}

impl ConfirmationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationStatus::Processed => "processed",
            ConfirmationStatus::Confirmed => "confirmed",
            ConfirmationStatus::Finalized => "finalized",
            ConfirmationStatus::Unknown => "unknown",
            ConfirmationStatus::NotFound => "not_found",
        }
    }

    pub fn level(&self) -> Option<ConfirmationLevel> {
        match self {
            ConfirmationStatus::Processed => Some(ConfirmationLevel::Processed),
            ConfirmationStatus::Confirmed => Some(ConfirmationLevel::Confirmed),
            ConfirmationStatus::Finalized => Some(ConfirmationLevel::Finalized),
            ConfirmationStatus::Unknown | ConfirmationStatus::NotFound => None,
        }
    }

    /// Whether this status is at least as final as `required`.
    pub fn satisfies(&self, required: ConfirmationLevel) -> bool {
        self.level().is_some_and(|level| level >= required)
    }
}

impl From<ConfirmationLevel> for ConfirmationStatus {
    fn from(value: ConfirmationLevel) -> Self {
        match value {
            ConfirmationLevel::Processed => ConfirmationStatus::Processed,
            ConfirmationLevel::Confirmed => ConfirmationStatus::Confirmed,
            ConfirmationLevel::Finalized => ConfirmationStatus::Finalized,
        }
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Require the exact amount instead of allowing a one micro-unit tolerance.
    pub strict_amount: bool,
    pub require_memo: bool,
    pub require_references: bool,
    pub allow_extra_instructions: bool,
    pub max_confirmation_time_secs: u64,
    pub required_confirmation: ConfirmationLevel,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strict_amount: true,
            require_memo: false,
            require_references: false,
            allow_extra_instructions: true,
            max_confirmation_time_secs: 60,
            required_confirmation: ConfirmationLevel::Confirmed,
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationConfigError {
    #[error("max_confirmation_time must be positive")]
    ZeroConfirmationTime,
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), ValidationConfigError> {
        if self.max_confirmation_time_secs == 0 {
            return Err(ValidationConfigError::ZeroConfirmationTime);
        }
        Ok(())
    }

    pub fn max_confirmation_time(&self) -> Duration {
        Duration::from_secs(self.max_confirmation_time_secs)
    }
}

/// One of the independent checks recorded in a [`ValidationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCheck {
    Recipient,
    Amount,
    Memo,
    References,
    Token,
}

impl ValidationCheck {
    pub fn name(&self) -> &'static str {
        match self {
            ValidationCheck::Recipient => "Recipient",
            ValidationCheck::Amount => "Amount",
            ValidationCheck::Memo => "Memo",
            ValidationCheck::References => "References",
            ValidationCheck::Token => "SPL Token",
        }
    }
}

/// Outcome of checking a confirmed transaction against a payment request.
///
/// Starts valid with every check passing. [`add_error`](Self::add_error) and
/// [`fail_check`](Self::fail_check) are append-only and turn the result
/// invalid; [`add_warning`](Self::add_warning) records a note and leaves
/// validity untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    is_valid: bool,
    recipient_match: bool,
    amount_match: bool,
    memo_match: bool,
    references_match: bool,
    token_match: bool,
    confirmation_status: ConfirmationStatus,
    signature: Option<String>,
    errors: Vec<String>,
    warnings: Vec<String>,
    block_time: Option<i64>,
    slot: Option<u64>,
}

impl ValidationResult {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            recipient_match: true,
            amount_match: true,
            memo_match: true,
            references_match: true,
            token_match: true,
            confirmation_status: ConfirmationStatus::Unknown,
            signature: Some(signature.into()),
            errors: Vec::new(),
            warnings: Vec::new(),
            block_time: None,
            slot: None,
        }
    }

    /// A failed result for a transaction that never showed up.
    pub fn not_found(signature: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut result = Self::new(signature);
        result.recipient_match = false;
        result.amount_match = false;
        result.memo_match = false;
        result.references_match = false;
        result.token_match = false;
        result.confirmation_status = ConfirmationStatus::NotFound;
        result.add_error(reason);
        result
    }

    pub fn with_confirmation(
        mut self,
        status: ConfirmationStatus,
        slot: Option<u64>,
        block_time: Option<i64>,
    ) -> Self {
        self.confirmation_status = status;
        self.slot = slot;
        self.block_time = block_time;
        self
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Marks one check as failed and records why.
    pub fn fail_check(&mut self, check: ValidationCheck, error: impl Into<String>) {
        match check {
            ValidationCheck::Recipient => self.recipient_match = false,
            ValidationCheck::Amount => self.amount_match = false,
            ValidationCheck::Memo => self.memo_match = false,
            ValidationCheck::References => self.references_match = false,
            ValidationCheck::Token => self.token_match = false,
        }
        self.add_error(error);
    }

    pub fn check(&self, check: ValidationCheck) -> bool {
        match check {
            ValidationCheck::Recipient => self.recipient_match,
            ValidationCheck::Amount => self.amount_match,
            ValidationCheck::Memo => self.memo_match,
            ValidationCheck::References => self.references_match,
            ValidationCheck::Token => self.token_match,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn recipient_match(&self) -> bool {
        self.recipient_match
    }

    pub fn amount_match(&self) -> bool {
        self.amount_match
    }

    pub fn memo_match(&self) -> bool {
        self.memo_match
    }

    pub fn references_match(&self) -> bool {
        self.references_match
    }

    pub fn token_match(&self) -> bool {
        self.token_match
    }

    pub fn confirmation_status(&self) -> ConfirmationStatus {
        self.confirmation_status
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn block_time(&self) -> Option<i64> {
        self.block_time
    }

    pub fn slot(&self) -> Option<u64> {
        self.slot
    }

    pub fn summary(&self) -> String {
        if self.is_valid {
            return format!(
                "Transaction validation passed ({})",
                self.confirmation_status
            );
        }
        let mut summary = format!(
            "Transaction validation failed with {} error(s)",
            self.errors.len()
        );
        if !self.warnings.is_empty() {
            summary.push_str(&format!(" and {} warning(s)", self.warnings.len()));
        }
        summary
    }

    pub fn detailed_report(&self) -> String {
        let mut lines = vec![self.summary()];
        if let Some(signature) = &self.signature {
            lines.push(format!("Signature: {signature}"));
        }
        lines.push(format!("Confirmation: {}", self.confirmation_status));
        if let Some(slot) = self.slot {
            lines.push(format!("Slot: {slot}"));
        }
        lines.push(String::new());
        lines.push("Validation Checks:".to_string());
        for check in [
            ValidationCheck::Recipient,
            ValidationCheck::Amount,
            ValidationCheck::Memo,
            ValidationCheck::References,
            ValidationCheck::Token,
        ] {
            let mark = if self.check(check) { "PASS" } else { "FAIL" };
            lines.push(format!("  [{mark}] {}", check.name()));
        }
        for (title, items) in [("Errors:", &self.errors), ("Warnings:", &self.warnings)] {
            if !items.is_empty() {
                lines.push(String::new());
                lines.push(title.to_string());
                lines.extend(items.iter().map(|item| format!("  - {item}")));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_result_is_valid() {
        let result = ValidationResult::new("sig");
        assert!(result.is_valid());
        assert!(result.recipient_match() && result.amount_match() && result.token_match());
        assert_eq!(result.confirmation_status(), ConfirmationStatus::Unknown);
    }

    #[test]
    fn test_errors_flip_validity_warnings_do_not() {
        let mut result = ValidationResult::new("sig");
        result.add_warning("references out of order");
        assert!(result.is_valid());
        result.fail_check(ValidationCheck::Amount, "amount mismatch");
        assert!(!result.is_valid());
        assert!(!result.amount_match());
        assert!(result.recipient_match());
        assert_eq!(result.errors(), ["amount mismatch".to_string()]);
    }

    #[test]
    fn test_not_found_serializes_snake_case() {
        let result = ValidationResult::not_found("sig", "Transaction not confirmed within 1s");
        assert!(!result.is_valid());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["confirmation_status"], "not_found");
        assert_eq!(json["is_valid"], false);
        let back: ValidationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_summary_and_report() {
        let ok = ValidationResult::new("sig").with_confirmation(
            ConfirmationStatus::Finalized,
            Some(10),
            None,
        );
        assert_eq!(ok.summary(), "Transaction validation passed (finalized)");

        let mut bad = ValidationResult::new("sig");
        bad.fail_check(ValidationCheck::Recipient, "recipient missing");
        bad.add_warning("odd");
        assert_eq!(
            bad.summary(),
            "Transaction validation failed with 1 error(s) and 1 warning(s)"
        );
        let report = bad.detailed_report();
        assert!(report.contains("[FAIL] Recipient"));
        assert!(report.contains("[PASS] Amount"));
        assert!(report.contains("  - recipient missing"));
        assert!(report.contains("Signature: sig"));
    }

    #[test]
    fn test_confirmation_ordering() {
        assert!(ConfirmationStatus::Finalized.satisfies(ConfirmationLevel::Confirmed));
        assert!(ConfirmationStatus::Confirmed.satisfies(ConfirmationLevel::Confirmed));
        assert!(!ConfirmationStatus::Processed.satisfies(ConfirmationLevel::Confirmed));
        assert!(!ConfirmationStatus::NotFound.satisfies(ConfirmationLevel::Processed));
        assert_eq!(
            "Finalized".parse::<ConfirmationLevel>(),
            Ok(ConfirmationLevel::Finalized)
        );
        assert!("eventually".parse::<ConfirmationLevel>().is_err());
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config = ValidationConfig::default();
        assert!(config.strict_amount);
        assert_eq!(config.required_confirmation, ConfirmationLevel::Confirmed);
        assert_eq!(config.max_confirmation_time(), Duration::from_secs(60));
        let zero = ValidationConfig {
            max_confirmation_time_secs: 0,
            ..ValidationConfig::default()
        };
        assert_eq!(
            zero.validate(),
            Err(ValidationConfigError::ZeroConfirmationTime)
        );
    }
}
