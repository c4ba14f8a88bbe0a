//! Transaction build options, build results and transaction-request payloads.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Knobs for the transaction builder. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Extra fee in lamports added to the estimate.
    pub priority_fee: Option<u64>,
    /// Create the recipient's associated token account if it is missing.
    pub auto_create_ata: bool,
    /// Emit a v0 message; `false` emits a legacy message.
    pub use_versioned_tx: bool,
    pub compute_unit_limit: Option<u32>,
    /// Price per compute unit in micro-lamports.
    pub compute_unit_price: Option<u64>,
    /// Not read yet: messages are compiled without address lookup tables.
    pub use_lookup_tables: bool,
    /// Not read by the builder; RPC retries follow the RPC settings.
    pub max_retries: u32,
    /// Upper bound on the whole build, RPC reads included.
    pub timeout_secs: u64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            priority_fee: None,
            auto_create_ata: true,
            use_versioned_tx: true,
            compute_unit_limit: None,
            compute_unit_price: None,
            use_lookup_tables: false,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BuildOptionsError {
    #[error("compute_unit_limit must be positive")]
    ZeroComputeUnitLimit,
    #[error("timeout must be positive")]
    ZeroTimeout,
}

impl BuildOptions {
    pub fn validate(&self) -> Result<(), BuildOptionsError> {
        if self.compute_unit_limit == Some(0) {
            return Err(BuildOptionsError::ZeroComputeUnitLimit);
        }
        if self.timeout_secs == 0 {
            return Err(BuildOptionsError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// An unsigned transaction ready to hand to a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    /// Base64 of the serialized transaction with empty signature slots.
    pub transaction: String,
    pub signers_required: Vec<String>,
    pub instructions_count: usize,
    /// Estimated fee in lamports.
    pub estimated_fee: u64,
    pub uses_lookup_tables: bool,
    pub compute_units: Option<u32>,
}

/// Body of `GET` on a transaction-request endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("label must be a non-empty string")]
    EmptyLabel,
    #[error("icon must be an http or https URL: {0:?}")]
    InvalidIcon(String),
}

impl TransactionMetadata {
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.label.trim().is_empty() {
            return Err(MetadataError::EmptyLabel);
        }
        if let Some(icon) = &self.icon {
            let valid = url::Url::parse(icon)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                return Err(MetadataError::InvalidIcon(icon.clone()));
            }
        }
        Ok(())
    }
}

/// Body of a `POST` on a transaction-request endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequestBody {
    pub account: String,
}

/// Response to a `POST` on a transaction-request endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_options_defaults() {
        let options = BuildOptions::default();
        assert!(options.auto_create_ata);
        assert!(options.use_versioned_tx);
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.timeout(), Duration::from_secs(30));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_build_options_validation() {
        let options = BuildOptions {
            compute_unit_limit: Some(0),
            ..BuildOptions::default()
        };
        assert_eq!(
            options.validate(),
            Err(BuildOptionsError::ZeroComputeUnitLimit)
        );
        let options = BuildOptions {
            timeout_secs: 0,
            ..BuildOptions::default()
        };
        assert_eq!(options.validate(), Err(BuildOptionsError::ZeroTimeout));
    }

    #[test]
    fn test_build_options_partial_json() {
        let options: BuildOptions =
            serde_json::from_str(r#"{"priority_fee": 1000, "use_versioned_tx": false}"#).unwrap();
        assert_eq!(options.priority_fee, Some(1000));
        assert!(!options.use_versioned_tx);
        assert!(options.auto_create_ata);
    }

    #[test]
    fn test_metadata_validation() {
        let ok = TransactionMetadata {
            label: "Coffee".into(),
            icon: Some("https://example.com/icon.png".into()),
        };
        assert!(ok.validate().is_ok());
        let empty = TransactionMetadata {
            label: "  ".into(),
            icon: None,
        };
        assert_eq!(empty.validate(), Err(MetadataError::EmptyLabel));
        let bad_icon = TransactionMetadata {
            label: "Coffee".into(),
            icon: Some("ftp://example.com/icon.png".into()),
        };
        assert!(matches!(
            bad_icon.validate(),
            Err(MetadataError::InvalidIcon(_))
        ));
    }
}
