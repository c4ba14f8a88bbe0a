use serde::{Deserialize, Serialize};
use solana_pay_types::config::LiteralOrEnv;
use solana_pay_types::validation::ConfirmationLevel;
use std::time::Duration;
use url::Url;

use crate::chain::retry::RetryPolicy;
use crate::networks::Cluster;

pub const ENV_CLUSTER: &str = "SOLANA_PAY_CLUSTER";
pub const ENV_COMMITMENT: &str = "SOLANA_PAY_COMMITMENT";
pub const ENV_TIMEOUT: &str = "SOLANA_PAY_TIMEOUT";
pub const ENV_MAX_RETRIES: &str = "SOLANA_PAY_MAX_RETRIES";

/// How to reach Solana.
///
/// Explicit `endpoints` win over the cluster's public RPC URL. Each endpoint
/// may be a literal URL or an environment reference:
///
/// ```json
/// {
///   "cluster": "mainnet-beta",
///   "endpoints": ["$HELIUS_RPC_URL", "https://api.mainnet-beta.solana.com"],
///   "commitment": "finalized"
/// }
/// ```
///
/// Missing fields fall back to `SOLANA_PAY_CLUSTER`, `SOLANA_PAY_COMMITMENT`,
/// `SOLANA_PAY_TIMEOUT` and `SOLANA_PAY_MAX_RETRIES`, then to built-in
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcSettings {
    #[serde(default = "rpc_settings::default_cluster")]
    pub cluster: Cluster,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<LiteralOrEnv<Url>>,
    #[serde(default = "rpc_settings::default_commitment")]
    pub commitment: ConfirmationLevel,
    /// Per-request timeout in seconds.
    #[serde(default = "rpc_settings::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "rpc_settings::default_max_retries")]
    pub max_retries: u32,
    /// Upper bound on the delay between retries, in seconds.
    #[serde(default = "rpc_settings::default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

mod rpc_settings {
    use super::*;
    use solana_pay_types::config::env_or;

    pub fn default_cluster() -> Cluster {
        env_or(ENV_CLUSTER, Cluster::Devnet)
    }
    pub fn default_commitment() -> ConfirmationLevel {
        env_or(ENV_COMMITMENT, ConfirmationLevel::Confirmed)
    }
    pub fn default_timeout_secs() -> u64 {
        env_or(ENV_TIMEOUT, 30)
    }
    pub fn default_max_retries() -> u32 {
        env_or(ENV_MAX_RETRIES, 3)
    }
    pub fn default_max_backoff_secs() -> u64 {
        10
    }
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            cluster: rpc_settings::default_cluster(),
            endpoints: Vec::new(),
            commitment: rpc_settings::default_commitment(),
            timeout_secs: rpc_settings::default_timeout_secs(),
            max_retries: rpc_settings::default_max_retries(),
            max_backoff_secs: rpc_settings::default_max_backoff_secs(),
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RpcSettingsError {
    #[error("timeout_secs must be positive")]
    ZeroTimeout,
    #[error("RPC endpoint {0} must use http or https")]
    UnsupportedScheme(String),
}

impl RpcSettings {
    pub fn for_cluster(cluster: Cluster) -> Self {
        Self {
            cluster,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), RpcSettingsError> {
        if self.timeout_secs == 0 {
            return Err(RpcSettingsError::ZeroTimeout);
        }
        if let Some(url) = self
            .endpoints
            .iter()
            .find(|url| !matches!(url.scheme(), "http" | "https"))
        {
            return Err(RpcSettingsError::UnsupportedScheme(url.to_string()));
        }
        Ok(())
    }

    /// Configured endpoints in order, or the cluster's public endpoint.
    pub fn endpoint_urls(&self) -> Vec<String> {
        if self.endpoints.is_empty() {
            vec![self.cluster.rpc_url().to_string()]
        } else {
            self.endpoints.iter().map(|url| url.to_string()).collect()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            max_delay: Duration::from_secs(self.max_backoff_secs),
            ..RetryPolicy::default()
        }
    }
}
