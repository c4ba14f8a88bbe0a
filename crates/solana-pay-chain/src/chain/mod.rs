//! Talking to Solana.
//!
//! - [`rpc`] - The [`SolanaRpc`] boundary, error classification, mint lookup
//! - [`provider`] - [`RpcEndpoint`], one node with timeouts and retries
//! - [`pool`] - [`RpcPool`], several nodes with health-checked failover
//! - [`retry`] - Exponential backoff policy
//! - [`config`] - [`RpcSettings`] read from JSON and the environment
//! - [`types`] - The confirmed-transaction record and program constants
//!
//! # Example
//!
//! ```ignore
//! use solana_pay_chain::chain::{RpcPool, RpcSettings, SolanaRpc};
//!
//! let settings: RpcSettings = serde_json::from_str(r#"{"cluster": "devnet"}"#)?;
//! let pool = RpcPool::from_settings(&settings)?;
//! let blockhash = pool.get_latest_blockhash().await?;
//! ```

pub mod config;
pub mod pool;
pub mod provider;
pub mod retry;
pub mod rpc;
pub mod types;

pub use config::*;
pub use pool::*;
pub use provider::*;
pub use retry::*;
pub use rpc::*;
pub use types::*;
