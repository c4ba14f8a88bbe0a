#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana network support for Solana Pay.
//!
//! Builds unsigned payment transactions for a payer and confirms that a
//! submitted transaction pays what a [`PaymentRequest`](solana_pay_types::PaymentRequest)
//! asked for. Everything that talks to a node goes through the
//! [`SolanaRpc`](chain::SolanaRpc) trait, implemented by a single
//! [`RpcEndpoint`](chain::RpcEndpoint) and by a failover [`RpcPool`](chain::RpcPool).
//!
//! # Modules
//!
//! - [`chain`] - RPC access: endpoints, retries, failover, settings
//! - [`networks`] - Known clusters and their public endpoints
//! - [`transfer`] - Transaction builder for native SOL and SPL token payments
//! - [`validation`] - Confirmation polling and payment validation
//!
//! # Feature Flags
//!
//! - `telemetry` - Emits `tracing` events for RPC calls, retries, failover and validation
//!
//! # Example
//!
//! ```ignore
//! use solana_pay_chain::chain::{RpcPool, RpcSettings};
//! use solana_pay_chain::transfer::build_transfer_transaction;
//! use solana_pay_types::{PaymentRequest, transaction::BuildOptions};
//!
//! let pool = RpcPool::from_settings(&RpcSettings::default())?;
//! let request = PaymentRequest::builder("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM")
//!     .amount("0.5")
//!     .build()?;
//! let built = build_transfer_transaction(&pool, &payer, &request, &BuildOptions::default()).await?;
//! ```

pub mod chain;
pub mod networks;
pub mod transfer;
pub mod validation;

pub use chain::{RpcEndpoint, RpcError, RpcPool, RpcSettings, SolanaRpc};
pub use networks::Cluster;
pub use transfer::{BuildError, build_transfer_transaction};
pub use validation::TransactionValidator;
