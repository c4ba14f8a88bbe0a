#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Solana Pay for Rust merchants.
//!
//! A merchant describes what it wants to be paid as a [`PaymentRequest`],
//! hands it to the customer as a `solana:` URL (or builds the transaction
//! itself for a transaction-request wallet), and later confirms on-chain that
//! the payment matches.
//!
//! [`SolanaPayClient`] covers that whole flow. The building blocks are
//! re-exported as [`types`] (amounts, requests, URLs, results) and [`chain`]
//! (RPC access, transaction builder, validator).
//!
//! # Feature Flags
//!
//! - `telemetry` - Emits `tracing` events from both crates
//!
//! # Example
//!
//! ```ignore
//! use solana_pay::{PaymentRequest, SolanaPayClient};
//! use solana_pay::chain::chain::RpcSettings;
//!
//! let client = SolanaPayClient::from_settings(&RpcSettings::default())?;
//! let request = PaymentRequest::builder("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM")
//!     .amount("0.5")
//!     .reference("82ZJ7nbGpixjeDCmEhUcmwXYfvurzAgGdtSMuHnUgyny")
//!     .label("Coffee shop")
//!     .build()?;
//! println!("{}", client.create_payment_url(&request));
//! ```

pub mod client;
pub mod error;

pub use solana_pay_chain as chain;
pub use solana_pay_types as types;

pub use client::SolanaPayClient;
pub use error::SolanaPayError;
pub use solana_pay_chain::{Cluster, TransactionValidator};
pub use solana_pay_types::{Address, MoneyAmount, PaymentRequest, PaymentRequestBuilder};
