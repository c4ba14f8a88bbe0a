#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for Solana Pay.
//!
//! This crate holds the parts of Solana Pay that do not talk to a network:
//! amounts and their conversion to base units, the Payment Request value
//! object, the `solana:` URL codec, and the option/result types exchanged
//! with the transaction builder and validator in `solana-pay-chain`.
//!
//! # Modules
//!
//! - [`units`] - Decimal to base-unit conversion, precision checks, normalization
//! - [`address`] - Base-58 address format
//! - [`request`] - Payment Request and its builder
//! - [`url`] - `solana:` and `https:` URL encoding and decoding
//! - [`transaction`] - Build options and results, transaction-request payloads
//! - [`validation`] - Validation configuration, results, confirmation levels
//! - [`config`] - Environment-aware configuration helpers
//! - [`util`] - Base64 and money amount helpers
//!
//! # Feature Flags
//!
//! - `telemetry` - Emits `tracing` events from parsing and configuration code

pub mod address;
pub mod config;
pub mod request;
pub mod transaction;
pub mod units;
pub mod url;
pub mod util;
pub mod validation;

pub use address::Address;
pub use request::{PaymentParams, PaymentRequest, PaymentRequestBuilder, PaymentRequestError};
pub use util::MoneyAmount;
