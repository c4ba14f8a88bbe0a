//! Helper types for Solana Pay.
//!
//! - [`b64`] - Base64 transport encoding for serialized transactions
//! - [`money_amount`] - Non-negative decimal payment amounts

pub mod b64;
pub mod money_amount;

pub use b64::*;
pub use money_amount::MoneyAmount;
