//! Solana Pay merchant server.
//!
//! Serves one configured payment as a Solana Pay transaction request: wallets
//! fetch the merchant label from `GET /tx` and an unsigned transaction for
//! their account from `POST /tx`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Configuration file and CLI |
//! | [`handlers`] | `/tx` and `/health` endpoints |
//! | [`run`] | Server startup and shutdown |
//! | [`util`] | Signal handling and logging |
//!
//! # Running the Server
//!
//! ```bash
//! solana-pay-merchant --config /path/to/config.json
//! RUST_LOG=debug CONFIG=config.json solana-pay-merchant
//! ```

pub mod config;
pub mod handlers;
pub mod run;
pub mod util;

pub use run::run;
