//! Solana Pay transaction-request server.
//!
//! Endpoints:
//! - `GET /tx` - Merchant label and icon
//! - `POST /tx` - Unsigned payment transaction for `{ "account": <payer> }`
//! - `GET /health` - RPC reachability
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `CONFIG` names the configuration file
//! - `HOST`, `PORT` control the binding address
//! - `RUST_LOG` sets the log filter

use std::process;

#[tokio::main]
async fn main() {
    let result = solana_pay_merchant::run().await;
    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(1)
    }
}
