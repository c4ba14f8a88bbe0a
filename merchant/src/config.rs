//! Configuration for the merchant transaction-request server.

use clap::Parser;
use serde::Deserialize;
use solana_pay::PaymentRequest;
use solana_pay::chain::chain::RpcSettings;
use solana_pay::types::transaction::{BuildOptions, MetadataError, TransactionMetadata};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "solana-pay-merchant")]
#[command(about = "Solana Pay transaction-request server")]
struct CliArgs {
    /// Path to the JSON configuration file
    #[arg(long, short, env = "CONFIG", default_value = "config.json")]
    config: PathBuf,
}

/// Server configuration.
///
/// ```json
/// {
///   "port": 8080,
///   "rpc": { "cluster": "devnet" },
///   "request": {
///     "recipient": "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM",
///     "amount": "0.5",
///     "references": ["82ZJ7nbGpixjeDCmEhUcmwXYfvurzAgGdtSMuHnUgyny"],
///     "memo": "Order #42"
///   },
///   "metadata": { "label": "Coffee shop", "icon": "https://example.com/icon.svg" },
///   "message": "Thanks for your order"
/// }
/// ```
///
/// `host` and `port` fall back to `HOST` and `PORT`, then to `0.0.0.0:8080`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "config_defaults::default_port")]
    port: u16,
    #[serde(default = "config_defaults::default_host")]
    host: IpAddr,
    #[serde(default)]
    rpc: RpcSettings,
    request: PaymentRequest,
    metadata: TransactionMetadata,
    /// Shown by the wallet next to the transaction.
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    build: BuildOptions,
}

pub mod config_defaults {
    use std::env;
    use std::net::{IpAddr, Ipv4Addr};

    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

    /// $PORT, else 8080.
    pub fn default_port() -> u16 {
        env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT)
    }

    /// $HOST, else 0.0.0.0.
    pub fn default_host() -> IpAddr {
        env::var("HOST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_HOST)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("Invalid metadata: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Merchant request must carry an amount")]
    MissingAmount,
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    pub fn rpc(&self) -> &RpcSettings {
        &self.rpc
    }

    pub fn request(&self) -> &PaymentRequest {
        &self.request
    }

    pub fn metadata(&self) -> &TransactionMetadata {
        &self.metadata
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn build(&self) -> &BuildOptions {
        &self.build
    }

    /// Loads the file named by `--config` (or `CONFIG`), `./config.json` by default.
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();
        let config_path = Path::new(&cli_args.config)
            .canonicalize()
            .map_err(|e| ConfigError::FileRead(cli_args.config, e))?;
        Self::load_from_path(config_path)
    }

    fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path, e))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.metadata.validate()?;
        // A transaction request without an amount has nothing to build.
        if config.request.amount().is_none() {
            return Err(ConfigError::MissingAmount);
        }
        Ok(config)
    }
}
