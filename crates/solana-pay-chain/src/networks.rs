use serde::{Deserialize, Serialize};
use solana_pubkey::{Pubkey, pubkey};
use std::fmt;
use std::str::FromStr;

/// Well-known Solana clusters.
///
/// Each cluster knows its public RPC and WebSocket endpoints. Custom
/// endpoints in [`RpcSettings`](crate::chain::config::RpcSettings) take
/// precedence over these.
///
/// ```
/// use solana_pay_chain::Cluster;
///
/// let cluster: Cluster = "mainnet".parse().unwrap();
/// assert_eq!(cluster, Cluster::MainnetBeta);
/// assert_eq!(cluster.rpc_url(), "https://api.mainnet-beta.solana.com");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    MainnetBeta,
    #[default]
    Devnet,
    Testnet,
    Localnet,
}

impl Cluster {
    pub fn name(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::Localnet => "localnet",
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::Localnet => "http://127.0.0.1:8899",
        }
    }

    pub fn ws_url(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "wss://api.mainnet-beta.solana.com",
            Cluster::Devnet => "wss://api.devnet.solana.com",
            Cluster::Testnet => "wss://api.testnet.solana.com",
            Cluster::Localnet => "ws://127.0.0.1:8900",
        }
    }

    /// USDC mint on this cluster, where Circle deploys one.
    pub fn usdc_mint(&self) -> Option<Pubkey> {
        match self {
            Cluster::MainnetBeta => Some(pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")),
            Cluster::Devnet => Some(pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU")),
            Cluster::Testnet | Cluster::Localnet => None,
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("Unknown cluster {0:?}")]
pub struct UnknownCluster(pub String);

impl FromStr for Cluster {
    type Err = UnknownCluster;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Cluster::MainnetBeta),
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            _ => Err(UnknownCluster(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("mainnet-beta".parse(), Ok(Cluster::MainnetBeta));
        assert_eq!("Localhost".parse(), Ok(Cluster::Localnet));
        assert!("moonnet".parse::<Cluster>().is_err());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&Cluster::MainnetBeta).unwrap(),
            "\"mainnet-beta\""
        );
        let devnet: Cluster = serde_json::from_str("\"devnet\"").unwrap();
        assert_eq!(devnet, Cluster::Devnet);
        assert_eq!(Cluster::default(), Cluster::Devnet);
    }

    #[test]
    fn test_usdc_mints() {
        assert!(Cluster::MainnetBeta.usdc_mint().is_some());
        assert!(Cluster::Localnet.usdc_mint().is_none());
        assert_eq!(Cluster::Localnet.ws_url(), "ws://127.0.0.1:8900");
    }
}
