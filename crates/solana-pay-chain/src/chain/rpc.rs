use solana_account::Account;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::rpc_request::{RpcError as JsonRpcError, RpcResponseErrorData};
use solana_message::Hash;
use solana_pay_types::validation::ConfirmationLevel;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use spl_token::solana_program::program_pack::Pack;
use std::sync::Arc;
use std::time::Duration;

use crate::chain::types::{ConfirmedTransaction, Mint, SignatureStatus};

/// JSON-RPC code for "node is unhealthy".
const NODE_UNHEALTHY: i64 = -32005;
/// JSON-RPC code for "internal error".
const INTERNAL_ERROR: i64 = -32603;

/// Failure of one RPC operation against one endpoint.
///
/// Every variant carries the endpoint and the operation name, so a log line
/// or an error message is enough to tell which node failed at what.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The request never got an answer: connection refused, reset, DNS.
    #[error("{operation} on {endpoint}: network error: {message}")]
    Network {
        endpoint: String,
        operation: &'static str,
        message: String,
    },
    #[error("{operation} on {endpoint}: timed out after {timeout:?}")]
    Timeout {
        endpoint: String,
        operation: &'static str,
        timeout: Duration,
    },
    /// The node answered with an error.
    #[error("{operation} on {endpoint}: rejected: {message}")]
    Rejected {
        endpoint: String,
        operation: &'static str,
        /// HTTP status, when the rejection came from the transport.
        status: Option<u16>,
        /// JSON-RPC error code, when the node reported one.
        code: Option<i64>,
        message: String,
    },
}

impl RpcError {
    pub fn endpoint(&self) -> &str {
        match self {
            RpcError::Network { endpoint, .. }
            | RpcError::Timeout { endpoint, .. }
            | RpcError::Rejected { endpoint, .. } => endpoint,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            RpcError::Network { operation, .. }
            | RpcError::Timeout { operation, .. }
            | RpcError::Rejected { operation, .. } => operation,
        }
    }

    /// Whether trying again (here or on another endpoint) may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Network { .. } | RpcError::Timeout { .. } => true,
            RpcError::Rejected {
                status,
                code,
                message,
                ..
            } => {
                if let Some(status) = status {
                    if *status == 429 || (500..600).contains(status) {
                        return true;
                    }
                }
                if matches!(code, Some(NODE_UNHEALTHY) | Some(INTERNAL_ERROR)) {
                    return true;
                }
                let message = message.to_ascii_lowercase();
                message.contains("rate limit") || message.contains("too many requests")
            }
        }
    }

    /// Classifies a `solana-client` error.
    pub fn from_client_error(
        endpoint: impl Into<String>,
        operation: &'static str,
        error: ClientError,
    ) -> Self {
        let endpoint = endpoint.into();
        match error.kind() {
            ClientErrorKind::Io(e) => RpcError::Network {
                endpoint,
                operation,
                message: e.to_string(),
            },
            ClientErrorKind::Reqwest(e) => {
                if e.is_timeout() {
                    RpcError::Timeout {
                        endpoint,
                        operation,
                        timeout: Duration::ZERO,
                    }
                } else if let Some(status) = e.status() {
                    RpcError::Rejected {
                        endpoint,
                        operation,
                        status: Some(status.as_u16()),
                        code: None,
                        message: e.to_string(),
                    }
                } else {
                    RpcError::Network {
                        endpoint,
                        operation,
                        message: e.to_string(),
                    }
                }
            }
            ClientErrorKind::RpcError(JsonRpcError::RpcResponseError {
                code,
                message,
                data,
            }) => {
                let message = match data {
                    RpcResponseErrorData::NodeUnhealthy { .. } => {
                        format!("{message} (node unhealthy)")
                    }
                    _ => message.clone(),
                };
                RpcError::Rejected {
                    endpoint,
                    operation,
                    status: None,
                    code: Some(*code),
                    message,
                }
            }
            other => RpcError::Rejected {
                endpoint,
                operation,
                status: None,
                code: None,
                message: other.to_string(),
            },
        }
    }
}

/// The RPC surface the builder and the validator need.
///
/// [`RpcEndpoint`](crate::chain::provider::RpcEndpoint) talks to one node,
/// [`RpcPool`](crate::chain::pool::RpcPool) fails over between several.
/// Tests implement it over canned data.
pub trait SolanaRpc {
    /// URL (or label) of the node currently serving requests.
    fn endpoint(&self) -> String;

    /// Single cheap probe, no retries.
    fn check_health(&self) -> impl Future<Output = Result<(), RpcError>> + Send;

    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, RpcError>> + Send;

    /// `Ok(None)` when the account does not exist.
    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Option<Account>, RpcError>> + Send;

    /// `Ok(None)` when the node has not seen the transaction at `level` yet.
    fn get_transaction(
        &self,
        signature: &Signature,
        level: ConfirmationLevel,
    ) -> impl Future<Output = Result<Option<ConfirmedTransaction>, RpcError>> + Send;

    fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> impl Future<Output = Result<Vec<Option<SignatureStatus>>, RpcError>> + Send;
}

impl<T: SolanaRpc> SolanaRpc for Arc<T> {
    fn endpoint(&self) -> String {
        (**self).endpoint()
    }

    fn check_health(&self) -> impl Future<Output = Result<(), RpcError>> + Send {
        (**self).check_health()
    }

    fn get_latest_blockhash(&self) -> impl Future<Output = Result<Hash, RpcError>> + Send {
        (**self).get_latest_blockhash()
    }

    fn get_account(
        &self,
        pubkey: &Pubkey,
    ) -> impl Future<Output = Result<Option<Account>, RpcError>> + Send {
        (**self).get_account(pubkey)
    }

    fn get_transaction(
        &self,
        signature: &Signature,
        level: ConfirmationLevel,
    ) -> impl Future<Output = Result<Option<ConfirmedTransaction>, RpcError>> + Send {
        (**self).get_transaction(signature, level)
    }

    fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> impl Future<Output = Result<Vec<Option<SignatureStatus>>, RpcError>> + Send {
        (**self).get_signature_statuses(signatures)
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MintError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("Mint account {0} not found")]
    NotFound(Pubkey),
    #[error("Account {mint} is owned by {owner}, not a token program")]
    UnknownOwner { mint: Pubkey, owner: Pubkey },
    #[error("Failed to unpack mint {mint}: {message}")]
    Unpack { mint: Pubkey, message: String },
}

/// Fetches the decimals and owning token program of a mint.
pub async fn fetch_mint<R: SolanaRpc>(rpc: &R, mint: &Pubkey) -> Result<Mint, MintError> {
    let account = rpc
        .get_account(mint)
        .await?
        .ok_or(MintError::NotFound(*mint))?;
    if account.owner == spl_token::id() {
        let state = spl_token::state::Mint::unpack(&account.data).map_err(|e| MintError::Unpack {
            mint: *mint,
            message: e.to_string(),
        })?;
        Ok(Mint::Token {
            decimals: state.decimals,
            token_program: spl_token::id(),
        })
    } else if account.owner == spl_token_2022::id() {
        // Token-2022 mints may carry extensions after the base layout.
        let base = account
            .data
            .get(..spl_token_2022::state::Mint::LEN)
            .ok_or_else(|| MintError::Unpack {
                mint: *mint,
                message: "account data too short".to_string(),
            })?;
        let state =
            spl_token_2022::state::Mint::unpack(base).map_err(|e| MintError::Unpack {
                mint: *mint,
                message: e.to_string(),
            })?;
        Ok(Mint::Token2022 {
            decimals: state.decimals,
            token_program: spl_token_2022::id(),
        })
    } else {
        Err(MintError::UnknownOwner {
            mint: *mint,
            owner: account.owner,
        })
    }
}

pub async fn account_exists<R: SolanaRpc>(rpc: &R, pubkey: &Pubkey) -> Result<bool, RpcError> {
    Ok(rpc.get_account(pubkey).await?.is_some())
}


#[cfg(test)]
mod tests {
    use super::mock::MockRpc;
    use super::*;
    use spl_token::solana_program::program_option::COption;

    fn rejected(status: Option<u16>, code: Option<i64>, message: &str) -> RpcError {
        RpcError::Rejected {
            endpoint: "http://node".into(),
            operation: "getAccountInfo",
            status,
            code,
            message: message.into(),
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(
            RpcError::Network {
                endpoint: "http://node".into(),
                operation: "getSlot",
                message: "reset".into()
            }
            .is_retryable()
        );
        assert!(
            RpcError::Timeout {
                endpoint: "http://node".into(),
                operation: "getSlot",
                timeout: Duration::from_secs(30)
            }
            .is_retryable()
        );
        assert!(rejected(Some(429), None, "slow down").is_retryable());
        assert!(rejected(Some(503), None, "unavailable").is_retryable());
        assert!(rejected(None, Some(NODE_UNHEALTHY), "behind").is_retryable());
        assert!(rejected(None, None, "Rate limit exceeded").is_retryable());
        assert!(!rejected(Some(400), None, "bad request").is_retryable());
        assert!(!rejected(None, Some(-32602), "invalid params").is_retryable());
    }

    #[test]
    fn test_error_carries_context() {
        let err = rejected(Some(404), None, "not found");
        assert_eq!(err.endpoint(), "http://node");
        assert_eq!(err.operation(), "getAccountInfo");
        assert!(err.to_string().contains("getAccountInfo on http://node"));
    }

    fn mint_account(owner: Pubkey, decimals: u8) -> Account {
        let state = spl_token::state::Mint {
            mint_authority: COption::None,
            supply: 1_000_000,
            decimals,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; spl_token::state::Mint::LEN];
        spl_token::state::Mint::pack(state, &mut data).unwrap();
        Account {
            lamports: 1_461_600,
            data,
            owner,
            executable: false,
            rent_epoch: 0,
        }
    }

    #[tokio::test]
    async fn test_fetch_mint_by_owner() {
        let usdc = Pubkey::new_from_array([1; 32]);
        let pyusd = Pubkey::new_from_array([2; 32]);
        let mut rpc = MockRpc::named("mock");
        rpc.accounts.insert(usdc, mint_account(spl_token::id(), 6));
        rpc.accounts
            .insert(pyusd, mint_account(spl_token_2022::id(), 6));

        let mint = fetch_mint(&rpc, &usdc).await.unwrap();
        assert_eq!(
            mint,
            Mint::Token {
                decimals: 6,
                token_program: spl_token::id()
            }
        );
        let mint = fetch_mint(&rpc, &pyusd).await.unwrap();
        assert_eq!(*mint.token_program(), spl_token_2022::id());
        assert_eq!(mint.decimals(), 6);
    }

    #[tokio::test]
    async fn test_fetch_mint_rejects_unknown_owner_and_missing() {
        let mint = Pubkey::new_from_array([3; 32]);
        let missing = Pubkey::new_from_array([4; 32]);
        let mut rpc = MockRpc::named("mock");
        rpc.accounts
            .insert(mint, mint_account(Pubkey::new_from_array([5; 32]), 6));

        assert!(matches!(
            fetch_mint(&rpc, &mint).await,
            Err(MintError::UnknownOwner { .. })
        ));
        assert_eq!(
            fetch_mint(&rpc, &missing).await,
            Err(MintError::NotFound(missing))
        );
        assert!(!account_exists(&rpc, &missing).await.unwrap());
        assert!(account_exists(&rpc, &mint).await.unwrap());
    }
}
