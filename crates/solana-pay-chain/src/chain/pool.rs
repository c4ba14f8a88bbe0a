use solana_account::Account;
use solana_message::Hash;
use solana_pay_types::validation::ConfirmationLevel;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::chain::config::{RpcSettings, RpcSettingsError};
use crate::chain::provider::RpcEndpoint;
use crate::chain::rpc::{RpcError, SolanaRpc};
use crate::chain::types::{ConfirmedTransaction, SignatureStatus};

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("RPC pool needs at least one endpoint")]
    Empty,
    #[error(transparent)]
    Settings(#[from] RpcSettingsError),
}

/// Several RPC endpoints serving as one.
///
/// Calls go to the current primary. When it fails with a retryable error,
/// the next endpoints are tried in order, each one health-checked first. A
/// fallback that answers becomes the new primary. Terminal errors are
/// returned straight away, since another node would reject the same
/// request.
#[derive(Debug)]
pub struct RpcPool<R = RpcEndpoint> {
    endpoints: Vec<Arc<R>>,
    current: AtomicUsize,
}

impl RpcPool<RpcEndpoint> {
    /// One [`RpcEndpoint`] per configured URL, in order.
    pub fn from_settings(settings: &RpcSettings) -> Result<Self, PoolError> {
        settings.validate()?;
        let endpoints = settings
            .endpoint_urls()
            .into_iter()
            .map(|url| {
                RpcEndpoint::new(
                    url,
                    settings.timeout(),
                    settings.retry_policy(),
                    settings.commitment,
                )
            })
            .collect();
        Self::new(endpoints)
    }
}

impl<R: SolanaRpc> RpcPool<R> {
    pub fn new(endpoints: Vec<R>) -> Result<Self, PoolError> {
        if endpoints.is_empty() {
            return Err(PoolError::Empty);
        }
        Ok(Self {
            endpoints: endpoints.into_iter().map(Arc::new).collect(),
            current: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    pub fn current(&self) -> Arc<R> {
        Arc::clone(&self.endpoints[self.current_index()])
    }

    /// Runs `call` against the primary, falling over to healthy fallbacks.
    pub async fn failover<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, RpcError>
    where
        F: Fn(Arc<R>) -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let count = self.endpoints.len();
        let start = self.current_index();
        let mut last_error = None;
        for offset in 0..count {
            let index = (start + offset) % count;
            let endpoint = Arc::clone(&self.endpoints[index]);
            if offset > 0 {
                if let Err(error) = endpoint.check_health().await {
                    #[cfg(feature = "telemetry")]
                    tracing::warn!(endpoint = %endpoint.endpoint(), error = %error, "Skipping unhealthy RPC endpoint");
                    last_error = Some(error);
                    continue;
                }
            }
            match call(endpoint).await {
                Ok(value) => {
                    if offset > 0
                        && self
                            .current
                            .compare_exchange(start, index, Ordering::AcqRel, Ordering::Acquire)
                            .is_ok()
                    {
                        #[cfg(feature = "telemetry")]
                        tracing::info!(
                            endpoint = %self.endpoints[index].endpoint(),
                            operation,
                            "Promoted RPC endpoint to primary"
                        );
                    }
                    return Ok(value);
                }
                Err(error) if error.is_retryable() => {
                    #[cfg(feature = "telemetry")]
                    tracing::warn!(error = %error, "RPC endpoint failed, trying next");
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }
        Err(last_error.unwrap_or_else(|| RpcError::Network {
            endpoint: self.current().endpoint(),
            operation,
            message: "no endpoint available".to_string(),
        }))
    }
}

impl<R> SolanaRpc for RpcPool<R>
where
    R: SolanaRpc + Send + Sync,
{
    fn endpoint(&self) -> String {
        self.current().endpoint()
    }

    async fn check_health(&self) -> Result<(), RpcError> {
        self.failover("getHealth", |rpc| async move { rpc.check_health().await })
            .await
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, RpcError> {
        self.failover("getLatestBlockhash", |rpc| async move {
            rpc.get_latest_blockhash().await
        })
        .await
    }

    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, RpcError> {
        let pubkey = *pubkey;
        self.failover("getAccountInfo", move |rpc| async move {
            rpc.get_account(&pubkey).await
        })
        .await
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
        level: ConfirmationLevel,
    ) -> Result<Option<ConfirmedTransaction>, RpcError> {
        let signature = *signature;
        self.failover("getTransaction", move |rpc| async move {
            rpc.get_transaction(&signature, level).await
        })
        .await
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, RpcError> {
        let signatures = signatures.to_vec();
        self.failover("getSignatureStatuses", move |rpc| {
            let signatures = signatures.clone();
            async move { rpc.get_signature_statuses(&signatures).await }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::rpc::mock::MockRpc;

    fn node(name: &str) -> MockRpc {
        MockRpc::named(name)
    }

    fn down(name: &str) -> MockRpc {
        let rpc = MockRpc::named(name);
        let error = rpc.network_error("getLatestBlockhash");
        rpc.failing_with(vec![error])
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        assert!(matches!(
            RpcPool::<MockRpc>::new(vec![]),
            Err(PoolError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_primary_serves_when_healthy() {
        let pool = RpcPool::new(vec![node("a"), node("b")]).unwrap();
        pool.get_latest_blockhash().await.unwrap();
        assert_eq!(pool.current_index(), 0);
        assert_eq!(pool.endpoint(), "a");
    }

    #[tokio::test]
    async fn test_fails_over_and_promotes() {
        let pool = RpcPool::new(vec![down("a"), node("b")]).unwrap();
        pool.get_latest_blockhash().await.unwrap();
        assert_eq!(pool.current_index(), 1);
        assert_eq!(pool.endpoint(), "b");
        // The next call starts at the promoted endpoint.
        pool.get_latest_blockhash().await.unwrap();
        assert_eq!(pool.current_index(), 1);
    }

    #[tokio::test]
    async fn test_skips_unhealthy_fallback() {
        let mut sick = node("b");
        sick.unhealthy = true;
        let pool = RpcPool::new(vec![down("a"), sick, node("c")]).unwrap();
        pool.get_latest_blockhash().await.unwrap();
        assert_eq!(pool.endpoint(), "c");
        assert_eq!(
            pool.endpoints[1]
                .calls
                .load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[tokio::test]
    async fn test_terminal_error_stops_failover() {
        let terminal = RpcError::Rejected {
            endpoint: "a".into(),
            operation: "getAccountInfo",
            status: Some(400),
            code: None,
            message: "bad request".into(),
        };
        let pool = RpcPool::new(vec![
            node("a").failing_with(vec![terminal.clone()]),
            node("b"),
        ])
        .unwrap();
        let result = pool.get_account(&Pubkey::new_from_array([7; 32])).await;
        assert_eq!(result, Err(terminal));
        assert_eq!(pool.current_index(), 0);
    }

    #[tokio::test]
    async fn test_all_endpoints_down_returns_last_error() {
        let pool = RpcPool::new(vec![down("a"), down("b")]).unwrap();
        let error = pool.get_latest_blockhash().await.unwrap_err();
        assert_eq!(error.endpoint(), "b");
        assert!(error.is_retryable());
        assert_eq!(pool.current_index(), 0);
    }
}
