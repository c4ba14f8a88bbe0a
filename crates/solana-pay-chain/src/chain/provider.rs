use serde_json::json;
use solana_account::Account;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_client::rpc_request::RpcRequest;
use solana_message::Hash;
use solana_pay_types::validation::{ConfirmationLevel, ConfirmationStatus};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction_status_client_types::{
    EncodedConfirmedTransactionWithStatusMeta, TransactionConfirmationStatus, TransactionStatus,
    UiTransactionEncoding,
};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use crate::chain::retry::RetryPolicy;
use crate::chain::rpc::{RpcError, SolanaRpc};
use crate::chain::types::{ConfirmedTransaction, SignatureStatus, commitment_config};

/// One Solana JSON-RPC node.
///
/// Every call is bounded by `timeout`, classified into an [`RpcError`], and
/// retried according to the [`RetryPolicy`] when the failure is transient.
pub struct RpcEndpoint {
    url: String,
    client: Arc<RpcClient>,
    timeout: Duration,
    retry: RetryPolicy,
    commitment: ConfirmationLevel,
}

impl Debug for RpcEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcEndpoint")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("commitment", &self.commitment)
            .finish()
    }
}

impl RpcEndpoint {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
        commitment: ConfirmationLevel,
    ) -> Self {
        let url = url.into();
        #[cfg(feature = "telemetry")]
        tracing::info!(
            rpc = %url,
            timeout_ms = timeout.as_millis() as u64,
            max_retries = retry.max_retries,
            commitment = %commitment,
            "Using Solana RPC endpoint"
        );
        let client =
            RpcClient::new_with_timeout_and_commitment(url.clone(), timeout, commitment_config(commitment));
        Self {
            url,
            client: Arc::new(client),
            timeout,
            retry,
            commitment,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn commitment(&self) -> ConfirmationLevel {
        self.commitment
    }

    /// Returns a cloned reference to the RPC client.
    pub fn rpc_client(&self) -> Arc<RpcClient> {
        Arc::clone(&self.client)
    }

    /// One bounded attempt, no retries.
    async fn attempt<T, Fut>(&self, operation: &'static str, request: Fut) -> Result<T, RpcError>
    where
        Fut: Future<Output = Result<T, ClientError>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(
                match RpcError::from_client_error(self.url.clone(), operation, error) {
                    RpcError::Timeout {
                        endpoint,
                        operation,
                        ..
                    } => RpcError::Timeout {
                        endpoint,
                        operation,
                        timeout: self.timeout,
                    },
                    other => other,
                },
            ),
            Err(_) => Err(RpcError::Timeout {
                endpoint: self.url.clone(),
                operation,
                timeout: self.timeout,
            }),
        }
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, mut request: F) -> Result<T, RpcError>
    where
        F: FnMut(Arc<RpcClient>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        self.retry
            .run(|| self.attempt(operation, request(Arc::clone(&self.client))))
            .await
    }
}

fn confirmation_status(status: Option<&TransactionConfirmationStatus>) -> ConfirmationStatus {
    match status {
        Some(TransactionConfirmationStatus::Processed) => ConfirmationStatus::Processed,
        Some(TransactionConfirmationStatus::Confirmed) => ConfirmationStatus::Confirmed,
        Some(TransactionConfirmationStatus::Finalized) => ConfirmationStatus::Finalized,
        None => ConfirmationStatus::Unknown,
    }
}

impl From<TransactionStatus> for SignatureStatus {
    fn from(status: TransactionStatus) -> Self {
        Self {
            slot: status.slot,
            confirmations: status.confirmations,
            confirmation_status: confirmation_status(status.confirmation_status.as_ref()),
            err: status.err.as_ref().map(|e| format!("{e:?}")),
        }
    }
}

impl SolanaRpc for RpcEndpoint {
    fn endpoint(&self) -> String {
        self.url.clone()
    }

    async fn check_health(&self) -> Result<(), RpcError> {
        self.attempt("getSlot", self.client.get_slot())
            .await
            .map(|_| ())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, RpcError> {
        self.call("getLatestBlockhash", |client| async move {
            client.get_latest_blockhash().await
        })
        .await
    }

    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>, RpcError> {
        let pubkey = *pubkey;
        let commitment = commitment_config(self.commitment);
        self.call("getAccountInfo", move |client| async move {
            client
                .get_account_with_commitment(&pubkey, commitment)
                .await
                .map(|response| response.value)
        })
        .await
    }

    async fn get_transaction(
        &self,
        signature: &Signature,
        level: ConfirmationLevel,
    ) -> Result<Option<ConfirmedTransaction>, RpcError> {
        let signature = *signature;
        // getTransaction does not accept `processed`.
        let level = level.max(ConfirmationLevel::Confirmed);
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(commitment_config(level)),
            max_supported_transaction_version: Some(0),
        };
        // `send` instead of `get_transaction_with_config`: an unknown
        // signature comes back as `null`, which is not an error here.
        let encoded: Option<EncodedConfirmedTransactionWithStatusMeta> = self
            .call("getTransaction", move |client| {
                let params = json!([signature.to_string(), config]);
                async move { client.send(RpcRequest::GetTransaction, params).await }
            })
            .await?;
        let Some(encoded) = encoded else {
            return Ok(None);
        };
        let mut tx = ConfirmedTransaction::from_encoded(signature, level, encoded).map_err(|e| {
            RpcError::Rejected {
                endpoint: self.url.clone(),
                operation: "getTransaction",
                status: None,
                code: None,
                message: e.to_string(),
            }
        })?;
        let statuses = self.get_signature_statuses(&[signature]).await?;
        tx.observe_status(statuses.first().and_then(Option::as_ref));
        Ok(Some(tx))
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>, RpcError> {
        let signatures = signatures.to_vec();
        let statuses = self
            .call("getSignatureStatuses", move |client| {
                let signatures = signatures.clone();
                async move {
                    client
                        .get_signature_statuses(&signatures)
                        .await
                        .map(|response| response.value)
                }
            })
            .await?;
        Ok(statuses
            .into_iter()
            .map(|status| status.map(SignatureStatus::from))
            .collect())
    }
}
