use solana_pay_chain::chain::{PoolError, RpcError};
use solana_pay_chain::transfer::BuildError;
use solana_pay_types::PaymentRequestError;
use solana_pay_types::units::UnitsError;
use solana_pay_types::url::UrlError;
use solana_pay_types::validation::ValidationConfigError;
use solana_pubkey::ParsePubkeyError;
use solana_signature::ParseSignatureError;

/// Any failure surfaced by [`SolanaPayClient`](crate::SolanaPayClient).
///
/// Validation mismatches are not errors; they are reported in the
/// [`ValidationResult`](solana_pay_types::validation::ValidationResult).
#[derive(Debug, thiserror::Error)]
pub enum SolanaPayError {
    #[error(transparent)]
    Units(#[from] UnitsError),
    #[error(transparent)]
    PaymentRequest(#[from] PaymentRequestError),
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    ValidationConfig(#[from] ValidationConfigError),
    #[error("Invalid signature: {0}")]
    InvalidSignature(#[from] ParseSignatureError),
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] ParsePubkeyError),
}

impl SolanaPayError {
    /// Whether the failure came from the network rather than from the input.
    pub fn is_network(&self) -> bool {
        matches!(self, SolanaPayError::Rpc(_) | SolanaPayError::Build(BuildError::Rpc(_)))
    }
}
