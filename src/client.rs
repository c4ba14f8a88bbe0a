use solana_pay_chain::chain::{RpcPool, RpcSettings, SignatureStatus, SolanaRpc};
use solana_pay_chain::transfer::build_transfer_transaction;
use solana_pay_chain::validation::TransactionValidator;
use solana_pay_types::PaymentRequest;
use solana_pay_types::transaction::{BuildOptions, BuildResult};
use solana_pay_types::url::{SolanaPayUrl, encode_url, parse_url};
use solana_pay_types::validation::{ValidationConfig, ValidationResult};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SolanaPayError;

/// One entry point for the merchant flow: encode a request, build the
/// transaction a wallet signs, and verify the payment once it lands.
///
/// ```ignore
/// let client = SolanaPayClient::from_settings(&RpcSettings::default())?;
/// let request = PaymentRequest::builder(merchant).amount("0.5").reference(reference).build()?;
/// let url = client.create_payment_url(&request);
/// // ... the customer pays ...
/// let result = client.verify_payment(&signature, &request, None).await?;
/// assert!(result.is_valid());
/// ```
#[derive(Debug)]
pub struct SolanaPayClient<R = RpcPool> {
    rpc: Arc<R>,
    build_options: BuildOptions,
    validation_config: ValidationConfig,
    poll_interval: Option<Duration>,
}

impl SolanaPayClient<RpcPool> {
    pub fn from_settings(settings: &RpcSettings) -> Result<Self, SolanaPayError> {
        Ok(Self::new(RpcPool::from_settings(settings)?))
    }
}

impl<R> SolanaPayClient<R> {
    pub fn new(rpc: R) -> Self {
        Self {
            rpc: Arc::new(rpc),
            build_options: BuildOptions::default(),
            validation_config: ValidationConfig::default(),
            poll_interval: None,
        }
    }

    pub fn with_build_options(mut self, build_options: BuildOptions) -> Self {
        self.build_options = build_options;
        self
    }

    pub fn with_validation_config(
        mut self,
        validation_config: ValidationConfig,
    ) -> Result<Self, SolanaPayError> {
        validation_config.validate()?;
        self.validation_config = validation_config;
        Ok(self)
    }

    /// Overrides the one-second confirmation polling interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = Some(poll_interval);
        self
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }

    pub fn build_options(&self) -> &BuildOptions {
        &self.build_options
    }

    pub fn validation_config(&self) -> &ValidationConfig {
        &self.validation_config
    }

    pub fn create_payment_url(&self, request: &PaymentRequest) -> String {
        encode_url(request)
    }

    pub fn parse_payment_url(&self, url: &str) -> Result<SolanaPayUrl, SolanaPayError> {
        Ok(parse_url(url)?)
    }

    fn validator(&self) -> Result<TransactionValidator<Arc<R>>, SolanaPayError> {
        let validator =
            TransactionValidator::new(self.rpc.clone(), self.validation_config.clone())?;
        Ok(match self.poll_interval {
            Some(interval) => validator.with_poll_interval(interval),
            None => validator,
        })
    }
}

impl<R: SolanaRpc> SolanaPayClient<R> {
    /// Builds the unsigned transaction `payer` signs to settle `request`.
    pub async fn create_transaction(
        &self,
        payer: &str,
        request: &PaymentRequest,
    ) -> Result<BuildResult, SolanaPayError> {
        let payer = Pubkey::from_str(payer.trim())?;
        let built =
            build_transfer_transaction(&self.rpc, &payer, request, &self.build_options).await?;
        Ok(built)
    }

    /// Waits for `signature` to confirm and checks it against `request`.
    ///
    /// Only a malformed signature is an error. A payment that never confirms
    /// or does not match comes back as an invalid [`ValidationResult`].
    pub async fn verify_payment(
        &self,
        signature: &str,
        request: &PaymentRequest,
        timeout: Option<Duration>,
    ) -> Result<ValidationResult, SolanaPayError> {
        let signature = Signature::from_str(signature.trim())?;
        Ok(self
            .validator()?
            .wait_and_verify(&signature, request, timeout)
            .await)
    }

    pub async fn transaction_status(
        &self,
        signature: &str,
    ) -> Result<Option<SignatureStatus>, SolanaPayError> {
        let signature = Signature::from_str(signature.trim())?;
        Ok(self.validator()?.transaction_status(&signature).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_account::Account;
    use solana_message::Hash;
    use solana_pay_chain::chain::{ConfirmedTransaction, DecodedInstruction, RpcError};
    use solana_pay_types::validation::{ConfirmationLevel, ConfirmationStatus};
    use std::collections::HashMap;

    const MERCHANT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const PAYER: &str = "7XSvJnS19TodrQJSbjUR6tEGwmYyL1i9FX7Z5ZQHc53W";
    const REFERENCE: &str = "82ZJ7nbGpixjeDCmEhUcmwXYfvurzAgGdtSMuHnUgyny";

    #[derive(Default)]
    struct StaticRpc {
        transactions: HashMap<Signature, ConfirmedTransaction>,
    }

    impl SolanaRpc for StaticRpc {
        fn endpoint(&self) -> String {
            "static".to_string()
        }

        async fn check_health(&self) -> Result<(), RpcError> {
            Ok(())
        }

        async fn get_latest_blockhash(&self) -> Result<Hash, RpcError> {
            Ok(Hash::new_from_array([5; 32]))
        }

        async fn get_account(&self, _pubkey: &Pubkey) -> Result<Option<Account>, RpcError> {
            Ok(None)
        }

        async fn get_transaction(
            &self,
            signature: &Signature,
            _level: ConfirmationLevel,
        ) -> Result<Option<ConfirmedTransaction>, RpcError> {
            Ok(self.transactions.get(signature).cloned())
        }

        async fn get_signature_statuses(
            &self,
            signatures: &[Signature],
        ) -> Result<Vec<Option<SignatureStatus>>, RpcError> {
            Ok(signatures
                .iter()
                .map(|s| {
                    self.transactions.get(s).map(|tx| SignatureStatus {
                        slot: tx.slot,
                        confirmations: Some(1),
                        confirmation_status: tx.confirmation_status,
                        err: None,
                    })
                })
                .collect())
        }
    }

    fn request() -> PaymentRequest {
        PaymentRequest::builder(MERCHANT)
            .amount("0.25")
            .reference(REFERENCE)
            .label("Coffee shop")
            .build()
            .unwrap()
    }

    /// 0.25 SOL from the payer to the merchant with the reference attached.
    fn settled(signature: Signature) -> ConfirmedTransaction {
        let payer = Pubkey::from_str(PAYER).unwrap();
        let merchant = Pubkey::from_str(MERCHANT).unwrap();
        let reference = Pubkey::from_str(REFERENCE).unwrap();
        let system = Pubkey::default();
        let mut data = 2u32.to_le_bytes().to_vec();
        data.extend_from_slice(&250_000_000u64.to_le_bytes());
        ConfirmedTransaction {
            signature,
            slot: 42,
            block_time: Some(1_700_000_000),
            confirmation_status: ConfirmationStatus::Finalized,
            account_keys: vec![payer, merchant, reference, system],
            instructions: vec![DecodedInstruction {
                program_id: system,
                accounts: vec![payer, merchant, reference],
                data,
            }],
            pre_balances: vec![1_000_000_000, 0, 0, 1],
            post_balances: vec![749_995_000, 250_000_000, 0, 1],
            pre_token_balances: Vec::new(),
            post_token_balances: Vec::new(),
            log_messages: Vec::new(),
            err: None,
        }
    }

    #[test]
    fn test_url_round_trip_through_client() {
        let client = SolanaPayClient::new(StaticRpc::default());
        let url = client.create_payment_url(&request());
        assert!(url.starts_with(&format!("solana:{MERCHANT}?amount=0.25&reference={REFERENCE}")));
        match client.parse_payment_url(&url).unwrap() {
            SolanaPayUrl::Transfer(parsed) => assert_eq!(parsed, request()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            client.parse_payment_url("bitcoin:abc"),
            Err(SolanaPayError::Url(_))
        ));
    }

    #[tokio::test]
    async fn test_create_transaction_for_payer() {
        let client = SolanaPayClient::new(StaticRpc::default());
        let built = client.create_transaction(PAYER, &request()).await.unwrap();
        assert_eq!(built.signers_required, vec![PAYER.to_string()]);
        assert_eq!(built.instructions_count, 1);
        assert_eq!(built.estimated_fee, 5_000);

        let err = client.create_transaction("not-a-key", &request()).await;
        assert!(matches!(err, Err(SolanaPayError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_verify_payment_and_status() {
        let signature = Signature::from([4; 64]);
        let mut rpc = StaticRpc::default();
        rpc.transactions.insert(signature, settled(signature));
        let client = SolanaPayClient::new(rpc);

        let result = client
            .verify_payment(&signature.to_string(), &request(), None)
            .await
            .unwrap();
        assert!(result.is_valid(), "{}", result.detailed_report());

        let status = client
            .transaction_status(&signature.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.confirmation_status, ConfirmationStatus::Finalized);

        assert!(matches!(
            client.verify_payment("xyz", &request(), None).await,
            Err(SolanaPayError::InvalidSignature(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_payment_is_invalid_not_an_error() {
        let client = SolanaPayClient::new(StaticRpc::default())
            .with_validation_config(ValidationConfig {
                max_confirmation_time_secs: 3,
                ..ValidationConfig::default()
            })
            .unwrap();
        let signature = Signature::from([6; 64]).to_string();
        let result = client.verify_payment(&signature, &request(), None).await.unwrap();
        assert!(!result.is_valid());
        assert_eq!(result.confirmation_status(), ConfirmationStatus::NotFound);
    }

    #[test]
    fn test_rejects_zero_confirmation_time() {
        let result = SolanaPayClient::new(StaticRpc::default()).with_validation_config(
            ValidationConfig {
                max_confirmation_time_secs: 0,
                ..ValidationConfig::default()
            },
        );
        assert!(matches!(result, Err(SolanaPayError::ValidationConfig(_))));
    }
}
