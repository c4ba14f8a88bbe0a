//! Checking a confirmed transaction against a payment request.
//!
//! [`TransactionValidator::wait_and_verify`] polls until the transaction is
//! visible at the required confirmation level, then runs every check and
//! reports them all in one [`ValidationResult`] rather than stopping at the
//! first mismatch.
//!
//! Amounts are read from the transfer instructions first. When none target
//! the recipient, the balance change of the recipient (or its token account)
//! is used instead.

pub mod transfers;

use rust_decimal::Decimal;
use solana_pay_types::PaymentRequest;
use solana_pay_types::units::{NATIVE_DECIMALS, units_to_decimal};
use solana_pay_types::validation::{
    ValidationCheck, ValidationConfig, ValidationConfigError, ValidationResult,
};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::chain::rpc::{RpcError, SolanaRpc};
use crate::chain::types::{
    ATA_PROGRAM_PUBKEY, AddressExt, ConfirmedTransaction, MEMO_PROGRAM_PUBKEY,
    SYSTEM_PROGRAM_PUBKEY, SignatureStatus, holding_account_address,
};
use transfers::{
    native_amount_paid, native_balance_delta, recorded_decimals, token_balance_delta,
    token_transfers_to,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// 0.000001, the slack allowed between requested and paid amounts unless
/// `strict_amount` is set.
const AMOUNT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

fn is_known_program(program_id: &Pubkey) -> bool {
    *program_id == SYSTEM_PROGRAM_PUBKEY
        || *program_id == solana_compute_budget_interface::ID
        || *program_id == spl_token::id()
        || *program_id == spl_token_2022::id()
        || *program_id == ATA_PROGRAM_PUBKEY
        || *program_id == MEMO_PROGRAM_PUBKEY
}

pub struct TransactionValidator<R> {
    rpc: R,
    config: ValidationConfig,
    poll_interval: Duration,
}

impl<R> TransactionValidator<R> {
    pub fn new(rpc: R, config: ValidationConfig) -> Result<Self, ValidationConfigError> {
        config.validate()?;
        Ok(Self {
            rpc,
            config,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn rpc(&self) -> &R {
        &self.rpc
    }
}

impl<R: SolanaRpc> TransactionValidator<R> {
    /// Waits for `signature` to reach the configured confirmation level, then
    /// validates it against `request`.
    ///
    /// Gives up after `timeout`, or the configured maximum confirmation time,
    /// with a not-found result. RPC errors while polling are logged and
    /// polling continues.
    pub async fn wait_and_verify(
        &self,
        signature: &Signature,
        request: &PaymentRequest,
        timeout: Option<Duration>,
    ) -> ValidationResult {
        let timeout = timeout.unwrap_or_else(|| self.config.max_confirmation_time());
        match tokio::time::timeout(timeout, self.poll_until_visible(signature)).await {
            Ok(tx) => self.validate(&tx, request),
            Err(_) => {
                #[cfg(feature = "telemetry")]
                tracing::warn!(%signature, ?timeout, "Transaction not confirmed in time");
                ValidationResult::not_found(
                    signature.to_string(),
                    format!(
                        "Transaction not {} within {}s",
                        self.config.required_confirmation,
                        timeout.as_secs()
                    ),
                )
            }
        }
    }

    async fn poll_until_visible(&self, signature: &Signature) -> ConfirmedTransaction {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match self
                .rpc
                .get_transaction(signature, self.config.required_confirmation)
                .await
            {
                Ok(Some(tx)) => return tx,
                Ok(None) => {
                    #[cfg(feature = "telemetry")]
                    tracing::debug!(%signature, "Transaction not visible yet");
                }
                Err(_error) => {
                    #[cfg(feature = "telemetry")]
                    tracing::warn!(%signature, error = %_error, "Polling for transaction failed");
                }
            }
        }
    }

    /// Fetches `signature` once and validates it, without waiting.
    pub async fn verify_signature(
        &self,
        signature: &Signature,
        request: &PaymentRequest,
    ) -> ValidationResult {
        match self
            .rpc
            .get_transaction(signature, self.config.required_confirmation)
            .await
        {
            Ok(Some(tx)) => self.validate(&tx, request),
            Ok(None) => ValidationResult::not_found(signature.to_string(), "Transaction not found"),
            Err(error) => {
                let mut result = ValidationResult::new(signature.to_string());
                result.add_error(format!("Failed to fetch transaction: {error}"));
                result
            }
        }
    }

    /// Current status of `signature`, `None` if the cluster does not know it.
    pub async fn transaction_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let statuses = self.rpc.get_signature_statuses(&[*signature]).await?;
        Ok(statuses.into_iter().next().flatten())
    }
}

impl<R> TransactionValidator<R> {
    /// Runs every check of `tx` against `request`.
    pub fn validate(&self, tx: &ConfirmedTransaction, request: &PaymentRequest) -> ValidationResult {
        let mut result = ValidationResult::new(tx.signature.to_string()).with_confirmation(
            tx.confirmation_status,
            Some(tx.slot),
            tx.block_time,
        );

        if let Some(err) = &tx.err {
            result.add_error(format!("Transaction failed on-chain: {err}"));
        }
        if !tx
            .confirmation_status
            .satisfies(self.config.required_confirmation)
        {
            result.add_error(format!(
                "Transaction is {}, {} required",
                tx.confirmation_status, self.config.required_confirmation
            ));
        }

        let Ok(recipient) = request.recipient().to_pubkey() else {
            result.fail_check(
                ValidationCheck::Recipient,
                format!("Invalid recipient address {}", request.recipient()),
            );
            return result;
        };
        let mint = match request.token().map(|t| t.to_pubkey()) {
            None => None,
            Some(Ok(mint)) => Some(mint),
            Some(Err(_)) => {
                result.fail_check(
                    ValidationCheck::Token,
                    format!("Invalid token mint {}", request.token().map_or("", |t| t.as_str())),
                );
                return result;
            }
        };

        self.check_recipient(tx, &recipient, mint.as_ref(), &mut result);
        match &mint {
            None => self.check_native_amount(tx, request, &recipient, &mut result),
            Some(mint) => {
                self.check_token(tx, mint, &mut result);
                self.check_token_amount(tx, request, &recipient, mint, &mut result);
            }
        }
        self.check_memo(tx, request, &mut result);
        self.check_references(tx, request, &mut result);
        if !self.config.allow_extra_instructions {
            self.check_programs(tx, &mut result);
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(signature = %tx.signature, valid = result.is_valid(), "Validated transaction");
        result
    }

    /// The recipient itself, or for token payments one of its token accounts,
    /// must be among the transaction's accounts.
    fn check_recipient(
        &self,
        tx: &ConfirmedTransaction,
        recipient: &Pubkey,
        mint: Option<&Pubkey>,
        result: &mut ValidationResult,
    ) {
        if tx.contains_account(recipient) {
            return;
        }
        if let Some(mint) = mint {
            if holding_accounts(recipient, mint)
                .iter()
                .any(|account| tx.contains_account(account))
            {
                return;
            }
        }
        result.fail_check(
            ValidationCheck::Recipient,
            format!("Recipient {recipient} not found in transaction"),
        );
    }

    fn check_native_amount(
        &self,
        tx: &ConfirmedTransaction,
        request: &PaymentRequest,
        recipient: &Pubkey,
        result: &mut ValidationResult,
    ) {
        let Some(expected) = request.amount() else {
            return;
        };
        let lamports = match native_amount_paid(tx, recipient) {
            Some(lamports) => lamports as i128,
            None => match native_balance_delta(tx, recipient) {
                Some(delta) => delta,
                None => {
                    result.fail_check(
                        ValidationCheck::Amount,
                        format!("No transfer to {recipient} found"),
                    );
                    return;
                }
            },
        };
        if lamports <= 0 {
            result.add_warning(format!(
                "Balance of {recipient} did not increase, amount could not be verified"
            ));
            return;
        }
        self.compare_amount(expected.value(), lamports, NATIVE_DECIMALS, "SOL", result);
    }

    fn check_token(&self, tx: &ConfirmedTransaction, mint: &Pubkey, result: &mut ValidationResult) {
        if !tx.contains_account(mint) && recorded_decimals(tx, mint).is_none() {
            result.fail_check(
                ValidationCheck::Token,
                format!("Token mint {mint} not found in transaction"),
            );
        }
    }

    fn check_token_amount(
        &self,
        tx: &ConfirmedTransaction,
        request: &PaymentRequest,
        recipient: &Pubkey,
        mint: &Pubkey,
        result: &mut ValidationResult,
    ) {
        let Some(expected) = request.amount() else {
            return;
        };
        let accounts = holding_accounts(recipient, mint);

        let mut paid: Option<(u64, Option<u8>)> = None;
        for transfer in token_transfers_to(tx, &accounts, mint) {
            let (total, decimals) = paid.get_or_insert((0, None));
            *total = total.saturating_add(transfer.amount);
            *decimals = decimals.or(transfer.decimals);
        }

        let (units, decimals) = match paid {
            Some((units, decimals)) => {
                match decimals.or_else(|| recorded_decimals(tx, mint)) {
                    Some(decimals) => (units as i128, decimals),
                    None => {
                        result.fail_check(
                            ValidationCheck::Amount,
                            format!("Decimals of {mint} unknown, amount could not be verified"),
                        );
                        return;
                    }
                }
            }
            None => {
                match accounts
                    .iter()
                    .find_map(|account| token_balance_delta(tx, account, mint))
                {
                    Some(delta) => delta,
                    None => {
                        result.fail_check(
                            ValidationCheck::Amount,
                            format!("No transfer of {mint} to {recipient} found"),
                        );
                        return;
                    }
                }
            }
        };
        if units <= 0 {
            result.add_warning(format!(
                "Token balance of {recipient} did not increase, amount could not be verified"
            ));
            return;
        }
        self.compare_amount(expected.value(), units, decimals, "tokens", result);
    }

    fn compare_amount(
        &self,
        expected: Decimal,
        units: i128,
        decimals: u8,
        unit_name: &str,
        result: &mut ValidationResult,
    ) {
        let paid = match u64::try_from(units)
            .ok()
            .and_then(|units| units_to_decimal(units, decimals).ok())
        {
            Some(paid) => paid,
            None => {
                result.fail_check(
                    ValidationCheck::Amount,
                    format!("Paid amount of {units} base units is out of range"),
                );
                return;
            }
        };
        let matches = if self.config.strict_amount {
            paid == expected
        } else {
            (paid - expected).abs() <= AMOUNT_TOLERANCE
        };
        if !matches {
            result.fail_check(
                ValidationCheck::Amount,
                format!(
                    "Amount mismatch: expected {} {unit_name}, got {} {unit_name}",
                    expected.normalize(),
                    paid.normalize()
                ),
            );
        }
    }

    fn check_memo(
        &self,
        tx: &ConfirmedTransaction,
        request: &PaymentRequest,
        result: &mut ValidationResult,
    ) {
        let memos = tx
            .instructions
            .iter()
            .filter(|ix| ix.program_id == MEMO_PROGRAM_PUBKEY);
        match request.memo() {
            Some(expected) => {
                let in_instructions = memos
                    .clone()
                    .any(|ix| ix.data.as_slice() == expected.as_bytes());
                // Explorers and some RPC nodes only surface the memo through the logs.
                let in_logs = tx
                    .log_messages
                    .iter()
                    .any(|line| logged_memo_is(line, expected));
                if !in_instructions && !in_logs {
                    result.fail_check(
                        ValidationCheck::Memo,
                        format!("Memo \"{expected}\" not found in transaction"),
                    );
                }
            }
            None if self.config.require_memo => {
                if memos.count() == 0 {
                    result.fail_check(ValidationCheck::Memo, "Transaction carries no memo");
                }
            }
            None => {}
        }
    }

    fn check_references(
        &self,
        tx: &ConfirmedTransaction,
        request: &PaymentRequest,
        result: &mut ValidationResult,
    ) {
        let references = request.references();
        if references.is_empty() {
            if self.config.require_references {
                result.fail_check(
                    ValidationCheck::References,
                    "Payment request carries no references",
                );
            }
            return;
        }

        let mut positions = Vec::with_capacity(references.len());
        for reference in references {
            let position = reference
                .to_pubkey()
                .ok()
                .and_then(|pubkey| tx.account_index(&pubkey));
            match position {
                Some(position) => positions.push(position),
                None => result.fail_check(
                    ValidationCheck::References,
                    format!("Reference {reference} not found in transaction"),
                ),
            }
        }
        if positions.len() == references.len() && !positions.is_sorted() {
            result.add_warning("References appear in a different order than requested");
        }
    }

    fn check_programs(&self, tx: &ConfirmedTransaction, result: &mut ValidationResult) {
        for ix in tx
            .instructions
            .iter()
            .filter(|ix| !is_known_program(&ix.program_id))
        {
            result.add_error(format!(
                "Unexpected instruction for program {}",
                ix.program_id
            ));
        }
    }
}

/// True if `line` is the memo program's `Memo (len N): "<memo>"` log of
/// exactly `expected`. The program logs the memo in debug form, quoted and
/// escaped.
fn logged_memo_is(line: &str, expected: &str) -> bool {
    line.split_once("Memo (len ")
        .and_then(|(_, rest)| rest.split_once("): "))
        .is_some_and(|(_, logged)| logged == format!("{expected:?}"))
}

/// Token accounts of `owner` for `mint` under either token program.
fn holding_accounts(owner: &Pubkey, mint: &Pubkey) -> [Pubkey; 2] {
    [
        holding_account_address(owner, mint, &spl_token::id()),
        holding_account_address(owner, mint, &spl_token_2022::id()),
    ]
}
