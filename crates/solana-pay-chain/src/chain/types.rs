use solana_commitment_config::CommitmentConfig;
use solana_pay_types::Address;
use solana_pay_types::validation::{ConfirmationLevel, ConfirmationStatus};
use solana_pubkey::{ParsePubkeyError, Pubkey, pubkey};
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use solana_transaction_status_client_types::option_serializer::OptionSerializer;
use solana_transaction_status_client_types::{
    EncodedConfirmedTransactionWithStatusMeta, UiTransactionTokenBalance,
};
use std::str::FromStr;

pub const ATA_PROGRAM_PUBKEY: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
pub const MEMO_PROGRAM_PUBKEY: Pubkey = pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");
pub const SYSTEM_PROGRAM_PUBKEY: Pubkey = pubkey!("11111111111111111111111111111111");

/// Converts a format-checked [`Address`] into a 32-byte [`Pubkey`].
pub trait AddressExt {
    fn to_pubkey(&self) -> Result<Pubkey, ParsePubkeyError>;
}

impl AddressExt for Address {
    fn to_pubkey(&self) -> Result<Pubkey, ParsePubkeyError> {
        Pubkey::from_str(self.as_str())
    }
}

pub fn commitment_config(level: ConfirmationLevel) -> CommitmentConfig {
    match level {
        ConfirmationLevel::Processed => CommitmentConfig::processed(),
        ConfirmationLevel::Confirmed => CommitmentConfig::confirmed(),
        ConfirmationLevel::Finalized => CommitmentConfig::finalized(),
    }
}

/// Mint information for SPL tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mint {
    Token { decimals: u8, token_program: Pubkey },
    Token2022 { decimals: u8, token_program: Pubkey },
}

impl Mint {
    pub fn token_program(&self) -> &Pubkey {
        match self {
            Mint::Token { token_program, .. } => token_program,
            Mint::Token2022 { token_program, .. } => token_program,
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Mint::Token { decimals, .. } => *decimals,
            Mint::Token2022 { decimals, .. } => *decimals,
        }
    }
}

/// Deterministic associated token account of `owner` for `mint`.
pub fn holding_account_address(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    let (ata, _) = Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_PUBKEY,
    );
    ata
}

/// An instruction with its account indices resolved to keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub program_id: Pubkey,
    pub accounts: Vec<Pubkey>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: Pubkey,
    pub owner: Option<Pubkey>,
    /// Raw amount in base units.
    pub amount: u64,
    pub decimals: u8,
}

/// A confirmed transaction as the validator sees it.
///
/// Built once from the RPC response, so that everything downstream reads
/// plain fields. `account_keys` holds the static keys followed by the
/// writable and then the readonly keys loaded from lookup tables, which is
/// the order instruction account indices refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedTransaction {
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub confirmation_status: ConfirmationStatus,
    pub account_keys: Vec<Pubkey>,
    pub instructions: Vec<DecodedInstruction>,
    pub pre_balances: Vec<u64>,
    pub post_balances: Vec<u64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub log_messages: Vec<String>,
    /// On-chain execution error, if the transaction failed.
    pub err: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TransactionDecodeError {
    #[error("Transaction payload could not be decoded")]
    Undecodable,
    #[error("Transaction has no status metadata")]
    MissingMeta,
    #[error("Invalid loaded address {0}")]
    InvalidLoadedAddress(String),
    #[error("Instruction references account index {0} out of range")]
    AccountIndexOutOfRange(u8),
}

fn option_of<T: Clone>(value: &OptionSerializer<T>) -> Option<T> {
    match value {
        OptionSerializer::Some(inner) => Some(inner.clone()),
        _ => None,
    }
}

fn token_balances(balances: &OptionSerializer<Vec<UiTransactionTokenBalance>>) -> Vec<TokenBalance> {
    option_of(balances)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|balance| {
            let mint = Pubkey::from_str(&balance.mint).ok()?;
            let owner = option_of(&balance.owner).and_then(|o| Pubkey::from_str(&o).ok());
            let amount = balance.ui_token_amount.amount.parse::<u64>().ok()?;
            Some(TokenBalance {
                account_index: balance.account_index,
                mint,
                owner,
                amount,
                decimals: balance.ui_token_amount.decimals,
            })
        })
        .collect()
}

impl ConfirmedTransaction {
    /// Flattens a `getTransaction` response fetched at `level`.
    ///
    /// The response carries no status of its own, so `confirmation_status`
    /// starts at `level` until [`observe_status`](Self::observe_status)
    /// replaces it.
    pub fn from_encoded(
        signature: Signature,
        level: ConfirmationLevel,
        encoded: EncodedConfirmedTransactionWithStatusMeta,
    ) -> Result<Self, TransactionDecodeError> {
        let tx: VersionedTransaction = encoded
            .transaction
            .transaction
            .decode()
            .ok_or(TransactionDecodeError::Undecodable)?;
        let meta = encoded
            .transaction
            .meta
            .ok_or(TransactionDecodeError::MissingMeta)?;

        let mut account_keys = tx.message.static_account_keys().to_vec();
        if let Some(loaded) = option_of(&meta.loaded_addresses) {
            for key in loaded.writable.iter().chain(loaded.readonly.iter()) {
                let pubkey = Pubkey::from_str(key)
                    .map_err(|_| TransactionDecodeError::InvalidLoadedAddress(key.clone()))?;
                account_keys.push(pubkey);
            }
        }

        let resolve = |index: u8| {
            account_keys
                .get(index as usize)
                .copied()
                .ok_or(TransactionDecodeError::AccountIndexOutOfRange(index))
        };
        let instructions = tx
            .message
            .instructions()
            .iter()
            .map(|ix| -> Result<DecodedInstruction, TransactionDecodeError> {
                Ok(DecodedInstruction {
                    program_id: resolve(ix.program_id_index)?,
                    accounts: ix
                        .accounts
                        .iter()
                        .map(|&i| resolve(i))
                        .collect::<Result<_, _>>()?,
                    data: ix.data.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            signature,
            slot: encoded.slot,
            block_time: encoded.block_time,
            confirmation_status: level.into(),
            instructions,
            pre_balances: meta.pre_balances.clone(),
            post_balances: meta.post_balances.clone(),
            pre_token_balances: token_balances(&meta.pre_token_balances),
            post_token_balances: token_balances(&meta.post_token_balances),
            log_messages: option_of(&meta.log_messages).unwrap_or_default(),
            err: meta.err.as_ref().map(|e| format!("{e:?}")),
            account_keys,
        })
    }

    /// Takes the confirmation status the cluster reported. Signatures that
    /// dropped out of the status cache report nothing and keep the status
    /// implied by the fetch.
    pub fn observe_status(&mut self, status: Option<&SignatureStatus>) {
        if let Some(status) = status {
            self.confirmation_status = status.confirmation_status;
        }
    }

    pub fn account_index(&self, key: &Pubkey) -> Option<usize> {
        self.account_keys.iter().position(|k| k == key)
    }

    pub fn contains_account(&self, key: &Pubkey) -> bool {
        self.account_index(key).is_some()
    }
}

/// Status of a signature as reported by `getSignatureStatuses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` once the block is rooted.
    pub confirmations: Option<usize>,
    pub confirmation_status: ConfirmationStatus,
    pub err: Option<String>,
}

impl SignatureStatus {
    pub fn satisfies(&self, level: ConfirmationLevel) -> bool {
        self.err.is_none() && self.confirmation_status.satisfies(level)
    }
}
