//! Builds unsigned Solana Pay transfer transactions.
//!
//! The transaction is returned base64-encoded with empty signature slots,
//! ready to be handed to a wallet that signs it as the payer. Instructions
//! are laid out as:
//!
//! 1. compute budget (limit, then price), when configured
//! 2. creation of the recipient's associated token account, for token
//!    transfers whose recipient account does not exist yet
//! 3. the transfer, with references appended as read-only accounts
//! 4. the memo, when present

pub mod instructions;

use solana_message::v0::Message as MessageV0;
use solana_message::{Message as LegacyMessage, VersionedMessage};
use solana_pay_types::PaymentRequest;
use solana_pay_types::transaction::{BuildOptions, BuildOptionsError, BuildResult};
use solana_pay_types::units::{NATIVE_DECIMALS, UnitsError};
use solana_pay_types::util::Base64Bytes;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;

use crate::chain::rpc::{MintError, RpcError, SolanaRpc, account_exists, fetch_mint};
use crate::chain::types::{AddressExt, holding_account_address};

pub use instructions::*;

/// Base fee charged per signature, in lamports.
pub const LAMPORTS_PER_SIGNATURE: u64 = 5_000;
/// Compute unit limit the runtime assumes when none is requested.
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 200_000;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Invalid build options: {0}")]
    InvalidOptions(#[from] BuildOptionsError),
    #[error("Invalid {field} address {value}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("Amount is required to build a transfer")]
    MissingAmount,
    #[error("Invalid memo: {0}")]
    InvalidMemo(#[from] MemoError),
    #[error("Invalid amount: {0}")]
    Amount(#[from] UnitsError),
    #[error("Account {0} not found")]
    AccountNotFound(Pubkey),
    #[error("Unsupported mint: {0}")]
    UnsupportedMint(String),
    #[error("Failed to build instruction: {0}")]
    Instruction(String),
    #[error("Failed to compile message: {0}")]
    Compile(String),
    #[error("Failed to encode transaction: {0}")]
    Encode(String),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl From<MintError> for BuildError {
    fn from(error: MintError) -> Self {
        match error {
            MintError::Rpc(e) => BuildError::Rpc(e),
            MintError::NotFound(mint) => BuildError::AccountNotFound(mint),
            e @ (MintError::UnknownOwner { .. } | MintError::Unpack { .. }) => {
                BuildError::UnsupportedMint(e.to_string())
            }
        }
    }
}

/// Lamports the network is expected to charge.
///
/// An explicit `priority_fee` is taken as is; otherwise the priority part is
/// derived from the compute-unit price (micro-lamports) and limit.
pub fn estimate_fee(signatures: usize, options: &BuildOptions) -> u64 {
    let base = LAMPORTS_PER_SIGNATURE.saturating_mul(signatures as u64);
    let priority = match (options.priority_fee, options.compute_unit_price) {
        (Some(fee), _) => fee,
        (None, Some(price)) => {
            let limit = options.compute_unit_limit.unwrap_or(DEFAULT_COMPUTE_UNIT_LIMIT);
            price.saturating_mul(limit as u64) / 1_000_000
        }
        (None, None) => 0,
    };
    base.saturating_add(priority)
}

fn pubkey_of(
    address: &solana_pay_types::Address,
    field: &'static str,
) -> Result<Pubkey, BuildError> {
    address.to_pubkey().map_err(|_| BuildError::InvalidAddress {
        field,
        value: address.to_string(),
    })
}

/// Builds the unsigned transaction paying `request` from `payer`.
///
/// Reads the mint, the recipient's token account and a recent blockhash
/// through `rpc`. Retries are the RPC layer's business; any RPC failure is
/// returned as [`BuildError::Rpc`]. The whole build is bounded by
/// [`BuildOptions::timeout`], after which an [`RpcError::Timeout`] is returned.
pub async fn build_transfer_transaction<R: SolanaRpc>(
    rpc: &R,
    payer: &Pubkey,
    request: &PaymentRequest,
    options: &BuildOptions,
) -> Result<BuildResult, BuildError> {
    options.validate()?;
    let timeout = options.timeout();
    match tokio::time::timeout(timeout, build(rpc, payer, request, options)).await {
        Ok(built) => built,
        Err(_) => Err(BuildError::Rpc(RpcError::Timeout {
            endpoint: rpc.endpoint(),
            operation: "buildTransaction",
            timeout,
        })),
    }
}

async fn build<R: SolanaRpc>(
    rpc: &R,
    payer: &Pubkey,
    request: &PaymentRequest,
    options: &BuildOptions,
) -> Result<BuildResult, BuildError> {
    let amount = request.amount().ok_or(BuildError::MissingAmount)?;
    let memo = request.memo().map(memo_instruction).transpose()?;
    let recipient = pubkey_of(request.recipient(), "recipient")?;
    let references = request
        .references()
        .iter()
        .map(|reference| pubkey_of(reference, "reference"))
        .collect::<Result<Vec<_>, _>>()?;

    let mut instructions = compute_budget_instructions(options);

    let mut transfer = match request.token() {
        None => {
            let lamports = amount.to_units(NATIVE_DECIMALS)?;
            transfer_native_instruction(payer, &recipient, lamports)
        }
        Some(token) => {
            let mint_address = pubkey_of(token, "spl-token")?;
            let mint = fetch_mint(rpc, &mint_address).await?;
            let units = amount.to_units(mint.decimals())?;
            if options.auto_create_ata {
                let holding_account =
                    holding_account_address(&recipient, &mint_address, mint.token_program());
                if !account_exists(rpc, &holding_account).await? {
                    #[cfg(feature = "telemetry")]
                    tracing::debug!(%holding_account, "Recipient token account missing, creating it");
                    instructions.push(create_holding_account_instruction(
                        payer,
                        &recipient,
                        &mint_address,
                        mint.token_program(),
                    ));
                }
            }
            transfer_token_instruction(&mint, &mint_address, payer, &recipient, units)
                .map_err(BuildError::Instruction)?
        }
    };
    append_references(&mut transfer, &references);
    instructions.push(transfer);
    instructions.extend(memo);

    let recent_blockhash = rpc.get_latest_blockhash().await?;
    let message = if options.use_versioned_tx {
        let message = MessageV0::try_compile(payer, &instructions, &[], recent_blockhash)
            .map_err(|e| BuildError::Compile(format!("{e:?}")))?;
        VersionedMessage::V0(message)
    } else {
        VersionedMessage::Legacy(LegacyMessage::new_with_blockhash(
            &instructions,
            Some(payer),
            &recent_blockhash,
        ))
    };

    let num_required_signatures = message.header().num_required_signatures as usize;
    let signers_required = message
        .static_account_keys()
        .iter()
        .take(num_required_signatures)
        .map(|key| key.to_string())
        .collect();
    let tx = VersionedTransaction {
        signatures: vec![Signature::default(); num_required_signatures],
        message,
    };
    let bytes = bincode::serialize(&tx).map_err(|e| BuildError::Encode(format!("{e}")))?;

    #[cfg(feature = "telemetry")]
    tracing::debug!(
        payer = %payer,
        recipient = %recipient,
        instructions = instructions.len(),
        size = bytes.len(),
        "Built transfer transaction"
    );

    Ok(BuildResult {
        transaction: Base64Bytes::encode(&bytes).to_string(),
        signers_required,
        instructions_count: instructions.len(),
        estimated_fee: estimate_fee(num_required_signatures, options),
        // Messages are compiled without address lookup tables.
        uses_lookup_tables: false,
        compute_units: options.compute_unit_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::rpc::mock::MockRpc;
    use crate::chain::types::{ATA_PROGRAM_PUBKEY, MEMO_PROGRAM_PUBKEY, SYSTEM_PROGRAM_PUBKEY};
    use solana_account::Account;
    use spl_token::solana_program::program_option::COption;
    use spl_token::solana_program::program_pack::Pack;
    use std::str::FromStr;

    const RECIPIENT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const REF_A: &str = "7XSvJnS19TodrQJSbjUR6tEGwmYyL1i9FX7Z5ZQHc53W";

    fn payer() -> Pubkey {
        Pubkey::new_from_array([1; 32])
    }

    fn pk(s: &str) -> Pubkey {
        Pubkey::from_str(s).unwrap()
    }

    fn decode(result: &BuildResult) -> VersionedTransaction {
        let bytes = Base64Bytes::from(result.transaction.as_str()).decode().unwrap();
        bincode::deserialize::<VersionedTransaction>(&bytes).unwrap()
    }

    fn program_ids(tx: &VersionedTransaction) -> Vec<Pubkey> {
        let keys = tx.message.static_account_keys();
        tx.message
            .instructions()
            .iter()
            .map(|ix| *ix.program_id(keys))
            .collect()
    }

    fn usdc_rpc() -> MockRpc {
        let state = spl_token::state::Mint {
            mint_authority: COption::None,
            supply: 0,
            decimals: 6,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; spl_token::state::Mint::LEN];
        spl_token::state::Mint::pack(state, &mut data).unwrap();
        let mut rpc = MockRpc::named("mock");
        rpc.accounts.insert(
            pk(USDC),
            Account {
                lamports: 1,
                data,
                owner: spl_token::id(),
                executable: false,
                rent_epoch: 0,
            },
        );
        rpc
    }

    #[tokio::test]
    async fn test_native_transfer_with_reference_and_memo() {
        let request = PaymentRequest::builder(RECIPIENT)
            .amount("0.5")
            .reference(REF_A)
            .memo("Order #42")
            .build()
            .unwrap();
        let rpc = MockRpc::named("mock");
        let result = build_transfer_transaction(&rpc, &payer(), &request, &BuildOptions::default())
            .await
            .unwrap();

        assert_eq!(result.signers_required, vec![payer().to_string()]);
        assert_eq!(result.instructions_count, 2);
        assert_eq!(result.estimated_fee, 5_000);
        assert!(!result.uses_lookup_tables);

        let tx = decode(&result);
        assert!(matches!(tx.message, VersionedMessage::V0(_)));
        assert_eq!(tx.signatures, vec![Signature::default()]);
        assert_eq!(
            program_ids(&tx),
            vec![SYSTEM_PROGRAM_PUBKEY, MEMO_PROGRAM_PUBKEY]
        );
        let keys = tx.message.static_account_keys();
        let transfer = &tx.message.instructions()[0];
        let accounts: Vec<Pubkey> = transfer
            .accounts
            .iter()
            .map(|&i| keys[i as usize])
            .collect();
        assert_eq!(accounts, vec![payer(), pk(RECIPIENT), pk(REF_A)]);
        assert_eq!(&transfer.data[4..], &500_000_000u64.to_le_bytes());
        assert_eq!(tx.message.instructions()[1].data, b"Order #42".to_vec());
        assert_eq!(keys[0], payer());
    }

    #[tokio::test]
    async fn test_compute_budget_and_legacy_message() {
        let request = PaymentRequest::builder(RECIPIENT)
            .amount("1")
            .build()
            .unwrap();
        let options = BuildOptions {
            compute_unit_limit: Some(100_000),
            compute_unit_price: Some(50_000),
            use_versioned_tx: false,
            ..BuildOptions::default()
        };
        let rpc = MockRpc::named("mock");
        let result = build_transfer_transaction(&rpc, &payer(), &request, &options)
            .await
            .unwrap();
        // 5000 + 50_000 * 100_000 / 1e6
        assert_eq!(result.estimated_fee, 10_000);
        assert_eq!(result.compute_units, Some(100_000));
        let tx = decode(&result);
        assert!(matches!(tx.message, VersionedMessage::Legacy(_)));
        assert_eq!(
            program_ids(&tx),
            vec![
                solana_compute_budget_interface::ID,
                solana_compute_budget_interface::ID,
                SYSTEM_PROGRAM_PUBKEY
            ]
        );
    }

    #[tokio::test]
    async fn test_token_transfer_creates_missing_holding_account() {
        let request = PaymentRequest::builder(RECIPIENT)
            .amount("12.5")
            .token(USDC)
            .build()
            .unwrap();
        let rpc = usdc_rpc();
        let result = build_transfer_transaction(&rpc, &payer(), &request, &BuildOptions::default())
            .await
            .unwrap();
        let tx = decode(&result);
        assert_eq!(program_ids(&tx), vec![ATA_PROGRAM_PUBKEY, spl_token::id()]);
        let transfer = &tx.message.instructions()[1];
        match spl_token::instruction::TokenInstruction::unpack(&transfer.data).unwrap() {
            spl_token::instruction::TokenInstruction::TransferChecked { amount, decimals } => {
                assert_eq!(amount, 12_500_000);
                assert_eq!(decimals, 6);
            }
            other => panic!("unexpected instruction {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_token_transfer_skips_existing_holding_account() {
        let request = PaymentRequest::builder(RECIPIENT)
            .amount("1")
            .token(USDC)
            .build()
            .unwrap();
        let mut rpc = usdc_rpc();
        let ata = holding_account_address(&pk(RECIPIENT), &pk(USDC), &spl_token::id());
        rpc.accounts.insert(ata, Account::default());
        let result = build_transfer_transaction(&rpc, &payer(), &request, &BuildOptions::default())
            .await
            .unwrap();
        assert_eq!(result.instructions_count, 1);

        let rpc = usdc_rpc();
        let options = BuildOptions {
            auto_create_ata: false,
            ..BuildOptions::default()
        };
        let result = build_transfer_transaction(&rpc, &payer(), &request, &options)
            .await
            .unwrap();
        assert_eq!(program_ids(&decode(&result)), vec![spl_token::id()]);
    }

    #[tokio::test]
    async fn test_build_errors() {
        let rpc = MockRpc::named("mock");
        let no_amount = PaymentRequest::builder(RECIPIENT).build().unwrap();
        assert_eq!(
            build_transfer_transaction(&rpc, &payer(), &no_amount, &BuildOptions::default()).await,
            Err(BuildError::MissingAmount)
        );

        let long_memo = PaymentRequest::builder(RECIPIENT)
            .amount("1")
            .memo("x".repeat(MAX_MEMO_BYTES + 1))
            .build()
            .unwrap();
        assert!(matches!(
            build_transfer_transaction(&rpc, &payer(), &long_memo, &BuildOptions::default()).await,
            Err(BuildError::InvalidMemo(MemoError::TooLong(_)))
        ));

        let unknown_mint = PaymentRequest::builder(RECIPIENT)
            .amount("1")
            .token(USDC)
            .build()
            .unwrap();
        assert_eq!(
            build_transfer_transaction(&rpc, &payer(), &unknown_mint, &BuildOptions::default())
                .await,
            Err(BuildError::AccountNotFound(pk(USDC)))
        );

        let bad_options = BuildOptions {
            timeout_secs: 0,
            ..BuildOptions::default()
        };
        assert!(matches!(
            build_transfer_transaction(&rpc, &payer(), &no_amount, &bad_options).await,
            Err(BuildError::InvalidOptions(_))
        ));
    }

    #[tokio::test]
    async fn test_rpc_failure_surfaces_with_context() {
        let request = PaymentRequest::builder(RECIPIENT)
            .amount("1")
            .build()
            .unwrap();
        let rpc = MockRpc::named("http://node");
        let error = rpc.network_error("getLatestBlockhash");
        let rpc = rpc.failing_with(vec![error.clone()]);
        assert_eq!(
            build_transfer_transaction(&rpc, &payer(), &request, &BuildOptions::default()).await,
            Err(BuildError::Rpc(error))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_gives_up_after_timeout() {
        let request = PaymentRequest::builder(RECIPIENT)
            .amount("1")
            .build()
            .unwrap();
        let mut rpc = MockRpc::named("http://slow");
        rpc.latency = std::time::Duration::from_secs(10);
        let options = BuildOptions {
            timeout_secs: 2,
            ..BuildOptions::default()
        };
        let start = tokio::time::Instant::now();
        assert_eq!(
            build_transfer_transaction(&rpc, &payer(), &request, &options).await,
            Err(BuildError::Rpc(RpcError::Timeout {
                endpoint: "http://slow".to_string(),
                operation: "buildTransaction",
                timeout: std::time::Duration::from_secs(2),
            }))
        );
        assert_eq!(start.elapsed(), std::time::Duration::from_secs(2));

        rpc.latency = std::time::Duration::from_secs(1);
        assert!(
            build_transfer_transaction(&rpc, &payer(), &request, &options)
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_estimate_fee() {
        let options = BuildOptions {
            priority_fee: Some(1_000),
            compute_unit_price: Some(99),
            ..BuildOptions::default()
        };
        assert_eq!(estimate_fee(1, &options), 6_000);
        let options = BuildOptions {
            compute_unit_price: Some(1_000_000),
            ..BuildOptions::default()
        };
        assert_eq!(estimate_fee(2, &options), 10_000 + 200_000);
    }
}
