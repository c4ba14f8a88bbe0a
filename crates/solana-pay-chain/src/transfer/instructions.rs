//! Instruction constructors for Solana Pay transfers.

use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_pay_types::transaction::BuildOptions;
use solana_pubkey::Pubkey;
use solana_transaction::Instruction;
use spl_token::solana_program::instruction::AccountMeta;

use crate::chain::types::{
    ATA_PROGRAM_PUBKEY, MEMO_PROGRAM_PUBKEY, Mint, SYSTEM_PROGRAM_PUBKEY, holding_account_address,
};

/// Longest memo accepted, in bytes of UTF-8.
pub const MAX_MEMO_BYTES: usize = 566;

/// Instruction index of `CreateIdempotent` in the associated token account program.
const CREATE_IDEMPOTENT: u8 = 1;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MemoError {
    #[error("Memo must not be empty")]
    Empty,
    #[error("Memo is {0} bytes, limit is {MAX_MEMO_BYTES}")]
    TooLong(usize),
}

/// `SetComputeUnitLimit` and `SetComputeUnitPrice`, in that order, when set.
pub fn compute_budget_instructions(options: &BuildOptions) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(2);
    if let Some(limit) = options.compute_unit_limit {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(limit));
    }
    if let Some(price) = options.compute_unit_price {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(price));
    }
    instructions
}

pub fn transfer_native_instruction(payer: &Pubkey, recipient: &Pubkey, lamports: u64) -> Instruction {
    solana_system_interface::instruction::transfer(payer, recipient, lamports)
}

/// `TransferChecked` between the associated token accounts of `payer` and
/// `recipient`, with the token program the mint belongs to.
pub fn transfer_token_instruction(
    mint: &Mint,
    mint_address: &Pubkey,
    payer: &Pubkey,
    recipient: &Pubkey,
    amount: u64,
) -> Result<Instruction, String> {
    let token_program = mint.token_program();
    let source = holding_account_address(payer, mint_address, token_program);
    let destination = holding_account_address(recipient, mint_address, token_program);
    match *mint {
        Mint::Token {
            decimals,
            token_program,
        } => spl_token::instruction::transfer_checked(
            &token_program,
            &source,
            mint_address,
            &destination,
            payer,
            &[],
            amount,
            decimals,
        )
        .map_err(|e| format!("{e}")),
        Mint::Token2022 {
            decimals,
            token_program,
        } => spl_token_2022::instruction::transfer_checked(
            &token_program,
            &source,
            mint_address,
            &destination,
            payer,
            &[],
            amount,
            decimals,
        )
        .map_err(|e| format!("{e}")),
    }
}

/// Idempotent creation of `owner`'s associated token account, funded by `payer`.
pub fn create_holding_account_instruction(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Instruction {
    let holding_account = holding_account_address(owner, mint, token_program);
    Instruction::new_with_bytes(
        ATA_PROGRAM_PUBKEY,
        &[CREATE_IDEMPOTENT],
        vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(holding_account, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_PUBKEY, false),
            AccountMeta::new_readonly(*token_program, false),
        ],
    )
}

/// Adds references as trailing read-only, non-signer accounts.
///
/// Programs ignore accounts past the ones they expect, so the transfer
/// behaves the same while the references become searchable on-chain.
pub fn append_references(instruction: &mut Instruction, references: &[Pubkey]) {
    instruction.accounts.extend(
        references
            .iter()
            .map(|reference| AccountMeta::new_readonly(*reference, false)),
    );
}

pub fn memo_instruction(memo: &str) -> Result<Instruction, MemoError> {
    if memo.trim().is_empty() {
        return Err(MemoError::Empty);
    }
    if memo.len() > MAX_MEMO_BYTES {
        return Err(MemoError::TooLong(memo.len()));
    }
    Ok(Instruction::new_with_bytes(
        MEMO_PROGRAM_PUBKEY,
        memo.as_bytes(),
        Vec::new(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    #[test]
    fn test_compute_budget_order() {
        let options = BuildOptions {
            compute_unit_limit: Some(200_000),
            compute_unit_price: Some(1_000),
            ..BuildOptions::default()
        };
        let ixs = compute_budget_instructions(&options);
        assert_eq!(ixs.len(), 2);
        assert!(ixs.iter().all(|ix| ix.program_id == solana_compute_budget_interface::ID));
        // SetComputeUnitLimit = 2, SetComputeUnitPrice = 3
        assert_eq!(ixs[0].data[0], 2);
        assert_eq!(ixs[1].data[0], 3);
        assert!(compute_budget_instructions(&BuildOptions::default()).is_empty());
    }

    #[test]
    fn test_native_transfer_layout() {
        let ix = transfer_native_instruction(&key(1), &key(2), 500_000_000);
        assert_eq!(ix.program_id, SYSTEM_PROGRAM_PUBKEY);
        assert_eq!(&ix.data[..4], &2u32.to_le_bytes());
        assert_eq!(&ix.data[4..], &500_000_000u64.to_le_bytes());
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[1].pubkey, key(2));
    }

    #[test]
    fn test_references_are_readonly_and_ordered() {
        let mut ix = transfer_native_instruction(&key(1), &key(2), 1);
        append_references(&mut ix, &[key(7), key(8)]);
        assert_eq!(ix.accounts.len(), 4);
        assert_eq!(ix.accounts[2].pubkey, key(7));
        assert_eq!(ix.accounts[3].pubkey, key(8));
        assert!(
            ix.accounts[2..]
                .iter()
                .all(|meta| !meta.is_signer && !meta.is_writable)
        );
    }

    #[test]
    fn test_memo_bounds() {
        assert_eq!(memo_instruction(""), Err(MemoError::Empty));
        assert_eq!(memo_instruction("   "), Err(MemoError::Empty));
        let longest = "a".repeat(MAX_MEMO_BYTES);
        assert_eq!(memo_instruction(&longest).unwrap().data.len(), MAX_MEMO_BYTES);
        assert_eq!(
            memo_instruction(&"a".repeat(MAX_MEMO_BYTES + 1)),
            Err(MemoError::TooLong(MAX_MEMO_BYTES + 1))
        );
        // Byte length, not character count.
        assert!(memo_instruction(&"é".repeat(300)).is_err());
        let ix = memo_instruction("Order #42").unwrap();
        assert_eq!(ix.program_id, MEMO_PROGRAM_PUBKEY);
        assert!(ix.accounts.is_empty());
    }

    #[test]
    fn test_create_holding_account_targets_derived_address() {
        let mint = key(9);
        let ix = create_holding_account_instruction(&key(1), &key(2), &mint, &spl_token::id());
        assert_eq!(ix.program_id, ATA_PROGRAM_PUBKEY);
        assert_eq!(ix.data, vec![CREATE_IDEMPOTENT]);
        assert_eq!(
            ix.accounts[1].pubkey,
            holding_account_address(&key(2), &mint, &spl_token::id())
        );
        assert_eq!(ix.accounts[5].pubkey, spl_token::id());
    }

    #[test]
    fn test_token_transfer_is_checked() {
        let mint = Mint::Token2022 {
            decimals: 6,
            token_program: spl_token_2022::id(),
        };
        let ix = transfer_token_instruction(&mint, &key(9), &key(1), &key(2), 1_500_000).unwrap();
        assert_eq!(ix.program_id, spl_token_2022::id());
        match spl_token_2022::instruction::TokenInstruction::unpack(&ix.data).unwrap() {
            spl_token_2022::instruction::TokenInstruction::TransferChecked { amount, decimals } => {
                assert_eq!(amount, 1_500_000);
                assert_eq!(decimals, 6);
            }
            other => panic!("unexpected instruction {other:?}"),
        }
        assert_eq!(
            ix.accounts[2].pubkey,
            holding_account_address(&key(2), &key(9), &spl_token_2022::id())
        );
    }
}
