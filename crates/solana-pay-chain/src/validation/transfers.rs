//! Reading transfers back out of a confirmed transaction.

use solana_pubkey::Pubkey;

use crate::chain::types::{
    ConfirmedTransaction, DecodedInstruction, SYSTEM_PROGRAM_PUBKEY, TokenBalance,
};

/// Discriminant of the system program `Transfer` instruction.
const SYSTEM_TRANSFER: u32 = 2;

/// A token movement decoded from a `Transfer` or `TransferChecked` instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    pub token_program: Pubkey,
    pub destination: Pubkey,
    pub amount: u64,
    /// Only `TransferChecked` names the mint and its decimals.
    pub mint: Option<Pubkey>,
    pub decimals: Option<u8>,
}

/// Destination and lamports of a system `Transfer`.
pub fn decode_system_transfer(instruction: &DecodedInstruction) -> Option<(Pubkey, u64)> {
    if instruction.program_id != SYSTEM_PROGRAM_PUBKEY || instruction.data.len() != 12 {
        return None;
    }
    let discriminant = u32::from_le_bytes(instruction.data[..4].try_into().ok()?);
    if discriminant != SYSTEM_TRANSFER {
        return None;
    }
    let lamports = u64::from_le_bytes(instruction.data[4..].try_into().ok()?);
    let destination = *instruction.accounts.get(1)?;
    Some((destination, lamports))
}

/// `Transfer` is deprecated in favour of `TransferChecked` but wallets still send it.
#[allow(deprecated)]
pub fn decode_token_transfer(instruction: &DecodedInstruction) -> Option<TokenTransfer> {
    let program_id = instruction.program_id;
    // (amount, decimals, destination index, mint index)
    let (amount, decimals, destination_index, mint_index) = if program_id == spl_token::id() {
        match spl_token::instruction::TokenInstruction::unpack(&instruction.data).ok()? {
            spl_token::instruction::TokenInstruction::Transfer { amount } => {
                (amount, None, 1, None)
            }
            spl_token::instruction::TokenInstruction::TransferChecked { amount, decimals } => {
                (amount, Some(decimals), 2, Some(1))
            }
            _ => return None,
        }
    } else if program_id == spl_token_2022::id() {
        match spl_token_2022::instruction::TokenInstruction::unpack(&instruction.data).ok()? {
            spl_token_2022::instruction::TokenInstruction::Transfer { amount } => {
                (amount, None, 1, None)
            }
            spl_token_2022::instruction::TokenInstruction::TransferChecked {
                amount,
                decimals,
            } => (amount, Some(decimals), 2, Some(1)),
            _ => return None,
        }
    } else {
        return None;
    };
    let destination = *instruction.accounts.get(destination_index)?;
    let mint = match mint_index {
        Some(index) => Some(*instruction.accounts.get(index)?),
        None => None,
    };
    Some(TokenTransfer {
        token_program: program_id,
        destination,
        amount,
        mint,
        decimals,
    })
}

/// Total lamports moved to `recipient` by system transfers, `None` if there are none.
pub fn native_amount_paid(tx: &ConfirmedTransaction, recipient: &Pubkey) -> Option<u64> {
    tx.instructions
        .iter()
        .filter_map(decode_system_transfer)
        .filter(|(destination, _)| destination == recipient)
        .map(|(_, lamports)| lamports)
        .reduce(|a, b| a.saturating_add(b))
}

/// Post minus pre lamports of `account`, `None` if it is not in the transaction.
pub fn native_balance_delta(tx: &ConfirmedTransaction, account: &Pubkey) -> Option<i128> {
    let index = tx.account_index(account)?;
    let pre = *tx.pre_balances.get(index)?;
    let post = *tx.post_balances.get(index)?;
    Some(post as i128 - pre as i128)
}

/// Token transfers into any of `holding_accounts`.
///
/// `TransferChecked` entries naming another mint are skipped.
pub fn token_transfers_to<'a>(
    tx: &'a ConfirmedTransaction,
    holding_accounts: &'a [Pubkey],
    mint: &'a Pubkey,
) -> impl Iterator<Item = TokenTransfer> + 'a {
    tx.instructions
        .iter()
        .filter_map(decode_token_transfer)
        .filter(move |t| holding_accounts.contains(&t.destination))
        .filter(move |t| t.mint.is_none_or(|m| m == *mint))
}

fn balance_of<'a>(
    balances: &'a [TokenBalance],
    index: usize,
    mint: &Pubkey,
) -> Option<&'a TokenBalance> {
    balances
        .iter()
        .find(|b| b.account_index as usize == index && b.mint == *mint)
}

/// Change of `mint` held in `account`, with the mint's decimals.
///
/// An account missing from the pre balances was created by the transaction
/// and starts at zero.
pub fn token_balance_delta(
    tx: &ConfirmedTransaction,
    account: &Pubkey,
    mint: &Pubkey,
) -> Option<(i128, u8)> {
    let index = tx.account_index(account)?;
    let post = balance_of(&tx.post_token_balances, index, mint)?;
    let pre = balance_of(&tx.pre_token_balances, index, mint).map_or(0, |b| b.amount);
    Some((post.amount as i128 - pre as i128, post.decimals))
}

/// Decimals of `mint` as recorded in the transaction's token balances.
pub fn recorded_decimals(tx: &ConfirmedTransaction, mint: &Pubkey) -> Option<u8> {
    tx.post_token_balances
        .iter()
        .chain(tx.pre_token_balances.iter())
        .find(|b| b.mint == *mint)
        .map(|b| b.decimals)
}
