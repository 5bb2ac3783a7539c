//! Instruction encoding for the programs a relay transaction touches.
//!
//! The relay program, the system program and the associated token account
//! program are encoded here by hand; token program instructions come from
//! `spl-token`. Relay instruction data is a one-byte instruction index
//! followed by little-endian `u64` arguments.

use std::sync::LazyLock;

use fee_relay::Network;
use solana_instruction::{AccountMeta, Instruction};
use solana_pubkey::{Pubkey, pubkey};

use crate::swap::{DirectSwapData, TransitiveSwapData};

/// System program ID.
pub const SYSTEM_PROGRAM_ID: Pubkey = pubkey!("11111111111111111111111111111111");

/// Rent sysvar ID.
pub const RENT_SYSVAR_ID: Pubkey = pubkey!("SysvarRent111111111111111111111111111111111");

/// Associated Token Account program public key.
pub const ATA_PROGRAM_PUBKEY: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// Size of an SPL token account in bytes.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

static RELAY_PROGRAM_MAINNET: LazyLock<Pubkey> = LazyLock::new(|| {
    "12YKFL4mnZz6CBEGePrf293mEzueQM3h8VLPUJsKpGs9"
        .parse()
        .expect("Invalid mainnet relay program ID")
});

static RELAY_PROGRAM_DEVNET: LazyLock<Pubkey> = LazyLock::new(|| {
    "6xKJFyuM6UHCT8F5SBxnjGt6ZrZYjsVfnAnAeHPU775k"
        .parse()
        .expect("Invalid devnet relay program ID")
});

/// Relay program instruction indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RelayInstruction {
    /// Swap SPL tokens into SOL for the user's relay account through one pool.
    TopUpWithSplSwapDirect = 0,
    /// Swap SPL tokens into SOL for the user's relay account through two pools.
    TopUpWithSplSwapTransitive = 1,
    /// Move SOL from the user's relay account to a recipient.
    TransferSol = 2,
    /// Create the user's transit token account for a mint.
    CreateTransitToken = 3,
    /// Relay-signed swap through one pool.
    SplSwapDirect = 4,
    /// Relay-signed swap through two pools via the transit token account.
    SplSwapTransitive = 5,
}

/// Relay program ID on `network`.
#[must_use]
pub fn relay_program_id(network: Network) -> Pubkey {
    match network {
        Network::MainnetBeta => *RELAY_PROGRAM_MAINNET,
        Network::Devnet | Network::Testnet => *RELAY_PROGRAM_DEVNET,
    }
}

/// The user's relay account, holding lamports that pre-pay relay fees.
#[must_use]
pub fn user_relay_address(user: &Pubkey, network: Network) -> Pubkey {
    Pubkey::find_program_address(&[user.as_ref(), b"relay"], &relay_program_id(network)).0
}

/// The user's temporary WSOL account used while topping up.
#[must_use]
pub fn user_temporary_wsol_address(user: &Pubkey, network: Network) -> Pubkey {
    Pubkey::find_program_address(
        &[user.as_ref(), b"temporary_wsol"],
        &relay_program_id(network),
    )
    .0
}

/// The user's transit token account for `transit_token_mint`.
#[must_use]
pub fn transit_token_account_address(
    user: &Pubkey,
    transit_token_mint: &Pubkey,
    network: Network,
) -> Pubkey {
    Pubkey::find_program_address(
        &[user.as_ref(), transit_token_mint.as_ref(), b"transit"],
        &relay_program_id(network),
    )
    .0
}

/// The associated token account of `owner` for `mint`.
#[must_use]
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), spl_token::ID.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_PUBKEY,
    )
    .0
}

fn relay_data(instruction: RelayInstruction, args: &[u64]) -> Vec<u8> {
    let mut data = Vec::with_capacity(1 + args.len() * 8);
    data.push(instruction as u8);
    for arg in args {
        data.extend_from_slice(&arg.to_le_bytes());
    }
    data
}

fn pool_accounts(swap: &DirectSwapData) -> [AccountMeta; 7] {
    [
        AccountMeta::new_readonly(swap.program_id, false),
        AccountMeta::new_readonly(swap.account, false),
        AccountMeta::new_readonly(swap.authority, false),
        AccountMeta::new(swap.source, false),
        AccountMeta::new(swap.destination, false),
        AccountMeta::new(swap.pool_token_mint, false),
        AccountMeta::new(swap.pool_fee_account, false),
    ]
}

/// Creates the user's transit token account, paid by the fee payer.
#[must_use]
pub fn create_transit_token_account_instruction(
    fee_payer: &Pubkey,
    user_authority: &Pubkey,
    transit_token_account: &Pubkey,
    transit_token_mint: &Pubkey,
    network: Network,
) -> Instruction {
    Instruction::new_with_bytes(
        relay_program_id(network),
        &relay_data(RelayInstruction::CreateTransitToken, &[]),
        vec![
            AccountMeta::new(*transit_token_account, false),
            AccountMeta::new_readonly(*transit_token_mint, false),
            AccountMeta::new_readonly(*user_authority, true),
            AccountMeta::new(*fee_payer, true),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(RENT_SYSVAR_ID, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
    )
}

/// Relay-signed swap through a single pool.
#[must_use]
pub fn relay_swap_direct_instruction(
    swap: &DirectSwapData,
    user_source: &Pubkey,
    user_destination: &Pubkey,
    fee_payer: &Pubkey,
    network: Network,
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new(*fee_payer, true),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(swap.transfer_authority, true),
        AccountMeta::new(*user_source, false),
        AccountMeta::new(*user_destination, false),
    ];
    accounts.extend(pool_accounts(swap));
    Instruction::new_with_bytes(
        relay_program_id(network),
        &relay_data(
            RelayInstruction::SplSwapDirect,
            &[swap.amount_in, swap.minimum_amount_out],
        ),
        accounts,
    )
}

/// Relay-signed swap through two pools, routed via the transit token account.
#[must_use]
pub fn relay_swap_transitive_instruction(
    swap: &TransitiveSwapData,
    user_source: &Pubkey,
    transit_token_account: &Pubkey,
    user_destination: &Pubkey,
    fee_payer: &Pubkey,
    network: Network,
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new(*fee_payer, true),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(swap.from.transfer_authority, true),
        AccountMeta::new(*user_source, false),
        AccountMeta::new(*transit_token_account, false),
        AccountMeta::new(*user_destination, false),
        AccountMeta::new_readonly(swap.transit_token_mint, false),
    ];
    accounts.extend(pool_accounts(&swap.from));
    accounts.extend(pool_accounts(&swap.to));
    Instruction::new_with_bytes(
        relay_program_id(network),
        &relay_data(
            RelayInstruction::SplSwapTransitive,
            &[
                swap.from.amount_in,
                swap.from.minimum_amount_out,
                swap.to.minimum_amount_out,
            ],
        ),
        accounts,
    )
}

/// Top-up swap through a single pool into the user's relay account.
#[must_use]
pub fn top_up_swap_direct_instruction(
    swap: &DirectSwapData,
    user_authority: &Pubkey,
    user_source: &Pubkey,
    fee_payer: &Pubkey,
    network: Network,
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new(*fee_payer, true),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(*user_authority, true),
        AccountMeta::new(user_relay_address(user_authority, network), false),
        AccountMeta::new_readonly(swap.transfer_authority, true),
        AccountMeta::new(*user_source, false),
        AccountMeta::new(user_temporary_wsol_address(user_authority, network), false),
    ];
    accounts.extend(pool_accounts(swap));
    accounts.push(AccountMeta::new_readonly(spl_token::native_mint::ID, false));
    accounts.push(AccountMeta::new_readonly(RENT_SYSVAR_ID, false));
    accounts.push(AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false));
    Instruction::new_with_bytes(
        relay_program_id(network),
        &relay_data(
            RelayInstruction::TopUpWithSplSwapDirect,
            &[swap.amount_in, swap.minimum_amount_out],
        ),
        accounts,
    )
}

/// Top-up swap through two pools into the user's relay account.
#[must_use]
pub fn top_up_swap_transitive_instruction(
    swap: &TransitiveSwapData,
    user_authority: &Pubkey,
    user_source: &Pubkey,
    transit_token_account: &Pubkey,
    fee_payer: &Pubkey,
    network: Network,
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new(*fee_payer, true),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(*user_authority, true),
        AccountMeta::new(user_relay_address(user_authority, network), false),
        AccountMeta::new_readonly(swap.from.transfer_authority, true),
        AccountMeta::new(*user_source, false),
        AccountMeta::new(*transit_token_account, false),
        AccountMeta::new(user_temporary_wsol_address(user_authority, network), false),
        AccountMeta::new_readonly(swap.transit_token_mint, false),
    ];
    accounts.extend(pool_accounts(&swap.from));
    accounts.extend(pool_accounts(&swap.to));
    accounts.push(AccountMeta::new_readonly(spl_token::native_mint::ID, false));
    accounts.push(AccountMeta::new_readonly(RENT_SYSVAR_ID, false));
    accounts.push(AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false));
    Instruction::new_with_bytes(
        relay_program_id(network),
        &relay_data(
            RelayInstruction::TopUpWithSplSwapTransitive,
            &[
                swap.from.amount_in,
                swap.from.minimum_amount_out,
                swap.to.minimum_amount_out,
            ],
        ),
        accounts,
    )
}

/// Moves `lamports` from the user's relay account to `recipient`.
#[must_use]
pub fn transfer_sol_instruction(
    user_authority: &Pubkey,
    recipient: &Pubkey,
    lamports: u64,
    network: Network,
) -> Instruction {
    Instruction::new_with_bytes(
        relay_program_id(network),
        &relay_data(RelayInstruction::TransferSol, &[lamports]),
        vec![
            AccountMeta::new_readonly(*user_authority, true),
            AccountMeta::new(user_relay_address(user_authority, network), false),
            AccountMeta::new(*recipient, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
        ],
    )
}

/// System program `CreateAccount`.
#[must_use]
pub fn create_account_instruction(
    from: &Pubkey,
    new_account: &Pubkey,
    lamports: u64,
    space: u64,
    owner: &Pubkey,
) -> Instruction {
    let mut data = Vec::with_capacity(52);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data.extend_from_slice(&space.to_le_bytes());
    data.extend_from_slice(owner.as_ref());
    Instruction::new_with_bytes(
        SYSTEM_PROGRAM_ID,
        &data,
        vec![
            AccountMeta::new(*from, true),
            AccountMeta::new(*new_account, true),
        ],
    )
}

/// System program `Transfer`.
#[must_use]
pub fn transfer_instruction(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    Instruction::new_with_bytes(
        SYSTEM_PROGRAM_ID,
        &data,
        vec![AccountMeta::new(*from, true), AccountMeta::new(*to, false)],
    )
}

/// Associated token account program `CreateIdempotent`.
#[must_use]
pub fn create_associated_token_account_idempotent_instruction(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction::new_with_bytes(
        ATA_PROGRAM_PUBKEY,
        &[1],
        vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(associated_token_address(owner, mint), false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(spl_token::ID, false),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    fn direct(amount_in: u64, minimum_amount_out: u64) -> DirectSwapData {
        DirectSwapData {
            program_id: key(10),
            account: key(11),
            authority: key(12),
            transfer_authority: key(13),
            source: key(14),
            destination: key(15),
            pool_token_mint: key(16),
            pool_fee_account: key(17),
            amount_in,
            minimum_amount_out,
        }
    }

    #[test]
    fn test_token_account_len_matches_spl_token() {
        use spl_token::solana_program::program_pack::Pack;
        assert_eq!(TOKEN_ACCOUNT_LEN, spl_token::state::Account::LEN);
    }

    #[test]
    fn test_relay_program_per_network() {
        assert_ne!(
            relay_program_id(Network::MainnetBeta),
            relay_program_id(Network::Devnet)
        );
        assert_eq!(
            relay_program_id(Network::Devnet),
            relay_program_id(Network::Testnet)
        );
    }

    #[test]
    fn test_pdas_are_distinct_and_deterministic() {
        let user = key(1);
        let relay = user_relay_address(&user, Network::MainnetBeta);
        let wsol = user_temporary_wsol_address(&user, Network::MainnetBeta);
        let transit = transit_token_account_address(&user, &key(2), Network::MainnetBeta);
        assert_ne!(relay, wsol);
        assert_ne!(relay, transit);
        assert_eq!(relay, user_relay_address(&user, Network::MainnetBeta));
    }

    #[test]
    fn test_relay_swap_direct_layout() {
        let swap = direct(1_000, 990);
        let ix = relay_swap_direct_instruction(&swap, &key(20), &key(21), &key(22), Network::Devnet);
        assert_eq!(ix.program_id, relay_program_id(Network::Devnet));
        assert_eq!(ix.data[0], RelayInstruction::SplSwapDirect as u8);
        assert_eq!(ix.data.len(), 17);
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 1_000);
        assert_eq!(u64::from_le_bytes(ix.data[9..17].try_into().unwrap()), 990);
        assert_eq!(ix.accounts.len(), 12);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].pubkey == key(22));
        assert!(ix.accounts[2].is_signer && ix.accounts[2].pubkey == key(13));
    }

    #[test]
    fn test_relay_swap_transitive_layout() {
        let swap = TransitiveSwapData {
            from: direct(1_000, 500),
            to: direct(500, 250),
            transit_token_mint: key(30),
            needs_create_transit_token_account: true,
        };
        let ix = relay_swap_transitive_instruction(
            &swap,
            &key(20),
            &key(31),
            &key(21),
            &key(22),
            Network::MainnetBeta,
        );
        assert_eq!(ix.data[0], RelayInstruction::SplSwapTransitive as u8);
        assert_eq!(ix.data.len(), 25);
        assert_eq!(u64::from_le_bytes(ix.data[9..17].try_into().unwrap()), 500);
        assert_eq!(u64::from_le_bytes(ix.data[17..25].try_into().unwrap()), 250);
        assert_eq!(ix.accounts.len(), 21);
        assert_eq!(ix.accounts[4].pubkey, key(31));
    }

    #[test]
    fn test_system_create_account_encoding() {
        let ix = create_account_instruction(&key(1), &key(2), 2_039_280, 165, &spl_token::ID);
        assert_eq!(ix.program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(ix.data.len(), 52);
        assert_eq!(&ix.data[..4], &[0, 0, 0, 0]);
        assert_eq!(u64::from_le_bytes(ix.data[4..12].try_into().unwrap()), 2_039_280);
        assert_eq!(u64::from_le_bytes(ix.data[12..20].try_into().unwrap()), 165);
        assert_eq!(&ix.data[20..], spl_token::ID.as_ref());
        assert!(ix.accounts.iter().all(|a| a.is_signer && a.is_writable));
    }

    #[test]
    fn test_system_transfer_encoding() {
        let ix = transfer_instruction(&key(1), &key(2), 42);
        assert_eq!(ix.data, [2, 0, 0, 0, 42, 0, 0, 0, 0, 0, 0, 0]);
        assert!(!ix.accounts[1].is_signer);
    }
}
