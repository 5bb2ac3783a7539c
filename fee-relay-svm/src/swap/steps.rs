//! Pipeline steps building a relay swap transaction.
//!
//! Each step reads what earlier steps recorded in [`BuildContext::env`] and
//! appends to it. They must run in this order:
//!
//! 1. [`check_source`]
//! 2. [`check_destination`]
//! 3. [`check_transit_token_account`]
//! 4. [`check_swap_data`]
//! 5. [`check_closing_accounts`]
//!
//! [`SwapPipeline`](super::SwapPipeline) runs them in that order by
//! construction.

use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signer::Signer;
use spl_token::native_mint;

use crate::chain::ChainStateClient;
use crate::error::FeeRelayerError;
use crate::program::{
    TOKEN_ACCOUNT_LEN, associated_token_address, create_account_instruction,
    create_associated_token_account_idempotent_instruction,
    create_transit_token_account_instruction, relay_swap_direct_instruction,
    relay_swap_transitive_instruction, transfer_instruction,
};
use crate::swap::{BuildContext, SwapData, TransitTokenAccountManager, build_swap_data};

fn token_error(e: impl std::fmt::Display) -> FeeRelayerError {
    FeeRelayerError::Instruction(e.to_string())
}

/// Creates a scratch WSOL account funded by the fee payer and owned by the
/// user. Returns its address.
fn push_wsol_account(ctx: &mut BuildContext, lamports: u64) -> Result<Pubkey, FeeRelayerError> {
    let account = Keypair::new();
    let address = account.pubkey();
    let user = ctx.config.user_account;
    ctx.env.instructions.push(create_account_instruction(
        &ctx.config.fee_payer,
        &address,
        lamports,
        TOKEN_ACCOUNT_LEN as u64,
        &spl_token::ID,
    ));
    ctx.env.instructions.push(
        spl_token::instruction::initialize_account(
            &spl_token::ID,
            &address,
            &native_mint::ID,
            &user,
        )
        .map_err(token_error)?,
    );
    ctx.env.signers.push(account);
    Ok(address)
}

/// Resolves the account the swap takes from.
///
/// A WSOL source is wrapped on the fly: the user sends the input amount to
/// the fee payer, which funds a scratch token account with it plus rent. The
/// rent is added to `additional_payback_fee`.
///
/// # Errors
///
/// Returns [`FeeRelayerError::Instruction`] if a token instruction cannot be
/// built, or [`FeeRelayerError::ArithmeticOverflow`].
pub fn check_source(ctx: &mut BuildContext) -> Result<(), FeeRelayerError> {
    let source = ctx.config.source_token;
    if source.mint != native_mint::ID {
        ctx.env.user_source = Some(source.address);
        return Ok(());
    }

    let input_amount = ctx.config.input_amount;
    let rent = ctx.config.minimum_token_account_balance;
    let funding = input_amount
        .checked_add(rent)
        .ok_or(FeeRelayerError::ArithmeticOverflow)?;
    ctx.env.instructions.push(transfer_instruction(
        &ctx.config.user_account,
        &ctx.config.fee_payer,
        input_amount,
    ));
    let address = push_wsol_account(ctx, funding)?;
    ctx.env.user_source = Some(address);
    ctx.env.source_wsol_account = Some(address);
    ctx.env.additional_payback_fee = ctx
        .env
        .additional_payback_fee
        .checked_add(rent)
        .ok_or(FeeRelayerError::ArithmeticOverflow)?;

    #[cfg(feature = "telemetry")]
    tracing::debug!(source = %address, input_amount, "Wrapping SOL source");

    Ok(())
}

/// Resolves the account the swap pays into.
///
/// A WSOL destination gets a scratch account that is unwrapped after the
/// swap. Otherwise the explicit destination is used, or the user's
/// associated token account, created when missing. Rent of created accounts
/// is added to `account_creation_fee`.
///
/// # Errors
///
/// Returns [`FeeRelayerError::Client`] if the account lookup fails,
/// [`FeeRelayerError::Instruction`] or [`FeeRelayerError::ArithmeticOverflow`].
pub async fn check_destination<C>(ctx: &mut BuildContext, chain: &C) -> Result<(), FeeRelayerError>
where
    C: ChainStateClient + ?Sized,
{
    let mint = ctx.config.destination_mint;
    let rent = ctx.config.minimum_token_account_balance;

    if mint == native_mint::ID {
        let address = push_wsol_account(ctx, rent)?;
        ctx.env.user_destination_token_account = Some(address);
        ctx.env.destination_wsol_account = Some(address);
        return ctx.add_account_creation_fee(rent);
    }

    if let Some(address) = ctx.config.destination_address {
        ctx.env.user_destination_token_account = Some(address);
        return Ok(());
    }

    let user = ctx.config.user_account;
    let address = associated_token_address(&user, &mint);
    ctx.env.user_destination_token_account = Some(address);
    if chain.get_token_account(&address).await?.is_none() {
        #[cfg(feature = "telemetry")]
        tracing::debug!(destination = %address, "Creating destination token account");

        ctx.env.destination_account_creation = Some(ctx.env.instructions.len());
        ctx.env
            .instructions
            .push(create_associated_token_account_idempotent_instruction(
                &ctx.config.fee_payer,
                &user,
                &mint,
            ));
        ctx.add_account_creation_fee(rent)?;
    }
    Ok(())
}

/// Records the transit token account of a two-hop route and whether it has
/// to be created.
///
/// # Errors
///
/// Propagates the manager's failure.
pub async fn check_transit_token_account<M>(
    ctx: &mut BuildContext,
    manager: &M,
) -> Result<(), FeeRelayerError>
where
    M: TransitTokenAccountManager + ?Sized,
{
    let transit = manager.get_transit_token(
        &ctx.config.user_account,
        ctx.config.pools.pools(),
        ctx.config.network,
    );
    let needs_create = manager
        .needs_create_transit_token_account(transit.as_ref())
        .await?;
    ctx.env.transit_token_account_address = transit.map(|t| t.address);
    ctx.env.transit_token_mint = transit.map(|t| t.mint);
    ctx.env.needs_create_transit_token_account = needs_create;
    Ok(())
}

/// Emits the swap: an approve when a fresh transfer authority is used, then
/// the relay swap, preceded by transit account creation for a two-hop route
/// that needs it.
///
/// # Errors
///
/// - [`FeeRelayerError::UnsupportedSwapShape`] if earlier steps did not run
///   or the route does not match the recorded transit state.
/// - Any error of [`build_swap_data`].
pub fn check_swap_data(ctx: &mut BuildContext) -> Result<(), FeeRelayerError> {
    let user = ctx.config.user_account;
    let fee_payer = ctx.config.fee_payer;
    let network = ctx.config.network;
    let user_source = ctx
        .env
        .user_source
        .ok_or(FeeRelayerError::UnsupportedSwapShape("source not checked"))?;
    let user_destination = ctx
        .env
        .user_destination_token_account
        .ok_or(FeeRelayerError::UnsupportedSwapShape("destination not checked"))?;

    let swap = build_swap_data(
        &user,
        ctx.config.pools.pools(),
        Some(ctx.config.input_amount),
        None,
        ctx.config.slippage,
        ctx.env.transit_token_mint,
        ctx.config.new_transfer_authority,
        ctx.env.needs_create_transit_token_account,
    )?;

    if let Some(authority) = swap.transfer_authority {
        ctx.env.instructions.push(
            spl_token::instruction::approve(
                &spl_token::ID,
                &user_source,
                &authority.pubkey(),
                &user,
                &[],
                swap.swap_data.amount_in(),
            )
            .map_err(token_error)?,
        );
        ctx.env.signers.push(authority);
    }

    match swap.swap_data {
        SwapData::Direct(direct) => {
            if ctx.env.transit_token_account_address.is_some() {
                return Err(FeeRelayerError::UnsupportedSwapShape(
                    "direct swap with a transit token account",
                ));
            }
            ctx.env.instructions.push(relay_swap_direct_instruction(
                &direct,
                &user_source,
                &user_destination,
                &fee_payer,
                network,
            ));
        }
        SwapData::Transitive(transitive) => {
            let transit_account = ctx.env.transit_token_account_address.ok_or(
                FeeRelayerError::UnsupportedSwapShape("transitive swap without transit account"),
            )?;
            if transitive.needs_create_transit_token_account {
                ctx.env
                    .instructions
                    .push(create_transit_token_account_instruction(
                        &fee_payer,
                        &user,
                        &transit_account,
                        &transitive.transit_token_mint,
                        network,
                    ));
                ctx.add_account_creation_fee(ctx.config.minimum_token_account_balance)?;
            }
            ctx.env.instructions.push(relay_swap_transitive_instruction(
                &transitive,
                &user_source,
                &transit_account,
                &user_destination,
                &fee_payer,
                network,
            ));
        }
    }

    #[cfg(feature = "telemetry")]
    tracing::debug!(
        amount_in = swap.swap_data.amount_in(),
        minimum_amount_out = swap.swap_data.minimum_amount_out(),
        instructions = ctx.env.instructions.len(),
        "Relay swap emitted"
    );

    Ok(())
}

/// Closes the scratch WSOL accounts into the user's wallet.
///
/// The destination account's rent, fronted by the fee payer, is paid back
/// in the same transaction and removed from `account_creation_fee`.
///
/// # Errors
///
/// Returns [`FeeRelayerError::Instruction`] if a token instruction cannot be
/// built.
pub fn check_closing_accounts(ctx: &mut BuildContext) -> Result<(), FeeRelayerError> {
    let user = ctx.config.user_account;
    if let Some(source) = ctx.env.source_wsol_account {
        ctx.env.instructions.push(
            spl_token::instruction::close_account(&spl_token::ID, &source, &user, &user, &[])
                .map_err(token_error)?,
        );
    }
    if let Some(destination) = ctx.env.destination_wsol_account {
        let rent = ctx.config.minimum_token_account_balance;
        ctx.env.instructions.push(
            spl_token::instruction::close_account(&spl_token::ID, &destination, &user, &user, &[])
                .map_err(token_error)?,
        );
        ctx.env
            .instructions
            .push(transfer_instruction(&user, &ctx.config.fee_payer, rent));
        ctx.env.account_creation_fee = ctx.env.account_creation_fee.saturating_sub(rent);
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use fee_relay::{Network, Slippage};
    use solana_message::Hash;

    use super::*;
    use crate::chain::tests::FakeChain;
    use crate::chain::{TokenAccount, TokenAccountInfo};
    use crate::pool::PoolsPair;
    use crate::pool::tests::{key, pool};
    use crate::program::{RelayInstruction, SYSTEM_PROGRAM_ID, relay_program_id};
    use crate::swap::{BuildConfig, ChainTransitTokenAccountManager};

    const RENT: u64 = 2_039_280;

    pub(crate) fn config(
        pools: PoolsPair,
        source_mint: Pubkey,
        destination_mint: Pubkey,
    ) -> BuildConfig {
        BuildConfig {
            network: Network::MainnetBeta,
            user_account: key(9),
            fee_payer: key(77),
            pools,
            input_amount: 100_000,
            slippage: Slippage::from_bps(100).unwrap(),
            source_token: TokenAccount::new(key(90), source_mint),
            destination_mint,
            destination_address: None,
            recent_blockhash: Hash::default(),
            minimum_token_account_balance: RENT,
            lamports_per_signature: 5_000,
            new_transfer_authority: true,
        }
    }

    fn direct_pools() -> PoolsPair {
        PoolsPair::direct(pool(1, 2, 10_000_000, 10_000_000))
    }

    fn relay_index(ctx: &BuildContext, i: usize) -> Option<u8> {
        let ix = &ctx.env.instructions[i];
        (ix.program_id == relay_program_id(Network::MainnetBeta)).then(|| ix.data[0])
    }

    #[test]
    fn test_token_source_used_as_is() {
        let mut ctx = BuildContext::new(config(direct_pools(), key(1), key(2)));
        check_source(&mut ctx).unwrap();
        assert_eq!(ctx.env.user_source, Some(key(90)));
        assert!(ctx.env.instructions.is_empty());
    }

    #[test]
    fn test_wsol_source_is_wrapped() {
        let mut ctx = BuildContext::new(config(direct_pools(), native_mint::ID, key(2)));
        check_source(&mut ctx).unwrap();
        let ixs = &ctx.env.instructions;
        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[0].program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(ixs[0].accounts[0].pubkey, key(9));
        assert_eq!(ixs[1].program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(u64::from_le_bytes(ixs[1].data[4..12].try_into().unwrap()), 100_000 + RENT);
        assert_eq!(ixs[2].program_id, spl_token::ID);
        let scratch = ctx.env.signers[0].pubkey();
        assert_eq!(ctx.env.user_source, Some(scratch));
        assert_eq!(ctx.env.source_wsol_account, Some(scratch));
        assert_eq!(ctx.env.additional_payback_fee, RENT);
    }

    #[tokio::test]
    async fn test_missing_destination_is_created() {
        let chain = FakeChain::default();
        let mut ctx = BuildContext::new(config(direct_pools(), key(1), key(2)));
        check_source(&mut ctx).unwrap();
        check_destination(&mut ctx, &chain).await.unwrap();
        assert_eq!(
            ctx.env.user_destination_token_account,
            Some(associated_token_address(&key(9), &key(2)))
        );
        assert_eq!(ctx.env.destination_account_creation, Some(0));
        assert_eq!(ctx.env.account_creation_fee, RENT);
    }

    #[tokio::test]
    async fn test_existing_or_explicit_destination_not_created() {
        let mut chain = FakeChain::default();
        let ata = associated_token_address(&key(9), &key(2));
        chain.token_accounts.insert(
            ata,
            TokenAccountInfo { mint: key(2), owner: key(9), amount: 0 },
        );
        let mut ctx = BuildContext::new(config(direct_pools(), key(1), key(2)));
        check_destination(&mut ctx, &chain).await.unwrap();
        assert_eq!(ctx.env.user_destination_token_account, Some(ata));
        assert!(ctx.env.instructions.is_empty());

        let mut cfg = config(direct_pools(), key(1), key(2));
        cfg.destination_address = Some(key(91));
        let mut ctx = BuildContext::new(cfg);
        check_destination(&mut ctx, &FakeChain::default()).await.unwrap();
        assert_eq!(ctx.env.user_destination_token_account, Some(key(91)));
        assert_eq!(ctx.env.account_creation_fee, 0);
    }

    #[tokio::test]
    async fn test_direct_swap_instruction_order() {
        let chain = FakeChain::default();
        let manager = ChainTransitTokenAccountManager::new(&chain);
        let mut cfg = config(direct_pools(), key(1), key(2));
        cfg.destination_address = Some(key(91));
        let mut ctx = BuildContext::new(cfg);
        check_source(&mut ctx).unwrap();
        check_destination(&mut ctx, &chain).await.unwrap();
        check_transit_token_account(&mut ctx, &manager).await.unwrap();
        assert!(ctx.env.transit_token_account_address.is_none());
        check_swap_data(&mut ctx).unwrap();
        check_closing_accounts(&mut ctx).unwrap();

        let ixs = &ctx.env.instructions;
        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0].program_id, spl_token::ID);
        assert_eq!(relay_index(&ctx, 1), Some(RelayInstruction::SplSwapDirect as u8));
        assert_eq!(ctx.env.signers.len(), 1);
        assert_eq!(ixs[1].accounts[2].pubkey, ctx.env.signers[0].pubkey());
    }

    #[tokio::test]
    async fn test_user_authority_skips_approve() {
        let chain = FakeChain::default();
        let manager = ChainTransitTokenAccountManager::new(&chain);
        let mut cfg = config(direct_pools(), key(1), key(2));
        cfg.destination_address = Some(key(91));
        cfg.new_transfer_authority = false;
        let mut ctx = BuildContext::new(cfg);
        check_source(&mut ctx).unwrap();
        check_destination(&mut ctx, &chain).await.unwrap();
        check_transit_token_account(&mut ctx, &manager).await.unwrap();
        check_swap_data(&mut ctx).unwrap();
        assert_eq!(ctx.env.instructions.len(), 1);
        assert!(ctx.env.signers.is_empty());
        assert_eq!(ctx.env.instructions[0].accounts[2].pubkey, key(9));
    }

    #[tokio::test]
    async fn test_transitive_swap_creates_transit_account() {
        let chain = FakeChain::default();
        let manager = ChainTransitTokenAccountManager::new(&chain);
        let pools = PoolsPair::new(vec![
            pool(1, 2, 10_000_000, 20_000_000),
            pool(2, 3, 20_000_000, 10_000_000),
        ])
        .unwrap();
        let mut cfg = config(pools, key(1), key(3));
        cfg.destination_address = Some(key(91));
        let mut ctx = BuildContext::new(cfg);
        check_source(&mut ctx).unwrap();
        check_destination(&mut ctx, &chain).await.unwrap();
        check_transit_token_account(&mut ctx, &manager).await.unwrap();
        assert!(ctx.env.needs_create_transit_token_account);
        assert_eq!(ctx.env.transit_token_mint, Some(key(2)));
        check_swap_data(&mut ctx).unwrap();

        assert_eq!(ctx.env.instructions.len(), 3);
        assert_eq!(ctx.env.instructions[0].program_id, spl_token::ID);
        assert_eq!(relay_index(&ctx, 1), Some(RelayInstruction::CreateTransitToken as u8));
        assert_eq!(relay_index(&ctx, 2), Some(RelayInstruction::SplSwapTransitive as u8));
        assert_eq!(ctx.env.account_creation_fee, RENT);
    }

    #[test]
    fn test_swap_before_destination_is_a_defect() {
        let mut ctx = BuildContext::new(config(direct_pools(), key(1), key(2)));
        check_source(&mut ctx).unwrap();
        assert!(matches!(
            check_swap_data(&mut ctx),
            Err(FeeRelayerError::UnsupportedSwapShape(_))
        ));
    }

    #[tokio::test]
    async fn test_wsol_destination_is_unwrapped() {
        let chain = FakeChain::default();
        let manager = ChainTransitTokenAccountManager::new(&chain);
        let mut ctx = BuildContext::new(config(direct_pools(), key(1), native_mint::ID));
        check_source(&mut ctx).unwrap();
        check_destination(&mut ctx, &chain).await.unwrap();
        assert_eq!(ctx.env.account_creation_fee, RENT);
        check_transit_token_account(&mut ctx, &manager).await.unwrap();
        check_swap_data(&mut ctx).unwrap();
        check_closing_accounts(&mut ctx).unwrap();

        // create, initialize, approve, swap, close, repay rent
        let ixs = &ctx.env.instructions;
        assert_eq!(ixs.len(), 6);
        assert_eq!(relay_index(&ctx, 3), Some(RelayInstruction::SplSwapDirect as u8));
        assert_eq!(ixs[4].program_id, spl_token::ID);
        assert_eq!(ixs[5].program_id, SYSTEM_PROGRAM_ID);
        assert_eq!(ctx.env.account_creation_fee, 0);
    }
}
