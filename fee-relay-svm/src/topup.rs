//! Relay account top-up transaction.
//!
//! A top-up swaps the user's paying token into SOL that lands in the user's
//! relay account, then pays the relay its fee for the top-up itself out of
//! that account.

use fee_relay::{FeeAmount, Network};
use solana_message::Hash;
use solana_pubkey::Pubkey;
use solana_signer::Signer;

use crate::calculator::FeeCalculator;
use crate::chain::TokenAccount;
use crate::context::{CompensationContext, RelayAccountStatus};
use crate::error::FeeRelayerError;
use crate::pool::PoolsPair;
use crate::program::{
    create_transit_token_account_instruction, top_up_swap_direct_instruction,
    top_up_swap_transitive_instruction, transfer_instruction, transfer_sol_instruction,
    user_relay_address,
};
use crate::swap::{SwapData, TransitTokenAccountManager, build_swap_data};
use crate::transaction::{PreparedTransaction, compile_transaction};

/// What to top up and how to pay for it.
#[derive(Debug, Clone)]
pub struct TopUpRequest {
    /// Cluster the transaction is built for.
    pub network: Network,
    /// The user's wallet.
    pub user_account: Pubkey,
    /// The user's paying token account.
    pub source_token: TokenAccount,
    /// Route from the paying token to WSOL.
    pub pools: PoolsPair,
    /// Lamports the relay account must gain, as computed by
    /// [`FeeCalculator::calculate_needed_top_up_amount`].
    pub top_up_amount: u64,
    /// Blockhash the transaction is compiled against.
    pub recent_blockhash: Hash,
}

/// Builds the top-up transaction for `request`.
///
/// The swap must deliver `top_up_amount` plus the top-up's own expected fee,
/// which is then transferred from the relay account to the fee payer. A
/// relay account that does not exist yet is first funded by the fee payer.
/// The swap always uses a fresh transfer authority, returned as the
/// transaction's only extra signer.
///
/// # Errors
///
/// - [`FeeRelayerError::SwapPoolsNotFound`] if the route does not trade the
///   source token.
/// - [`FeeRelayerError::ArithmeticOverflow`] if the amounts overflow.
/// - Any error of [`build_swap_data`] or of the transit token manager.
/// - [`FeeRelayerError::Instruction`] or
///   [`FeeRelayerError::TransactionCompile`] if the transaction cannot be
///   built.
pub async fn prepare_top_up<M>(
    calculator: &FeeCalculator,
    context: &CompensationContext,
    transit_manager: &M,
    request: &TopUpRequest,
) -> Result<PreparedTransaction, FeeRelayerError>
where
    M: TransitTokenAccountManager + ?Sized,
{
    let user = request.user_account;
    let fee_payer = *context.fee_payer_address();
    let network = request.network;
    let route = request
        .pools
        .oriented_from(&request.source_token.mint)
        .ok_or(FeeRelayerError::SwapPoolsNotFound)?;
    let pools = route.pools();

    let transit = transit_manager.get_transit_token(&user, pools, network);
    let needs_create_transit = transit_manager
        .needs_create_transit_token_account(transit.as_ref())
        .await?;

    let expected_fee = calculator.calculate_expected_fee_for_top_up(context)?;
    let target_amount = request
        .top_up_amount
        .checked_add(expected_fee)
        .ok_or(FeeRelayerError::ArithmeticOverflow)?;

    let swap = build_swap_data(
        &user,
        pools,
        None,
        Some(target_amount),
        calculator.config().top_up_slippage,
        transit.map(|t| t.mint),
        true,
        needs_create_transit,
    )?;
    let authority = swap
        .transfer_authority
        .ok_or(FeeRelayerError::UnsupportedSwapShape("top-up without transfer authority"))?;

    let mut instructions = Vec::with_capacity(5);
    let mut account_balances = context.minimum_token_account_balance();
    if context.relay_account_status() == RelayAccountStatus::NotYetCreated {
        let minimum = context.minimum_relay_account_balance();
        instructions.push(transfer_instruction(
            &fee_payer,
            &user_relay_address(&user, network),
            minimum,
        ));
        account_balances = account_balances
            .checked_add(minimum)
            .ok_or(FeeRelayerError::ArithmeticOverflow)?;
    }

    instructions.push(
        spl_token::instruction::approve(
            &spl_token::ID,
            &request.source_token.address,
            &authority.pubkey(),
            &user,
            &[],
            swap.swap_data.amount_in(),
        )
        .map_err(|e| FeeRelayerError::Instruction(e.to_string()))?,
    );

    match (&swap.swap_data, transit) {
        (SwapData::Direct(direct), None) => {
            instructions.push(top_up_swap_direct_instruction(
                direct,
                &user,
                &request.source_token.address,
                &fee_payer,
                network,
            ));
        }
        (SwapData::Transitive(transitive), Some(transit)) => {
            if transitive.needs_create_transit_token_account {
                instructions.push(create_transit_token_account_instruction(
                    &fee_payer,
                    &user,
                    &transit.address,
                    &transit.mint,
                    network,
                ));
            }
            instructions.push(top_up_swap_transitive_instruction(
                transitive,
                &user,
                &request.source_token.address,
                &transit.address,
                &fee_payer,
                network,
            ));
        }
        _ => {
            return Err(FeeRelayerError::UnsupportedSwapShape(
                "route does not match transit token",
            ));
        }
    }

    instructions.push(transfer_sol_instruction(&user, &fee_payer, expected_fee, network));

    #[cfg(feature = "telemetry")]
    tracing::debug!(
        user = %user,
        top_up_amount = request.top_up_amount,
        expected_fee,
        amount_in = swap.swap_data.amount_in(),
        "Top-up transaction prepared"
    );

    let transaction = compile_transaction(&fee_payer, &instructions, request.recent_blockhash)?;
    let fee = FeeAmount::new(expected_fee.saturating_sub(account_balances), account_balances);
    Ok(transaction
        .with_signers(vec![authority])
        .with_expected_fee(fee))
}
