//! Relay fee calculator.
//!
//! Answers three questions for a relayed operation:
//!
//! - how many lamports the user's relay account must be topped up with
//!   ([`FeeCalculator::calculate_needed_top_up_amount`]),
//! - what the top-up itself is expected to cost
//!   ([`FeeCalculator::calculate_expected_fee_for_top_up`]),
//! - how much of the paying token buys a given SOL fee
//!   ([`FeeCalculator::calculate_fee_in_paying_token`]).
//!
//! All lamport arithmetic is checked and overflow is reported as
//! [`FeeRelayerError::ArithmeticOverflow`].

use fee_relay::FeeAmount;
use solana_pubkey::Pubkey;

use crate::config::CompensationConfig;
use crate::context::{CompensationContext, RelayAccountStatus};
use crate::error::FeeRelayerError;
use crate::pool::{PoolsPair, SwapRouteService};

fn add(a: u64, b: u64) -> Result<u64, FeeRelayerError> {
    a.checked_add(b).ok_or(FeeRelayerError::ArithmeticOverflow)
}

/// Computes relay top-ups and converts fees into the paying token.
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    config: CompensationConfig,
}

impl FeeCalculator {
    /// Creates a calculator with `config`.
    #[must_use]
    pub const fn new(config: CompensationConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &CompensationConfig {
        &self.config
    }

    fn top_up_network_fee(&self, context: &CompensationContext) -> Result<u64, FeeRelayerError> {
        self.config
            .top_up_signatures
            .checked_mul(context.lamports_per_signature())
            .ok_or(FeeRelayerError::ArithmeticOverflow)
    }

    /// Lamports the user's relay account must receive before `expected_fee`
    /// can be relayed.
    ///
    /// Network fees covered by the free-usage quota are dropped first. If
    /// nothing is left the result is returned as is. Otherwise the relay
    /// account is brought up to its rent-exempt minimum, or its surplus
    /// above that minimum is spent on the transaction fee and then on
    /// `account_balances`. When there is no surplus, a payer paying in WSOL
    /// gets the amount computed before the relay account was looked at. Any
    /// other non-zero result is raised to the minimum top-up.
    ///
    /// # Errors
    ///
    /// Returns [`FeeRelayerError::ArithmeticOverflow`] if a sum overflows.
    pub fn calculate_needed_top_up_amount(
        &self,
        context: &CompensationContext,
        expected_fee: &FeeAmount,
        paying_token_mint: &Pubkey,
    ) -> Result<FeeAmount, FeeRelayerError> {
        let usage = context.usage_status();
        let expected_top_up_fee = self.top_up_network_fee(context)?;
        let expected_transaction_fee = expected_fee.transaction;

        let top_up_fee = if usage.is_free_transaction_fee_available(expected_top_up_fee, false) {
            0
        } else {
            expected_top_up_fee
        };
        let transaction_fee = if usage.is_free_transaction_fee_available(
            add(expected_top_up_fee, expected_transaction_fee)?,
            true,
        ) {
            0
        } else {
            expected_transaction_fee
        };

        let mut needed = FeeAmount {
            transaction: add(top_up_fee, transaction_fee)?,
            ..expected_fee.clone()
        };
        if needed.total()? == 0 {
            #[cfg(feature = "telemetry")]
            tracing::debug!("Relay fee fully covered by free usage");
            return Ok(needed);
        }

        let without_relay_account = needed.clone();
        let minimum_relay_balance = context.minimum_relay_account_balance();
        let surplus_applied = match context.relay_account_status() {
            RelayAccountStatus::NotYetCreated => {
                needed.transaction = add(needed.transaction, minimum_relay_balance)?;
                false
            }
            RelayAccountStatus::Created { balance } if balance <= minimum_relay_balance => {
                needed.transaction = add(needed.transaction, minimum_relay_balance - balance)?;
                false
            }
            RelayAccountStatus::Created { balance } => {
                let surplus = balance - minimum_relay_balance;
                let covered = surplus.min(needed.transaction);
                needed.transaction -= covered;
                needed.account_balances = needed.account_balances.saturating_sub(surplus - covered);
                true
            }
        };

        let total = needed.total()?;
        if !surplus_applied && total > 0 && *paying_token_mint == spl_token::native_mint::ID {
            #[cfg(feature = "telemetry")]
            tracing::debug!(
                transaction = without_relay_account.transaction,
                account_balances = without_relay_account.account_balances,
                "Paying in WSOL, relay account balance not applied"
            );
            return Ok(without_relay_account);
        }

        let minimum = self.config.minimum_top_up_lamports;
        if total > 0 && total < minimum {
            needed.transaction = add(needed.transaction, minimum - total)?;
        }

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            transaction = needed.transaction,
            account_balances = needed.account_balances,
            relay_account = ?context.relay_account_status(),
            "Needed top-up amount computed"
        );

        Ok(needed)
    }

    /// Lamports a top-up transaction is expected to cost: relay account
    /// creation when it does not exist yet, the top-up's network fee unless
    /// it is free, and the temporary WSOL account's rent.
    ///
    /// # Errors
    ///
    /// Returns [`FeeRelayerError::ArithmeticOverflow`] if the sum does not
    /// fit in `u64`.
    pub fn calculate_expected_fee_for_top_up(
        &self,
        context: &CompensationContext,
    ) -> Result<u64, FeeRelayerError> {
        let mut expected: u128 = 0;
        if context.relay_account_status() == RelayAccountStatus::NotYetCreated {
            expected += u128::from(context.minimum_relay_account_balance());
        }
        let network_fee = self.top_up_network_fee(context)?;
        if !context
            .usage_status()
            .is_free_transaction_fee_available(network_fee, false)
        {
            expected += u128::from(network_fee);
        }
        expected += u128::from(context.minimum_token_account_balance());
        u64::try_from(expected).map_err(|_| FeeRelayerError::ArithmeticOverflow)
    }

    /// Converts `fee_in_sol` into an amount of `paying_token_mint`.
    ///
    /// Paying in WSOL needs no conversion and `fee_in_sol` is handed back.
    /// Otherwise the cheapest route for the total fee is used to price each
    /// bucket separately with the top-up slippage. A bucket the route cannot
    /// price is reported as zero.
    ///
    /// # Errors
    ///
    /// - [`FeeRelayerError::Route`] if the route service fails.
    /// - [`FeeRelayerError::SwapPoolsNotFound`] if no route exists.
    /// - [`FeeRelayerError::ArithmeticOverflow`] if the total fee overflows.
    pub async fn calculate_fee_in_paying_token<S>(
        &self,
        route_service: &S,
        fee_in_sol: FeeAmount,
        paying_token_mint: &Pubkey,
    ) -> Result<FeeAmount, FeeRelayerError>
    where
        S: SwapRouteService + ?Sized,
    {
        let wsol = spl_token::native_mint::ID;
        if *paying_token_mint == wsol {
            return Ok(fee_in_sol);
        }

        let pairs: Vec<PoolsPair> = route_service
            .get_tradable_pools_pairs(paying_token_mint, &wsol)
            .await?
            .iter()
            .filter_map(|pair| pair.oriented_from(paying_token_mint))
            .collect();
        let pair = route_service
            .find_best_pools_pair_for_estimated_amount(fee_in_sol.total()?, &pairs)
            .ok_or(FeeRelayerError::SwapPoolsNotFound)?;

        let slippage = self.config.top_up_slippage;
        let transaction = pair
            .input_amount_for_minimum_out(fee_in_sol.transaction, slippage)
            .unwrap_or(0);
        let account_balances = pair
            .input_amount_for_minimum_out(fee_in_sol.account_balances, slippage)
            .unwrap_or(0);

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            paying_token_mint = %paying_token_mint,
            hops = pair.len(),
            transaction,
            account_balances,
            "Fee converted to paying token"
        );

        Ok(FeeAmount {
            transaction,
            account_balances,
            others: fee_in_sol.others,
        })
    }
}
