use fee_relay::Slippage;
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signer::Signer;

use crate::error::FeeRelayerError;
use crate::pool::Pool;
use crate::swap::{SwapData, SwapDataWithAuthority, TransitiveSwapData};

fn positive(amount: Option<u64>) -> Result<u64, FeeRelayerError> {
    amount.filter(|a| *a > 0).ok_or(FeeRelayerError::InvalidAmount)
}

/// Resolves swap amounts along `pools`.
///
/// Exactly one of `input_amount` and `minimum_amount_out` drives the
/// computation; `input_amount` wins when both are given. With two pools the
/// first hop's minimum output is the second hop's input, in both
/// directions.
///
/// When `new_transfer_authority` is set, a fresh keypair is generated and
/// named as transfer authority so the relay can sign the swap; otherwise the
/// user is the authority.
///
/// # Errors
///
/// - [`FeeRelayerError::SwapPoolsNotFound`] unless `pools` holds 1 or 2 pools.
/// - [`FeeRelayerError::TransitTokenMintNotFound`] for two pools without a
///   transit mint.
/// - [`FeeRelayerError::InvalidAmount`] when no amount is given, or any
///   amount along the route does not resolve to a positive value.
pub fn build_swap_data(
    user: &Pubkey,
    pools: &[Pool],
    input_amount: Option<u64>,
    minimum_amount_out: Option<u64>,
    slippage: Slippage,
    transit_token_mint: Option<Pubkey>,
    new_transfer_authority: bool,
    needs_create_transit_token_account: bool,
) -> Result<SwapDataWithAuthority, FeeRelayerError> {
    if pools.is_empty() || pools.len() > 2 {
        return Err(FeeRelayerError::SwapPoolsNotFound);
    }
    if input_amount.is_none() && minimum_amount_out.is_none() {
        return Err(FeeRelayerError::InvalidAmount);
    }

    let keypair = new_transfer_authority.then(Keypair::new);
    let authority = keypair.as_ref().map_or(*user, Signer::pubkey);

    let swap_data = match pools {
        [pool] => {
            let (amount_in, min_out) = match input_amount {
                Some(input) => (input, pool.minimum_amount_out(input, slippage)),
                None => {
                    let min_out = minimum_amount_out.unwrap_or_default();
                    (
                        pool.input_amount_for_minimum_out(min_out, slippage)
                            .unwrap_or_default(),
                        Some(min_out),
                    )
                }
            };
            SwapData::Direct(pool.swap_data(
                authority,
                positive(Some(amount_in))?,
                positive(min_out)?,
            ))
        }
        [first, second] => {
            let transit_token_mint =
                transit_token_mint.ok_or(FeeRelayerError::TransitTokenMintNotFound)?;
            let (first_in, transit_amount, second_min_out) = match input_amount {
                Some(input) => {
                    let transit = positive(first.minimum_amount_out(input, slippage))?;
                    let out = second.minimum_amount_out(transit, slippage);
                    (input, transit, out)
                }
                None => {
                    let min_out = minimum_amount_out.unwrap_or_default();
                    let transit =
                        positive(second.input_amount_for_minimum_out(min_out, slippage))?;
                    let input = first.input_amount_for_minimum_out(transit, slippage);
                    (positive(input)?, transit, Some(min_out))
                }
            };
            SwapData::Transitive(TransitiveSwapData {
                from: first.swap_data(authority, positive(Some(first_in))?, transit_amount),
                to: second.swap_data(authority, transit_amount, positive(second_min_out)?),
                transit_token_mint,
                needs_create_transit_token_account,
            })
        }
        _ => return Err(FeeRelayerError::SwapPoolsNotFound),
    };

    #[cfg(feature = "telemetry")]
    tracing::debug!(
        amount_in = swap_data.amount_in(),
        minimum_amount_out = swap_data.minimum_amount_out(),
        hops = pools.len(),
        delegated = keypair.is_some(),
        "Swap data built"
    );

    Ok(SwapDataWithAuthority {
        swap_data,
        transfer_authority: keypair,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::tests::{key, pool};

    fn slippage() -> Slippage {
        Slippage::from_bps(100).unwrap()
    }

    #[test]
    fn test_one_pool_is_direct() {
        let p = pool(1, 2, 10_000_000, 10_000_000);
        let result =
            build_swap_data(&key(9), &[p.clone()], Some(10_000), None, slippage(), None, false, false)
                .unwrap();
        let SwapData::Direct(swap) = result.swap_data else {
            panic!("expected direct swap");
        };
        assert_eq!(swap.amount_in, 10_000);
        assert_eq!(swap.minimum_amount_out, p.minimum_amount_out(10_000, slippage()).unwrap());
        assert_eq!(swap.transfer_authority, key(9));
        assert!(result.transfer_authority.is_none());
    }

    #[test]
    fn test_direct_from_minimum_out() {
        let p = pool(1, 2, 10_000_000, 10_000_000);
        let result =
            build_swap_data(&key(9), &[p.clone()], None, Some(5_000), slippage(), None, true, false)
                .unwrap();
        assert_eq!(result.swap_data.minimum_amount_out(), 5_000);
        assert_eq!(
            result.swap_data.amount_in(),
            p.input_amount_for_minimum_out(5_000, slippage()).unwrap()
        );
        let authority = result.transfer_authority.as_ref().unwrap();
        assert_eq!(result.swap_data.transfer_authority(), authority.pubkey());
        assert_ne!(result.swap_data.transfer_authority(), key(9));
    }

    #[test]
    fn test_two_pools_with_transit_is_transitive() {
        let pools = [pool(1, 2, 10_000_000, 20_000_000), pool(2, 3, 20_000_000, 5_000_000)];
        let result = build_swap_data(
            &key(9),
            &pools,
            Some(100_000),
            None,
            slippage(),
            Some(key(2)),
            false,
            true,
        )
        .unwrap();
        let SwapData::Transitive(swap) = result.swap_data else {
            panic!("expected transitive swap");
        };
        assert_eq!(swap.from.minimum_amount_out, swap.to.amount_in);
        assert_eq!(swap.from.amount_in, 100_000);
        assert_eq!(swap.transit_token_mint, key(2));
        assert!(swap.needs_create_transit_token_account);
    }

    #[test]
    fn test_two_pools_backwards_keep_legs_consistent() {
        let pools = [pool(1, 2, 10_000_000, 20_000_000), pool(2, 3, 20_000_000, 5_000_000)];
        let result = build_swap_data(
            &key(9),
            &pools,
            None,
            Some(10_000),
            slippage(),
            Some(key(2)),
            false,
            false,
        )
        .unwrap();
        let SwapData::Transitive(swap) = result.swap_data else {
            panic!("expected transitive swap");
        };
        assert_eq!(swap.from.minimum_amount_out, swap.to.amount_in);
        assert_eq!(swap.to.minimum_amount_out, 10_000);
        assert_eq!(
            swap.to.amount_in,
            pools[1].input_amount_for_minimum_out(10_000, slippage()).unwrap()
        );
    }

    #[test]
    fn test_two_pools_without_transit_mint_fails() {
        let pools = [pool(1, 2, 1_000_000, 1_000_000), pool(2, 3, 1_000_000, 1_000_000)];
        let err =
            build_swap_data(&key(9), &pools, Some(1_000), None, slippage(), None, false, false)
                .unwrap_err();
        assert!(matches!(err, FeeRelayerError::TransitTokenMintNotFound));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let p = pool(1, 2, 1_000_000, 1_000_000);
        assert!(matches!(
            build_swap_data(&key(9), &[], Some(1), None, slippage(), None, false, false),
            Err(FeeRelayerError::SwapPoolsNotFound)
        ));
        assert!(matches!(
            build_swap_data(&key(9), &[p.clone()], None, None, slippage(), None, false, false),
            Err(FeeRelayerError::InvalidAmount)
        ));
        // draining the pool cannot be quoted
        assert!(matches!(
            build_swap_data(&key(9), &[p], None, Some(2_000_000), slippage(), None, false, false),
            Err(FeeRelayerError::InvalidAmount)
        ));
    }
}
