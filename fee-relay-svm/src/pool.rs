//! AMM pools and routes.
//!
//! A [`Pool`] is a constant-product token-swap pool oriented from its `a`
//! side (what the user pays) to its `b` side (what the user receives). A
//! [`PoolsPair`] is a route of one or two oriented pools. Pool discovery is
//! not done here: routes come from a [`SwapRouteService`].
//!
//! All pool math is done in `u128` with checked operations. A computation
//! that cannot be carried out (an empty pool, a request that would drain a
//! side, an overflow) yields `None` rather than a wrapped value.

use async_trait::async_trait;
use fee_relay::Slippage;
use solana_pubkey::Pubkey;

use crate::error::FeeRelayerError;
use crate::swap::DirectSwapData;

/// Error returned by a [`SwapRouteService`].
#[derive(Debug, thiserror::Error)]
#[error("Route service request failed: {0}")]
pub struct RouteServiceError(pub String);

/// A constant-product AMM pool, oriented from token A to token B.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    /// Swap program that owns the pool.
    pub swap_program_id: Pubkey,
    /// Pool state account.
    pub account: Pubkey,
    /// Pool authority (PDA of the swap program).
    pub authority: Pubkey,
    /// Pool vault holding token A.
    pub token_account_a: Pubkey,
    /// Pool vault holding token B.
    pub token_account_b: Pubkey,
    /// Mint of token A.
    pub token_a_mint: Pubkey,
    /// Mint of token B.
    pub token_b_mint: Pubkey,
    /// LP token mint.
    pub pool_token_mint: Pubkey,
    /// Account collecting owner fees.
    pub fee_account: Pubkey,
    /// Current token A reserve.
    pub token_a_balance: u64,
    /// Current token B reserve.
    pub token_b_balance: u64,
    /// Trade fee numerator.
    pub trade_fee_numerator: u64,
    /// Trade fee denominator.
    pub trade_fee_denominator: u64,
    /// Owner trade fee numerator.
    pub owner_trade_fee_numerator: u64,
    /// Owner trade fee denominator.
    pub owner_trade_fee_denominator: u64,
}

fn ceil_div(numerator: u128, denominator: u128) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    numerator.checked_add(denominator - 1).map(|n| n / denominator)
}

fn fee_part(amount: u128, numerator: u64, denominator: u64) -> Option<u128> {
    if numerator == 0 || denominator == 0 || amount == 0 {
        return Some(0);
    }
    let fee = amount.checked_mul(u128::from(numerator))? / u128::from(denominator);
    // a non-zero fee rate always charges at least one unit
    Some(fee.max(1))
}

impl Pool {
    /// Returns the same pool oriented from B to A.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            token_account_a: self.token_account_b,
            token_account_b: self.token_account_a,
            token_a_mint: self.token_b_mint,
            token_b_mint: self.token_a_mint,
            token_a_balance: self.token_b_balance,
            token_b_balance: self.token_a_balance,
            ..self.clone()
        }
    }

    /// Orients the pool so that it is paid in `source_mint`, if it trades it.
    #[must_use]
    pub fn oriented_from(&self, source_mint: &Pubkey) -> Option<Self> {
        if self.token_a_mint == *source_mint {
            Some(self.clone())
        } else if self.token_b_mint == *source_mint {
            Some(self.reversed())
        } else {
            None
        }
    }

    /// Trade plus owner fee charged on `input_amount`.
    #[must_use]
    pub fn fee(&self, input_amount: u64) -> Option<u64> {
        let amount = u128::from(input_amount);
        let trade = fee_part(amount, self.trade_fee_numerator, self.trade_fee_denominator)?;
        let owner = fee_part(
            amount,
            self.owner_trade_fee_numerator,
            self.owner_trade_fee_denominator,
        )?;
        u64::try_from(trade.checked_add(owner)?).ok()
    }

    /// Combined fee rate as a `(numerator, denominator)` fraction, `None` on
    /// overflow.
    fn fee_ratio(&self) -> Option<(u128, u128)> {
        let (tn, td) = if self.trade_fee_denominator == 0 {
            (0, 1)
        } else {
            (
                u128::from(self.trade_fee_numerator),
                u128::from(self.trade_fee_denominator),
            )
        };
        let (on, od) = if self.owner_trade_fee_denominator == 0 {
            (0, 1)
        } else {
            (
                u128::from(self.owner_trade_fee_numerator),
                u128::from(self.owner_trade_fee_denominator),
            )
        };
        let numerator = tn.checked_mul(od)?.checked_add(on.checked_mul(td)?)?;
        Some((numerator, td.checked_mul(od)?))
    }

    /// Token B received for `input_amount` of token A, fees deducted.
    #[must_use]
    pub fn output_amount(&self, input_amount: u64) -> Option<u64> {
        let fee = self.fee(input_amount)?;
        let input_less_fee = u128::from(input_amount.checked_sub(fee)?);
        let reserve_a = u128::from(self.token_a_balance);
        let reserve_b = u128::from(self.token_b_balance);
        if reserve_a == 0 || reserve_b == 0 {
            return None;
        }
        let invariant = reserve_a.checked_mul(reserve_b)?;
        let new_reserve_a = reserve_a.checked_add(input_less_fee)?;
        let new_reserve_b = ceil_div(invariant, new_reserve_a)?;
        u64::try_from(reserve_b.checked_sub(new_reserve_b)?).ok()
    }

    /// Token A that must be paid to receive `estimated_amount` of token B.
    #[must_use]
    pub fn input_amount(&self, estimated_amount: u64) -> Option<u64> {
        if estimated_amount == 0 {
            return Some(0);
        }
        let reserve_a = u128::from(self.token_a_balance);
        let reserve_b = u128::from(self.token_b_balance);
        let estimated = u128::from(estimated_amount);
        if reserve_a == 0 || estimated >= reserve_b {
            return None;
        }
        let invariant = reserve_a.checked_mul(reserve_b)?;
        let new_reserve_b = reserve_b - estimated;
        let input_less_fee = ceil_div(invariant, new_reserve_b)?.checked_sub(reserve_a)?;
        let (fee_numerator, fee_denominator) = self.fee_ratio()?;
        let kept = fee_denominator.checked_sub(fee_numerator).filter(|k| *k > 0)?;
        let input = ceil_div(input_less_fee.checked_mul(fee_denominator)?, kept)?;
        u64::try_from(input).ok()
    }

    /// Lowest token B amount accepted for `input_amount` under `slippage`.
    #[must_use]
    pub fn minimum_amount_out(&self, input_amount: u64, slippage: Slippage) -> Option<u64> {
        slippage.minimum_out(self.output_amount(input_amount)?)
    }

    /// Token A needed so that at least `minimum_amount_out` of token B is
    /// received even after `slippage`.
    #[must_use]
    pub fn input_amount_for_minimum_out(
        &self,
        minimum_amount_out: u64,
        slippage: Slippage,
    ) -> Option<u64> {
        if self.token_b_balance == 0 {
            return None;
        }
        self.input_amount(slippage.estimated_for_minimum(minimum_amount_out)?)
    }

    /// Packages this pool into swap instruction data.
    #[must_use]
    pub const fn swap_data(
        &self,
        transfer_authority: Pubkey,
        amount_in: u64,
        minimum_amount_out: u64,
    ) -> DirectSwapData {
        DirectSwapData {
            program_id: self.swap_program_id,
            account: self.account,
            authority: self.authority,
            transfer_authority,
            source: self.token_account_a,
            destination: self.token_account_b,
            pool_token_mint: self.pool_token_mint,
            pool_fee_account: self.fee_account,
            amount_in,
            minimum_amount_out,
        }
    }
}

/// A route of one pool, or two pools sharing a transit token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolsPair(Vec<Pool>);

impl PoolsPair {
    /// Creates a route from one or two pools.
    ///
    /// # Errors
    ///
    /// Returns [`FeeRelayerError::SwapPoolsNotFound`] for any other length,
    /// and [`FeeRelayerError::TransitTokenMintNotFound`] when two pools do
    /// not share a mint between them.
    pub fn new(pools: Vec<Pool>) -> Result<Self, FeeRelayerError> {
        match pools.as_slice() {
            [_] => Ok(Self(pools)),
            [first, second] if first.token_b_mint == second.token_a_mint => Ok(Self(pools)),
            [_, _] => Err(FeeRelayerError::TransitTokenMintNotFound),
            _ => Err(FeeRelayerError::SwapPoolsNotFound),
        }
    }

    /// A one-hop route.
    #[must_use]
    pub fn direct(pool: Pool) -> Self {
        Self(vec![pool])
    }

    /// The pools of the route, in swap order.
    #[must_use]
    pub fn pools(&self) -> &[Pool] {
        &self.0
    }

    /// Number of pools, 1 or 2.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a route holds at least one pool.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Orients every pool so that the route is paid in `source_mint` and
    /// each hop is paid in what the previous one delivers. `None` if the
    /// pools do not chain from `source_mint`.
    #[must_use]
    pub fn oriented_from(&self, source_mint: &Pubkey) -> Option<Self> {
        let mut mint = *source_mint;
        let pools = self
            .0
            .iter()
            .map(|pool| {
                let oriented = pool.oriented_from(&mint)?;
                mint = oriented.token_b_mint;
                Some(oriented)
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self(pools))
    }

    /// Returns `true` for a two-hop route.
    #[must_use]
    pub fn is_transitive(&self) -> bool {
        self.0.len() == 2
    }

    /// Mint the route starts from.
    #[must_use]
    pub fn source_mint(&self) -> Pubkey {
        self.0[0].token_a_mint
    }

    /// Mint the route ends in.
    #[must_use]
    pub fn destination_mint(&self) -> Pubkey {
        self.0[self.0.len() - 1].token_b_mint
    }

    /// Intermediate mint of a two-hop route.
    #[must_use]
    pub fn transit_mint(&self) -> Option<Pubkey> {
        match self.0.as_slice() {
            [first, _] => Some(first.token_b_mint),
            _ => None,
        }
    }

    /// Source amount needed to receive `estimated_amount` at the end of the
    /// route, without slippage.
    #[must_use]
    pub fn input_amount(&self, estimated_amount: u64) -> Option<u64> {
        self.0
            .iter()
            .rev()
            .try_fold(estimated_amount, |amount, pool| pool.input_amount(amount))
    }

    /// Source amount needed to receive at least `minimum_amount_out`, with
    /// `slippage` applied at every hop.
    #[must_use]
    pub fn input_amount_for_minimum_out(
        &self,
        minimum_amount_out: u64,
        slippage: Slippage,
    ) -> Option<u64> {
        self.0.iter().rev().try_fold(minimum_amount_out, |amount, pool| {
            pool.input_amount_for_minimum_out(amount, slippage)
        })
    }

    /// Lowest amount accepted at the end of the route for `input_amount`,
    /// with `slippage` applied at every hop.
    #[must_use]
    pub fn minimum_amount_out(&self, input_amount: u64, slippage: Slippage) -> Option<u64> {
        self.0.iter().try_fold(input_amount, |amount, pool| {
            pool.minimum_amount_out(amount, slippage)
        })
    }
}

/// AMM route discovery, consumed as a capability.
#[async_trait]
pub trait SwapRouteService: Send + Sync {
    /// All routes from `from_mint` to `to_mint`, pools listed in swap order.
    /// A pool may face either way.
    async fn get_tradable_pools_pairs(
        &self,
        from_mint: &Pubkey,
        to_mint: &Pubkey,
    ) -> Result<Vec<PoolsPair>, RouteServiceError>;

    /// The route that delivers `estimated_amount` for the least input.
    fn find_best_pools_pair_for_estimated_amount(
        &self,
        estimated_amount: u64,
        pools_pairs: &[PoolsPair],
    ) -> Option<PoolsPair> {
        pools_pairs
            .iter()
            .filter_map(|pair| pair.input_amount(estimated_amount).map(|input| (input, pair)))
            .min_by_key(|(input, _)| *input)
            .map(|(_, pair)| pair.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    /// A pool with a 0.25% trade fee and a 0.05% owner fee.
    pub(crate) fn pool(a_mint: u8, b_mint: u8, a_balance: u64, b_balance: u64) -> Pool {
        Pool {
            swap_program_id: key(200),
            account: key(a_mint.wrapping_mul(7).wrapping_add(b_mint)),
            authority: key(201),
            token_account_a: key(a_mint.wrapping_add(100)),
            token_account_b: key(b_mint.wrapping_add(100)),
            token_a_mint: key(a_mint),
            token_b_mint: key(b_mint),
            pool_token_mint: key(202),
            fee_account: key(203),
            token_a_balance: a_balance,
            token_b_balance: b_balance,
            trade_fee_numerator: 25,
            trade_fee_denominator: 10_000,
            owner_trade_fee_numerator: 5,
            owner_trade_fee_denominator: 10_000,
        }
    }

    fn fee_free(a_balance: u64, b_balance: u64) -> Pool {
        Pool {
            trade_fee_numerator: 0,
            owner_trade_fee_numerator: 0,
            ..pool(1, 2, a_balance, b_balance)
        }
    }

    #[test]
    fn test_output_amount_without_fees() {
        let p = fee_free(1_000_000, 1_000_000);
        // 1e12 / 1_001_000 = 999000.999 -> ceil 999001
        assert_eq!(p.output_amount(1_000), Some(999));
    }

    #[test]
    fn test_input_amount_without_fees() {
        let p = fee_free(1_000_000, 1_000_000);
        // 1e12 / 999_000 = 1001001.001 -> ceil 1001002
        assert_eq!(p.input_amount(1_000), Some(1_002));
        assert!(p.output_amount(1_002).unwrap() >= 1_000);
    }

    #[test]
    fn test_fee_has_floor_of_one_unit() {
        let p = pool(1, 2, 1_000_000, 1_000_000);
        assert_eq!(p.fee(10), Some(2));
        assert_eq!(p.fee(100_000), Some(300));
        assert_eq!(p.fee(0), Some(0));
    }

    #[test]
    fn test_input_amount_cannot_drain_pool() {
        let p = pool(1, 2, 1_000_000, 1_000_000);
        assert_eq!(p.input_amount(1_000_000), None);
        assert_eq!(p.input_amount(0), Some(0));
    }

    #[test]
    fn test_empty_pool_resolves_nothing() {
        let p = pool(1, 2, 0, 0);
        assert_eq!(p.output_amount(1_000), None);
        assert_eq!(p.input_amount_for_minimum_out(1_000, Slippage::ZERO), None);
    }

    #[test]
    fn test_extreme_fee_rate_resolves_nothing() {
        let p = Pool {
            trade_fee_numerator: u64::MAX - 1,
            trade_fee_denominator: u64::MAX,
            owner_trade_fee_numerator: u64::MAX - 1,
            owner_trade_fee_denominator: u64::MAX,
            ..pool(1, 2, 1_000_000, 1_000_000)
        };
        assert_eq!(p.fee_ratio(), None);
        assert_eq!(p.input_amount(1_000), None);
        assert_eq!(PoolsPair::direct(p).input_amount(1_000), None);
    }

    #[test]
    fn test_reversed_swaps_sides() {
        let p = pool(1, 2, 10, 20);
        let r = p.reversed();
        assert_eq!(r.token_a_mint, key(2));
        assert_eq!(r.token_b_balance, 10);
        assert_eq!(r.reversed(), p);
        assert_eq!(p.oriented_from(&key(2)), Some(r));
        assert_eq!(p.oriented_from(&key(3)), None);
    }

    #[test]
    fn test_pools_pair_length_and_transit() {
        assert!(matches!(
            PoolsPair::new(vec![]),
            Err(FeeRelayerError::SwapPoolsNotFound)
        ));
        let three = vec![pool(1, 2, 1, 1), pool(2, 3, 1, 1), pool(3, 4, 1, 1)];
        assert!(matches!(
            PoolsPair::new(three),
            Err(FeeRelayerError::SwapPoolsNotFound)
        ));
        assert!(matches!(
            PoolsPair::new(vec![pool(1, 2, 1, 1), pool(3, 4, 1, 1)]),
            Err(FeeRelayerError::TransitTokenMintNotFound)
        ));
        let pair = PoolsPair::new(vec![pool(1, 2, 1, 1), pool(2, 3, 1, 1)]).unwrap();
        assert_eq!(pair.transit_mint(), Some(key(2)));
        assert_eq!(pair.source_mint(), key(1));
        assert_eq!(pair.destination_mint(), key(3));
        assert_eq!(PoolsPair::direct(pool(1, 2, 1, 1)).transit_mint(), None);
    }

    #[test]
    fn test_pair_oriented_from_source() {
        let pair = PoolsPair::new(vec![pool(1, 2, 10, 20), pool(2, 3, 30, 40)]).unwrap();
        let flipped = PoolsPair(vec![pool(2, 1, 20, 10), pool(3, 2, 40, 30)]);
        let oriented = flipped.oriented_from(&key(1)).unwrap();
        assert_eq!(oriented.source_mint(), key(1));
        assert_eq!(oriented.transit_mint(), Some(key(2)));
        assert_eq!(oriented.destination_mint(), key(3));
        assert_eq!(oriented.pools()[1].token_a_balance, 30);
        assert_eq!(pair.oriented_from(&key(1)), Some(pair.clone()));
        assert_eq!(pair.oriented_from(&key(3)), None);
    }

    #[test]
    fn test_pair_input_chains_backwards() {
        let first = pool(1, 2, 50_000_000, 100_000_000);
        let second = pool(2, 3, 100_000_000, 25_000_000);
        let pair = PoolsPair::new(vec![first.clone(), second.clone()]).unwrap();
        let slippage = Slippage::from_bps(100).unwrap();
        let second_in = second.input_amount_for_minimum_out(10_000, slippage).unwrap();
        let first_in = first.input_amount_for_minimum_out(second_in, slippage).unwrap();
        assert_eq!(pair.input_amount_for_minimum_out(10_000, slippage), Some(first_in));
    }

    struct FixedRoutes;

    #[async_trait]
    impl SwapRouteService for FixedRoutes {
        async fn get_tradable_pools_pairs(
            &self,
            _from_mint: &Pubkey,
            _to_mint: &Pubkey,
        ) -> Result<Vec<PoolsPair>, RouteServiceError> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_best_pair_needs_least_input() {
        let shallow = PoolsPair::direct(pool(1, 2, 1_000_000, 1_000_000));
        let deep = PoolsPair::direct(pool(1, 2, 100_000_000, 100_000_000));
        let drained = PoolsPair::direct(pool(1, 2, 1_000, 1_000));
        let best = FixedRoutes
            .find_best_pools_pair_for_estimated_amount(
                10_000,
                &[shallow, deep.clone(), drained],
            )
            .unwrap();
        assert_eq!(best, deep);
        assert!(
            FixedRoutes
                .find_best_pools_pair_for_estimated_amount(10_000, &[])
                .is_none()
        );
    }
}
