use std::marker::PhantomData;

use crate::chain::ChainStateClient;
use crate::error::FeeRelayerError;
use crate::swap::{BuildConfig, BuildContext, TransitTokenAccountManager, steps};
use crate::transaction::PreparedTransaction;

/// Nothing checked yet.
#[derive(Debug)]
pub struct Initialized;
/// Source account resolved.
#[derive(Debug)]
pub struct SourceChecked;
/// Destination account resolved.
#[derive(Debug)]
pub struct DestinationChecked;
/// Transit token account resolved.
#[derive(Debug)]
pub struct TransitChecked;
/// Swap instructions emitted.
#[derive(Debug)]
pub struct SwapEmitted;
/// Scratch accounts closed; ready to compile.
#[derive(Debug)]
pub struct Finalized;

/// Relay swap build whose step order is checked by the compiler.
///
/// Each step consumes the pipeline and returns it in the next state. A
/// failed step drops the context with it, so a half-built context can never
/// be reused.
///
/// ```ignore
/// let transactions = SwapPipeline::new(config)
///     .check_source()?
///     .check_destination(&chain).await?
///     .check_transit_token_account(&manager).await?
///     .check_swap_data()?
///     .check_closing_accounts()?
///     .into_transactions(PACKET_DATA_SIZE)?;
/// ```
#[derive(Debug)]
pub struct SwapPipeline<S> {
    context: BuildContext,
    _state: PhantomData<S>,
}

impl<S> SwapPipeline<S> {
    /// The context built so far.
    #[must_use]
    pub const fn context(&self) -> &BuildContext {
        &self.context
    }

    const fn advance<T>(context: BuildContext) -> SwapPipeline<T> {
        SwapPipeline {
            context,
            _state: PhantomData,
        }
    }
}

impl SwapPipeline<Initialized> {
    /// Starts a build.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self::advance(BuildContext::new(config))
    }

    /// See [`steps::check_source`].
    ///
    /// # Errors
    ///
    /// Propagates the step's error.
    pub fn check_source(mut self) -> Result<SwapPipeline<SourceChecked>, FeeRelayerError> {
        steps::check_source(&mut self.context)?;
        Ok(Self::advance(self.context))
    }
}

impl SwapPipeline<SourceChecked> {
    /// See [`steps::check_destination`].
    ///
    /// # Errors
    ///
    /// Propagates the step's error.
    pub async fn check_destination<C>(
        mut self,
        chain: &C,
    ) -> Result<SwapPipeline<DestinationChecked>, FeeRelayerError>
    where
        C: ChainStateClient + ?Sized,
    {
        steps::check_destination(&mut self.context, chain).await?;
        Ok(Self::advance(self.context))
    }
}

impl SwapPipeline<DestinationChecked> {
    /// See [`steps::check_transit_token_account`].
    ///
    /// # Errors
    ///
    /// Propagates the step's error.
    pub async fn check_transit_token_account<M>(
        mut self,
        manager: &M,
    ) -> Result<SwapPipeline<TransitChecked>, FeeRelayerError>
    where
        M: TransitTokenAccountManager + ?Sized,
    {
        steps::check_transit_token_account(&mut self.context, manager).await?;
        Ok(Self::advance(self.context))
    }
}

impl SwapPipeline<TransitChecked> {
    /// See [`steps::check_swap_data`].
    ///
    /// # Errors
    ///
    /// Propagates the step's error.
    pub fn check_swap_data(mut self) -> Result<SwapPipeline<SwapEmitted>, FeeRelayerError> {
        steps::check_swap_data(&mut self.context)?;
        Ok(Self::advance(self.context))
    }
}

impl SwapPipeline<SwapEmitted> {
    /// See [`steps::check_closing_accounts`].
    ///
    /// # Errors
    ///
    /// Propagates the step's error.
    pub fn check_closing_accounts(mut self) -> Result<SwapPipeline<Finalized>, FeeRelayerError> {
        steps::check_closing_accounts(&mut self.context)?;
        Ok(Self::advance(self.context))
    }
}

impl SwapPipeline<Finalized> {
    /// See [`BuildContext::into_transactions`].
    ///
    /// # Errors
    ///
    /// Propagates the compilation error.
    pub fn into_transactions(
        self,
        max_transaction_size: usize,
    ) -> Result<Vec<PreparedTransaction>, FeeRelayerError> {
        self.context.into_transactions(max_transaction_size)
    }

    /// Returns the finished context.
    #[must_use]
    pub fn into_context(self) -> BuildContext {
        self.context
    }
}

#[cfg(test)]
mod tests {
    use solana_signer::Signer;

    use super::*;
    use crate::chain::tests::FakeChain;
    use crate::config::PACKET_DATA_SIZE;
    use crate::pool::PoolsPair;
    use crate::pool::tests::{key, pool};
    use crate::swap::ChainTransitTokenAccountManager;
    use crate::swap::steps::tests::config;

    #[tokio::test]
    async fn test_pipeline_produces_one_transaction() {
        let chain = FakeChain::default();
        let manager = ChainTransitTokenAccountManager::new(&chain);
        let pools = PoolsPair::direct(pool(1, 2, 10_000_000, 10_000_000));
        let transactions = SwapPipeline::new(config(pools, key(1), key(2)))
            .check_source()
            .unwrap()
            .check_destination(&chain)
            .await
            .unwrap()
            .check_transit_token_account(&manager)
            .await
            .unwrap()
            .check_swap_data()
            .unwrap()
            .check_closing_accounts()
            .unwrap()
            .into_transactions(PACKET_DATA_SIZE)
            .unwrap();

        assert_eq!(transactions.len(), 1);
        let tx = &transactions[0];
        // fee payer, user, transfer authority
        assert_eq!(tx.num_required_signatures(), 3);
        assert_eq!(tx.inner().message.static_account_keys()[0], key(77));
        assert_eq!(tx.expected_fee().transaction, 15_000);
        assert_eq!(tx.expected_fee().account_balances, 2_039_280);
        assert_eq!(tx.signers().len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_transaction_splits_account_creation() {
        let chain = FakeChain::default();
        let manager = ChainTransitTokenAccountManager::new(&chain);
        let pools = PoolsPair::direct(pool(1, 2, 10_000_000, 10_000_000));
        let finalized = SwapPipeline::new(config(pools, key(1), key(2)))
            .check_source()
            .unwrap()
            .check_destination(&chain)
            .await
            .unwrap()
            .check_transit_token_account(&manager)
            .await
            .unwrap()
            .check_swap_data()
            .unwrap()
            .check_closing_accounts()
            .unwrap();
        let authority = finalized.context().env.signers[0].pubkey();

        // any limit below the real size forces the split
        let transactions = finalized.into_transactions(200).unwrap();
        assert_eq!(transactions.len(), 2);
        let (setup, swap) = (&transactions[0], &transactions[1]);
        assert_eq!(setup.num_required_signatures(), 1);
        assert_eq!(setup.expected_fee().transaction, 5_000);
        assert_eq!(setup.expected_fee().account_balances, 2_039_280);
        assert!(setup.signers().is_empty());
        assert_eq!(swap.expected_fee().account_balances, 0);
        assert_eq!(swap.signers()[0].pubkey(), authority);
    }
}
