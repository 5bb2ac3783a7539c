use fee_relay::{FeeAmount, Network, Slippage};
use solana_instruction::Instruction;
use solana_keypair::Keypair;
use solana_message::Hash;
use solana_pubkey::Pubkey;

use crate::chain::TokenAccount;
use crate::error::FeeRelayerError;
use crate::pool::PoolsPair;
use crate::transaction::{PreparedTransaction, compile_transaction};

/// Inputs of a relay swap, fixed for the whole build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Cluster the transaction is built for.
    pub network: Network,
    /// The user's wallet.
    pub user_account: Pubkey,
    /// The relay's fee payer.
    pub fee_payer: Pubkey,
    /// Route to swap through.
    pub pools: PoolsPair,
    /// Amount of the source token to swap.
    pub input_amount: u64,
    /// Slippage applied at every hop.
    pub slippage: Slippage,
    /// The user's source token account and its mint.
    pub source_token: TokenAccount,
    /// Mint the user receives.
    pub destination_mint: Pubkey,
    /// Explicit destination token account; derived when `None`.
    pub destination_address: Option<Pubkey>,
    /// Blockhash the transaction is compiled against.
    pub recent_blockhash: Hash,
    /// Rent-exempt minimum of a token account.
    pub minimum_token_account_balance: u64,
    /// Current fee per signature.
    pub lamports_per_signature: u64,
    /// Let a fresh keypair, approved as delegate, move the source tokens
    /// instead of the user.
    pub new_transfer_authority: bool,
}

/// State accumulated by the pipeline steps.
#[derive(Debug, Default)]
pub struct BuildEnv {
    /// Token account the swap takes from.
    pub user_source: Option<Pubkey>,
    /// Scratch account wrapping a SOL source.
    pub source_wsol_account: Option<Pubkey>,
    /// Scratch account receiving SOL before unwrapping.
    pub destination_wsol_account: Option<Pubkey>,
    /// Token account the swap pays into.
    pub user_destination_token_account: Option<Pubkey>,
    /// Index in `instructions` of the destination account creation.
    pub destination_account_creation: Option<usize>,
    /// The user's transit token account.
    pub transit_token_account_address: Option<Pubkey>,
    /// Mint of the transit token.
    pub transit_token_mint: Option<Pubkey>,
    /// Whether the transit token account must be created.
    pub needs_create_transit_token_account: bool,
    /// Instructions emitted so far, in order.
    pub instructions: Vec<Instruction>,
    /// Fresh keypairs that must sign.
    pub signers: Vec<Keypair>,
    /// Rent the fee payer spends on new accounts.
    pub account_creation_fee: u64,
    /// Rent the fee payer fronts for scratch accounts, to be charged back
    /// separately.
    pub additional_payback_fee: u64,
}

/// Configuration and accumulated state of one relay swap build.
///
/// A context is used for exactly one build. After a failed step it must be
/// discarded.
#[derive(Debug)]
pub struct BuildContext {
    /// Build inputs.
    pub config: BuildConfig,
    /// Accumulated state.
    pub env: BuildEnv,
}

impl BuildContext {
    /// Creates a context with an empty environment.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            env: BuildEnv::default(),
        }
    }

    pub(crate) fn add_account_creation_fee(&mut self, lamports: u64) -> Result<(), FeeRelayerError> {
        self.env.account_creation_fee = self
            .env
            .account_creation_fee
            .checked_add(lamports)
            .ok_or(FeeRelayerError::ArithmeticOverflow)?;
        Ok(())
    }

    fn expected_fee(
        &self,
        transaction: &PreparedTransaction,
        account_balances: u64,
    ) -> Result<FeeAmount, FeeRelayerError> {
        let signatures = u64::from(transaction.num_required_signatures());
        let network_fee = signatures
            .checked_mul(self.config.lamports_per_signature)
            .ok_or(FeeRelayerError::ArithmeticOverflow)?;
        Ok(FeeAmount::new(network_fee, account_balances))
    }

    /// Compiles the emitted instructions into transactions paid by the fee
    /// payer.
    ///
    /// Normally one transaction is produced. If it serializes to more than
    /// `max_transaction_size` bytes and the destination token account is
    /// created in it, that creation is moved into a transaction of its own
    /// that goes first.
    ///
    /// # Errors
    ///
    /// Returns [`FeeRelayerError::TransactionCompile`] if a message cannot be
    /// compiled, and [`FeeRelayerError::ArithmeticOverflow`] if a fee
    /// overflows.
    pub fn into_transactions(
        self,
        max_transaction_size: usize,
    ) -> Result<Vec<PreparedTransaction>, FeeRelayerError> {
        let fee_payer = self.config.fee_payer;
        let blockhash = self.config.recent_blockhash;

        let single = compile_transaction(&fee_payer, &self.env.instructions, blockhash)?;
        let split_at = self
            .env
            .destination_account_creation
            .filter(|_| single.serialized_size() > max_transaction_size);

        let Some(index) = split_at else {
            let fee = self.expected_fee(&single, self.env.account_creation_fee)?;
            return Ok(vec![single.with_signers(self.env.signers).with_expected_fee(fee)]);
        };

        #[cfg(feature = "telemetry")]
        tracing::debug!(
            size = single.serialized_size(),
            limit = max_transaction_size,
            "Transaction too large, moving destination account creation out"
        );

        let mut instructions = self.env.instructions.clone();
        let creation = instructions.remove(index);
        let rent = self.config.minimum_token_account_balance;

        let setup = compile_transaction(&fee_payer, &[creation], blockhash)?;
        let setup_fee = self.expected_fee(&setup, rent)?;
        let swap = compile_transaction(&fee_payer, &instructions, blockhash)?;
        let swap_fee =
            self.expected_fee(&swap, self.env.account_creation_fee.saturating_sub(rent))?;

        Ok(vec![
            setup.with_expected_fee(setup_fee),
            swap.with_signers(self.env.signers).with_expected_fee(swap_fee),
        ])
    }
}
