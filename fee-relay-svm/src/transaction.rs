//! Compiled relay transactions awaiting signatures.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fee_relay::FeeAmount;
use solana_instruction::Instruction;
use solana_keypair::Keypair;
use solana_message::v0::Message as MessageV0;
use solana_message::{Hash, VersionedMessage};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::versioned::VersionedTransaction;

use crate::error::{FeeRelayerError, TransactionToB64Error};

/// Compiles `instructions` into an unsigned v0 transaction paid by
/// `fee_payer`, with one empty signature slot per required signer.
///
/// # Errors
///
/// Returns [`FeeRelayerError::TransactionCompile`] if the message cannot be
/// compiled.
pub fn compile_transaction(
    fee_payer: &Pubkey,
    instructions: &[Instruction],
    recent_blockhash: Hash,
) -> Result<PreparedTransaction, FeeRelayerError> {
    let message = MessageV0::try_compile(fee_payer, instructions, &[], recent_blockhash)
        .map_err(|e| FeeRelayerError::TransactionCompile(format!("{e:?}")))?;
    let message = VersionedMessage::V0(message);
    let num_required_signatures = message.header().num_required_signatures;
    Ok(PreparedTransaction::new(VersionedTransaction {
        signatures: vec![Signature::default(); usize::from(num_required_signatures)],
        message,
    }))
}

/// A relay transaction together with the fresh keypairs that must sign it
/// and the fee the relay expects for it.
///
/// The user's and the fee payer's signatures are added by their holders.
#[derive(Debug)]
pub struct PreparedTransaction {
    inner: VersionedTransaction,
    signers: Vec<Keypair>,
    expected_fee: FeeAmount,
}

impl PreparedTransaction {
    /// Wraps a transaction with no extra signers and no expected fee.
    #[must_use]
    pub fn new(transaction: VersionedTransaction) -> Self {
        Self {
            inner: transaction,
            signers: Vec::new(),
            expected_fee: FeeAmount::default(),
        }
    }

    /// Sets the fresh keypairs that sign this transaction.
    #[must_use]
    pub fn with_signers(mut self, signers: Vec<Keypair>) -> Self {
        self.signers = signers;
        self
    }

    /// Sets the fee the relay expects for this transaction.
    #[must_use]
    pub fn with_expected_fee(mut self, expected_fee: FeeAmount) -> Self {
        self.expected_fee = expected_fee;
        self
    }

    /// The wrapped transaction.
    #[must_use]
    pub const fn inner(&self) -> &VersionedTransaction {
        &self.inner
    }

    /// Consumes the wrapper, returning the transaction.
    #[must_use]
    pub fn into_inner(self) -> VersionedTransaction {
        self.inner
    }

    /// Fresh keypairs that must sign.
    #[must_use]
    pub fn signers(&self) -> &[Keypair] {
        &self.signers
    }

    /// Network fee and account rent the relay expects for this transaction.
    #[must_use]
    pub const fn expected_fee(&self) -> &FeeAmount {
        &self.expected_fee
    }

    /// Number of signatures the transaction requires.
    #[must_use]
    pub fn num_required_signatures(&self) -> u8 {
        self.inner.message.header().num_required_signatures
    }

    /// Size of the serialized transaction in bytes.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        bincode::serialized_size(&self.inner)
            .ok()
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or(usize::MAX)
    }

    /// Checks if every required signature is present.
    #[must_use]
    pub fn is_fully_signed(&self) -> bool {
        let num_required = usize::from(self.num_required_signatures());
        self.inner.signatures.len() >= num_required
            && self
                .inner
                .signatures
                .iter()
                .all(|signature| *signature != Signature::default())
    }

    /// Signs the transaction with `signer`.
    ///
    /// # Errors
    ///
    /// Returns [`FeeRelayerError::SignerNotRequired`] if `signer` is not a
    /// required signer, or [`FeeRelayerError::TransactionSign`] if signing
    /// fails.
    pub fn sign_with_keypair<S: Signer + ?Sized>(
        &mut self,
        signer: &S,
    ) -> Result<(), FeeRelayerError> {
        let msg_bytes = self.inner.message.serialize();
        let signature = signer
            .try_sign_message(msg_bytes.as_slice())
            .map_err(|e| FeeRelayerError::TransactionSign(format!("{e}")))?;

        let num_required = usize::from(self.num_required_signatures());
        let pubkey = signer.pubkey();
        let pos = self.inner.message.static_account_keys()[..num_required]
            .iter()
            .position(|k| *k == pubkey)
            .ok_or(FeeRelayerError::SignerNotRequired(pubkey))?;

        if self.inner.signatures.len() < num_required {
            self.inner
                .signatures
                .resize(num_required, Signature::default());
        }
        self.inner.signatures[pos] = signature;
        Ok(())
    }

    /// Signs with every fresh keypair carried by this transaction.
    ///
    /// # Errors
    ///
    /// Same as [`Self::sign_with_keypair`].
    pub fn partial_sign(&mut self) -> Result<(), FeeRelayerError> {
        let signers = std::mem::take(&mut self.signers);
        let result = signers
            .iter()
            .try_for_each(|signer| self.sign_with_keypair(signer));
        self.signers = signers;
        result
    }

    /// Encodes the transaction to base64.
    ///
    /// # Errors
    ///
    /// Returns [`TransactionToB64Error`] if serialization fails.
    pub fn as_base64(&self) -> Result<String, TransactionToB64Error> {
        let bytes =
            bincode::serialize(&self.inner).map_err(|e| TransactionToB64Error(format!("{e}")))?;
        Ok(STANDARD.encode(bytes))
    }
}
