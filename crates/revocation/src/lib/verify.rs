//! The verification decision: VALID / REVOKED from the on-chain record and
//! the queried epoch, optionally confirmed cryptographically by fetching the
//! published ciphertext and decapsulating it with an epoch-scoped key.

use scor_ahibe_engine::ahibe::{self, HierarchicalKey};

use crate::chain::{holder_key, ChainError, ChainReader, OnChainRecord, RevocationStatus};
use crate::epoch::{self, parse_epoch_label, EpochDays};
use crate::pointer::{PointerStrategy, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Not revoked at the queried epoch.
    Valid,
    /// Revoked at or before the queried epoch.
    Revoked,
    /// The chain says revoked but the ciphertext blob could not be fetched,
    /// so the cryptographic confirmation is unavailable.
    UnknownBlobMissing,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    Epoch(#[from] epoch::Error),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Engine(#[from] ahibe::Error),

    #[error("recovered session key does not match the expected challenge")]
    ChallengeMismatch,
}

/// The pure decision table. Absence of a record only reaches this function
/// after a confirmed clean chain read.
pub fn decide(record: Option<&OnChainRecord>, t_check: EpochDays) -> VerificationOutcome {
    match record {
        None => VerificationOutcome::Valid,
        Some(record) => match record.status {
            // An un-revoke supersedes whatever was published before.
            RevocationStatus::Active => VerificationOutcome::Valid,
            RevocationStatus::Revoked if t_check < record.epoch_days => VerificationOutcome::Valid,
            RevocationStatus::Revoked => VerificationOutcome::Revoked,
        },
    }
}

/// Reads the chain, applies the decision table, and optionally confirms a
/// REVOKED outcome by decapsulation.
pub struct Verifier<C> {
    chain: C,
    pointers: PointerStrategy,
}

impl<C: ChainReader> Verifier<C> {
    pub fn new(chain: C, pointers: PointerStrategy) -> Self {
        Self { chain, pointers }
    }

    /// Status from the on-chain record alone; one chain read, no blob fetch.
    pub fn status(
        &self,
        holder_id: &str,
        t_check_label: &str,
    ) -> Result<VerificationOutcome, VerifyError> {
        let t_check = parse_epoch_label(t_check_label)?;
        let record = self.chain.get_info(holder_key(holder_id))?;
        let outcome = decide(record.as_ref(), t_check);
        tracing::debug!(holder = holder_id, t_check = %t_check, ?outcome, "status check");
        Ok(outcome)
    }

    /// Status plus cryptographic confirmation: when the table says REVOKED,
    /// fetch the blob at the record's pointer and decapsulate with the
    /// supplied epoch-scoped key. A missing or unreachable blob degrades to
    /// [`VerificationOutcome::UnknownBlobMissing`]; the on-chain
    /// status+epoch already carried the decision. When an expected session
    /// key is supplied, the recovered key must match it.
    pub fn verify_confirmed(
        &self,
        holder_id: &str,
        t_check_label: &str,
        epoch_key: &HierarchicalKey,
        expected_session_key: Option<&[u8; 32]>,
    ) -> Result<VerificationOutcome, VerifyError> {
        let t_check = parse_epoch_label(t_check_label)?;
        let record = self.chain.get_info(holder_key(holder_id))?;
        let outcome = decide(record.as_ref(), t_check);
        if outcome != VerificationOutcome::Revoked {
            return Ok(outcome);
        }
        let record = record.expect("a REVOKED decision always carries a record");

        let ciphertext = match self.pointers.fetch(&record.pointer) {
            Ok(bytes) => bytes,
            Err(
                error @ (StorageError::NotFound(_)
                | StorageError::Backend(_)
                | StorageError::NoStoreConfigured),
            ) => {
                tracing::warn!(
                    holder = holder_id,
                    pointer = %record.pointer,
                    %error,
                    "revoked on chain, but the ciphertext blob is unavailable"
                );
                return Ok(VerificationOutcome::UnknownBlobMissing);
            }
            Err(error) => {
                tracing::warn!(holder = holder_id, %error, "blob fetch failed");
                return Ok(VerificationOutcome::UnknownBlobMissing);
            }
        };

        let recovered = ahibe::decapsulate(epoch_key, &ciphertext)?;
        if let Some(expected) = expected_session_key {
            if &recovered != expected {
                return Err(VerifyError::ChallengeMismatch);
            }
        }
        tracing::info!(
            holder = holder_id,
            t_check = %t_check,
            "revocation confirmed by decapsulation"
        );
        Ok(VerificationOutcome::Revoked)
    }
}
