//! Issuer-side orchestration: turn a (holder, epoch) pair into the two
//! artefacts a revocation needs -- the off-chain record and the on-chain
//! publish request. Chain and blob I/O stay behind their traits.

use rand::{CryptoRng, RngCore};

use scor_ahibe_engine::ahibe::{self, encapsulate, PublicParams};

use crate::chain::holder_key;
use crate::epoch::{self, parse_epoch_label, EpochDays};
use crate::pointer::{PointerStrategy, StorageError};
use crate::record::RevocationRecord;

/// Arguments for `ChainWriter::publish`, prepared but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationPublish {
    pub key: [u8; 32],
    pub epoch_days: EpochDays,
    pub pointer: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error(transparent)]
    Epoch(#[from] epoch::Error),

    #[error(transparent)]
    Engine(#[from] ahibe::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Encapsulates a fresh session key to `(holder_id, epoch_label)`, assigns
/// a storage pointer for the ciphertext, and returns the audit record plus
/// the publish request. The holder id is treated as opaque bytes; callers
/// normalise before calling.
pub fn build_revocation<R: RngCore + CryptoRng>(
    pp: &PublicParams,
    holder_id: &str,
    epoch_label: &str,
    pointers: &PointerStrategy,
    rng: &mut R,
) -> Result<(RevocationRecord, RevocationPublish), IssueError> {
    let epoch_days = parse_epoch_label(epoch_label)?;

    let ids = vec![holder_id.to_string(), epoch_label.to_string()];
    let encapsulation = encapsulate(pp, &ids, rng)?;
    let ciphertext = encapsulation.ciphertext.to_bytes();

    let pointer = pointers.assign(&ciphertext)?;
    tracing::info!(
        holder = holder_id,
        epoch = epoch_label,
        pointer = %pointer,
        ciphertext_len = ciphertext.len(),
        "prepared revocation artefacts"
    );

    let record = RevocationRecord::new(
        holder_id,
        epoch_label,
        encapsulation.session_key,
        ciphertext,
        pointer.clone(),
    );
    let publish = RevocationPublish {
        key: holder_key(holder_id),
        epoch_days,
        pointer,
    };
    Ok((record, publish))
}
