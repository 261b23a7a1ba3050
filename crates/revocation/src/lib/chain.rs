//! The consumed on-chain contract surface. The contract itself lives
//! elsewhere; this module fixes the record layout, the holder keying and the
//! typed conversions, and exposes the read/write seams as traits for the
//! RPC layer to implement.

use std::fmt;

use alloy_primitives::{keccak256, ruint::FromUintError, U256};
use alloy_sol_types::sol;

use crate::epoch::EpochDays;

sol! {
    /// Per-holder record as stored by the contract. Only `epoch_days`,
    /// `pointer`, `version` and `status` are semantically consumed here.
    #[derive(Debug)]
    struct RevocationInfoSolidity {
        uint256 epoch_days;
        string pointer;
        bytes32 leaf_hash;
        bool aggregated;
        uint256 version;
        uint8 status;
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    #[error("conversion error: failed to convert {value} to u64: {error:?}")]
    FromUint256Error {
        value: U256,
        error: FromUintError<u64>,
    },

    #[error("unknown on-chain status byte {0}")]
    UnknownStatus(u8),

    #[error("chain read failed: {0}")]
    Read(String),

    #[error("chain write failed: {0}")]
    Write(String),
}

pub mod conversions {
    use super::{ChainError, U256};

    pub fn u64_to_uint256(value: u64) -> U256 {
        U256::from(value)
    }

    pub fn uint256_to_u64(value: U256) -> Result<u64, ChainError> {
        value
            .try_into()
            .map_err(|error| ChainError::FromUint256Error { value, error })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationStatus {
    Active,
    Revoked,
}

impl TryFrom<u8> for RevocationStatus {
    type Error = ChainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Active),
            1 => Ok(Self::Revoked),
            other => Err(ChainError::UnknownStatus(other)),
        }
    }
}

impl From<RevocationStatus> for u8 {
    fn from(value: RevocationStatus) -> Self {
        match value {
            RevocationStatus::Active => 0,
            RevocationStatus::Revoked => 1,
        }
    }
}

impl fmt::Display for RevocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Revoked => write!(f, "Revoked"),
        }
    }
}

/// Typed view of the consumed record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainRecord {
    pub epoch_days: EpochDays,
    pub pointer: String,
    pub status: RevocationStatus,
    pub version: u64,
}

impl TryFrom<RevocationInfoSolidity> for OnChainRecord {
    type Error = ChainError;

    fn try_from(value: RevocationInfoSolidity) -> Result<Self, Self::Error> {
        let result = Self {
            epoch_days: EpochDays(conversions::uint256_to_u64(value.epoch_days)?),
            pointer: value.pointer,
            status: value.status.try_into()?,
            version: conversions::uint256_to_u64(value.version)?,
        };
        Ok(result)
    }
}

impl From<OnChainRecord> for RevocationInfoSolidity {
    fn from(value: OnChainRecord) -> Self {
        Self {
            epoch_days: conversions::u64_to_uint256(value.epoch_days.0),
            pointer: value.pointer,
            leaf_hash: [0u8; 32].into(),
            aggregated: false,
            version: conversions::u64_to_uint256(value.version),
            status: value.status.into(),
        }
    }
}

/// `keccak256(utf8(holder_id))`, the contract-side key for a holder.
pub fn holder_key(holder_id: &str) -> [u8; 32] {
    keccak256(holder_id.as_bytes()).0
}

/// Read seam. `Ok(None)` means the chain confirmed a clean read with no
/// record for the key; transport failures must be errors, never `None`.
pub trait ChainReader {
    fn get_info(&self, key: [u8; 32]) -> Result<Option<OnChainRecord>, ChainError>;
}

impl<T: ChainReader + ?Sized> ChainReader for &T {
    fn get_info(&self, key: [u8; 32]) -> Result<Option<OnChainRecord>, ChainError> {
        (**self).get_info(key)
    }
}

/// Write seam mirroring the contract functions: `publish` fails for a key
/// that is already actively revoked, `unrevoke` flips the status back and
/// bumps the version.
pub trait ChainWriter {
    fn publish(&self, key: [u8; 32], epoch_days: EpochDays, pointer: &str)
        -> Result<(), ChainError>;
    fn unrevoke(&self, key: [u8; 32]) -> Result<(), ChainError>;
}
