//! Storage pointers for published ciphertexts: either assigned by an
//! external content-addressable blob store, or derived deterministically
//! from the ciphertext bytes when no store is configured.

use sha2::{Digest, Sha256};

/// Prefix of pointers derived locally from the ciphertext content.
pub const DETERMINISTIC_POINTER_PREFIX: &str = "cid-sha256-";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("blob {0:?} not found")]
    NotFound(String),

    #[error("blob upload refused: {0}")]
    UploadRefused(String),

    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("deterministic pointers cannot be dereferenced; no blob store is configured")]
    NoStoreConfigured,
}

/// Content-addressable blob store. Addresses are opaque UTF-8 strings chosen
/// by the store.
pub trait BlobStore {
    fn put(&self, bytes: &[u8]) -> Result<String, StorageError>;
    fn get(&self, pointer: &str) -> Result<Vec<u8>, StorageError>;
}

/// `"cid-sha256-" || lowercase_hex(sha256(ciphertext))`.
pub fn deterministic_pointer(ciphertext: &[u8]) -> String {
    format!(
        "{DETERMINISTIC_POINTER_PREFIX}{}",
        hex::encode(Sha256::digest(ciphertext))
    )
}

/// How pointers are produced and resolved; chosen once at construction.
pub enum PointerStrategy {
    /// Upload to a blob store and use the address it returns.
    BlobStore(Box<dyn BlobStore + Send + Sync>),
    /// No store: derive the pointer from the ciphertext. Fetches are
    /// unavailable in this mode.
    Deterministic,
}

impl PointerStrategy {
    pub fn assign(&self, ciphertext: &[u8]) -> Result<String, StorageError> {
        match self {
            Self::BlobStore(store) => store.put(ciphertext),
            Self::Deterministic => Ok(deterministic_pointer(ciphertext)),
        }
    }

    pub fn fetch(&self, pointer: &str) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::BlobStore(store) => store.get(pointer),
            Self::Deterministic => Err(StorageError::NoStoreConfigured),
        }
    }
}

impl std::fmt::Debug for PointerStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlobStore(_) => write!(f, "PointerStrategy::BlobStore(..)"),
            Self::Deterministic => write!(f, "PointerStrategy::Deterministic"),
        }
    }
}
