use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use scor_ahibe_revocation::chain::{
    ChainError, ChainReader, ChainWriter, OnChainRecord, RevocationStatus,
};
use scor_ahibe_revocation::epoch::EpochDays;
use scor_ahibe_revocation::pointer::{BlobStore, StorageError};

/// Contract double: one record per holder key, publish/unrevoke semantics
/// as the real contract implements them.
#[derive(Default)]
pub struct InMemoryChain {
    records: Mutex<HashMap<[u8; 32], OnChainRecord>>,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChainReader for InMemoryChain {
    fn get_info(&self, key: [u8; 32]) -> Result<Option<OnChainRecord>, ChainError> {
        let records = self.records.lock().expect("chain double lock poisoned");
        Ok(records.get(&key).cloned())
    }
}

impl ChainWriter for InMemoryChain {
    fn publish(
        &self,
        key: [u8; 32],
        epoch_days: EpochDays,
        pointer: &str,
    ) -> Result<(), ChainError> {
        let mut records = self.records.lock().expect("chain double lock poisoned");
        let version = match records.get(&key) {
            Some(existing) if existing.status == RevocationStatus::Revoked => {
                return Err(ChainError::Write("already actively revoked".to_string()));
            }
            Some(existing) => existing.version + 1,
            None => 1,
        };
        records.insert(
            key,
            OnChainRecord {
                epoch_days,
                pointer: pointer.to_string(),
                status: RevocationStatus::Revoked,
                version,
            },
        );
        Ok(())
    }

    fn unrevoke(&self, key: [u8; 32]) -> Result<(), ChainError> {
        let mut records = self.records.lock().expect("chain double lock poisoned");
        match records.get_mut(&key) {
            Some(record) => {
                record.status = RevocationStatus::Active;
                record.version += 1;
                Ok(())
            }
            None => Err(ChainError::Write("no record for key".to_string())),
        }
    }
}

/// Blob-store double handing out opaque `mem-blob-N` addresses.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    counter: Arc<AtomicU64>,
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<String, StorageError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst);
        let address = format!("mem-blob-{index}");
        let mut blobs = self.blobs.lock().expect("blob double lock poisoned");
        blobs.insert(address.clone(), bytes.to_vec());
        Ok(address)
    }

    fn get(&self, pointer: &str) -> Result<Vec<u8>, StorageError> {
        let blobs = self.blobs.lock().expect("blob double lock poisoned");
        blobs
            .get(pointer)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(pointer.to_string()))
    }
}
