//! Off-chain revocation records: the audit artefact an issuer emits when a
//! credential is revoked. Records are built once and never mutated.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::io::serde_utils::{Base64Std, BytesProtocol, FixedBytesProtocol, Hex0x};

/// One revocation event. The session key stays off-chain; only the pointer
/// is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRecord {
    pub holder_id: String,
    /// Epoch label as issued, `YYYY-MM-DD`.
    pub epoch: String,
    #[serde(with = "FixedBytesProtocol::<32, Base64Std>")]
    pub session_key: [u8; 32],
    #[serde(with = "BytesProtocol::<Hex0x>")]
    pub ciphertext: Vec<u8>,
    pub storage_pointer: String,
    /// RFC 3339 creation timestamp.
    pub exported_at: String,
}

impl RevocationRecord {
    pub fn new(
        holder_id: impl Into<String>,
        epoch: impl Into<String>,
        session_key: [u8; 32],
        ciphertext: Vec<u8>,
        storage_pointer: impl Into<String>,
    ) -> Self {
        Self {
            holder_id: holder_id.into(),
            epoch: epoch.into(),
            session_key,
            ciphertext,
            storage_pointer: storage_pointer.into(),
            exported_at: Utc::now().to_rfc3339(),
        }
    }
}
