//! Session-key derivation: HKDF-SHA-256 over the serialised pairing result,
//! with the identity path digested into the `info` context so material is
//! bound to the path it was encapsulated for.

use hkdf::Hkdf;
use sha2::{Digest, Sha256};

use crate::bls::GT_BYTES;

/// Length of derived session-key material.
pub const SESSION_KEY_BYTES: usize = 32;

/// `SHA-256(ID_1 || ID_2 || ... || ID_d)` over the raw UTF-8 bytes.
pub fn path_info(ids: &[String]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for id in ids {
        hasher.update(id.as_bytes());
    }
    hasher.finalize().into()
}

/// HKDF-SHA-256 with no salt; `ikm` is the 576-byte `GT` encoding and `info`
/// the path digest.
pub fn derive_mask(gt_bytes: &[u8; GT_BYTES], info: &[u8; 32]) -> [u8; SESSION_KEY_BYTES] {
    let hkdf = Hkdf::<Sha256>::new(None, gt_bytes);
    let mut mask = [0u8; SESSION_KEY_BYTES];
    hkdf.expand(info, &mut mask)
        .expect("32 bytes is always a valid HKDF-SHA-256 output length");
    mask
}
