//! Encrypted delegate-key files for offline transfer of epoch-scoped keys.
//!
//! Envelope: PBKDF2-HMAC-SHA-256 (200k iterations, 16-byte salt) derives an
//! AES-256-GCM key; the AEAD ciphertext wraps the JSON key-material payload.
//! Wrong passphrases and tampering are indistinguishable at this layer --
//! both fail authentication.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use scor_ahibe_engine::ahibe::{self, HierarchicalKey, KeyComponents, PublicParams};
use scor_ahibe_engine::bls::{G1_BYTES, G2_BYTES};

pub const KEY_FILE_FORMAT: &str = "SCOR-AHIBE-DELEGATE-KEY-BLS12";
pub const KEY_FILE_VERSION: u32 = 2;
pub const KEY_FILE_KDF: &str = "PBKDF2WithHmacSHA256";
pub const PBKDF2_ITERATIONS: u32 = 200_000;
pub const CURVE_PARAMS: &str = "BLS12-381";

const SALT_BYTES: usize = 16;
const NONCE_BYTES: usize = 12;
const AES_KEY_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("unsupported key file format {0:?}")]
    UnsupportedFormat(String),

    #[error("unsupported key file version {0}")]
    UnsupportedVersion(u32),

    #[error("unsupported key derivation function {0:?}")]
    UnsupportedKdf(String),

    #[error("unsupported iteration count {0}")]
    UnsupportedIterations(u32),

    #[error("field {field} is not valid base64")]
    Encoding {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("field {field} has length {actual}, expected {expected}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("identity component is not valid UTF-8")]
    IdentityEncoding,

    #[error("curve parameter mismatch: found {0:?}")]
    CurveMismatch(String),

    #[error("AEAD encryption failed")]
    Encryption,

    #[error("decryption failed: wrong passphrase or tampered ciphertext")]
    Decryption,

    #[error(transparent)]
    Key(#[from] ahibe::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct KeyFileEnvelope {
    format: String,
    version: u32,
    kdf: String,
    iterations: u32,
    salt: String,
    iv: String,
    ciphertext: String,
}

/// Inner payload, AEAD-protected. All byte fields are Base64; identity
/// components are Base64 of their UTF-8 bytes.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyMaterial {
    k11: String,
    k12: String,
    k21: String,
    k22: String,
    e1s: Vec<String>,
    e2s: Vec<String>,
    ids: Vec<String>,
    curve_params: String,
}

fn derive_aes_key(passphrase: &str, salt: &[u8]) -> [u8; AES_KEY_BYTES] {
    let mut key = [0u8; AES_KEY_BYTES];
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

fn decode_b64(field: &'static str, value: &str) -> Result<Vec<u8>, KeyFileError> {
    BASE64
        .decode(value)
        .map_err(|source| KeyFileError::Encoding { field, source })
}

fn decode_fixed<const N: usize>(
    field: &'static str,
    value: &str,
) -> Result<[u8; N], KeyFileError> {
    let decoded = decode_b64(field, value)?;
    if decoded.len() != N {
        return Err(KeyFileError::FieldLength {
            field,
            expected: N,
            actual: decoded.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&decoded);
    Ok(out)
}

/// Serialises and encrypts a delegate key under a passphrase. Salt and
/// nonce are drawn fresh from the injected RNG on every export.
pub fn export_delegate_key<R: RngCore + CryptoRng>(
    key: &HierarchicalKey,
    passphrase: &str,
    rng: &mut R,
) -> Result<String, KeyFileError> {
    let mut components = key.components();
    let material = KeyMaterial {
        k11: BASE64.encode(components.k11),
        k12: BASE64.encode(components.k12),
        k21: BASE64.encode(components.k21),
        k22: BASE64.encode(components.k22),
        e1s: components.e1.iter().map(|bytes| BASE64.encode(bytes)).collect(),
        e2s: components.e2.iter().map(|bytes| BASE64.encode(bytes)).collect(),
        ids: components
            .ids
            .iter()
            .map(|id| BASE64.encode(id.as_bytes()))
            .collect(),
        curve_params: CURVE_PARAMS.to_string(),
    };
    components.zeroize();
    let mut payload = serde_json::to_vec(&material)?;

    let mut salt = [0u8; SALT_BYTES];
    rng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_BYTES];
    rng.fill_bytes(&mut nonce_bytes);

    let mut aes_key = derive_aes_key(passphrase, &salt);
    let cipher = Aes256Gcm::new_from_slice(&aes_key).map_err(|_| KeyFileError::Encryption)?;
    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), payload.as_slice())
        .map_err(|_| KeyFileError::Encryption);
    aes_key.zeroize();
    payload.zeroize();
    let sealed = sealed?;

    let envelope = KeyFileEnvelope {
        format: KEY_FILE_FORMAT.to_string(),
        version: KEY_FILE_VERSION,
        kdf: KEY_FILE_KDF.to_string(),
        iterations: PBKDF2_ITERATIONS,
        salt: BASE64.encode(salt),
        iv: BASE64.encode(nonce_bytes),
        ciphertext: BASE64.encode(&sealed),
    };

    tracing::debug!(depth = key.depth(), "exported delegate key file");
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Decrypts and rebuilds a delegate key, re-running every point decode and
/// subgroup check. The public parameters supply the hierarchy bound.
pub fn import_delegate_key(
    file_contents: &str,
    passphrase: &str,
    pp: &PublicParams,
) -> Result<HierarchicalKey, KeyFileError> {
    let envelope: KeyFileEnvelope = serde_json::from_str(file_contents)?;
    if envelope.format != KEY_FILE_FORMAT {
        return Err(KeyFileError::UnsupportedFormat(envelope.format));
    }
    if envelope.version != KEY_FILE_VERSION {
        return Err(KeyFileError::UnsupportedVersion(envelope.version));
    }
    if envelope.kdf != KEY_FILE_KDF {
        return Err(KeyFileError::UnsupportedKdf(envelope.kdf));
    }
    if envelope.iterations != PBKDF2_ITERATIONS {
        return Err(KeyFileError::UnsupportedIterations(envelope.iterations));
    }

    let salt = decode_b64("salt", &envelope.salt)?;
    if salt.len() != SALT_BYTES {
        return Err(KeyFileError::FieldLength {
            field: "salt",
            expected: SALT_BYTES,
            actual: salt.len(),
        });
    }
    let nonce_bytes = decode_b64("iv", &envelope.iv)?;
    if nonce_bytes.len() != NONCE_BYTES {
        return Err(KeyFileError::FieldLength {
            field: "iv",
            expected: NONCE_BYTES,
            actual: nonce_bytes.len(),
        });
    }
    let sealed = decode_b64("ciphertext", &envelope.ciphertext)?;

    let mut aes_key = derive_aes_key(passphrase, &salt);
    let cipher = Aes256Gcm::new_from_slice(&aes_key).map_err(|_| KeyFileError::Decryption)?;
    let payload = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), sealed.as_slice())
        .map_err(|_| KeyFileError::Decryption);
    aes_key.zeroize();
    let mut payload = payload?;

    let material: KeyMaterial = serde_json::from_slice(&payload)?;
    payload.zeroize();
    if material.curve_params != CURVE_PARAMS {
        return Err(KeyFileError::CurveMismatch(material.curve_params));
    }

    let mut e1 = Vec::with_capacity(material.e1s.len());
    for encoded in &material.e1s {
        e1.push(decode_fixed::<G1_BYTES>("e1s", encoded)?);
    }
    let mut e2 = Vec::with_capacity(material.e2s.len());
    for encoded in &material.e2s {
        e2.push(decode_fixed::<G2_BYTES>("e2s", encoded)?);
    }
    let mut ids = Vec::with_capacity(material.ids.len());
    for encoded in &material.ids {
        let bytes = decode_b64("ids", encoded)?;
        ids.push(String::from_utf8(bytes).map_err(|_| KeyFileError::IdentityEncoding)?);
    }

    let mut components = KeyComponents {
        k11: decode_fixed::<G1_BYTES>("k11", &material.k11)?,
        k12: decode_fixed::<G1_BYTES>("k12", &material.k12)?,
        k21: decode_fixed::<G2_BYTES>("k21", &material.k21)?,
        k22: decode_fixed::<G2_BYTES>("k22", &material.k22)?,
        e1,
        e2,
        ids,
    };
    let key = HierarchicalKey::from_components(&components, pp.max_depth);
    components.zeroize();
    let key = key?;

    tracing::debug!(depth = key.depth(), "imported delegate key file");
    Ok(key)
}
