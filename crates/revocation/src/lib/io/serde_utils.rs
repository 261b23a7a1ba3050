//! String-encoded byte fields for the JSON wire formats: `0x`-hex for
//! ciphertext bytes, standard Base64 for key material. Both wire encodings
//! share one protocol pair, parameterised by the codec.

use std::marker::PhantomData;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serializer};

/// A byte-to-string wire encoding.
pub trait ByteCodec {
    const NAME: &'static str;

    fn encode(bytes: &[u8]) -> String;
    fn decode(text: &str) -> Result<Vec<u8>, String>;
}

/// Lowercase hex with a `0x` prefix; the prefix is optional on input.
pub struct Hex0x;

impl ByteCodec for Hex0x {
    const NAME: &'static str = "0x-hex";

    fn encode(bytes: &[u8]) -> String {
        format!("0x{}", hex::encode(bytes))
    }

    fn decode(text: &str) -> Result<Vec<u8>, String> {
        let stripped = text.strip_prefix("0x").unwrap_or(text);
        hex::decode(stripped).map_err(|error| error.to_string())
    }
}

/// RFC 4648 standard Base64 with padding.
pub struct Base64Std;

impl ByteCodec for Base64Std {
    const NAME: &'static str = "base64";

    fn encode(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }

    fn decode(text: &str) -> Result<Vec<u8>, String> {
        BASE64.decode(text).map_err(|error| error.to_string())
    }
}

/// `#[serde(with = ...)]` protocol for fixed-size byte fields; rejects any
/// decoded length other than `N`.
pub struct FixedBytesProtocol<const N: usize, C: ByteCodec> {
    _codec: PhantomData<C>,
}

impl<const N: usize, C: ByteCodec> FixedBytesProtocol<N, C> {
    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&C::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let text: String = Deserialize::deserialize(deserializer)?;
        let decoded = C::decode(&text).map_err(Error::custom)?;
        if decoded.len() != N {
            return Err(Error::custom(format!(
                "expected {N} {}-encoded bytes, got {}",
                C::NAME,
                decoded.len()
            )));
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&decoded);
        Ok(out)
    }
}

/// `#[serde(with = ...)]` protocol for variable-length byte fields.
pub struct BytesProtocol<C: ByteCodec> {
    _codec: PhantomData<C>,
}

impl<C: ByteCodec> BytesProtocol<C> {
    pub fn serialize<S>(value: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&C::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text: String = Deserialize::deserialize(deserializer)?;
        C::decode(&text).map_err(Error::custom)
    }
}
