//! Hash-to-curve layer: RFC 9380 `expand_message_xmd` over SHA-256 plus the
//! backend's SSWU map, with fixed domain-separation tags per target group.

use std::mem::MaybeUninit;
use std::ptr;

use blst::{blst_expand_message_xmd, blst_hash_to_g1, blst_hash_to_g2, blst_p1, blst_p2};

use crate::bls::{CryptoError, Fr, G1Point, G2Point};

/// Domain-separation tag for hashing into `G1`.
pub const DST_G1: &[u8] = b"AHIBE_BLS12381G1_XMD:SHA-256_SSWU_RO_";
/// Domain-separation tag for hashing into `G2`.
pub const DST_G2: &[u8] = b"AHIBE_BLS12381G2_XMD:SHA-256_SSWU_RO_";
/// Domain-separation tag for hashing into `Fr`: `DST_G1` with an `Fr` suffix.
pub const DST_FR: &[u8] = b"AHIBE_BLS12381G1_XMD:SHA-256_SSWU_RO_Fr";

/// RFC 9380 caps DSTs at 255 bytes.
const MAX_DST_LEN: usize = 255;

/// One 48-byte chunk reduced mod `r` yields a negligible-bias scalar.
const FR_EXPAND_LEN: usize = 48;

fn check_inputs(msg: &[u8], dst: &[u8]) -> Result<(), CryptoError> {
    if msg.is_empty() {
        return Err(CryptoError::HashToCurve("empty message"));
    }
    if dst.is_empty() {
        return Err(CryptoError::HashToCurve("empty domain-separation tag"));
    }
    if dst.len() > MAX_DST_LEN {
        return Err(CryptoError::HashToCurve("domain-separation tag exceeds 255 bytes"));
    }
    Ok(())
}

/// `expand_message_xmd(SHA-256, msg, dst, out_len)` per RFC 9380 §5.3.1.
pub fn expand_message_xmd(msg: &[u8], dst: &[u8], out_len: usize) -> Result<Vec<u8>, CryptoError> {
    check_inputs(msg, dst)?;
    if out_len == 0 || out_len > 255 * 32 {
        return Err(CryptoError::HashToCurve("output length out of range"));
    }
    let mut out = vec![0u8; out_len];
    unsafe {
        blst_expand_message_xmd(
            out.as_mut_ptr(),
            out_len,
            msg.as_ptr(),
            msg.len(),
            dst.as_ptr(),
            dst.len(),
        );
    }
    Ok(out)
}

/// Deterministic map from bytes to `Fr` under [`DST_FR`].
pub fn hash_to_fr(msg: &[u8]) -> Result<Fr, CryptoError> {
    let expanded = expand_message_xmd(msg, DST_FR, FR_EXPAND_LEN)?;
    Ok(Fr::reduce_wide(&expanded))
}

/// Deterministic map from bytes to the prime-order subgroup of `G1`.
pub fn hash_to_g1(msg: &[u8]) -> Result<G1Point, CryptoError> {
    check_inputs(msg, DST_G1)?;
    let mut out = MaybeUninit::<blst_p1>::uninit();
    unsafe {
        blst_hash_to_g1(
            out.as_mut_ptr(),
            msg.as_ptr(),
            msg.len(),
            DST_G1.as_ptr(),
            DST_G1.len(),
            ptr::null(),
            0,
        );
        Ok(G1Point(out.assume_init()))
    }
}

/// Deterministic map from bytes to the prime-order subgroup of `G2`.
pub fn hash_to_g2(msg: &[u8]) -> Result<G2Point, CryptoError> {
    check_inputs(msg, DST_G2)?;
    let mut out = MaybeUninit::<blst_p2>::uninit();
    unsafe {
        blst_hash_to_g2(
            out.as_mut_ptr(),
            msg.as_ptr(),
            msg.len(),
            DST_G2.as_ptr(),
            DST_G2.len(),
            ptr::null(),
            0,
        );
        Ok(G2Point(out.assume_init()))
    }
}
