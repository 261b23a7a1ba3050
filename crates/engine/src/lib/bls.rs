//! Field and group layer over the native BLS12-381 backend.
//!
//! Thin byte-in/byte-out wrappers around `blst`. Group operations on secret
//! inputs inherit the backend's constant-time guarantees; this layer adds no
//! secret-dependent branching of its own.

use std::mem::MaybeUninit;

use blst::{
    blst_bendian_from_fp, blst_bendian_from_scalar, blst_final_exp, blst_fp12, blst_fr,
    blst_fr_add, blst_fr_eucl_inverse, blst_fr_from_scalar, blst_fr_from_uint64, blst_fr_mul,
    blst_miller_loop, blst_p1, blst_p1_add_or_double, blst_p1_affine, blst_p1_affine_in_g1,
    blst_p1_compress, blst_p1_from_affine, blst_p1_generator, blst_p1_is_equal, blst_p1_is_inf,
    blst_p1_mult, blst_p1_to_affine, blst_p1_uncompress, blst_p2, blst_p2_add_or_double,
    blst_p2_affine, blst_p2_affine_in_g2, blst_p2_compress, blst_p2_from_affine,
    blst_p2_generator, blst_p2_is_equal, blst_p2_is_inf, blst_p2_mult, blst_p2_to_affine,
    blst_p2_uncompress, blst_scalar, blst_scalar_from_be_bytes, blst_scalar_from_bendian,
    blst_scalar_from_fr, blst_scalar_fr_check, BLST_ERROR,
};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

/// Compressed `G1` encoding length.
pub const G1_BYTES: usize = 48;
/// Compressed `G2` encoding length.
pub const G2_BYTES: usize = 96;
/// Serialised `GT` (Fp12 tower) encoding length.
pub const GT_BYTES: usize = 576;
/// Big-endian `Fr` encoding length.
pub const FR_BYTES: usize = 32;

/// Scalar multiplications run over the full 255-bit width of `r`.
const FR_BITS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("encoding length mismatch: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("point decoding failed for {0}")]
    InvalidPoint(&'static str),

    #[error("decoded {0} point is not in the prime-order subgroup")]
    NotInSubgroup(&'static str),

    #[error("scalar encoding is not canonical mod r")]
    ScalarOutOfRange,

    #[error("attempted to invert the zero scalar")]
    ZeroInverse,

    #[error("hash-to-curve rejected input: {0}")]
    HashToCurve(&'static str),
}

/// Element of the scalar field `Fr` (integers mod the group order `r`).
#[derive(Clone, Copy)]
pub struct Fr(pub(crate) blst_fr);

impl Fr {
    /// Uniform scalar, reduced from 64 bytes of RNG output.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut wide = [0u8; 64];
        rng.fill_bytes(&mut wide);
        let out = Self::reduce_wide(&wide);
        wide.zeroize();
        out
    }

    /// Uniform scalar in `Fr*`.
    pub fn random_nonzero<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let candidate = Self::random(rng);
            if !candidate.is_zero() {
                return candidate;
            }
        }
    }

    pub fn from_u64(value: u64) -> Self {
        let limbs = [value, 0, 0, 0];
        let mut fr = MaybeUninit::<blst_fr>::uninit();
        unsafe {
            blst_fr_from_uint64(fr.as_mut_ptr(), limbs.as_ptr());
            Self(fr.assume_init())
        }
    }

    /// Big-endian reduction of an arbitrary-length byte string mod `r`.
    pub(crate) fn reduce_wide(bytes: &[u8]) -> Self {
        let mut scalar = MaybeUninit::<blst_scalar>::uninit();
        let mut fr = MaybeUninit::<blst_fr>::uninit();
        unsafe {
            blst_scalar_from_be_bytes(scalar.as_mut_ptr(), bytes.as_ptr(), bytes.len());
            blst_fr_from_scalar(fr.as_mut_ptr(), scalar.as_ptr());
            Self(fr.assume_init())
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut out = MaybeUninit::<blst_fr>::uninit();
        unsafe {
            blst_fr_add(out.as_mut_ptr(), &self.0, &other.0);
            Self(out.assume_init())
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        let mut out = MaybeUninit::<blst_fr>::uninit();
        unsafe {
            blst_fr_mul(out.as_mut_ptr(), &self.0, &other.0);
            Self(out.assume_init())
        }
    }

    pub fn inverse(&self) -> Result<Self, CryptoError> {
        if self.is_zero() {
            return Err(CryptoError::ZeroInverse);
        }
        let mut out = MaybeUninit::<blst_fr>::uninit();
        unsafe {
            blst_fr_eucl_inverse(out.as_mut_ptr(), &self.0);
            Ok(Self(out.assume_init()))
        }
    }

    pub fn is_zero(&self) -> bool {
        self.to_be_bytes() == [0u8; FR_BYTES]
    }

    pub fn to_be_bytes(&self) -> [u8; FR_BYTES] {
        let mut out = [0u8; FR_BYTES];
        unsafe {
            blst_bendian_from_scalar(out.as_mut_ptr(), &self.to_scalar());
        }
        out
    }

    /// Rejects encodings that are not canonical mod `r`.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != FR_BYTES {
            return Err(CryptoError::InvalidLength {
                expected: FR_BYTES,
                actual: bytes.len(),
            });
        }
        let mut scalar = MaybeUninit::<blst_scalar>::uninit();
        let mut fr = MaybeUninit::<blst_fr>::uninit();
        unsafe {
            blst_scalar_from_bendian(scalar.as_mut_ptr(), bytes.as_ptr());
            if !blst_scalar_fr_check(scalar.as_ptr()) {
                return Err(CryptoError::ScalarOutOfRange);
            }
            blst_fr_from_scalar(fr.as_mut_ptr(), scalar.as_ptr());
            Ok(Self(fr.assume_init()))
        }
    }

    pub(crate) fn to_scalar(&self) -> blst_scalar {
        let mut scalar = MaybeUninit::<blst_scalar>::uninit();
        unsafe {
            blst_scalar_from_fr(scalar.as_mut_ptr(), &self.0);
            scalar.assume_init()
        }
    }
}

impl PartialEq for Fr {
    fn eq(&self, other: &Self) -> bool {
        self.to_be_bytes() == other.to_be_bytes()
    }
}

impl Eq for Fr {}

impl std::fmt::Debug for Fr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print scalar material; it may be a secret exponent.
        write!(f, "Fr(..)")
    }
}

impl Zeroize for Fr {
    fn zeroize(&mut self) {
        self.0.l.zeroize();
    }
}

/// Point in the prime-order subgroup of `G1`.
#[derive(Clone, Copy)]
pub struct G1Point(pub(crate) blst_p1);

impl G1Point {
    pub fn generator() -> Self {
        unsafe { Self(*blst_p1_generator()) }
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::generator().mul(&Fr::random_nonzero(rng))
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut out = MaybeUninit::<blst_p1>::uninit();
        unsafe {
            blst_p1_add_or_double(out.as_mut_ptr(), &self.0, &other.0);
            Self(out.assume_init())
        }
    }

    pub fn mul(&self, scalar: &Fr) -> Self {
        let k = scalar.to_scalar();
        let mut out = MaybeUninit::<blst_p1>::uninit();
        unsafe {
            blst_p1_mult(out.as_mut_ptr(), &self.0, k.b.as_ptr(), FR_BITS);
            Self(out.assume_init())
        }
    }

    pub fn is_identity(&self) -> bool {
        unsafe { blst_p1_is_inf(&self.0) }
    }

    pub fn to_compressed(&self) -> [u8; G1_BYTES] {
        let mut out = [0u8; G1_BYTES];
        unsafe {
            blst_p1_compress(out.as_mut_ptr(), &self.0);
        }
        out
    }

    /// Decodes a compressed point; subgroup membership is mandatory.
    pub fn from_compressed(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != G1_BYTES {
            return Err(CryptoError::InvalidLength {
                expected: G1_BYTES,
                actual: bytes.len(),
            });
        }
        let mut affine = MaybeUninit::<blst_p1_affine>::uninit();
        unsafe {
            match blst_p1_uncompress(affine.as_mut_ptr(), bytes.as_ptr()) {
                BLST_ERROR::BLST_SUCCESS => {}
                BLST_ERROR::BLST_POINT_NOT_IN_GROUP => {
                    return Err(CryptoError::NotInSubgroup("G1"))
                }
                _ => return Err(CryptoError::InvalidPoint("G1")),
            }
            let affine = affine.assume_init();
            if !blst_p1_affine_in_g1(&affine) {
                return Err(CryptoError::NotInSubgroup("G1"));
            }
            let mut point = MaybeUninit::<blst_p1>::uninit();
            blst_p1_from_affine(point.as_mut_ptr(), &affine);
            Ok(Self(point.assume_init()))
        }
    }

    fn to_affine(self) -> blst_p1_affine {
        let mut affine = MaybeUninit::<blst_p1_affine>::uninit();
        unsafe {
            blst_p1_to_affine(affine.as_mut_ptr(), &self.0);
            affine.assume_init()
        }
    }
}

impl PartialEq for G1Point {
    fn eq(&self, other: &Self) -> bool {
        unsafe { blst_p1_is_equal(&self.0, &other.0) }
    }
}

impl Eq for G1Point {}

impl std::fmt::Debug for G1Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "G1Point({})", hex_compact(&self.to_compressed()))
    }
}

impl Zeroize for G1Point {
    fn zeroize(&mut self) {
        self.0.x.l.zeroize();
        self.0.y.l.zeroize();
        self.0.z.l.zeroize();
    }
}

/// Point in the prime-order subgroup of `G2`.
#[derive(Clone, Copy)]
pub struct G2Point(pub(crate) blst_p2);

impl G2Point {
    pub fn generator() -> Self {
        unsafe { Self(*blst_p2_generator()) }
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::generator().mul(&Fr::random_nonzero(rng))
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut out = MaybeUninit::<blst_p2>::uninit();
        unsafe {
            blst_p2_add_or_double(out.as_mut_ptr(), &self.0, &other.0);
            Self(out.assume_init())
        }
    }

    pub fn mul(&self, scalar: &Fr) -> Self {
        let k = scalar.to_scalar();
        let mut out = MaybeUninit::<blst_p2>::uninit();
        unsafe {
            blst_p2_mult(out.as_mut_ptr(), &self.0, k.b.as_ptr(), FR_BITS);
            Self(out.assume_init())
        }
    }

    pub fn is_identity(&self) -> bool {
        unsafe { blst_p2_is_inf(&self.0) }
    }

    pub fn to_compressed(&self) -> [u8; G2_BYTES] {
        let mut out = [0u8; G2_BYTES];
        unsafe {
            blst_p2_compress(out.as_mut_ptr(), &self.0);
        }
        out
    }

    /// Decodes a compressed point; subgroup membership is mandatory.
    pub fn from_compressed(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != G2_BYTES {
            return Err(CryptoError::InvalidLength {
                expected: G2_BYTES,
                actual: bytes.len(),
            });
        }
        let mut affine = MaybeUninit::<blst_p2_affine>::uninit();
        unsafe {
            match blst_p2_uncompress(affine.as_mut_ptr(), bytes.as_ptr()) {
                BLST_ERROR::BLST_SUCCESS => {}
                BLST_ERROR::BLST_POINT_NOT_IN_GROUP => {
                    return Err(CryptoError::NotInSubgroup("G2"))
                }
                _ => return Err(CryptoError::InvalidPoint("G2")),
            }
            let affine = affine.assume_init();
            if !blst_p2_affine_in_g2(&affine) {
                return Err(CryptoError::NotInSubgroup("G2"));
            }
            let mut point = MaybeUninit::<blst_p2>::uninit();
            blst_p2_from_affine(point.as_mut_ptr(), &affine);
            Ok(Self(point.assume_init()))
        }
    }

    fn to_affine(self) -> blst_p2_affine {
        let mut affine = MaybeUninit::<blst_p2_affine>::uninit();
        unsafe {
            blst_p2_to_affine(affine.as_mut_ptr(), &self.0);
            affine.assume_init()
        }
    }
}

impl PartialEq for G2Point {
    fn eq(&self, other: &Self) -> bool {
        unsafe { blst_p2_is_equal(&self.0, &other.0) }
    }
}

impl Eq for G2Point {}

impl std::fmt::Debug for G2Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "G2Point({})", hex_compact(&self.to_compressed()))
    }
}

impl Zeroize for G2Point {
    fn zeroize(&mut self) {
        for coord in [&mut self.0.x, &mut self.0.y, &mut self.0.z] {
            coord.fp[0].l.zeroize();
            coord.fp[1].l.zeroize();
        }
    }
}

/// Element of the pairing target field `GT`.
#[derive(Clone, Copy)]
pub struct GtElement(blst_fp12);

impl GtElement {
    /// Big-endian serialisation of the Fp12 tower, coefficient order
    /// `fp6[0..2] / fp2[0..3] / fp[0..2]`, 48 bytes each.
    pub fn to_bytes(&self) -> [u8; GT_BYTES] {
        let mut out = [0u8; GT_BYTES];
        let mut offset = 0;
        for fp6 in &self.0.fp6 {
            for fp2 in &fp6.fp2 {
                for fp in &fp2.fp {
                    unsafe {
                        blst_bendian_from_fp(out[offset..offset + 48].as_mut_ptr(), fp);
                    }
                    offset += 48;
                }
            }
        }
        out
    }
}

impl PartialEq for GtElement {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for GtElement {}

impl std::fmt::Debug for GtElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GtElement({})", hex_compact(&self.to_bytes()[..16]))
    }
}

/// Optimal ate pairing `e: G1 x G2 -> GT`.
pub fn pairing(p: &G1Point, q: &G2Point) -> GtElement {
    let p_affine = p.to_affine();
    let q_affine = q.to_affine();
    let mut loop_out = MaybeUninit::<blst_fp12>::uninit();
    let mut out = MaybeUninit::<blst_fp12>::uninit();
    unsafe {
        blst_miller_loop(loop_out.as_mut_ptr(), &q_affine, &p_affine);
        blst_final_exp(out.as_mut_ptr(), loop_out.as_ptr());
        GtElement(out.assume_init())
    }
}

fn hex_compact(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes.iter().take(8) {
        out.push_str(&format!("{byte:02x}"));
    }
    out.push_str("..");
    out
}
