//! The AHIBE key-encapsulation engine: setup, key generation, delegation,
//! encapsulation and decapsulation over identity paths.
//!
//! An identity path is an ordered sequence of opaque UTF-8 strings; depth 1
//! identifies a holder, depth 2 a `(holder, epoch)` pair. The engine never
//! normalises identities -- byte-identical input is the caller's contract.

use rand::{CryptoRng, RngCore};
use sha2::Digest;
use zeroize::Zeroize;

use crate::bls::{
    pairing, CryptoError, Fr, G1Point, G2Point, FR_BYTES, G1_BYTES, G2_BYTES, GT_BYTES,
};
use crate::hash_to_curve::{hash_to_fr, hash_to_g1, hash_to_g2};
use crate::kdf::{derive_mask, path_info, SESSION_KEY_BYTES};

/// Hierarchies shallower than holder + epoch are not usable.
pub const MIN_HIERARCHY_DEPTH: usize = 2;

/// Size of the opaque `omega` field carried in the public parameters.
pub const OMEGA_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("maximum hierarchy depth must be at least {MIN_HIERARCHY_DEPTH}, got {0}")]
    MaxDepthTooSmall(usize),

    #[error("identity path is empty")]
    EmptyPath,

    #[error("identity component at position {index} is empty")]
    EmptyIdentity { index: usize },

    #[error("identity path depth {depth} exceeds maximum {max}")]
    DepthExceeded { depth: usize, max: usize },

    #[error("ciphertext length mismatch: expected {expected} bytes for depth {depth}, got {actual}")]
    CiphertextLength {
        depth: usize,
        expected: usize,
        actual: usize,
    },

    #[error("public parameter encoding is malformed: {0}")]
    MalformedParams(&'static str),

    #[error("secret key component set is inconsistent: {0}")]
    MalformedKey(&'static str),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Public parameters shared read-only by every role. Fixed for the lifetime
/// of a deployment; the byte codec below is the stability contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicParams {
    pub y1: G1Point,
    pub y3: G2Point,
    pub y4: G2Point,
    pub t: G1Point,
    pub u: Vec<G1Point>,
    /// Opaque digest retained for sizing compatibility; not consumed by any
    /// operation.
    pub omega: [u8; OMEGA_BYTES],
    pub max_depth: usize,
}

impl PublicParams {
    fn encoded_len(max_depth: usize) -> usize {
        1 + G1_BYTES + G2_BYTES + G2_BYTES + G1_BYTES + max_depth * G1_BYTES + OMEGA_BYTES
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::encoded_len(self.max_depth));
        out.push(self.max_depth as u8);
        out.extend_from_slice(&self.y1.to_compressed());
        out.extend_from_slice(&self.y3.to_compressed());
        out.extend_from_slice(&self.y4.to_compressed());
        out.extend_from_slice(&self.t.to_compressed());
        for u_i in &self.u {
            out.extend_from_slice(&u_i.to_compressed());
        }
        out.extend_from_slice(&self.omega);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let max_depth = *bytes.first().ok_or(Error::MalformedParams("empty input"))? as usize;
        if max_depth < MIN_HIERARCHY_DEPTH {
            return Err(Error::MaxDepthTooSmall(max_depth));
        }
        if bytes.len() != Self::encoded_len(max_depth) {
            return Err(Error::MalformedParams("length does not match declared depth"));
        }
        fn take<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> &'a [u8] {
            let slice = &bytes[*cursor..*cursor + len];
            *cursor += len;
            slice
        }

        let mut cursor = 1;
        let y1 = G1Point::from_compressed(take(bytes, &mut cursor, G1_BYTES))?;
        let y3 = G2Point::from_compressed(take(bytes, &mut cursor, G2_BYTES))?;
        let y4 = G2Point::from_compressed(take(bytes, &mut cursor, G2_BYTES))?;
        let t = G1Point::from_compressed(take(bytes, &mut cursor, G1_BYTES))?;
        let mut u = Vec::with_capacity(max_depth);
        for _ in 0..max_depth {
            u.push(G1Point::from_compressed(take(bytes, &mut cursor, G1_BYTES))?);
        }
        let mut omega = [0u8; OMEGA_BYTES];
        omega.copy_from_slice(take(bytes, &mut cursor, OMEGA_BYTES));
        Ok(Self {
            y1,
            y3,
            y4,
            t,
            u,
            omega,
            max_depth,
        })
    }
}

/// Master secret held only by the authority. Never serialised; wiped on drop.
pub struct MasterSecret {
    x1: G1Point,
    alpha: Fr,
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MasterSecret(..)")
    }
}

impl Drop for MasterSecret {
    fn drop(&mut self) {
        self.x1.zeroize();
        self.alpha.zeroize();
    }
}

/// Hierarchical secret key for an identity path of depth `1..=max_depth`.
/// Wiped on drop.
#[derive(Clone)]
pub struct HierarchicalKey {
    k11: G1Point,
    k12: G1Point,
    k21: G2Point,
    k22: G2Point,
    e1: Vec<G1Point>,
    e2: Vec<G2Point>,
    ids: Vec<String>,
    max_depth: usize,
}

impl HierarchicalKey {
    pub fn depth(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Byte-level component view, used by the encrypted key-file codec.
    pub fn components(&self) -> KeyComponents {
        KeyComponents {
            k11: self.k11.to_compressed(),
            k12: self.k12.to_compressed(),
            k21: self.k21.to_compressed(),
            k22: self.k22.to_compressed(),
            e1: self.e1.iter().map(G1Point::to_compressed).collect(),
            e2: self.e2.iter().map(G2Point::to_compressed).collect(),
            ids: self.ids.clone(),
        }
    }

    /// Rebuilds a key from exported components, re-running every point
    /// decode and subgroup check.
    pub fn from_components(components: &KeyComponents, max_depth: usize) -> Result<Self, Error> {
        let depth = components.ids.len();
        if depth == 0 {
            return Err(Error::EmptyPath);
        }
        if depth > max_depth {
            return Err(Error::DepthExceeded {
                depth,
                max: max_depth,
            });
        }
        if components.e1.len() != depth || components.e2.len() != depth {
            return Err(Error::MalformedKey("component arrays disagree with path depth"));
        }
        if let Some(index) = components.ids.iter().position(String::is_empty) {
            return Err(Error::EmptyIdentity { index });
        }
        let mut e1 = Vec::with_capacity(depth);
        for bytes in &components.e1 {
            e1.push(G1Point::from_compressed(bytes)?);
        }
        let mut e2 = Vec::with_capacity(depth);
        for bytes in &components.e2 {
            e2.push(G2Point::from_compressed(bytes)?);
        }
        Ok(Self {
            k11: G1Point::from_compressed(&components.k11)?,
            k12: G1Point::from_compressed(&components.k12)?,
            k21: G2Point::from_compressed(&components.k21)?,
            k22: G2Point::from_compressed(&components.k22)?,
            e1,
            e2,
            ids: components.ids.clone(),
            max_depth,
        })
    }
}

impl std::fmt::Debug for HierarchicalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchicalKey")
            .field("depth", &self.depth())
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

impl Drop for HierarchicalKey {
    fn drop(&mut self) {
        self.k11.zeroize();
        self.k12.zeroize();
        self.k21.zeroize();
        self.k22.zeroize();
        for point in &mut self.e1 {
            point.zeroize();
        }
        for point in &mut self.e2 {
            point.zeroize();
        }
    }
}

/// Compressed-byte view of a hierarchical key, the payload of the encrypted
/// key file.
#[derive(Clone)]
pub struct KeyComponents {
    pub k11: [u8; G1_BYTES],
    pub k12: [u8; G1_BYTES],
    pub k21: [u8; G2_BYTES],
    pub k22: [u8; G2_BYTES],
    pub e1: Vec<[u8; G1_BYTES]>,
    pub e2: Vec<[u8; G2_BYTES]>,
    pub ids: Vec<String>,
}

impl Zeroize for KeyComponents {
    fn zeroize(&mut self) {
        self.k11.zeroize();
        self.k12.zeroize();
        self.k21.zeroize();
        self.k22.zeroize();
        for bytes in &mut self.e1 {
            bytes.zeroize();
        }
        for bytes in &mut self.e2 {
            bytes.zeroize();
        }
    }
}

/// Ciphertext `U || V_0 || ... || V_{d-1} || E`; depth is carried out-of-band
/// by the decrypting key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    u: G1Point,
    v: Vec<G1Point>,
    e: [u8; SESSION_KEY_BYTES],
}

impl Ciphertext {
    pub fn depth(&self) -> usize {
        self.v.len()
    }

    pub fn encoded_len(depth: usize) -> usize {
        G1_BYTES * (depth + 1) + SESSION_KEY_BYTES
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::encoded_len(self.depth()));
        out.extend_from_slice(&self.u.to_compressed());
        for v_i in &self.v {
            out.extend_from_slice(&v_i.to_compressed());
        }
        out.extend_from_slice(&self.e);
        out
    }

    /// Parses for a known depth. The length check runs before any point
    /// allocation, so oversized inputs are rejected up front.
    pub fn from_bytes(bytes: &[u8], depth: usize) -> Result<Self, Error> {
        let expected = Self::encoded_len(depth);
        if bytes.len() != expected {
            return Err(Error::CiphertextLength {
                depth,
                expected,
                actual: bytes.len(),
            });
        }
        let u = G1Point::from_compressed(&bytes[..G1_BYTES])?;
        let mut v = Vec::with_capacity(depth);
        for i in 0..depth {
            let start = G1_BYTES * (i + 1);
            v.push(G1Point::from_compressed(&bytes[start..start + G1_BYTES])?);
        }
        let mut e = [0u8; SESSION_KEY_BYTES];
        e.copy_from_slice(&bytes[expected - SESSION_KEY_BYTES..]);
        Ok(Self { u, v, e })
    }
}

/// Output of [`encapsulate`]: the session key is handed off-channel, the
/// ciphertext is published.
#[derive(Debug)]
pub struct Encapsulation {
    pub session_key: [u8; SESSION_KEY_BYTES],
    pub ciphertext: Ciphertext,
}

fn validate_path(ids: &[String], max_depth: usize) -> Result<(), Error> {
    if ids.is_empty() {
        return Err(Error::EmptyPath);
    }
    if let Some(index) = ids.iter().position(String::is_empty) {
        return Err(Error::EmptyIdentity { index });
    }
    if ids.len() > max_depth {
        return Err(Error::DepthExceeded {
            depth: ids.len(),
            max: max_depth,
        });
    }
    Ok(())
}

/// Length-prefixed derivation transcript; the optional leading secret is the
/// master scalar (present at keygen, absent at delegation).
fn component_transcript(secret: Option<&[u8; FR_BYTES]>, ids: &[String], label: &str) -> Vec<u8> {
    let mut transcript = Vec::new();
    if let Some(secret) = secret {
        transcript.extend_from_slice(secret);
    }
    transcript.extend_from_slice(label.as_bytes());
    transcript.push(0x00);
    transcript.extend_from_slice(&(ids.len() as u32).to_be_bytes());
    for id in ids {
        transcript.extend_from_slice(&(id.len() as u32).to_be_bytes());
        transcript.extend_from_slice(id.as_bytes());
    }
    transcript
}

struct DerivedComponents {
    k11: G1Point,
    k12: G1Point,
    e1: Vec<G1Point>,
    e2: Vec<G2Point>,
}

// The transcript may carry the master scalar; scrub it before propagating
// any error, the same way the callers treat alpha_be and the mask buffers.
fn g1_component(
    secret: Option<&[u8; FR_BYTES]>,
    ids: &[String],
    label: &str,
) -> Result<G1Point, Error> {
    let mut transcript = component_transcript(secret, ids, label);
    let point = hash_to_g1(&transcript);
    transcript.zeroize();
    Ok(point?)
}

fn g2_component(
    secret: Option<&[u8; FR_BYTES]>,
    ids: &[String],
    label: &str,
) -> Result<G2Point, Error> {
    let mut transcript = component_transcript(secret, ids, label);
    let point = hash_to_g2(&transcript);
    transcript.zeroize();
    Ok(point?)
}

fn derive_components(
    secret: Option<&[u8; FR_BYTES]>,
    ids: &[String],
) -> Result<DerivedComponents, Error> {
    let k11 = g1_component(secret, ids, "k11")?;
    let k12 = g1_component(secret, ids, "k12")?;

    let mut e1 = Vec::with_capacity(ids.len());
    let mut e2 = Vec::with_capacity(ids.len());
    for level in 0..ids.len() {
        e1.push(g1_component(secret, ids, &format!("e1/{level}"))?);
        e2.push(g2_component(secret, ids, &format!("e2/{level}"))?);
    }
    Ok(DerivedComponents { k11, k12, e1, e2 })
}

/// Pairing outputs combine by byte-wise XOR of their 576-byte serialisation.
/// Encapsulation and decapsulation must apply the identical combination for
/// the unmask to line up; this is part of the observable wire contract.
fn xor_gt(acc: &mut [u8; GT_BYTES], other: &[u8; GT_BYTES]) {
    for (a, b) in acc.iter_mut().zip(other.iter()) {
        *a ^= b;
    }
}

/// Samples a fresh deployment: public parameters plus the master secret.
/// All randomness comes from the injected RNG, so a fixed seed reproduces
/// the deployment bit-for-bit.
pub fn setup<R: RngCore + CryptoRng>(
    max_depth: usize,
    rng: &mut R,
) -> Result<(PublicParams, MasterSecret), Error> {
    if max_depth < MIN_HIERARCHY_DEPTH {
        return Err(Error::MaxDepthTooSmall(max_depth));
    }
    if max_depth > u8::MAX as usize {
        return Err(Error::MalformedParams("maximum depth exceeds codec bound"));
    }

    let alpha = Fr::random_nonzero(rng);
    let x1 = G1Point::random(rng);
    let y1 = G1Point::random(rng);
    let y3 = G2Point::random(rng);
    let y4 = G2Point::random(rng);
    let t = G1Point::random(rng);
    let u: Vec<G1Point> = (0..max_depth).map(|_| G1Point::random(rng)).collect();

    // omega = SHA-256(gt_bytes(e(y1, y3)^alpha) || alpha_be), kept opaque.
    let omega_pairing = pairing(&y1.mul(&alpha), &y3);
    let mut alpha_be = alpha.to_be_bytes();
    let mut hasher = sha2::Sha256::new_with_prefix(omega_pairing.to_bytes());
    hasher.update(alpha_be);
    let omega: [u8; OMEGA_BYTES] = hasher.finalize().into();
    alpha_be.zeroize();

    tracing::debug!(max_depth, "sampled new AHIBE deployment parameters");

    Ok((
        PublicParams {
            y1,
            y3,
            y4,
            t,
            u,
            omega,
            max_depth,
        },
        MasterSecret { x1, alpha },
    ))
}

/// Issues the secret key for an identity path of depth `1..=max_depth`.
pub fn keygen(
    pp: &PublicParams,
    msk: &MasterSecret,
    ids: &[String],
) -> Result<HierarchicalKey, Error> {
    validate_path(ids, pp.max_depth)?;

    let mut alpha_be = msk.alpha.to_be_bytes();
    let derived = derive_components(Some(&alpha_be), ids);
    alpha_be.zeroize();
    let derived = derived?;

    tracing::debug!(depth = ids.len(), "issued hierarchical key");

    Ok(HierarchicalKey {
        k11: derived.k11,
        k12: derived.k12,
        // Binding k21/k22 to the public y3/y4 is what aligns the
        // encapsulation- and decapsulation-side pairings.
        k21: pp.y3,
        k22: pp.y4,
        e1: derived.e1,
        e2: derived.e2,
        ids: ids.to_vec(),
        max_depth: pp.max_depth,
    })
}

/// Extends a parent key by one identity component. Runs without the master
/// secret; the extended-path transcript alone seeds the rederived
/// components, and `k21`/`k22` are re-bound to the public `y3`/`y4`.
pub fn delegate(
    pp: &PublicParams,
    parent: &HierarchicalKey,
    child_id: &str,
) -> Result<HierarchicalKey, Error> {
    if child_id.is_empty() {
        return Err(Error::EmptyIdentity {
            index: parent.depth(),
        });
    }
    let depth = parent.depth() + 1;
    if depth > pp.max_depth {
        return Err(Error::DepthExceeded {
            depth,
            max: pp.max_depth,
        });
    }

    let mut ids = parent.ids.clone();
    ids.push(child_id.to_string());
    let derived = derive_components(None, &ids)?;

    tracing::debug!(depth, "delegated hierarchical key");

    Ok(HierarchicalKey {
        k11: derived.k11,
        k12: derived.k12,
        k21: pp.y3,
        k22: pp.y4,
        e1: derived.e1,
        e2: derived.e2,
        ids,
        max_depth: pp.max_depth,
    })
}

/// Encapsulates a fresh 32-byte session key to an identity path.
pub fn encapsulate<R: RngCore + CryptoRng>(
    pp: &PublicParams,
    ids: &[String],
    rng: &mut R,
) -> Result<Encapsulation, Error> {
    validate_path(ids, pp.max_depth)?;

    let mut session_key = [0u8; SESSION_KEY_BYTES];
    rng.fill_bytes(&mut session_key);

    let s = Fr::random_nonzero(rng);
    let u_point = pp.y1.mul(&s);

    let mut v = Vec::with_capacity(ids.len());
    for (level, id) in ids.iter().enumerate() {
        let h = hash_to_fr(id.as_bytes())?;
        v.push(pp.t.add(&pp.u[level].mul(&h)).mul(&s));
    }

    let mut shared = pairing(&u_point, &pp.y3).to_bytes();
    for v_i in &v {
        xor_gt(&mut shared, &pairing(v_i, &pp.y4).to_bytes());
    }

    let info = path_info(ids);
    let mut mask = derive_mask(&shared, &info);
    shared.zeroize();

    let mut e = [0u8; SESSION_KEY_BYTES];
    for (index, byte) in e.iter_mut().enumerate() {
        *byte = session_key[index] ^ mask[index];
    }
    mask.zeroize();

    Ok(Encapsulation {
        session_key,
        ciphertext: Ciphertext { u: u_point, v, e },
    })
}

/// Recovers the session key from ciphertext bytes using a key whose path
/// matches the encapsulation path. A key for any other path completes
/// without error but yields unrelated pseudo-random bytes.
pub fn decapsulate(
    key: &HierarchicalKey,
    ciphertext_bytes: &[u8],
) -> Result<[u8; SESSION_KEY_BYTES], Error> {
    let ciphertext = Ciphertext::from_bytes(ciphertext_bytes, key.depth())?;

    let mut shared = pairing(&ciphertext.u, &key.k21).to_bytes();
    // The ciphertext's own V_i feed the combination; that is what binds the
    // recovery to the path embedded at encapsulation time.
    for v_i in &ciphertext.v {
        xor_gt(&mut shared, &pairing(v_i, &key.k22).to_bytes());
    }

    let info = path_info(&key.ids);
    let mut mask = derive_mask(&shared, &info);
    shared.zeroize();

    let mut session_key = [0u8; SESSION_KEY_BYTES];
    for (index, byte) in session_key.iter_mut().enumerate() {
        *byte = ciphertext.e[index] ^ mask[index];
    }
    mask.zeroize();

    Ok(session_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn path(components: &[&str]) -> Vec<String> {
        components.iter().map(|id| id.to_string()).collect()
    }

    const HOLDER: &str = "holder:alice@example.com";
    const EPOCH: &str = "2025-10-30";

    #[test]
    fn round_trip_at_every_depth() {
        let mut rng = rng();
        let (pp, msk) = setup(3, &mut rng).unwrap();
        for ids in [
            path(&[HOLDER]),
            path(&[HOLDER, EPOCH]),
            path(&[HOLDER, EPOCH, "segment:3"]),
        ] {
            let key = keygen(&pp, &msk, &ids).unwrap();
            let encapsulation = encapsulate(&pp, &ids, &mut rng).unwrap();
            let bytes = encapsulation.ciphertext.to_bytes();
            assert_eq!(bytes.len(), Ciphertext::encoded_len(ids.len()));
            let recovered = decapsulate(&key, &bytes).unwrap();
            assert_eq!(recovered, encapsulation.session_key);
        }
    }

    #[test]
    fn delegation_matches_direct_issuance_for_decryption() {
        let mut rng = rng();
        let (pp, msk) = setup(3, &mut rng).unwrap();
        let ids = path(&[HOLDER, EPOCH, "segment:3"]);

        let holder_key = keygen(&pp, &msk, &ids[..1]).unwrap();
        let epoch_key = delegate(&pp, &holder_key, EPOCH).unwrap();
        let leaf_key = delegate(&pp, &epoch_key, "segment:3").unwrap();
        assert_eq!(leaf_key.ids(), ids.as_slice());

        let encapsulation = encapsulate(&pp, &ids, &mut rng).unwrap();
        let bytes = encapsulation.ciphertext.to_bytes();
        let via_delegation = decapsulate(&leaf_key, &bytes).unwrap();
        let via_keygen = decapsulate(&keygen(&pp, &msk, &ids).unwrap(), &bytes).unwrap();
        assert_eq!(via_delegation, encapsulation.session_key);
        assert_eq!(via_keygen, encapsulation.session_key);
    }

    #[test]
    fn holder_epoch_scenario_has_the_expected_ciphertext_size() {
        let mut rng = rng();
        let (pp, msk) = setup(3, &mut rng).unwrap();
        let holder_key = keygen(&pp, &msk, &path(&[HOLDER])).unwrap();
        let epoch_key = delegate(&pp, &holder_key, EPOCH).unwrap();

        let ids = path(&[HOLDER, EPOCH]);
        let encapsulation = encapsulate(&pp, &ids, &mut rng).unwrap();
        let bytes = encapsulation.ciphertext.to_bytes();
        assert_eq!(bytes.len(), 176);
        assert_eq!(decapsulate(&epoch_key, &bytes).unwrap(), encapsulation.session_key);
    }

    #[test]
    fn wrong_identity_yields_unrelated_output() {
        let mut rng = rng();
        let (pp, msk) = setup(2, &mut rng).unwrap();
        let alice = path(&[HOLDER, EPOCH]);
        let bob = path(&["holder:bob@example.com", EPOCH]);

        let encapsulation = encapsulate(&pp, &alice, &mut rng).unwrap();
        let bytes = encapsulation.ciphertext.to_bytes();

        let bob_key = keygen(&pp, &msk, &bob).unwrap();
        let recovered = decapsulate(&bob_key, &bytes).unwrap();
        assert_ne!(recovered, encapsulation.session_key);
    }

    #[test]
    fn wrong_epoch_yields_unrelated_output() {
        let mut rng = rng();
        let (pp, msk) = setup(2, &mut rng).unwrap();
        let encapsulation = encapsulate(&pp, &path(&[HOLDER, EPOCH]), &mut rng).unwrap();
        let bytes = encapsulation.ciphertext.to_bytes();

        let holder_key = keygen(&pp, &msk, &path(&[HOLDER])).unwrap();
        let other_epoch = delegate(&pp, &holder_key, "2025-10-31").unwrap();
        assert_ne!(decapsulate(&other_epoch, &bytes).unwrap(), encapsulation.session_key);
    }

    #[test]
    fn depth_limits_are_enforced() {
        let mut rng = rng();
        let (pp, msk) = setup(2, &mut rng).unwrap();
        let too_deep = path(&["a", "b", "c"]);

        assert_eq!(
            keygen(&pp, &msk, &too_deep).unwrap_err(),
            Error::DepthExceeded { depth: 3, max: 2 }
        );
        assert_eq!(
            encapsulate(&pp, &too_deep, &mut rng).unwrap_err(),
            Error::DepthExceeded { depth: 3, max: 2 }
        );

        let leaf = keygen(&pp, &msk, &path(&["a", "b"])).unwrap();
        assert_eq!(
            delegate(&pp, &leaf, "c").unwrap_err(),
            Error::DepthExceeded { depth: 3, max: 2 }
        );
    }

    #[test]
    fn empty_paths_and_components_are_rejected() {
        let mut rng = rng();
        let (pp, msk) = setup(2, &mut rng).unwrap();
        assert_eq!(keygen(&pp, &msk, &[]).unwrap_err(), Error::EmptyPath);
        assert_eq!(
            keygen(&pp, &msk, &path(&["a", ""])).unwrap_err(),
            Error::EmptyIdentity { index: 1 }
        );
        assert_eq!(encapsulate(&pp, &[], &mut rng).unwrap_err(), Error::EmptyPath);
        let parent = keygen(&pp, &msk, &path(&["a"])).unwrap();
        assert_eq!(
            delegate(&pp, &parent, "").unwrap_err(),
            Error::EmptyIdentity { index: 1 }
        );
    }

    #[test]
    fn setup_rejects_unusable_depths() {
        let mut rng = rng();
        assert_eq!(setup(0, &mut rng).unwrap_err(), Error::MaxDepthTooSmall(0));
        assert_eq!(setup(1, &mut rng).unwrap_err(), Error::MaxDepthTooSmall(1));
    }

    #[test]
    fn decapsulate_rejects_mismatched_lengths() {
        let mut rng = rng();
        let (pp, msk) = setup(2, &mut rng).unwrap();
        let ids = path(&[HOLDER, EPOCH]);
        let key = keygen(&pp, &msk, &ids).unwrap();
        let encapsulation = encapsulate(&pp, &ids, &mut rng).unwrap();
        let mut bytes = encapsulation.ciphertext.to_bytes();
        bytes.pop();

        assert_eq!(
            decapsulate(&key, &bytes).unwrap_err(),
            Error::CiphertextLength {
                depth: 2,
                expected: 176,
                actual: 175,
            }
        );

        // A depth-1 key disagrees with a depth-2 ciphertext by length.
        let holder_key = keygen(&pp, &msk, &ids[..1]).unwrap();
        let bytes = encapsulation.ciphertext.to_bytes();
        assert_eq!(
            decapsulate(&holder_key, &bytes).unwrap_err(),
            Error::CiphertextLength {
                depth: 1,
                expected: 128,
                actual: 176,
            }
        );
    }

    #[test]
    fn ciphertext_wire_format_is_stable() {
        let mut rng = rng();
        let (pp, _msk) = setup(3, &mut rng).unwrap();
        let ids = path(&[HOLDER, EPOCH]);
        let encapsulation = encapsulate(&pp, &ids, &mut rng).unwrap();
        let bytes = encapsulation.ciphertext.to_bytes();
        let reparsed = Ciphertext::from_bytes(&bytes, ids.len()).unwrap();
        assert_eq!(reparsed, encapsulation.ciphertext);
        assert_eq!(reparsed.to_bytes(), bytes);
    }

    #[test]
    fn tampered_ciphertext_decapsulates_to_garbage() {
        let mut rng = rng();
        let (pp, msk) = setup(2, &mut rng).unwrap();
        let ids = path(&[HOLDER, EPOCH]);
        let key = keygen(&pp, &msk, &ids).unwrap();
        let encapsulation = encapsulate(&pp, &ids, &mut rng).unwrap();

        let mut bytes = encapsulation.ciphertext.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let recovered = decapsulate(&key, &bytes).unwrap();
        assert_ne!(recovered, encapsulation.session_key);
    }

    #[test]
    fn setup_is_reproducible_under_a_fixed_rng() {
        let (pp_a, msk_a) = setup(3, &mut StdRng::seed_from_u64(99)).unwrap();
        let (pp_b, msk_b) = setup(3, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(pp_a.to_bytes(), pp_b.to_bytes());
        assert_eq!(msk_a.alpha, msk_b.alpha);
        assert_eq!(msk_a.x1, msk_b.x1);

        let (pp_c, _) = setup(3, &mut StdRng::seed_from_u64(100)).unwrap();
        assert_ne!(pp_a.to_bytes(), pp_c.to_bytes());
    }

    #[test]
    fn public_params_codec_round_trips() {
        let mut rng = rng();
        let (pp, _msk) = setup(4, &mut rng).unwrap();
        let bytes = pp.to_bytes();
        let decoded = PublicParams::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, pp);
        assert_eq!(decoded.to_bytes(), bytes);

        assert!(matches!(
            PublicParams::from_bytes(&bytes[..bytes.len() - 1]),
            Err(Error::MalformedParams(_))
        ));
        assert!(matches!(PublicParams::from_bytes(&[]), Err(Error::MalformedParams(_))));
    }

    #[test]
    fn key_components_round_trip() {
        let mut rng = rng();
        let (pp, msk) = setup(3, &mut rng).unwrap();
        let ids = path(&[HOLDER, EPOCH]);
        let key = keygen(&pp, &msk, &ids).unwrap();

        let components = key.components();
        let rebuilt = HierarchicalKey::from_components(&components, pp.max_depth).unwrap();
        assert_eq!(rebuilt.components().k11, components.k11);
        assert_eq!(rebuilt.components().k21, components.k21);
        assert_eq!(rebuilt.ids(), key.ids());

        let encapsulation = encapsulate(&pp, &ids, &mut rng).unwrap();
        let bytes = encapsulation.ciphertext.to_bytes();
        assert_eq!(decapsulate(&rebuilt, &bytes).unwrap(), encapsulation.session_key);
    }

    #[test]
    fn malformed_key_components_are_rejected() {
        let mut rng = rng();
        let (pp, msk) = setup(2, &mut rng).unwrap();
        let key = keygen(&pp, &msk, &path(&[HOLDER])).unwrap();

        let mut components = key.components();
        components.e1.clear();
        assert!(matches!(
            HierarchicalKey::from_components(&components, pp.max_depth),
            Err(Error::MalformedKey(_))
        ));

        let mut components = key.components();
        components.ids.clear();
        assert!(matches!(
            HierarchicalKey::from_components(&components, pp.max_depth),
            Err(Error::EmptyPath)
        ));

        let mut components = key.components();
        components.k11 = [0u8; G1_BYTES];
        assert!(matches!(
            HierarchicalKey::from_components(&components, pp.max_depth),
            Err(Error::Crypto(_))
        ));
    }
}
