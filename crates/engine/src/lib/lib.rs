pub mod ahibe;
pub mod bls;
pub mod hash_to_curve;
pub mod kdf;
