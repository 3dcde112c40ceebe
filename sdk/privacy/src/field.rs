//! BN254 scalar field helpers
//!
//! Digests and tree nodes travel as 32-byte big-endian integers. These
//! helpers move them in and out of `Fr`.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};

/// Interpret 32 big-endian bytes as a scalar, reducing modulo the field order
pub fn fr_from_bytes(bytes: &[u8; 32]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

/// Canonical 32-byte big-endian encoding of a scalar
pub fn fr_to_bytes(value: &Fr) -> [u8; 32] {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Reduce an arbitrary 256-bit digest into the scalar field
pub fn reduce_to_field(bytes: &[u8; 32]) -> [u8; 32] {
    fr_to_bytes(&fr_from_bytes(bytes))
}

/// True if `bytes` is the canonical encoding of some scalar
pub fn is_canonical(bytes: &[u8; 32]) -> bool {
    reduce_to_field(bytes) == *bytes
}
