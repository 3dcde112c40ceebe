//! Pseudo-random functions of the join-split statement
//!
//! All PRFs are BLAKE2s-256 over a 512-bit block whose left half carries a
//! short bit tag followed by (a prefix of) a secret:
//!
//! ```text
//! PRF^addr(a_sk)         = H( 1100 ‖ a_sk[..252] ‖ 0^256 )
//! PRF^nf(a_sk, rho)      = H( 1110 ‖ a_sk[..252] ‖ rho )
//! PRF^rho(phi, h_sig, i) = H( 0 ‖ i ‖ 10 ‖ phi[..252 - |i|] ‖ h_sig )
//! ```
//!
//! Tags keep the three functions on disjoint domains even though they share
//! the same hash. Note commitments use a personalized BLAKE2s instead.

use blake2s_simd::{Params, State};
use sha2::{Digest, Sha256};

use crate::field::reduce_to_field;
use crate::params::{DIGEST_LENGTH, JS_OUTPUTS, TRAPDOOR_LENGTH, output_index_bits};

const TAG_ADDR: [bool; 4] = [true, true, false, false];
const TAG_NF: [bool; 4] = [true, true, true, false];

/// BLAKE2s personalization of note commitments
const COMMIT_PERSONAL: &[u8; 8] = b"shroudcm";

/// Big-endian bits of `bytes`, most significant first
fn bits(bytes: &[u8]) -> impl Iterator<Item = bool> + '_ {
    (0..bytes.len() * 8).map(move |i| ((bytes[i / 8] >> (7 - i % 8)) & 1) == 1)
}

/// Writes `prefix` followed by `payload`, truncated to 256 bits
fn tagged(prefix: &[bool], payload: &[u8; DIGEST_LENGTH]) -> [u8; DIGEST_LENGTH] {
    let mut out = [0u8; DIGEST_LENGTH];
    let stream = prefix.iter().copied().chain(bits(payload));
    for (i, bit) in stream.take(DIGEST_LENGTH * 8).enumerate() {
        if bit {
            out[i / 8] |= 0x80 >> (i % 8);
        }
    }
    out
}

fn blake2s(left: &[u8; DIGEST_LENGTH], right: &[u8; DIGEST_LENGTH]) -> [u8; DIGEST_LENGTH] {
    let mut state = State::new();
    state.update(left);
    state.update(right);
    *state.finalize().as_array()
}

/// Ownership public key `a_pk` for the secret `a_sk`
pub fn prf_addr(a_sk: &[u8; DIGEST_LENGTH]) -> [u8; DIGEST_LENGTH] {
    blake2s(&tagged(&TAG_ADDR, a_sk), &[0u8; DIGEST_LENGTH])
}

/// Nullifier of the note with randomness `rho`, owned by `a_sk`
pub fn prf_nf(a_sk: &[u8; DIGEST_LENGTH], rho: &[u8; DIGEST_LENGTH]) -> [u8; DIGEST_LENGTH] {
    blake2s(&tagged(&TAG_NF, a_sk), rho)
}

/// `rho` of output `index`, derived from the transaction seed `phi` and `h_sig`
///
/// # Panics
/// If `index >= JS_OUTPUTS`.
pub fn prf_rho(
    phi: &[u8; DIGEST_LENGTH],
    h_sig: &[u8; DIGEST_LENGTH],
    index: usize,
) -> [u8; DIGEST_LENGTH] {
    assert!(index < JS_OUTPUTS, "output index {index} out of range");
    let index_bits = output_index_bits();
    let mut prefix = Vec::with_capacity(index_bits + 3);
    prefix.push(false);
    prefix.extend((0..index_bits).rev().map(|b| (index >> b) & 1 == 1));
    prefix.extend([true, false]);
    blake2s(&tagged(&prefix, phi), h_sig)
}

/// Note commitment `H_cm(r ‖ a_pk ‖ rho ‖ v) mod p`
pub fn commit(
    trapdoor: &[u8; TRAPDOOR_LENGTH],
    a_pk: &[u8; DIGEST_LENGTH],
    rho: &[u8; DIGEST_LENGTH],
    value: u64,
) -> [u8; DIGEST_LENGTH] {
    let mut state = Params::new().personal(COMMIT_PERSONAL).to_state();
    state.update(trapdoor);
    state.update(a_pk);
    state.update(rho);
    state.update(&value.to_be_bytes());
    reduce_to_field(state.finalize().as_array())
}

/// `h_sig = SHA-256(nf_0 ‖ … ‖ nf_n ‖ vk)`
pub fn h_sig(nullifiers: &[[u8; DIGEST_LENGTH]], vk_bytes: &[u8]) -> [u8; DIGEST_LENGTH] {
    let mut hasher = Sha256::new();
    for nf in nullifiers {
        hasher.update(nf);
    }
    hasher.update(vk_bytes);
    hasher.finalize().into()
}
