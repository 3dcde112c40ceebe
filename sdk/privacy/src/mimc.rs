//! MiMC7 hash over the BN254 scalar field
//!
//! Used as the two-to-one compression function of the commitment tree.
//!
//! - x^7 round function, 91 rounds
//! - round 0 uses the constant 0, the remaining constants are an iterated
//!   SHA-256 chain starting from [`MIMC_SEED`]
//! - Miyaguchi–Preneel: `H(m, k) = E_k(m) + m + k`

use std::sync::LazyLock;

use ark_bn254::Fr;
use sha2::{Digest, Sha256};

use crate::field::{fr_from_bytes, fr_to_bytes};

/// Number of MiMC rounds
const MIMC_ROUNDS: usize = 91;

/// Seed of the round constant chain
pub const MIMC_SEED: &[u8] = b"shroud_mt_seed";

static ROUND_CONSTANTS: LazyLock<Vec<Fr>> = LazyLock::new(|| {
    let mut constants = Vec::with_capacity(MIMC_ROUNDS);
    constants.push(Fr::from(0u64));
    let mut digest: [u8; 32] = Sha256::digest(MIMC_SEED).into();
    for _ in 1..MIMC_ROUNDS {
        constants.push(fr_from_bytes(&digest));
        digest = Sha256::digest(digest).into();
    }
    constants
});

/// MiMC round function: x -> (x + k + c)^7
fn mimc_round(x: Fr, k: Fr, c: Fr) -> Fr {
    let t = x + k + c;
    let t2 = t * t;
    let t4 = t2 * t2;
    let t6 = t4 * t2;
    t6 * t
}

/// Block cipher: encrypts `message` under `key`
pub fn encrypt(message: Fr, key: Fr) -> Fr {
    let mut state = message;
    for c in ROUND_CONSTANTS.iter() {
        state = mimc_round(state, key, *c);
    }
    state + key
}

/// Miyaguchi–Preneel compression of two scalars
pub fn hash(message: Fr, key: Fr) -> Fr {
    encrypt(message, key) + message + key
}

/// Compress two tree nodes into their parent
pub fn combine(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    fr_to_bytes(&hash(fr_from_bytes(left), fr_from_bytes(right)))
}
