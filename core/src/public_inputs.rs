//! Primary inputs of the join-split statement
//!
//! Layout of the words handed to the contract:
//!
//! ```text
//! [ root | cm_0 .. cm_{J_OUT-1} | nf_0 .. nf_{J_IN-1} | h_sig | residual ]
//! ```
//!
//! Nullifiers and `h_sig` are 256-bit digests, which do not fit in a field
//! element. Each is split into its low 253 bits (its own word) and its top 3
//! bits, which are collected into the residual word together with the public
//! values:
//!
//! ```text
//! residual = v_in << (64 + R) | v_out << R | Σ top3(digest_i) << 3i
//! ```
//!
//! where `digest_i` runs over `nf_0 .. nf_{J_IN-1}, h_sig` and
//! `R = 3 · (J_IN + 1)`.

use num_bigint::BigUint;
use shroud_privacy::curve::Word;
use shroud_privacy::params::{DIGEST_RESIDUAL_BITS, JS_INPUTS, JS_OUTPUTS, PUBLIC_VALUE_BITS};
use shroud_privacy::{Commitment, Nullifier};

use crate::error::{MixerError, Result};

/// Digests whose top bits land in the residual word
pub const NUM_INPUT_DIGESTS: usize = JS_INPUTS + 1;

/// Bits of the residual word taken by digest tails
pub const TOTAL_DIGEST_RESIDUAL_BITS: usize = NUM_INPUT_DIGESTS * DIGEST_RESIDUAL_BITS;

/// Total number of primary inputs
pub const NUM_PUBLIC_INPUTS: usize = 1 + JS_OUTPUTS + JS_INPUTS + 2;

pub const ROOT_INDEX: usize = 0;
pub const COMMITMENTS_INDEX: usize = 1;
pub const NULLIFIERS_INDEX: usize = COMMITMENTS_INDEX + JS_OUTPUTS;
pub const H_SIG_INDEX: usize = NULLIFIERS_INDEX + JS_INPUTS;
pub const RESIDUAL_BITS_INDEX: usize = H_SIG_INDEX + 1;

const DIGEST_HEAD_MASK: u8 = 0xFF >> DIGEST_RESIDUAL_BITS;

/// The statement a join-split proof is made for, in unpacked form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicInputs {
    pub root: [u8; 32],
    pub commitments: [Commitment; JS_OUTPUTS],
    pub nullifiers: [Nullifier; JS_INPUTS],
    pub h_sig: [u8; 32],
    pub v_in: u64,
    pub v_out: u64,
}

impl PublicInputs {
    pub fn pack(&self) -> Vec<Word> {
        let mut words = Vec::with_capacity(NUM_PUBLIC_INPUTS);
        words.push(self.root);
        words.extend(self.commitments.iter().map(|cm| cm.0));

        let mut residual = BigUint::from(self.v_in) << (PUBLIC_VALUE_BITS + TOTAL_DIGEST_RESIDUAL_BITS);
        residual |= BigUint::from(self.v_out) << TOTAL_DIGEST_RESIDUAL_BITS;

        let digests = self.nullifiers.iter().map(|nf| &nf.0).chain([&self.h_sig]);
        for (i, digest) in digests.enumerate() {
            let (head, tail) = split_digest(digest);
            words.push(head);
            residual |= BigUint::from(tail) << (DIGEST_RESIDUAL_BITS * i);
        }
        words.push(biguint_to_word(&residual));
        words
    }

    /// Inverse of [`pack`](Self::pack)
    pub fn unpack(words: &[Word]) -> Result<Self> {
        if words.len() != NUM_PUBLIC_INPUTS {
            return Err(MixerError::InvalidProof(format!(
                "expected {NUM_PUBLIC_INPUTS} public inputs, got {}",
                words.len()
            )));
        }
        let residual = BigUint::from_bytes_be(&words[RESIDUAL_BITS_INDEX]);
        let (v_in, v_out) = public_values_from_residual(&residual)?;

        let mut digests = [[0u8; 32]; NUM_INPUT_DIGESTS];
        for (i, digest) in digests.iter_mut().enumerate() {
            let tail = (&residual >> (DIGEST_RESIDUAL_BITS * i)) & BigUint::from(7u8);
            let tail = tail.to_u32_digits().first().copied().unwrap_or(0) as u8;
            *digest = join_digest(&words[NULLIFIERS_INDEX + i], tail);
        }

        Ok(Self {
            root: words[ROOT_INDEX],
            commitments: std::array::from_fn(|i| Commitment(words[COMMITMENTS_INDEX + i])),
            nullifiers: std::array::from_fn(|i| Nullifier(digests[i])),
            h_sig: digests[JS_INPUTS],
            v_in,
            v_out,
        })
    }
}

/// `(v_in, v_out)` carried in the residual word of packed inputs
pub fn extract_public_values(words: &[Word]) -> Result<(u64, u64)> {
    let residual = words.get(RESIDUAL_BITS_INDEX).ok_or_else(|| {
        MixerError::InvalidProof(format!("no residual word in {} inputs", words.len()))
    })?;
    public_values_from_residual(&BigUint::from_bytes_be(residual))
}

fn public_values_from_residual(residual: &BigUint) -> Result<(u64, u64)> {
    let values = residual >> TOTAL_DIGEST_RESIDUAL_BITS;
    let mask = (BigUint::from(1u8) << PUBLIC_VALUE_BITS) - 1u8;
    let v_out = to_u64(&(&values & &mask));
    let v_in_big = &values >> PUBLIC_VALUE_BITS;
    if v_in_big > BigUint::from(u64::MAX) {
        return Err(MixerError::InvalidProof("residual word overflows v_in".into()));
    }
    Ok((to_u64(&v_in_big), v_out))
}

fn to_u64(value: &BigUint) -> u64 {
    value.to_u64_digits().first().copied().unwrap_or(0)
}

/// Low 253 bits as a word, top 3 bits as an integer
fn split_digest(digest: &[u8; 32]) -> (Word, u8) {
    let mut head = *digest;
    head[0] &= DIGEST_HEAD_MASK;
    let tail = digest[0] >> (8 - DIGEST_RESIDUAL_BITS);
    (head, tail)
}

fn join_digest(head: &Word, tail: u8) -> [u8; 32] {
    let mut digest = *head;
    digest[0] = (digest[0] & DIGEST_HEAD_MASK) | (tail << (8 - DIGEST_RESIDUAL_BITS));
    digest
}

fn biguint_to_word(value: &BigUint) -> Word {
    let bytes = value.to_bytes_be();
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    word
}

const _: () = assert!(PUBLIC_VALUE_BITS * 2 + TOTAL_DIGEST_RESIDUAL_BITS < 253);
