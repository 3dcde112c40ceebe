//! One-time Schnorr signatures over BN254 G1
//!
//! Two-tier construction (Bellare–Shoup):
//!
//! ```text
//! sk = (x, y)                    random scalars
//! vk = (X, Y) = (x·G, y·G)
//! c  = SHA-256(Y ‖ m) mod r
//! σ  = y + c·x
//! verify: σ·G == Y + c·X
//! ```
//!
//! A key pair must sign exactly one message; a second signature under the
//! same key reveals `x`. Every join-split uses a fresh pair, bound to the
//! transaction through `h_sig`.

use ark_bn254::{Fr, G1Affine, G1Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_std::UniformRand;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::curve::{Word, g1_from_words, g1_to_words};
use crate::error::{PrivacyError, Result};
use crate::field::{fr_from_bytes, fr_to_bytes};

/// Encoded verification key size
pub const VERIFICATION_KEY_LENGTH: usize = 128;

#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecretKey {
    x: Fr,
    y: Fr,
}

impl std::fmt::Debug for SigningSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecretKey(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EncodedVerificationKey", into = "EncodedVerificationKey")]
pub struct SigningVerificationKey {
    /// `X = x·G`
    pub ppk: G1Affine,
    /// `Y = y·G`
    pub spk: G1Affine,
}

impl SigningVerificationKey {
    /// Contract encoding `[X.x, X.y, Y.x, Y.y]`
    pub fn to_words(&self) -> [Word; 4] {
        let [px, py] = g1_to_words(&self.ppk);
        let [sx, sy] = g1_to_words(&self.spk);
        [px, py, sx, sy]
    }

    pub fn from_words(words: &[Word; 4]) -> Result<Self> {
        Ok(Self {
            ppk: g1_from_words(&[words[0], words[1]])?,
            spk: g1_from_words(&[words[2], words[3]])?,
        })
    }

    /// The words concatenated, as hashed into `h_sig`
    pub fn to_bytes(&self) -> [u8; VERIFICATION_KEY_LENGTH] {
        let mut out = [0u8; VERIFICATION_KEY_LENGTH];
        for (chunk, word) in out.chunks_exact_mut(32).zip(self.to_words()) {
            chunk.copy_from_slice(&word);
        }
        out
    }
}

#[derive(Serialize, Deserialize)]
struct EncodedVerificationKey {
    #[serde(with = "crate::hex_serde::words")]
    ppk: Vec<Word>,
    #[serde(with = "crate::hex_serde::words")]
    spk: Vec<Word>,
}

impl From<SigningVerificationKey> for EncodedVerificationKey {
    fn from(vk: SigningVerificationKey) -> Self {
        Self {
            ppk: g1_to_words(&vk.ppk).to_vec(),
            spk: g1_to_words(&vk.spk).to_vec(),
        }
    }
}

impl TryFrom<EncodedVerificationKey> for SigningVerificationKey {
    type Error = PrivacyError;

    fn try_from(encoded: EncodedVerificationKey) -> Result<Self> {
        let pair = |words: Vec<Word>| -> Result<G1Affine> {
            let words: [Word; 2] = words
                .try_into()
                .map_err(|_| PrivacyError::InvalidPoint("expected 2 coordinates".into()))?;
            g1_from_words(&words)
        };
        Ok(Self {
            ppk: pair(encoded.ppk)?,
            spk: pair(encoded.spk)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKeyPair {
    pub secret: SigningSecretKey,
    pub public: SigningVerificationKey,
}

impl SigningKeyPair {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let x = Fr::rand(rng);
        let y = Fr::rand(rng);
        let g = G1Affine::generator();
        let public = SigningVerificationKey {
            ppk: (g * x).into_affine(),
            spk: (g * y).into_affine(),
        };
        Self {
            secret: SigningSecretKey { x, y },
            public,
        }
    }
}

/// Signature scalar `σ`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature(pub Fr);

impl Signature {
    pub fn to_word(&self) -> Word {
        fr_to_bytes(&self.0)
    }

    pub fn from_word(word: &Word) -> Self {
        Self(fr_from_bytes(word))
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        hex::encode(sig.to_word())
    }
}

impl TryFrom<String> for Signature {
    type Error = PrivacyError;

    fn try_from(s: String) -> Result<Self> {
        crate::hex_serde::decode_array(&s)
            .map(|word| Signature::from_word(&word))
            .map_err(PrivacyError::InvalidHex)
    }
}

fn challenge(spk: &G1Affine, message: &[u8]) -> Fr {
    let [y_x, y_y] = g1_to_words(spk);
    let mut hasher = Sha256::new();
    hasher.update(y_x);
    hasher.update(y_y);
    hasher.update(message);
    fr_from_bytes(&hasher.finalize().into())
}

/// Sign `message`. Each key pair must only ever sign one message.
pub fn sign(keys: &SigningKeyPair, message: &[u8]) -> Signature {
    let c = challenge(&keys.public.spk, message);
    Signature(keys.secret.y + c * keys.secret.x)
}

pub fn verify(vk: &SigningVerificationKey, message: &[u8], signature: &Signature) -> bool {
    let c = challenge(&vk.spk, message);
    let g = G1Affine::generator();
    let lhs = g * signature.0;
    let rhs = G1Projective::from(vk.spk) + vk.ppk * c;
    lhs == rhs
}
