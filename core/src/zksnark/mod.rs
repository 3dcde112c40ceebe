//! zk-SNARK proof systems
//!
//! The mixer contract can be deployed against either of two BN254 proof
//! systems. Proofs and verification keys are tagged enums over the
//! per-system types; [`SnarkScheme`] is the capability every system
//! provides (contract encoding and pairing verification).
//!
//! Curve points are encoded for the contract as 32-byte words, G2
//! coordinates in EVM precompile order `[x.c1, x.c0, y.c1, y.c0]`.

pub mod groth16;
pub mod pghr13;

use ark_bn254::{Fr, G1Affine, G2Affine};
use serde::{Deserialize, Serialize};
use shroud_privacy::curve::{Word, g1_from_words, g1_to_words, g2_from_words, g2_to_words};
use shroud_privacy::field::{fr_from_bytes, is_canonical};

use crate::error::{MixerError, Result};

pub use groth16::Groth16;
pub use pghr13::Pghr13;

/// Supported proof systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofSystem {
    Groth16,
    Pghr13,
}

impl From<shroud_config::ProofSystemKind> for ProofSystem {
    fn from(kind: shroud_config::ProofSystemKind) -> Self {
        match kind {
            shroud_config::ProofSystemKind::Groth16 => Self::Groth16,
            shroud_config::ProofSystemKind::Pghr13 => Self::Pghr13,
        }
    }
}

/// Operations every proof system supports
pub trait SnarkScheme {
    type Proof;
    type VerificationKey;

    const SYSTEM: ProofSystem;

    fn proof_to_words(proof: &Self::Proof) -> Vec<Word>;

    fn proof_from_words(words: &[Word]) -> Result<Self::Proof>;

    fn verification_key_to_words(vk: &Self::VerificationKey) -> Vec<Word>;

    /// Pairing check of `proof` against `vk` for the given public inputs
    fn verify(vk: &Self::VerificationKey, proof: &Self::Proof, inputs: &[Fr]) -> Result<bool>;
}

/// G1 point, serialized as two hex coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct G1Point(pub G1Affine);

impl G1Point {
    pub fn to_words(&self) -> [Word; 2] {
        g1_to_words(&self.0)
    }

    pub fn from_words(words: &[Word]) -> Result<Self> {
        let words: [Word; 2] = words
            .try_into()
            .map_err(|_| MixerError::InvalidProof("G1 point needs 2 words".into()))?;
        Ok(Self(g1_from_words(&words)?))
    }
}

impl From<G1Point> for Vec<String> {
    fn from(p: G1Point) -> Self {
        p.to_words().iter().map(hex::encode).collect()
    }
}

impl TryFrom<Vec<String>> for G1Point {
    type Error = MixerError;

    fn try_from(coords: Vec<String>) -> Result<Self> {
        G1Point::from_words(&decode_words(&coords)?)
    }
}

/// G2 point, serialized as four hex coordinates `[x.c0, x.c1, y.c0, y.c1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct G2Point(pub G2Affine);

impl G2Point {
    /// Contract order `[x.c1, x.c0, y.c1, y.c0]`
    pub fn to_words(&self) -> [Word; 4] {
        let [x0, x1, y0, y1] = g2_to_words(&self.0);
        [x1, x0, y1, y0]
    }

    pub fn from_words(words: &[Word]) -> Result<Self> {
        let [x1, x0, y1, y0]: [Word; 4] = words
            .try_into()
            .map_err(|_| MixerError::InvalidProof("G2 point needs 4 words".into()))?;
        Ok(Self(g2_from_words(&[x0, x1, y0, y1])?))
    }
}

impl From<G2Point> for Vec<String> {
    fn from(p: G2Point) -> Self {
        g2_to_words(&p.0).iter().map(hex::encode).collect()
    }
}

impl TryFrom<Vec<String>> for G2Point {
    type Error = MixerError;

    fn try_from(coords: Vec<String>) -> Result<Self> {
        let words: [Word; 4] = decode_words(&coords)?
            .try_into()
            .map_err(|_| MixerError::InvalidProof("G2 point needs 4 coordinates".into()))?;
        Ok(Self(g2_from_words(&words)?))
    }
}

fn decode_words(coords: &[String]) -> Result<Vec<Word>> {
    coords
        .iter()
        .map(|c| {
            shroud_privacy::hex_serde::decode_array(c)
                .map_err(|e| MixerError::Serialization(format!("bad coordinate {c:?}: {e}")))
        })
        .collect()
}

/// Reads a point of `N` words off the front of `words`
pub(crate) fn take<'a, const N: usize>(words: &mut &'a [Word], what: &str) -> Result<&'a [Word]> {
    if words.len() < N {
        return Err(MixerError::InvalidProof(format!("truncated {what}")));
    }
    let all: &'a [Word] = *words;
    let (head, rest) = all.split_at(N);
    *words = rest;
    Ok(head)
}

/// Public inputs as scalars, rejecting words outside the field
pub fn inputs_to_scalars(inputs: &[Word]) -> Result<Vec<Fr>> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, word)| {
            if !is_canonical(word) {
                return Err(MixerError::InvalidProof(format!(
                    "public input {i} is not a field element"
                )));
            }
            Ok(fr_from_bytes(word))
        })
        .collect()
}

/// A proof for either system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "system", rename_all = "lowercase")]
pub enum Proof {
    Groth16(groth16::Proof),
    Pghr13(pghr13::Proof),
}

impl Proof {
    pub fn system(&self) -> ProofSystem {
        match self {
            Proof::Groth16(_) => ProofSystem::Groth16,
            Proof::Pghr13(_) => ProofSystem::Pghr13,
        }
    }

    pub fn to_contract_parameters(&self) -> Vec<Word> {
        match self {
            Proof::Groth16(p) => Groth16::proof_to_words(p),
            Proof::Pghr13(p) => Pghr13::proof_to_words(p),
        }
    }

    pub fn from_contract_parameters(system: ProofSystem, words: &[Word]) -> Result<Self> {
        Ok(match system {
            ProofSystem::Groth16 => Proof::Groth16(Groth16::proof_from_words(words)?),
            ProofSystem::Pghr13 => Proof::Pghr13(Pghr13::proof_from_words(words)?),
        })
    }
}

/// A verification key for either system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "system", rename_all = "lowercase")]
pub enum VerificationKey {
    Groth16(groth16::VerificationKey),
    Pghr13(pghr13::VerificationKey),
}

impl VerificationKey {
    pub fn system(&self) -> ProofSystem {
        match self {
            VerificationKey::Groth16(_) => ProofSystem::Groth16,
            VerificationKey::Pghr13(_) => ProofSystem::Pghr13,
        }
    }

    pub fn to_contract_parameters(&self) -> Vec<Word> {
        match self {
            VerificationKey::Groth16(vk) => Groth16::verification_key_to_words(vk),
            VerificationKey::Pghr13(vk) => Pghr13::verification_key_to_words(vk),
        }
    }

    /// Verify `proof` for the given public input words
    pub fn verify(&self, proof: &Proof, inputs: &[Word]) -> Result<bool> {
        let scalars = inputs_to_scalars(inputs)?;
        match (self, proof) {
            (VerificationKey::Groth16(vk), Proof::Groth16(p)) => Groth16::verify(vk, p, &scalars),
            (VerificationKey::Pghr13(vk), Proof::Pghr13(p)) => Pghr13::verify(vk, p, &scalars),
            _ => Err(MixerError::InvalidProof(format!(
                "{:?} proof checked against {:?} key",
                proof.system(),
                self.system()
            ))),
        }
    }
}

/// A proof together with the public inputs it was produced for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedProof {
    pub proof: Proof,
    #[serde(with = "shroud_privacy::hex_serde::words")]
    pub inputs: Vec<Word>,
}

impl ExtendedProof {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// `abc[0] + Σ x_i · abc[i+1]`
pub(crate) fn linear_combination(bases: &[G1Point], inputs: &[Fr]) -> Result<ark_bn254::G1Projective> {
    if bases.len() != inputs.len() + 1 {
        return Err(MixerError::InvalidProof(format!(
            "verification key expects {} inputs, got {}",
            bases.len().saturating_sub(1),
            inputs.len()
        )));
    }
    let mut acc = ark_bn254::G1Projective::from(bases[0].0);
    for (base, x) in bases[1..].iter().zip(inputs) {
        acc += base.0 * *x;
    }
    Ok(acc)
}
