//! Groth16 over BN254
//!
//! Verification equation:
//!
//! ```text
//! e(A, B) = e(α, β) · e(vk_x, γ) · e(C, δ)      vk_x = abc[0] + Σ x_i · abc[i+1]
//! ```

use ark_bn254::{Bn254, Fr, G1Affine, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, Zero};
use ark_std::rand::Rng;
use serde::{Deserialize, Serialize};
use shroud_privacy::curve::Word;

use super::{G1Point, G2Point, ProofSystem, SnarkScheme, linear_combination, take};
use crate::error::{MixerError, Result};

/// Number of contract words in a Groth16 proof
pub const PROOF_WORDS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub a: G1Point,
    pub b: G2Point,
    pub c: G1Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    pub alpha: G1Point,
    pub beta: G2Point,
    pub gamma: G2Point,
    pub delta: G2Point,
    pub abc: Vec<G1Point>,
}

pub struct Groth16;

impl SnarkScheme for Groth16 {
    type Proof = Proof;
    type VerificationKey = VerificationKey;

    const SYSTEM: ProofSystem = ProofSystem::Groth16;

    fn proof_to_words(proof: &Proof) -> Vec<Word> {
        let mut words = Vec::with_capacity(PROOF_WORDS);
        words.extend(proof.a.to_words());
        words.extend(proof.b.to_words());
        words.extend(proof.c.to_words());
        words
    }

    fn proof_from_words(words: &[Word]) -> Result<Proof> {
        if words.len() != PROOF_WORDS {
            return Err(MixerError::InvalidProof(format!(
                "groth16 proof needs {PROOF_WORDS} words, got {}",
                words.len()
            )));
        }
        let mut rest = words;
        Ok(Proof {
            a: G1Point::from_words(take::<2>(&mut rest, "a")?)?,
            b: G2Point::from_words(take::<4>(&mut rest, "b")?)?,
            c: G1Point::from_words(take::<2>(&mut rest, "c")?)?,
        })
    }

    fn verification_key_to_words(vk: &VerificationKey) -> Vec<Word> {
        let mut words = Vec::with_capacity(14 + 2 * vk.abc.len());
        words.extend(vk.alpha.to_words());
        words.extend(vk.beta.to_words());
        words.extend(vk.gamma.to_words());
        words.extend(vk.delta.to_words());
        for point in &vk.abc {
            words.extend(point.to_words());
        }
        words
    }

    fn verify(vk: &VerificationKey, proof: &Proof, inputs: &[Fr]) -> Result<bool> {
        let vk_x = linear_combination(&vk.abc, inputs)?.into_affine();

        let lhs = Bn254::pairing(proof.a.0, proof.b.0);
        let rhs = Bn254::pairing(vk.alpha.0, vk.beta.0)
            + Bn254::pairing(vk_x, vk.gamma.0)
            + Bn254::pairing(proof.c.0, vk.delta.0);
        Ok(lhs == rhs)
    }
}

/// Setup randomness that lets a holder produce proofs for any statement
///
/// Only the mock prover holds one of these.
#[derive(Debug, Clone)]
pub struct SimulationTrapdoor {
    alpha: Fr,
    beta: Fr,
    gamma: Fr,
    delta: Fr,
    abc: Vec<Fr>,
}

impl SimulationTrapdoor {
    /// Samples a trapdoor and the matching key for `num_inputs` public inputs
    pub fn setup<R: Rng>(num_inputs: usize, rng: &mut R) -> (Self, VerificationKey) {
        let trapdoor = Self {
            alpha: nonzero(rng),
            beta: nonzero(rng),
            gamma: nonzero(rng),
            delta: nonzero(rng),
            abc: (0..=num_inputs).map(|_| nonzero(rng)).collect(),
        };
        let vk = VerificationKey {
            alpha: g1(trapdoor.alpha),
            beta: g2(trapdoor.beta),
            gamma: g2(trapdoor.gamma),
            delta: g2(trapdoor.delta),
            abc: trapdoor.abc.iter().copied().map(g1).collect(),
        };
        (trapdoor, vk)
    }

    /// Produces a proof that verifies for `inputs`
    pub fn simulate<R: Rng>(&self, inputs: &[Fr], rng: &mut R) -> Result<Proof> {
        if inputs.len() + 1 != self.abc.len() {
            return Err(MixerError::InvalidProof(format!(
                "trapdoor expects {} inputs, got {}",
                self.abc.len() - 1,
                inputs.len()
            )));
        }
        let x = self.abc[0]
            + inputs
                .iter()
                .zip(&self.abc[1..])
                .map(|(x, u)| *x * u)
                .sum::<Fr>();

        let a = nonzero(rng);
        let b = nonzero(rng);
        let delta_inv = self
            .delta
            .inverse()
            .ok_or_else(|| MixerError::InvalidProof("degenerate trapdoor".into()))?;
        let c = (a * b - self.alpha * self.beta - self.gamma * x) * delta_inv;

        Ok(Proof {
            a: g1(a),
            b: g2(b),
            c: g1(c),
        })
    }
}

pub(crate) fn nonzero<R: Rng>(rng: &mut R) -> Fr {
    loop {
        let s = <Fr as ark_std::UniformRand>::rand(rng);
        if !s.is_zero() {
            return s;
        }
    }
}

pub(crate) fn g1(s: Fr) -> G1Point {
    G1Point((G1Affine::generator() * s).into_affine())
}

pub(crate) fn g2(s: Fr) -> G2Point {
    G2Point((G2Affine::generator() * s).into_affine())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn inputs() -> Vec<Fr> {
        (1..=7u64).map(Fr::from).collect()
    }

    #[test]
    fn test_simulated_proof_verifies() {
        let (trapdoor, vk) = SimulationTrapdoor::setup(7, &mut OsRng);
        let proof = trapdoor.simulate(&inputs(), &mut OsRng).unwrap();
        assert!(Groth16::verify(&vk, &proof, &inputs()).unwrap());
    }

    #[test]
    fn test_wrong_inputs_fail() {
        let (trapdoor, vk) = SimulationTrapdoor::setup(7, &mut OsRng);
        let proof = trapdoor.simulate(&inputs(), &mut OsRng).unwrap();

        let mut tampered = inputs();
        tampered[3] += Fr::from(1u64);
        assert!(!Groth16::verify(&vk, &proof, &tampered).unwrap());
        assert!(Groth16::verify(&vk, &proof, &inputs()[..6]).is_err());
    }

    #[test]
    fn test_contract_words() {
        let (trapdoor, vk) = SimulationTrapdoor::setup(7, &mut OsRng);
        let proof = trapdoor.simulate(&inputs(), &mut OsRng).unwrap();

        let words = Groth16::proof_to_words(&proof);
        assert_eq!(words.len(), PROOF_WORDS);
        assert_eq!(Groth16::proof_from_words(&words).unwrap(), proof);
        assert!(Groth16::proof_from_words(&words[..7]).is_err());

        assert_eq!(Groth16::verification_key_to_words(&vk).len(), 14 + 2 * 8);
    }
}
