//! PGHR13 over BN254
//!
//! Knowledge commitments are checked pairwise, then the divisibility and
//! same-coefficient checks:
//!
//! ```text
//! e(A, vk.a)                = e(A', g2)
//! e(vk.b, B)                = e(B', g2)
//! e(C, vk.c)                = e(C', g2)
//! e(vk_x + A, B)            = e(H, vk.z) · e(C, g2)
//! e(K, vk.γ)                = e(vk_x + A + C, vk.γβ₂) · e(vk.γβ₁, B)
//! ```

use ark_bn254::{Bn254, Fr, G1Projective, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Field;
use ark_std::rand::Rng;
use serde::{Deserialize, Serialize};
use shroud_privacy::curve::Word;

use super::groth16::{g1, g2, nonzero};
use super::{G1Point, G2Point, ProofSystem, SnarkScheme, linear_combination, take};
use crate::error::{MixerError, Result};

/// Number of contract words in a PGHR13 proof
pub const PROOF_WORDS: usize = 18;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub a: G1Point,
    pub a_p: G1Point,
    pub b: G2Point,
    pub b_p: G1Point,
    pub c: G1Point,
    pub c_p: G1Point,
    pub h: G1Point,
    pub k: G1Point,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    pub a: G2Point,
    pub b: G1Point,
    pub c: G2Point,
    pub gamma: G2Point,
    pub gamma_beta_g1: G1Point,
    pub gamma_beta_g2: G2Point,
    pub z: G2Point,
    pub ic: Vec<G1Point>,
}

pub struct Pghr13;

impl SnarkScheme for Pghr13 {
    type Proof = Proof;
    type VerificationKey = VerificationKey;

    const SYSTEM: ProofSystem = ProofSystem::Pghr13;

    fn proof_to_words(proof: &Proof) -> Vec<Word> {
        let mut words = Vec::with_capacity(PROOF_WORDS);
        words.extend(proof.a.to_words());
        words.extend(proof.a_p.to_words());
        words.extend(proof.b.to_words());
        words.extend(proof.b_p.to_words());
        words.extend(proof.c.to_words());
        words.extend(proof.c_p.to_words());
        words.extend(proof.h.to_words());
        words.extend(proof.k.to_words());
        words
    }

    fn proof_from_words(words: &[Word]) -> Result<Proof> {
        if words.len() != PROOF_WORDS {
            return Err(MixerError::InvalidProof(format!(
                "pghr13 proof needs {PROOF_WORDS} words, got {}",
                words.len()
            )));
        }
        let mut rest = words;
        Ok(Proof {
            a: G1Point::from_words(take::<2>(&mut rest, "a")?)?,
            a_p: G1Point::from_words(take::<2>(&mut rest, "a_p")?)?,
            b: G2Point::from_words(take::<4>(&mut rest, "b")?)?,
            b_p: G1Point::from_words(take::<2>(&mut rest, "b_p")?)?,
            c: G1Point::from_words(take::<2>(&mut rest, "c")?)?,
            c_p: G1Point::from_words(take::<2>(&mut rest, "c_p")?)?,
            h: G1Point::from_words(take::<2>(&mut rest, "h")?)?,
            k: G1Point::from_words(take::<2>(&mut rest, "k")?)?,
        })
    }

    fn verification_key_to_words(vk: &VerificationKey) -> Vec<Word> {
        let mut words = Vec::with_capacity(24 + 2 * vk.ic.len());
        words.extend(vk.a.to_words());
        words.extend(vk.b.to_words());
        words.extend(vk.c.to_words());
        words.extend(vk.gamma.to_words());
        words.extend(vk.gamma_beta_g1.to_words());
        words.extend(vk.gamma_beta_g2.to_words());
        words.extend(vk.z.to_words());
        for point in &vk.ic {
            words.extend(point.to_words());
        }
        words
    }

    fn verify(vk: &VerificationKey, proof: &Proof, inputs: &[Fr]) -> Result<bool> {
        let g2_gen = G2Affine::generator();
        let vk_x = linear_combination(&vk.ic, inputs)?;

        if Bn254::pairing(proof.a.0, vk.a.0) != Bn254::pairing(proof.a_p.0, g2_gen) {
            log::debug!("pghr13: knowledge commitment for A failed");
            return Ok(false);
        }
        if Bn254::pairing(vk.b.0, proof.b.0) != Bn254::pairing(proof.b_p.0, g2_gen) {
            log::debug!("pghr13: knowledge commitment for B failed");
            return Ok(false);
        }
        if Bn254::pairing(proof.c.0, vk.c.0) != Bn254::pairing(proof.c_p.0, g2_gen) {
            log::debug!("pghr13: knowledge commitment for C failed");
            return Ok(false);
        }

        let x_plus_a = vk_x + G1Projective::from(proof.a.0);
        let lhs = Bn254::pairing(x_plus_a.into_affine(), proof.b.0);
        let rhs = Bn254::pairing(proof.h.0, vk.z.0) + Bn254::pairing(proof.c.0, g2_gen);
        if lhs != rhs {
            log::debug!("pghr13: QAP divisibility check failed");
            return Ok(false);
        }

        let x_plus_a_plus_c = (x_plus_a + G1Projective::from(proof.c.0)).into_affine();
        let lhs = Bn254::pairing(proof.k.0, vk.gamma.0);
        let rhs = Bn254::pairing(x_plus_a_plus_c, vk.gamma_beta_g2.0)
            + Bn254::pairing(vk.gamma_beta_g1.0, proof.b.0);
        if lhs != rhs {
            log::debug!("pghr13: same coefficient check failed");
            return Ok(false);
        }
        Ok(true)
    }
}

/// Setup randomness that lets a holder produce proofs for any statement
#[derive(Debug, Clone)]
pub struct SimulationTrapdoor {
    va: Fr,
    vb: Fr,
    vc: Fr,
    beta: Fr,
    z: Fr,
    ic: Vec<Fr>,
}

impl SimulationTrapdoor {
    pub fn setup<R: Rng>(num_inputs: usize, rng: &mut R) -> (Self, VerificationKey) {
        let gamma = nonzero(rng);
        let trapdoor = Self {
            va: nonzero(rng),
            vb: nonzero(rng),
            vc: nonzero(rng),
            beta: nonzero(rng),
            z: nonzero(rng),
            ic: (0..=num_inputs).map(|_| nonzero(rng)).collect(),
        };
        let vk = VerificationKey {
            a: g2(trapdoor.va),
            b: g1(trapdoor.vb),
            c: g2(trapdoor.vc),
            gamma: g2(gamma),
            gamma_beta_g1: g1(gamma * trapdoor.beta),
            gamma_beta_g2: g2(gamma * trapdoor.beta),
            z: g2(trapdoor.z),
            ic: trapdoor.ic.iter().copied().map(g1).collect(),
        };
        (trapdoor, vk)
    }

    pub fn simulate<R: Rng>(&self, inputs: &[Fr], rng: &mut R) -> Result<Proof> {
        if inputs.len() + 1 != self.ic.len() {
            return Err(MixerError::InvalidProof(format!(
                "trapdoor expects {} inputs, got {}",
                self.ic.len() - 1,
                inputs.len()
            )));
        }
        let x = self.ic[0]
            + inputs
                .iter()
                .zip(&self.ic[1..])
                .map(|(x, u)| *x * u)
                .sum::<Fr>();

        let a = nonzero(rng);
        let b = nonzero(rng);
        let c = nonzero(rng);
        let z_inv = self
            .z
            .inverse()
            .ok_or_else(|| MixerError::InvalidProof("degenerate trapdoor".into()))?;
        let h = ((x + a) * b - c) * z_inv;
        let k = self.beta * (x + a + b + c);

        Ok(Proof {
            a: g1(a),
            a_p: g1(self.va * a),
            b: g2(b),
            b_p: g1(self.vb * b),
            c: g1(c),
            c_p: g1(self.vc * c),
            h: g1(h),
            k: g1(k),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_simulated_proof_verifies() {
        let inputs: Vec<Fr> = (10..17u64).map(Fr::from).collect();
        let (trapdoor, vk) = SimulationTrapdoor::setup(inputs.len(), &mut OsRng);
        let proof = trapdoor.simulate(&inputs, &mut OsRng).unwrap();
        assert!(Pghr13::verify(&vk, &proof, &inputs).unwrap());

        let words = Pghr13::proof_to_words(&proof);
        assert_eq!(words.len(), PROOF_WORDS);
        assert_eq!(Pghr13::proof_from_words(&words).unwrap(), proof);
    }

    #[test]
    fn test_tampered_proof_fails() {
        let inputs: Vec<Fr> = (10..17u64).map(Fr::from).collect();
        let (trapdoor, vk) = SimulationTrapdoor::setup(inputs.len(), &mut OsRng);
        let mut proof = trapdoor.simulate(&inputs, &mut OsRng).unwrap();

        let mut other = inputs.clone();
        other[6] = Fr::from(0u64);
        assert!(!Pghr13::verify(&vk, &proof, &other).unwrap());

        proof.a_p = proof.a;
        assert!(!Pghr13::verify(&vk, &proof, &inputs).unwrap());
    }
}
