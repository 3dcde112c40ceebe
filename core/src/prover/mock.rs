//! In-process prover for development and tests
//!
//! Checks the join-split relation directly on the witness and, if it holds,
//! emits a proof built from simulation trapdoors. The proofs pass the same
//! pairing checks as real ones against this prover's verification key.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::OsRng;
use shroud_privacy::nullifier::derive_nullifier_from_slices;
use shroud_privacy::prf::prf_addr;
use shroud_privacy::{JS_INPUTS, JS_OUTPUTS, derive_output_randomness};

use super::{JoinSplitInput, ProofInputs, ProverService};
use crate::error::{ProverError, ProverResult};
use crate::public_inputs::{NUM_PUBLIC_INPUTS, PublicInputs};
use crate::zksnark::{
    ExtendedProof, Proof, ProofSystem, VerificationKey, groth16, inputs_to_scalars, pghr13,
};

enum Trapdoor {
    Groth16(groth16::SimulationTrapdoor),
    Pghr13(pghr13::SimulationTrapdoor),
}

/// Mock prover for development
pub struct MockProver {
    trapdoor: Trapdoor,
    vk: VerificationKey,
    proofs_generated: AtomicUsize,
}

impl MockProver {
    pub fn new(system: ProofSystem) -> Self {
        let (trapdoor, vk) = match system {
            ProofSystem::Groth16 => {
                let (t, vk) = groth16::SimulationTrapdoor::setup(NUM_PUBLIC_INPUTS, &mut OsRng);
                (Trapdoor::Groth16(t), VerificationKey::Groth16(vk))
            }
            ProofSystem::Pghr13 => {
                let (t, vk) = pghr13::SimulationTrapdoor::setup(NUM_PUBLIC_INPUTS, &mut OsRng);
                (Trapdoor::Pghr13(t), VerificationKey::Pghr13(vk))
            }
        };
        Self {
            trapdoor,
            vk,
            proofs_generated: AtomicUsize::new(0),
        }
    }

    /// Number of proofs produced so far
    pub fn proofs_generated(&self) -> usize {
        self.proofs_generated.load(Ordering::Relaxed)
    }

    fn check_input(index: usize, input: &JoinSplitInput, root: &[u8; 32]) -> ProverResult<()> {
        let reject = |msg: &str| Err(ProverError::Rejected(format!("input {index}: {msg}")));

        let nullifier = derive_nullifier_from_slices(&input.spending_ask, input.note.rho.as_bytes())
            .map_err(|e| ProverError::Rejected(e.to_string()))?;
        if nullifier != input.nullifier {
            return reject("nullifier does not match note");
        }
        if prf_addr(&input.spending_ask) != *input.note.owner.as_bytes() {
            return reject("spending key does not own note");
        }
        // Zero-value inputs need not be in the tree
        if input.note.value.0 != 0 {
            if input.merkle_path.address != input.address {
                return reject("path address differs from note address");
            }
            if !input.merkle_path.verify(&input.note.commitment(), root) {
                return reject("note not in tree under root");
            }
        }
        Ok(())
    }

    fn check_statement(inputs: &ProofInputs) -> ProverResult<()> {
        if inputs.js_inputs.len() != JS_INPUTS || inputs.js_outputs.len() != JS_OUTPUTS {
            return Err(ProverError::Rejected(format!(
                "expected {JS_INPUTS} inputs and {JS_OUTPUTS} outputs, got {} and {}",
                inputs.js_inputs.len(),
                inputs.js_outputs.len()
            )));
        }
        for (i, input) in inputs.js_inputs.iter().enumerate() {
            Self::check_input(i, input, &inputs.mk_root)?;
        }
        for (i, output) in inputs.js_outputs.iter().enumerate() {
            if output.rho != derive_output_randomness(&inputs.phi, &inputs.h_sig, i) {
                return Err(ProverError::Rejected(format!(
                    "output {i}: rho not derived from phi and h_sig"
                )));
            }
        }

        let total_in = inputs.pub_in_value as u128
            + inputs.js_inputs.iter().map(|i| i.note.value.0 as u128).sum::<u128>();
        let total_out = inputs.pub_out_value as u128
            + inputs.js_outputs.iter().map(|o| o.value.0 as u128).sum::<u128>();
        if total_in != total_out {
            return Err(ProverError::Rejected(format!(
                "value not conserved: {total_in} in, {total_out} out"
            )));
        }
        Ok(())
    }
}

impl ProverService for MockProver {
    fn proof_system(&self) -> ProofSystem {
        self.vk.system()
    }

    fn verification_key(&self) -> ProverResult<VerificationKey> {
        Ok(self.vk.clone())
    }

    fn prove(&self, inputs: &ProofInputs) -> ProverResult<ExtendedProof> {
        Self::check_statement(inputs)?;

        let public = PublicInputs {
            root: inputs.mk_root,
            commitments: std::array::from_fn(|i| inputs.js_outputs[i].commitment()),
            nullifiers: std::array::from_fn(|i| inputs.js_inputs[i].nullifier),
            h_sig: inputs.h_sig,
            v_in: inputs.pub_in_value,
            v_out: inputs.pub_out_value,
        };
        let words = public.pack();
        let scalars =
            inputs_to_scalars(&words).map_err(|e| ProverError::Rejected(e.to_string()))?;

        let proof = match &self.trapdoor {
            Trapdoor::Groth16(t) => t.simulate(&scalars, &mut OsRng).map(Proof::Groth16),
            Trapdoor::Pghr13(t) => t.simulate(&scalars, &mut OsRng).map(Proof::Pghr13),
        }
        .map_err(|e| ProverError::Rejected(e.to_string()))?;

        let n = self.proofs_generated.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!(
            "Mock prover produced {:?} proof #{n} (v_in={}, v_out={})",
            self.vk.system(),
            inputs.pub_in_value,
            inputs.pub_out_value
        );

        Ok(ExtendedProof {
            proof,
            inputs: words,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_privacy::{MerkleTree, Note, OwnershipSecretKey};

    fn statement(value: u64) -> ProofInputs {
        let a_sk = OwnershipSecretKey::random(&mut OsRng);
        let a_pk = a_sk.public_key();

        let mut tree = MerkleTree::new(4);
        let note = Note::new(a_pk, value, &mut OsRng);
        let address = tree.insert(&note.commitment()).unwrap();
        let root = tree.recompute_root();

        let dummy = Note::dummy(a_pk, &mut OsRng);
        let js_inputs = [(note, address), (dummy, 0)]
            .into_iter()
            .map(|(note, address)| JoinSplitInput {
                merkle_path: tree.get_path(address).unwrap(),
                address,
                nullifier: note.nullifier(&a_sk),
                note,
                spending_ask: *a_sk.as_bytes(),
            })
            .collect();

        let phi = [7u8; 32];
        let h_sig = [9u8; 32];
        let js_outputs = (0..JS_OUTPUTS)
            .map(|i| {
                let rho = derive_output_randomness(&phi, &h_sig, i);
                Note::with_rho(a_pk, if i == 0 { value } else { 0 }, rho, &mut OsRng)
            })
            .collect();

        ProofInputs {
            mk_root: root,
            js_inputs,
            js_outputs,
            pub_in_value: 0,
            pub_out_value: 0,
            h_sig,
            phi,
        }
    }

    #[test]
    fn test_proof_verifies() {
        for system in [ProofSystem::Groth16, ProofSystem::Pghr13] {
            let prover = MockProver::new(system);
            let ext = prover.prove(&statement(100)).unwrap();
            let vk = prover.verification_key().unwrap();
            assert!(vk.verify(&ext.proof, &ext.inputs).unwrap());
            assert_eq!(prover.proofs_generated(), 1);
        }
    }

    #[test]
    fn test_rejects_unbalanced() {
        let prover = MockProver::new(ProofSystem::Groth16);
        let mut inputs = statement(100);
        inputs.pub_out_value = 1;
        assert!(matches!(prover.prove(&inputs), Err(ProverError::Rejected(_))));
    }

    #[test]
    fn test_rejects_wrong_root() {
        let prover = MockProver::new(ProofSystem::Groth16);
        let mut inputs = statement(100);
        inputs.mk_root = [0u8; 32];
        assert!(prover.prove(&inputs).is_err());
    }

    #[test]
    fn test_rejects_foreign_note() {
        let prover = MockProver::new(ProofSystem::Pghr13);
        let mut inputs = statement(100);
        inputs.js_inputs[0].spending_ask = [1u8; 32];
        assert!(prover.prove(&inputs).is_err());
    }

    #[test]
    fn test_rejects_free_rho() {
        let prover = MockProver::new(ProofSystem::Groth16);
        let mut inputs = statement(100);
        inputs.phi = [8u8; 32];
        assert!(prover.prove(&inputs).is_err());
        assert_eq!(prover.proofs_generated(), 0);
    }
}
