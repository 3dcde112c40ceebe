//! Join-split transaction builder
//!
//! ```text
//!  inputs ≤ J_IN ──┐                          ┌──▶ proof + primary inputs
//!                  ├─ pad ─▶ nf_i, paths ─▶ h_sig ─▶ rho_i ─▶ prover
//!  outputs ≤ J_OUT ┘                          └──▶ encrypt outputs
//!                                                          │
//!                          one-time signature over ◀───────┘
//!                sender ‖ ciphertexts ‖ proof ‖ primary inputs
//! ```
//!
//! Every input error is raised before the prover is contacted. A bundle is
//! immutable once signed: changing its proof, ciphertexts or primary inputs
//! invalidates the signature.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shroud_privacy::curve::Word;
use shroud_privacy::encryption::encrypt_note;
use shroud_privacy::signing::{self, Signature, SigningKeyPair, SigningVerificationKey};
use shroud_privacy::{
    EncryptionSecretKey, JS_INPUTS, JS_OUTPUTS, MerkleTree, Note, NoteDescription, Nullifier,
    OwnershipKeyPair, ShieldedAddress, derive_h_sig, derive_output_randomness,
};

use crate::contract::{LedgerAddress, MixCallArguments};
use crate::error::{MixerError, Result};
use crate::prover::{JoinSplitInput, ProofInputs, ProverService};
use crate::public_inputs::PublicInputs;
use crate::zksnark::ExtendedProof;

/// Replaces the default `h_sig` derivation
pub type ComputeHSig = Box<dyn Fn(&[Nullifier], &SigningVerificationKey) -> [u8; 32] + Send + Sync>;

/// Value sent to a shielded address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinSplitOutput {
    pub recipient: ShieldedAddress,
    pub value: u64,
}

impl JoinSplitOutput {
    pub fn new(recipient: ShieldedAddress, value: u64) -> Self {
        Self { recipient, value }
    }
}

/// A validated, not yet padded, join-split request
#[derive(Debug, Clone)]
pub struct MixCallDescription {
    inputs: Vec<NoteDescription>,
    outputs: Vec<JoinSplitOutput>,
    v_in: u64,
    v_out: u64,
}

impl MixCallDescription {
    pub fn new(
        inputs: Vec<NoteDescription>,
        outputs: Vec<JoinSplitOutput>,
        v_in: u64,
        v_out: u64,
    ) -> Result<Self> {
        let description = Self {
            inputs,
            outputs,
            v_in,
            v_out,
        };
        description.validate()?;
        Ok(description)
    }

    pub fn inputs(&self) -> &[NoteDescription] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[JoinSplitOutput] {
        &self.outputs
    }

    pub fn v_in(&self) -> u64 {
        self.v_in
    }

    pub fn v_out(&self) -> u64 {
        self.v_out
    }

    /// Arity and `v_in + Σ inputs = v_out + Σ outputs`
    fn validate(&self) -> Result<()> {
        if self.inputs.len() > JS_INPUTS {
            return Err(MixerError::TooManyInputs {
                max: JS_INPUTS,
                got: self.inputs.len(),
            });
        }
        if self.outputs.len() > JS_OUTPUTS {
            return Err(MixerError::TooManyOutputs {
                max: JS_OUTPUTS,
                got: self.outputs.len(),
            });
        }
        let total_in =
            self.v_in as u128 + self.inputs.iter().map(|i| i.value() as u128).sum::<u128>();
        let total_out =
            self.v_out as u128 + self.outputs.iter().map(|o| o.value as u128).sum::<u128>();
        if total_in != total_out {
            return Err(MixerError::ValueNotConserved {
                inputs: total_in,
                outputs: total_out,
            });
        }
        Ok(())
    }
}

/// Which digest a bundle's signature covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureMode {
    /// Sender, ciphertexts, proof and primary inputs
    #[default]
    Mix,
    /// As `Mix` but without the proof, for two-phase submission
    Dispatch,
}

/// Digest signed with the one-time key
pub fn joinsplit_sign_digest(
    sender: &LedgerAddress,
    ciphertexts: &[Vec<u8>],
    extended_proof: &ExtendedProof,
    mode: SignatureMode,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(sender.to_word());
    for ct in ciphertexts {
        hasher.update(ct);
    }
    if mode == SignatureMode::Mix {
        for word in extended_proof.proof.to_contract_parameters() {
            hasher.update(word);
        }
    }
    for word in &extended_proof.inputs {
        hasher.update(word);
    }
    hasher.finalize().into()
}

/// A complete, signed join-split ready for submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixParameters {
    pub extended_proof: ExtendedProof,
    pub signature_vk: SigningVerificationKey,
    pub signature: Signature,
    #[serde(with = "shroud_privacy::hex_serde::list")]
    pub ciphertexts: Vec<Vec<u8>>,
    #[serde(default)]
    pub mode: SignatureMode,
}

impl MixParameters {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_contract_arguments(&self) -> MixCallArguments {
        MixCallArguments {
            proof: self.extended_proof.proof.to_contract_parameters(),
            signature_vk: self.signature_vk.to_words().to_vec(),
            signature: self.signature.to_word(),
            public_inputs: self.extended_proof.inputs.clone(),
            ciphertexts: self.ciphertexts.clone(),
        }
    }

    /// True if the one-time signature covers this bundle as sent by `sender`
    pub fn verify_signature(&self, sender: &LedgerAddress) -> bool {
        let digest = joinsplit_sign_digest(sender, &self.ciphertexts, &self.extended_proof, self.mode);
        signing::verify(&self.signature_vk, &digest, &self.signature)
    }

    pub fn public_inputs(&self) -> Result<PublicInputs> {
        PublicInputs::unpack(&self.extended_proof.inputs)
    }
}

/// Proved and encrypted join-split awaiting its one-time signature
#[derive(Debug, Clone)]
pub struct UnsignedMix {
    pub extended_proof: ExtendedProof,
    pub ciphertexts: Vec<Vec<u8>>,
    /// The padded outputs, in slot order
    pub output_notes: Vec<Note>,
    signing_keys: SigningKeyPair,
}

impl UnsignedMix {
    pub fn signature_vk(&self) -> &SigningVerificationKey {
        &self.signing_keys.public
    }

    /// Consumes the one-time key
    pub fn sign(self, sender: &LedgerAddress, mode: SignatureMode) -> MixParameters {
        let digest = joinsplit_sign_digest(sender, &self.ciphertexts, &self.extended_proof, mode);
        let signature = signing::sign(&self.signing_keys, &digest);
        MixParameters {
            extended_proof: self.extended_proof,
            signature_vk: self.signing_keys.public,
            signature,
            ciphertexts: self.ciphertexts,
            mode,
        }
    }
}

/// Builds join-split bundles against a proving service
pub struct JoinSplitBuilder<'a, P: ?Sized> {
    prover: &'a P,
    compute_h_sig: Option<ComputeHSig>,
}

impl<'a, P: ProverService + ?Sized> JoinSplitBuilder<'a, P> {
    pub fn new(prover: &'a P) -> Self {
        Self {
            prover,
            compute_h_sig: None,
        }
    }

    pub fn with_h_sig(mut self, compute_h_sig: ComputeHSig) -> Self {
        self.compute_h_sig = Some(compute_h_sig);
        self
    }

    /// Pads, proves and encrypts, leaving the bundle unsigned
    pub fn prepare<R: RngCore + CryptoRng>(
        &self,
        tree: &MerkleTree,
        spender: &OwnershipKeyPair,
        description: MixCallDescription,
        rng: &mut R,
    ) -> Result<UnsignedMix> {
        description.validate()?;
        let mk_root = tree.root()?;
        for input in &description.inputs {
            if input.value() != 0 && tree.get_leaf(input.address) != input.commitment.0 {
                return Err(MixerError::InputNotInTree {
                    address: input.address,
                });
            }
        }

        let mut inputs = description.inputs;
        while inputs.len() < JS_INPUTS {
            inputs.push(NoteDescription::new(Note::dummy(spender.public, rng), 0));
        }
        let mut outputs = description.outputs;
        while outputs.len() < JS_OUTPUTS {
            // Nobody can decrypt a dummy output
            let recipient = ShieldedAddress {
                a_pk: spender.public,
                k_pk: EncryptionSecretKey::random(rng).public_key(),
            };
            outputs.push(JoinSplitOutput::new(recipient, 0));
        }

        let js_inputs = inputs
            .into_iter()
            .map(|input| -> Result<JoinSplitInput> {
                Ok(JoinSplitInput {
                    merkle_path: tree.get_path(input.address)?,
                    address: input.address,
                    nullifier: input.note.nullifier(&spender.secret),
                    note: input.note,
                    spending_ask: *spender.secret.as_bytes(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let nullifiers: Vec<Nullifier> = js_inputs.iter().map(|i| i.nullifier).collect();

        let signing_keys = SigningKeyPair::random(rng);
        let h_sig = match &self.compute_h_sig {
            Some(f) => f(&nullifiers, &signing_keys.public),
            None => derive_h_sig(&nullifiers, &signing_keys.public),
        };
        let mut phi = [0u8; 32];
        rng.fill_bytes(&mut phi);

        let output_notes: Vec<Note> = outputs
            .iter()
            .enumerate()
            .map(|(i, out)| {
                let rho = derive_output_randomness(&phi, &h_sig, i);
                Note::with_rho(out.recipient.a_pk, out.value, rho, rng)
            })
            .collect();

        let proof_inputs = ProofInputs {
            mk_root,
            js_inputs,
            js_outputs: output_notes.clone(),
            pub_in_value: description.v_in,
            pub_out_value: description.v_out,
            h_sig,
            phi,
        };
        log::debug!(
            "Requesting {:?} proof: root={} v_in={} v_out={}",
            self.prover.proof_system(),
            hex::encode(mk_root),
            description.v_in,
            description.v_out
        );
        let extended_proof = self.prover.prove(&proof_inputs)?;

        let expected = PublicInputs {
            root: mk_root,
            commitments: std::array::from_fn(|i| output_notes[i].commitment()),
            nullifiers: std::array::from_fn(|i| nullifiers[i]),
            h_sig,
            v_in: description.v_in,
            v_out: description.v_out,
        };
        if PublicInputs::unpack(&extended_proof.inputs)? != expected {
            return Err(MixerError::InvalidProof(
                "prover returned primary inputs for a different statement".into(),
            ));
        }

        let ciphertexts = output_notes
            .iter()
            .zip(&outputs)
            .map(|(note, out)| encrypt_note(note, &out.recipient.k_pk, rng))
            .collect::<shroud_privacy::Result<Vec<_>>>()?;

        Ok(UnsignedMix {
            extended_proof,
            ciphertexts,
            output_notes,
            signing_keys,
        })
    }

    /// Full bundle, signed for a direct `mix` call from `sender`
    pub fn build<R: RngCore + CryptoRng>(
        &self,
        tree: &MerkleTree,
        spender: &OwnershipKeyPair,
        sender: &LedgerAddress,
        description: MixCallDescription,
        rng: &mut R,
    ) -> Result<MixParameters> {
        Ok(self
            .prepare(tree, spender, description, rng)?
            .sign(sender, SignatureMode::Mix))
    }
}
