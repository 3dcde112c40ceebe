//! Prover Integration
//!
//! Interface to the proving service that produces join-split proofs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Join-Split Proof                            │
//! │                                                                 │
//! │  Public Inputs:                                                 │
//! │  ┌───────────────────────────────────────────────────────────┐ │
//! │  │ • mk_root            (commitment tree root)               │ │
//! │  │ • cm_0, cm_1         (output commitments)                 │ │
//! │  │ • nf_0, nf_1         (input nullifiers)                   │ │
//! │  │ • h_sig              (binding to the one-time key)        │ │
//! │  │ • v_in, v_out        (public value, packed)               │ │
//! │  └───────────────────────────────────────────────────────────┘ │
//! │                                                                 │
//! │  Private Witness:                                               │
//! │  ┌───────────────────────────────────────────────────────────┐ │
//! │  │ • input notes, Merkle paths and spending keys             │ │
//! │  │ • output notes                                            │ │
//! │  │ • phi                                                     │ │
//! │  └───────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod http;
mod mock;

pub use http::{ApiResponse, HttpProverClient, ProverConfiguration};
pub use mock::MockProver;

use serde::{Deserialize, Serialize};
use shroud_config::{ProverConfig, ProverMode};
use shroud_privacy::{MerklePath, Note, Nullifier};

use crate::error::ProverResult;
use crate::zksnark::{ExtendedProof, ProofSystem, VerificationKey};

/// A spent note and everything the circuit needs to check it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSplitInput {
    pub merkle_path: MerklePath,
    pub address: u64,
    pub note: Note,
    #[serde(with = "shroud_privacy::hex_serde")]
    pub spending_ask: [u8; 32],
    pub nullifier: Nullifier,
}

/// Request sent to the proving service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofInputs {
    #[serde(with = "shroud_privacy::hex_serde")]
    pub mk_root: [u8; 32],
    pub js_inputs: Vec<JoinSplitInput>,
    pub js_outputs: Vec<Note>,
    pub pub_in_value: u64,
    pub pub_out_value: u64,
    #[serde(with = "shroud_privacy::hex_serde")]
    pub h_sig: [u8; 32],
    #[serde(with = "shroud_privacy::hex_serde")]
    pub phi: [u8; 32],
}

/// A service that produces join-split proofs
pub trait ProverService: Send + Sync {
    fn proof_system(&self) -> ProofSystem;

    /// The key the mixer contract verifies against
    fn verification_key(&self) -> ProverResult<VerificationKey>;

    /// Generate a proof for the statement described by `inputs`
    fn prove(&self, inputs: &ProofInputs) -> ProverResult<ExtendedProof>;
}

impl<T: ProverService + ?Sized> ProverService for Box<T> {
    fn proof_system(&self) -> ProofSystem {
        (**self).proof_system()
    }

    fn verification_key(&self) -> ProverResult<VerificationKey> {
        (**self).verification_key()
    }

    fn prove(&self, inputs: &ProofInputs) -> ProverResult<ExtendedProof> {
        (**self).prove(inputs)
    }
}

/// Builds the prover selected by configuration
///
/// A remote prover must run the configured proof system over trees of
/// `tree_depth`.
pub fn prover_from_config(
    config: &ProverConfig,
    tree_depth: usize,
) -> ProverResult<Box<dyn ProverService>> {
    match config.mode {
        ProverMode::Mock => {
            log::info!("Using mock prover ({:?})", config.proof_system);
            Ok(Box::new(MockProver::new(config.proof_system.into())))
        }
        ProverMode::Http => {
            let client = HttpProverClient::connect(config)?;
            client
                .configuration()
                .ensure_compatible(config.proof_system.into(), tree_depth)
                .inspect_err(|e| log::warn!("Prover at {} is unusable: {e}", config.url))?;
            Ok(Box::new(client))
        }
    }
}
