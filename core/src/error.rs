//! Error types for transaction building, collaborators and the wallet.
use shroud_privacy::PrivacyError;
use thiserror::Error;

/// Errors reported by a proving service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProverError {
    /// The witness does not satisfy the join-split relation
    #[error("Prover rejected the statement: {0}")]
    Rejected(String),

    #[error("Prover unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid prover response: {0}")]
    InvalidResponse(String),
}

pub type ProverResult<T> = std::result::Result<T, ProverError>;

/// Errors reported by the ledger, surfaced verbatim
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The mixer contract refused the call
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while building or submitting a join-split
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixerError {
    #[error("Too many inputs: at most {max}, got {got}")]
    TooManyInputs { max: usize, got: usize },

    #[error("Too many outputs: at most {max}, got {got}")]
    TooManyOutputs { max: usize, got: usize },

    /// `v_in + Σ inputs ≠ v_out + Σ outputs`
    #[error("Value not conserved: {inputs} in, {outputs} out")]
    ValueNotConserved { inputs: u128, outputs: u128 },

    /// The leaf at the input's address is not the input's commitment
    #[error("Input note not found in tree at address {address}")]
    InputNotInTree { address: u64 },

    #[error("Proof generation failed: {0}")]
    ProofGenerationFailed(#[from] ProverError),

    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Privacy(#[from] PrivacyError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MixerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for join-split operations
pub type Result<T> = std::result::Result<T, MixerError>;

/// Errors raised by wallet storage and chain sync
#[derive(Error, Debug)]
pub enum WalletError {
    /// The locally maintained tree diverged from the ledger's
    #[error("Merkle root mismatch after block {block}: ledger {expected}, local {computed}")]
    MerkleRootMismatch {
        block: u64,
        expected: String,
        computed: String,
    },

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Insufficient funds: need {needed}, have {available} in at most {max_notes} notes")]
    InsufficientFunds {
        needed: u64,
        available: u64,
        max_notes: usize,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Privacy(#[from] PrivacyError),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}
