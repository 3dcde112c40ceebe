//! Shroud Core
//!
//! Client side of the shroud mixer: builds join-split transactions, talks to
//! the proving service and the ledger, and keeps a wallet in sync with the
//! chain.
//!
//! ```text
//!   Wallet ──sync──▶ LedgerClient::mix_results
//!     │ select_inputs, tree
//!     ▼
//!   MixerClient ──▶ JoinSplitBuilder ──▶ ProverService::prove
//!     │                                   (mock or HTTP)
//!     ▼
//!   LedgerClient::submit_mix(MixCallArguments)
//! ```

pub mod contract;
pub mod error;
pub mod joinsplit;
pub mod mixer_client;
pub mod prover;
pub mod public_inputs;
pub mod wallet;
pub mod zksnark;

pub use contract::{LedgerAddress, LedgerClient, MixCallArguments, MixResult, TxReceipt};
pub use error::{LedgerError, MixerError, ProverError, WalletError};
pub use joinsplit::{
    JoinSplitBuilder, JoinSplitOutput, MixCallDescription, MixParameters, SignatureMode,
};
pub use mixer_client::MixerClient;
pub use prover::{HttpProverClient, MockProver, ProverService, prover_from_config};
pub use public_inputs::{PublicInputs, extract_public_values};
pub use wallet::{SyncSummary, Wallet};
pub use zksnark::{ExtendedProof, Proof, ProofSystem, VerificationKey};
