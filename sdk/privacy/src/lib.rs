//! Shroud Privacy SDK
//!
//! Sprout-style note primitives for the shroud mixer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Join-Split                              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifiers  │  │ Commitments  │  │  Encrypted Outputs    │ │
//! │  │  PRF^nf      │  │  BLAKE2s     │  │  X25519 + ChaCha20    │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │  h_sig = SHA-256(nf_0 ‖ nf_1 ‖ one-time vk)              │   │
//! │  │  rho_i = PRF^rho(phi, h_sig, i)                          │   │
//! │  │  one-time Schnorr signature over the whole bundle        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                           │                                     │
//! │                           ▼                                     │
//! │            MiMC7 commitment tree (depth 32)                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod address;
pub mod commitment;
pub mod curve;
pub mod encryption;
pub mod error;
pub mod field;
pub mod hex_serde;
pub mod merkle;
pub mod mimc;
pub mod note;
pub mod nullifier;
pub mod params;
pub mod prf;
pub mod signing;

pub use address::{
    EncryptionKeyPair, EncryptionPublicKey, EncryptionSecretKey, OwnershipKeyPair,
    OwnershipPublicKey, OwnershipSecretKey, ShieldedAddress, ShieldedKeys, ShieldedSecret,
};
pub use commitment::{Commitment, derive_commitment};
pub use encryption::{decrypt_note, encrypt_note, try_decrypt_note};
pub use error::{PrivacyError, Result};
pub use merkle::{MerklePath, MerkleTree, TreeState};
pub use note::{Note, NoteDescription, NoteValue, Rho, Trapdoor};
pub use nullifier::{Nullifier, derive_nullifier};
pub use params::{
    JS_INPUTS, JS_OUTPUTS, PUBLIC_UNIT_VALUE, TREE_DEPTH, from_public_units, to_public_units,
};
pub use signing::{Signature, SigningKeyPair, SigningVerificationKey};

/// `h_sig` binding the input nullifiers to the one-time verification key
pub fn derive_h_sig(nullifiers: &[Nullifier], vk: &SigningVerificationKey) -> [u8; 32] {
    let nfs: Vec<[u8; 32]> = nullifiers.iter().map(|nf| nf.0).collect();
    prf::h_sig(&nfs, &vk.to_bytes())
}

/// `rho` of output `index`
pub fn derive_output_randomness(phi: &[u8; 32], h_sig: &[u8; 32], index: usize) -> Rho {
    Rho::from_bytes(prf::prf_rho(phi, h_sig, index))
}
