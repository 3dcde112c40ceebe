//! Nullifiers
//!
//! ```text
//! nf = PRF^nf(a_sk, rho)
//! ```
//!
//! Once a nullifier is published, the corresponding note cannot be spent
//! again. For a fixed `a_sk` the map from notes to nullifiers is injective,
//! since `rho` is unique per note.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::OwnershipSecretKey;
use crate::error::{PrivacyError, Result};
use crate::note::Note;
use crate::params::DIGEST_LENGTH;
use crate::prf;

/// A nullifier (32 bytes) - unique tag for a spent note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier(#[serde(with = "crate::hex_serde")] pub [u8; 32]);

impl Nullifier {
    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Nullifier revealed when `a_sk` spends `note`
pub fn derive_nullifier(note: &Note, a_sk: &OwnershipSecretKey) -> Nullifier {
    Nullifier(prf::prf_nf(a_sk.as_bytes(), note.rho.as_bytes()))
}

/// Nullifier from untrusted raw buffers, validating their lengths
pub fn derive_nullifier_from_slices(a_sk: &[u8], rho: &[u8]) -> Result<Nullifier> {
    let a_sk = OwnershipSecretKey::from_slice(a_sk)?;
    let rho: [u8; DIGEST_LENGTH] = rho.try_into().map_err(|_| PrivacyError::InvalidNoteLength {
        expected: DIGEST_LENGTH,
        got: rho.len(),
    })?;
    Ok(Nullifier(prf::prf_nf(a_sk.as_bytes(), &rho)))
}
