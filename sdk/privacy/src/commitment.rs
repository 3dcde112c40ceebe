//! Note Commitments
//!
//! ```text
//! cm = BLAKE2s(trapdoor ‖ a_pk ‖ rho ‖ value) mod p
//! ```
//!
//! The digest is reduced into the BN254 scalar field so it can be used
//! directly as a tree leaf and as a public input.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::error::PrivacyError;
use crate::field::{fr_from_bytes, fr_to_bytes};
use crate::note::Note;
use crate::prf;

/// Length of the commitment hint used as a lookup key
pub const SHORT_COMMITMENT_LENGTH: usize = 4;

/// A note commitment (32 bytes, big-endian scalar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commitment(#[serde(with = "crate::hex_serde")] pub [u8; 32]);

impl Commitment {
    /// Create commitment from field element
    pub fn from_field(f: Fr) -> Self {
        Self(fr_to_bytes(&f))
    }

    /// Convert to field element
    pub fn to_field(&self) -> Fr {
        fr_from_bytes(&self.0)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex of the first bytes, used to name a note without the full digest
    pub fn short(&self) -> String {
        hex::encode(&self.0[..SHORT_COMMITMENT_LENGTH])
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Commitment {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::hex_serde::decode_array(s)
            .map(Self)
            .map_err(PrivacyError::InvalidHex)
    }
}

/// Commitment of `note`
pub fn derive_commitment(note: &Note) -> Commitment {
    Commitment(prf::commit(
        note.trapdoor.as_bytes(),
        note.owner.as_bytes(),
        note.rho.as_bytes(),
        note.value.as_u64(),
    ))
}
