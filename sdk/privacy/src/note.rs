//! Shielded Notes
//!
//! A Note represents value held privately in the mixer.
//!
//! ```text
//! Note = {
//!     owner:    a_pk,       // 256 bits, who can spend this note
//!     value:    u64,        // amount in the smallest unit
//!     rho:      [u8; 32],   // nullifier seed
//!     trapdoor: [u8; 48],   // commitment blinding
//! }
//! ```
//!
//! Binary form (120 bytes): `a_pk ‖ value (BE) ‖ rho ‖ trapdoor`. This is the
//! plaintext of an encrypted output.

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::address::{OwnershipPublicKey, OwnershipSecretKey};
use crate::commitment::{Commitment, derive_commitment};
use crate::error::{PrivacyError, Result};
use crate::nullifier::{Nullifier, derive_nullifier};
use crate::params::{DIGEST_LENGTH, NOTE_LENGTH, TRAPDOOR_LENGTH};

/// Note value in public units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteValue(pub u64);

impl NoteValue {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Per-note nullifier seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rho(#[serde(with = "crate::hex_serde")] [u8; DIGEST_LENGTH]);

impl Rho {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut rho = [0u8; DIGEST_LENGTH];
        rng.fill_bytes(&mut rho);
        Self(rho)
    }

    pub fn from_bytes(rho: [u8; DIGEST_LENGTH]) -> Self {
        Self(rho)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }
}

/// 384-bit commitment trapdoor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trapdoor(#[serde(with = "crate::hex_serde")] [u8; TRAPDOOR_LENGTH]);

impl Trapdoor {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut r = [0u8; TRAPDOOR_LENGTH];
        rng.fill_bytes(&mut r);
        Self(r)
    }

    pub fn from_bytes(r: [u8; TRAPDOOR_LENGTH]) -> Self {
        Self(r)
    }

    pub fn as_bytes(&self) -> &[u8; TRAPDOOR_LENGTH] {
        &self.0
    }
}

/// A shielded note representing privately held value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Owner's ownership public key
    pub owner: OwnershipPublicKey,
    /// The value held in this note
    pub value: NoteValue,
    pub rho: Rho,
    pub trapdoor: Trapdoor,
}

impl Note {
    /// Create a note with fresh `rho` and trapdoor
    pub fn new<R: RngCore + CryptoRng>(owner: OwnershipPublicKey, value: u64, rng: &mut R) -> Self {
        Self::with_rho(owner, value, Rho::random(rng), rng)
    }

    /// Create a note with a given `rho` (join-split outputs) and fresh trapdoor
    pub fn with_rho<R: RngCore + CryptoRng>(
        owner: OwnershipPublicKey,
        value: u64,
        rho: Rho,
        rng: &mut R,
    ) -> Self {
        Self {
            owner,
            value: NoteValue(value),
            rho,
            trapdoor: Trapdoor::random(rng),
        }
    }

    /// Zero-value padding note owned by `owner`
    pub fn dummy<R: RngCore + CryptoRng>(owner: OwnershipPublicKey, rng: &mut R) -> Self {
        Self::new(owner, 0, rng)
    }

    pub fn commitment(&self) -> Commitment {
        derive_commitment(self)
    }

    /// Derive the nullifier for spending this note
    pub fn nullifier(&self, a_sk: &OwnershipSecretKey) -> Nullifier {
        derive_nullifier(self, a_sk)
    }

    pub fn to_bytes(&self) -> [u8; NOTE_LENGTH] {
        let mut out = [0u8; NOTE_LENGTH];
        let (owner, rest) = out.split_at_mut(DIGEST_LENGTH);
        let (value, rest) = rest.split_at_mut(8);
        let (rho, trapdoor) = rest.split_at_mut(DIGEST_LENGTH);
        owner.copy_from_slice(self.owner.as_bytes());
        value.copy_from_slice(&self.value.0.to_be_bytes());
        rho.copy_from_slice(&self.rho.0);
        trapdoor.copy_from_slice(&self.trapdoor.0);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NOTE_LENGTH {
            return Err(PrivacyError::InvalidNoteLength {
                expected: NOTE_LENGTH,
                got: bytes.len(),
            });
        }
        let (owner, rest) = bytes.split_at(DIGEST_LENGTH);
        let (value, rest) = rest.split_at(8);
        let (rho, trapdoor) = rest.split_at(DIGEST_LENGTH);

        let mut value_be = [0u8; 8];
        value_be.copy_from_slice(value);
        let mut rho_bytes = [0u8; DIGEST_LENGTH];
        rho_bytes.copy_from_slice(rho);
        let mut trapdoor_bytes = [0u8; TRAPDOOR_LENGTH];
        trapdoor_bytes.copy_from_slice(trapdoor);

        Ok(Self {
            owner: OwnershipPublicKey::from_slice(owner)?,
            value: NoteValue(u64::from_be_bytes(value_be)),
            rho: Rho(rho_bytes),
            trapdoor: Trapdoor(trapdoor_bytes),
        })
    }
}

/// An owned note together with where it sits in the commitment tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDescription {
    pub note: Note,
    pub address: u64,
    pub commitment: Commitment,
}

impl NoteDescription {
    pub fn new(note: Note, address: u64) -> Self {
        let commitment = note.commitment();
        Self {
            note,
            address,
            commitment,
        }
    }

    pub fn value(&self) -> u64 {
        self.note.value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::OwnershipKeyPair;
    use rand::thread_rng;

    #[test]
    fn test_note_bytes_round_trip() {
        let mut rng = thread_rng();
        let keys = OwnershipKeyPair::random(&mut rng);
        let note = Note::new(keys.public, 0x0102_0304_0506_0708, &mut rng);

        let bytes = note.to_bytes();
        assert_eq!(&bytes[..32], keys.public.as_bytes());
        assert_eq!(&bytes[32..40], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(Note::from_bytes(&bytes).unwrap(), note);
    }

    #[test]
    fn test_note_length_checked() {
        assert_eq!(
            Note::from_bytes(&[0u8; NOTE_LENGTH - 1]),
            Err(PrivacyError::InvalidNoteLength {
                expected: NOTE_LENGTH,
                got: NOTE_LENGTH - 1
            })
        );
    }

    #[test]
    fn test_note_commitment_hides_randomness() {
        let mut rng = thread_rng();
        let keys = OwnershipKeyPair::random(&mut rng);
        let note1 = Note::new(keys.public, 100, &mut rng);
        let note2 = Note::new(keys.public, 100, &mut rng);
        assert_ne!(note1.commitment(), note2.commitment());
    }

    #[test]
    fn test_json_round_trip() {
        let mut rng = thread_rng();
        let keys = OwnershipKeyPair::random(&mut rng);
        let desc = NoteDescription::new(Note::new(keys.public, 7, &mut rng), 3);
        let json = serde_json::to_string(&desc).unwrap();
        let parsed: NoteDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, desc);
        assert_eq!(parsed.commitment, parsed.note.commitment());
    }
}
