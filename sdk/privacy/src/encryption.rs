//! Note Encryption
//!
//! Encrypts output notes for their recipient using X25519 + ChaCha20-Poly1305.
//!
//! ```text
//! Flow:
//! 1. Sender generates ephemeral keypair (epk, esk)
//! 2. Shared secret = ECDH(esk, k_pk)
//! 3. Encryption key = BLAKE3-KDF("shroud-note-v1", shared_secret ‖ epk)
//! 4. Ciphertext = ChaCha20-Poly1305(key, 0, plaintext, aad = epk)
//! 5. Output = epk ‖ ciphertext ‖ tag
//! ```
//!
//! Every key is used for exactly one message, so a fixed nonce is safe.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::{CryptoRng, RngCore};
use x25519_dalek::{EphemeralSecret, PublicKey};

use crate::address::{EncryptionPublicKey, EncryptionSecretKey};
use crate::error::{PrivacyError, Result};
use crate::note::Note;
use crate::params::NOTE_LENGTH;

const KDF_CONTEXT: &str = "shroud-note-v1";

/// Ephemeral public key prefix
pub const EPK_LENGTH: usize = 32;
/// Poly1305 tag suffix
pub const TAG_LENGTH: usize = 16;
/// Fixed overhead of every ciphertext
pub const OVERHEAD: usize = EPK_LENGTH + TAG_LENGTH;
/// Size of an encrypted note
pub const NOTE_CIPHERTEXT_LENGTH: usize = NOTE_LENGTH + OVERHEAD;

fn derive_key(shared_secret: &[u8], ephemeral_pk: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT);
    hasher.update(shared_secret);
    hasher.update(ephemeral_pk);
    *hasher.finalize().as_bytes()
}

fn cipher(key: &[u8; 32]) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(key.into())
}

/// Encrypt `plaintext` to `recipient`
pub fn encrypt<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    recipient: &EncryptionPublicKey,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let ephemeral_secret = EphemeralSecret::random_from_rng(rng);
    let ephemeral_pk = PublicKey::from(&ephemeral_secret);
    let shared_secret = ephemeral_secret.diffie_hellman(&recipient.to_x25519());

    let key = derive_key(shared_secret.as_bytes(), ephemeral_pk.as_bytes());
    let sealed = cipher(&key)
        .encrypt(
            Nonce::from_slice(&[0u8; 12]),
            Payload {
                msg: plaintext,
                aad: ephemeral_pk.as_bytes(),
            },
        )
        .map_err(|_| PrivacyError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(EPK_LENGTH + sealed.len());
    out.extend_from_slice(ephemeral_pk.as_bytes());
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Decrypt a ciphertext addressed to `secret`
///
/// Fails with [`PrivacyError::DecryptionFailed`] when the ciphertext was
/// meant for somebody else, which is the common case while scanning.
pub fn decrypt(ciphertext: &[u8], secret: &EncryptionSecretKey) -> Result<Vec<u8>> {
    if ciphertext.len() < OVERHEAD {
        return Err(PrivacyError::DecryptionFailed);
    }
    let (epk, sealed) = ciphertext.split_at(EPK_LENGTH);
    let mut epk_bytes = [0u8; EPK_LENGTH];
    epk_bytes.copy_from_slice(epk);

    let shared_secret = secret.inner().diffie_hellman(&PublicKey::from(epk_bytes));
    let key = derive_key(shared_secret.as_bytes(), &epk_bytes);
    cipher(&key)
        .decrypt(
            Nonce::from_slice(&[0u8; 12]),
            Payload {
                msg: sealed,
                aad: &epk_bytes,
            },
        )
        .map_err(|_| PrivacyError::DecryptionFailed)
}

/// Encrypt an output note for its recipient
pub fn encrypt_note<R: RngCore + CryptoRng>(
    note: &Note,
    recipient: &EncryptionPublicKey,
    rng: &mut R,
) -> Result<Vec<u8>> {
    encrypt(&note.to_bytes(), recipient, rng)
}

pub fn decrypt_note(ciphertext: &[u8], secret: &EncryptionSecretKey) -> Result<Note> {
    Note::from_bytes(&decrypt(ciphertext, secret)?)
}

/// Decrypt if the note is ours, `None` otherwise
pub fn try_decrypt_note(ciphertext: &[u8], secret: &EncryptionSecretKey) -> Option<Note> {
    decrypt_note(ciphertext, secret).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{EncryptionKeyPair, OwnershipKeyPair};
    use rand::rngs::OsRng;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let mut rng = OsRng;
        let owner = OwnershipKeyPair::random(&mut rng);
        let recipient = EncryptionKeyPair::random(&mut rng);
        let note = Note::new(owner.public, 1000, &mut rng);

        let ciphertext = encrypt_note(&note, &recipient.public, &mut rng).unwrap();
        assert_eq!(ciphertext.len(), NOTE_CIPHERTEXT_LENGTH);

        let decrypted = decrypt_note(&ciphertext, &recipient.secret).unwrap();
        assert_eq!(decrypted, note);
        assert_eq!(decrypted.commitment(), note.commitment());
    }

    #[test]
    fn test_wrong_key_fails() {
        let mut rng = OsRng;
        let owner = OwnershipKeyPair::random(&mut rng);
        let recipient = EncryptionKeyPair::random(&mut rng);
        let wrong = EncryptionKeyPair::random(&mut rng);
        let note = Note::new(owner.public, 1000, &mut rng);

        let ciphertext = encrypt_note(&note, &recipient.public, &mut rng).unwrap();
        assert_eq!(
            decrypt_note(&ciphertext, &wrong.secret),
            Err(PrivacyError::DecryptionFailed)
        );
        assert!(try_decrypt_note(&ciphertext, &wrong.secret).is_none());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut rng = OsRng;
        let recipient = EncryptionKeyPair::random(&mut rng);
        let mut ciphertext = encrypt(b"hello", &recipient.public, &mut rng).unwrap();

        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 1;
        assert_eq!(
            decrypt(&ciphertext, &recipient.secret),
            Err(PrivacyError::DecryptionFailed)
        );

        // swapping the ephemeral key breaks the associated data
        let mut ciphertext = encrypt(b"hello", &recipient.public, &mut rng).unwrap();
        ciphertext[0] ^= 1;
        assert!(decrypt(&ciphertext, &recipient.secret).is_err());
    }

    #[test]
    fn test_short_ciphertext_fails() {
        let recipient = EncryptionKeyPair::random(&mut OsRng);
        assert_eq!(
            decrypt(&[0u8; OVERHEAD - 1], &recipient.secret),
            Err(PrivacyError::DecryptionFailed)
        );
    }

    #[test]
    fn test_ciphertexts_are_randomized() {
        let mut rng = OsRng;
        let recipient = EncryptionKeyPair::random(&mut rng);
        let a = encrypt(b"same", &recipient.public, &mut rng).unwrap();
        let b = encrypt(b"same", &recipient.public, &mut rng).unwrap();
        assert_ne!(a, b);
    }
}
