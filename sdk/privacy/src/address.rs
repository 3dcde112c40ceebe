//! Shielded addresses
//!
//! A user holds two key pairs:
//!
//! ```text
//! ownership:  a_sk (random 256 bits)  ->  a_pk = PRF^addr(a_sk)
//! encryption: k_sk (X25519 secret)    ->  k_pk = X25519(k_sk)
//! ```
//!
//! `a_pk` is written into notes and gates spending, `k_pk` is what senders
//! encrypt output notes to. The public address is the pair `(a_pk, k_pk)`,
//! rendered as `"<a_pk hex>:<k_pk hex>"`.

use std::fmt;
use std::str::FromStr;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{PrivacyError, Result};
use crate::params::DIGEST_LENGTH;
use crate::prf;

fn key_from_slice(bytes: &[u8]) -> Result<[u8; DIGEST_LENGTH]> {
    bytes.try_into().map_err(|_| PrivacyError::InvalidKeyLength {
        expected: DIGEST_LENGTH,
        got: bytes.len(),
    })
}

fn key_from_hex(s: &str) -> Result<[u8; DIGEST_LENGTH]> {
    let raw = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| PrivacyError::InvalidHex(e.to_string()))?;
    key_from_slice(&raw)
}

/// Ownership secret key `a_sk`. Allows spending notes.
#[derive(Clone, PartialEq, Eq)]
pub struct OwnershipSecretKey([u8; DIGEST_LENGTH]);

impl OwnershipSecretKey {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut key = [0u8; DIGEST_LENGTH];
        rng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(key: [u8; DIGEST_LENGTH]) -> Self {
        Self(key)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        key_from_slice(bytes).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    /// Derive `a_pk`
    pub fn public_key(&self) -> OwnershipPublicKey {
        OwnershipPublicKey(prf::prf_addr(&self.0))
    }
}

impl fmt::Debug for OwnershipSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OwnershipSecretKey(..)")
    }
}

/// Ownership public key `a_pk`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnershipPublicKey(#[serde(with = "crate::hex_serde")] [u8; DIGEST_LENGTH]);

impl OwnershipPublicKey {
    pub fn from_bytes(key: [u8; DIGEST_LENGTH]) -> Self {
        Self(key)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        key_from_slice(bytes).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }
}

impl fmt::Display for OwnershipPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipKeyPair {
    pub secret: OwnershipSecretKey,
    pub public: OwnershipPublicKey,
}

impl OwnershipKeyPair {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_secret(OwnershipSecretKey::random(rng))
    }

    pub fn from_secret(secret: OwnershipSecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }
}

/// X25519 secret used to decrypt incoming notes
#[derive(Clone)]
pub struct EncryptionSecretKey(StaticSecret);

impl EncryptionSecretKey {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(StaticSecret::random_from_rng(rng))
    }

    pub fn from_bytes(key: [u8; DIGEST_LENGTH]) -> Self {
        Self(StaticSecret::from(key))
    }

    pub fn to_bytes(&self) -> [u8; DIGEST_LENGTH] {
        self.0.to_bytes()
    }

    pub fn public_key(&self) -> EncryptionPublicKey {
        EncryptionPublicKey(*PublicKey::from(&self.0).as_bytes())
    }

    pub(crate) fn inner(&self) -> &StaticSecret {
        &self.0
    }
}

impl fmt::Debug for EncryptionSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionSecretKey(..)")
    }
}

impl PartialEq for EncryptionSecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bytes() == other.0.to_bytes()
    }
}

/// X25519 public key that output notes are encrypted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptionPublicKey(#[serde(with = "crate::hex_serde")] [u8; DIGEST_LENGTH]);

impl EncryptionPublicKey {
    pub fn from_bytes(key: [u8; DIGEST_LENGTH]) -> Self {
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LENGTH] {
        &self.0
    }

    pub(crate) fn to_x25519(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl fmt::Display for EncryptionPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionKeyPair {
    pub secret: EncryptionSecretKey,
    pub public: EncryptionPublicKey,
}

impl EncryptionKeyPair {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = EncryptionSecretKey::random(rng);
        let public = secret.public_key();
        Self { secret, public }
    }
}

/// Public shielded address `(a_pk, k_pk)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShieldedAddress {
    pub a_pk: OwnershipPublicKey,
    pub k_pk: EncryptionPublicKey,
}

impl fmt::Display for ShieldedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.a_pk, self.k_pk)
    }
}

impl FromStr for ShieldedAddress {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self> {
        let (a_pk, k_pk) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| PrivacyError::InvalidAddress(format!("missing ':' in {s:?}")))?;
        Ok(Self {
            a_pk: OwnershipPublicKey(key_from_hex(a_pk)?),
            k_pk: EncryptionPublicKey(key_from_hex(k_pk)?),
        })
    }
}

/// Secret half of a shielded address `(a_sk, k_sk)`
#[derive(Debug, Clone, PartialEq)]
pub struct ShieldedSecret {
    pub a_sk: OwnershipSecretKey,
    pub k_sk: EncryptionSecretKey,
}

/// A user's complete key material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "KeyFile", into = "KeyFile")]
pub struct ShieldedKeys {
    pub address: ShieldedAddress,
    pub secret: ShieldedSecret,
}

impl ShieldedKeys {
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_secret(ShieldedSecret {
            a_sk: OwnershipSecretKey::random(rng),
            k_sk: EncryptionSecretKey::random(rng),
        })
    }

    pub fn from_secret(secret: ShieldedSecret) -> Self {
        let address = ShieldedAddress {
            a_pk: secret.a_sk.public_key(),
            k_pk: secret.k_sk.public_key(),
        };
        Self { address, secret }
    }

    pub fn ownership(&self) -> OwnershipKeyPair {
        OwnershipKeyPair {
            secret: self.secret.a_sk.clone(),
            public: self.address.a_pk,
        }
    }
}

/// On-disk form of [`ShieldedKeys`]
#[derive(Serialize, Deserialize)]
struct KeyFile {
    #[serde(with = "crate::hex_serde")]
    a_sk: [u8; DIGEST_LENGTH],
    #[serde(with = "crate::hex_serde")]
    k_sk: [u8; DIGEST_LENGTH],
    #[serde(with = "crate::hex_serde")]
    a_pk: [u8; DIGEST_LENGTH],
    #[serde(with = "crate::hex_serde")]
    k_pk: [u8; DIGEST_LENGTH],
}

impl From<ShieldedKeys> for KeyFile {
    fn from(keys: ShieldedKeys) -> Self {
        Self {
            a_sk: *keys.secret.a_sk.as_bytes(),
            k_sk: keys.secret.k_sk.to_bytes(),
            a_pk: *keys.address.a_pk.as_bytes(),
            k_pk: *keys.address.k_pk.as_bytes(),
        }
    }
}

impl TryFrom<KeyFile> for ShieldedKeys {
    type Error = PrivacyError;

    fn try_from(file: KeyFile) -> Result<Self> {
        let keys = ShieldedKeys::from_secret(ShieldedSecret {
            a_sk: OwnershipSecretKey(file.a_sk),
            k_sk: EncryptionSecretKey::from_bytes(file.k_sk),
        });
        if keys.address.a_pk.0 != file.a_pk || keys.address.k_pk.0 != file.k_pk {
            return Err(PrivacyError::InvalidAddress(
                "public keys do not match secret keys".into(),
            ));
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_address_string_round_trip() {
        let keys = ShieldedKeys::random(&mut OsRng);
        let s = keys.address.to_string();
        assert_eq!(s.len(), 64 + 1 + 64);
        let parsed: ShieldedAddress = s.parse().unwrap();
        assert_eq!(parsed, keys.address);
    }

    #[test]
    fn test_address_parse_errors() {
        assert!(matches!(
            "deadbeef".parse::<ShieldedAddress>(),
            Err(PrivacyError::InvalidAddress(_))
        ));
        assert!(matches!(
            "00:11".parse::<ShieldedAddress>(),
            Err(PrivacyError::InvalidKeyLength { expected: 32, got: 1 })
        ));
        assert!(matches!(
            "zz:11".parse::<ShieldedAddress>(),
            Err(PrivacyError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_key_file_round_trip() {
        let keys = ShieldedKeys::random(&mut OsRng);
        let json = serde_json::to_string(&keys).unwrap();
        let loaded: ShieldedKeys = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, keys);
    }

    #[test]
    fn test_key_file_rejects_mismatched_public_key() {
        let keys = ShieldedKeys::random(&mut OsRng);
        let other = ShieldedKeys::random(&mut OsRng);
        let mut file = KeyFile::from(keys);
        file.a_pk = *other.address.a_pk.as_bytes();
        let json = serde_json::to_string(&file).unwrap();
        assert!(serde_json::from_str::<ShieldedKeys>(&json).is_err());
    }

    #[test]
    fn test_secret_key_length_checked() {
        assert_eq!(
            OwnershipSecretKey::from_slice(&[1u8; 16]),
            Err(PrivacyError::InvalidKeyLength {
                expected: 32,
                got: 16
            })
        );
    }

    #[test]
    fn test_ownership_key_is_deterministic() {
        let sk = OwnershipSecretKey::from_bytes([5u8; 32]);
        assert_eq!(sk.public_key(), sk.public_key());
        assert_ne!(sk.public_key().as_bytes(), sk.as_bytes());
    }
}
