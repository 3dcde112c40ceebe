//! Error type shared by the shielded primitives.
use thiserror::Error;

/// Errors raised by key handling, notes, encryption and the commitment tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivacyError {
    /// A secret or public key had the wrong number of bytes
    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    /// A note (or one of its fields) had the wrong number of bytes
    #[error("Invalid note length: expected {expected} bytes, got {got}")]
    InvalidNoteLength { expected: usize, got: usize },

    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    /// The ciphertext was not addressed to this key (or was tampered with)
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Encryption failed")]
    EncryptionFailed,

    /// The tree already holds 2^depth leaves
    #[error("Merkle tree capacity exceeded ({capacity} leaves)")]
    CapacityExceeded { capacity: u64 },

    /// The root or a path was requested while inserted leaves are pending
    #[error("Merkle tree has pending insertions; recompute the root first")]
    StaleTree,

    /// Tree depth outside `1..64`
    #[error("Unsupported merkle tree depth {0}")]
    InvalidDepth(usize),

    #[error("Address {address} out of range for tree of depth {depth}")]
    AddressOutOfRange { address: u64, depth: usize },

    /// Persisted tree bytes could not be decoded
    #[error("Corrupt merkle tree encoding: {0}")]
    CorruptTree(String),

    /// A shielded address string could not be parsed
    #[error("Invalid shielded address: {0}")]
    InvalidAddress(String),

    /// Bytes do not encode a point of the expected group
    #[error("Invalid curve point: {0}")]
    InvalidPoint(String),
}

/// Result type for shielded primitive operations
pub type Result<T> = std::result::Result<T, PrivacyError>;
