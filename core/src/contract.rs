//! Mixer contract interface
//!
//! Types exchanged with the ledger that hosts the mixer contract, and the
//! [`LedgerClient`] collaborator trait. Wire-level RPC framing is left to
//! implementations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shroud_privacy::curve::Word;
use shroud_privacy::{Commitment, Nullifier, PrivacyError};

use crate::error::LedgerError;

pub const LEDGER_ADDRESS_LENGTH: usize = 20;

/// A ledger account (20 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LedgerAddress(#[serde(with = "shroud_privacy::hex_serde")] pub [u8; LEDGER_ADDRESS_LENGTH]);

impl LedgerAddress {
    /// Left-padded to a 32-byte word
    pub fn to_word(&self) -> Word {
        let mut word = [0u8; 32];
        word[32 - LEDGER_ADDRESS_LENGTH..].copy_from_slice(&self.0);
        word
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for LedgerAddress {
    type Err = PrivacyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        shroud_privacy::hex_serde::decode_array(s.trim_start_matches("0x"))
            .map(Self)
            .map_err(PrivacyError::InvalidAddress)
    }
}

/// Arguments of the contract's `mix` call, as contract words
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixCallArguments {
    #[serde(with = "shroud_privacy::hex_serde::words")]
    pub proof: Vec<Word>,
    #[serde(with = "shroud_privacy::hex_serde::words")]
    pub signature_vk: Vec<Word>,
    #[serde(with = "shroud_privacy::hex_serde")]
    pub signature: Word,
    #[serde(with = "shroud_privacy::hex_serde::words")]
    pub public_inputs: Vec<Word>,
    #[serde(with = "shroud_privacy::hex_serde::list")]
    pub ciphertexts: Vec<Vec<u8>>,
}

/// One output slot of a join-split, as emitted by the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixOutputEvent {
    pub commitment: Commitment,
    #[serde(with = "shroud_privacy::hex_serde::bytes")]
    pub ciphertext: Vec<u8>,
}

/// Everything a single successful `mix` call revealed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixResult {
    pub block: u64,
    #[serde(with = "shroud_privacy::hex_serde")]
    pub new_merkle_root: [u8; 32],
    pub nullifiers: Vec<Nullifier>,
    pub output_events: Vec<MixOutputEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    #[serde(with = "shroud_privacy::hex_serde")]
    pub tx_hash: [u8; 32],
    pub block: u64,
}

/// The ledger hosting the mixer contract
pub trait LedgerClient: Send + Sync {
    /// Current chain head
    fn block_number(&self) -> Result<u64, LedgerError>;

    /// Join-split results in blocks `from..=to`, in emission order
    fn mix_results(&self, from: u64, to: u64) -> Result<Vec<MixResult>, LedgerError>;

    /// Submit a `mix` call from `sender`, attaching `value` ledger base units
    fn submit_mix(
        &self,
        sender: &LedgerAddress,
        args: &MixCallArguments,
        value: u128,
    ) -> Result<TxReceipt, LedgerError>;
}

impl<T: LedgerClient + ?Sized> LedgerClient for &T {
    fn block_number(&self) -> Result<u64, LedgerError> {
        (**self).block_number()
    }

    fn mix_results(&self, from: u64, to: u64) -> Result<Vec<MixResult>, LedgerError> {
        (**self).mix_results(from, to)
    }

    fn submit_mix(
        &self,
        sender: &LedgerAddress,
        args: &MixCallArguments,
        value: u128,
    ) -> Result<TxReceipt, LedgerError> {
        (**self).submit_mix(sender, args, value)
    }
}
