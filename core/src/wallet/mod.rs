//! Wallet
//!
//! Keeps a local copy of the commitment tree in lock-step with the ledger,
//! discovers notes addressed to this wallet and tracks which of them have
//! been spent.
//!
//! ```text
//!  ledger ──mix_results(from, to)──▶ for each event, in emission order:
//!                                      insert commitment into tree
//!                                      try decrypt ciphertext ─▶ new note
//!                                    for each revealed nullifier:
//!                                      owned? ─▶ move note to spent
//!                                    recompute root == ledger root?
//!                                    commit chunk atomically
//! ```

mod keys;
mod store;

pub use keys::{load_keys, save_keys};
pub use store::{SyncBatch, WalletState, WalletStore};

use std::path::Path;

use serde::{Deserialize, Serialize};
use shroud_config::WalletConfig;
use shroud_privacy::{
    Commitment, JS_INPUTS, MerkleTree, NoteDescription, ShieldedAddress, ShieldedKeys,
    try_decrypt_note,
};

use crate::contract::LedgerClient;
use crate::error::WalletError;

pub type Result<T> = std::result::Result<T, WalletError>;

/// What a call to [`Wallet::sync`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub blocks_scanned: u64,
    pub new_notes: Vec<NoteDescription>,
    pub spent: Vec<Commitment>,
    pub total_notes_seen: u64,
    /// Decrypted notes whose commitment differed from the emitted one
    pub commitment_mismatches: usize,
}

/// Listing entry for an owned note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub address: u64,
    pub short_commitment: String,
    pub value: u64,
}

pub struct Wallet {
    username: String,
    keys: ShieldedKeys,
    store: WalletStore,
    tree: MerkleTree,
    state: WalletState,
    sync_blocks_per_batch: u64,
}

impl Wallet {
    /// Opens (or creates) the wallet database in `dir`
    pub fn open(
        username: &str,
        keys: ShieldedKeys,
        dir: &Path,
        tree_depth: usize,
        sync_blocks_per_batch: u64,
    ) -> Result<Self> {
        let empty = MerkleTree::try_new(tree_depth)?;
        std::fs::create_dir_all(dir)
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", dir.display()))?;
        let store = WalletStore::open(dir)?;

        let tree = match store.load_tree()? {
            Some(tree) if tree.depth() != tree_depth => {
                return Err(WalletError::Storage(anyhow::anyhow!(
                    "stored tree has depth {}, configured {tree_depth}",
                    tree.depth()
                )));
            }
            Some(tree) => tree,
            None => empty,
        };
        let state = store.load_state()?.unwrap_or_default();

        log::info!(
            "Opened wallet '{username}' at {} (next block {}, {} leaves)",
            dir.display(),
            state.next_block,
            tree.num_entries()
        );

        Ok(Self {
            username: username.to_string(),
            keys,
            store,
            tree,
            state,
            sync_blocks_per_batch: sync_blocks_per_batch.max(1),
        })
    }

    pub fn open_with_config(
        username: &str,
        keys: ShieldedKeys,
        config: &WalletConfig,
    ) -> Result<Self> {
        Self::open(
            username,
            keys,
            &config.user_dir(username),
            config.tree_depth,
            config.sync_blocks_per_batch,
        )
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn address(&self) -> ShieldedAddress {
        self.keys.address
    }

    pub fn keys(&self) -> &ShieldedKeys {
        &self.keys
    }

    /// The local commitment tree, always clean between syncs
    pub fn tree(&self) -> &MerkleTree {
        &self.tree
    }

    pub fn state(&self) -> &WalletState {
        &self.state
    }

    pub fn next_block(&self) -> u64 {
        self.state.next_block
    }

    /// Scans every block up to the ledger's head
    pub fn sync<L: LedgerClient + ?Sized>(&mut self, ledger: &L) -> Result<SyncSummary> {
        let head = ledger.block_number()?;
        let mut summary = SyncSummary::default();

        while self.state.next_block <= head {
            let from = self.state.next_block;
            let to = head.min(from.saturating_add(self.sync_blocks_per_batch - 1));
            self.sync_chunk(ledger, from, to, &mut summary)?;
            summary.blocks_scanned += to - from + 1;
        }

        summary.total_notes_seen = self.state.num_notes;
        if !summary.new_notes.is_empty() || !summary.spent.is_empty() {
            log::info!(
                "Wallet '{}' synced to block {head}: {} new notes, {} spent",
                self.username,
                summary.new_notes.len(),
                summary.spent.len()
            );
        }
        Ok(summary)
    }

    /// Processes `from..=to` on a working copy and swaps it in once stored
    fn sync_chunk<L: LedgerClient + ?Sized>(
        &mut self,
        ledger: &L,
        from: u64,
        to: u64,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let results = ledger.mix_results(from, to)?;
        log::debug!("Scanning blocks {from}..={to}: {} mix results", results.len());

        let mut tree = self.tree.clone();
        let mut state = self.state.clone();
        let mut batch = SyncBatch::default();
        let mut last_root = None;

        for result in &results {
            for event in &result.output_events {
                let address = tree.insert(&event.commitment)?;
                let Some(note) = try_decrypt_note(&event.ciphertext, &self.keys.secret.k_sk)
                else {
                    continue;
                };
                if note.commitment() != event.commitment {
                    log::warn!(
                        "Decrypted note at address {address} does not match commitment {}",
                        event.commitment
                    );
                    summary.commitment_mismatches += 1;
                    continue;
                }
                if note.owner != self.keys.address.a_pk {
                    log::debug!("Ignoring note at address {address} for another owner");
                    continue;
                }
                let nullifier = note.nullifier(&self.keys.secret.a_sk);
                state
                    .nullifier_map
                    .insert(nullifier.to_string(), event.commitment.short());
                state.num_notes += 1;
                log::debug!("Received note {} (value {})", event.commitment.short(), note.value.0);
                batch.new_notes.push(NoteDescription::new(note, address));
            }

            for nullifier in &result.nullifiers {
                let Some(short) = state.nullifier_map.remove(&nullifier.to_string()) else {
                    continue;
                };
                let commitment = self.resolve_spent(&batch.new_notes, &short, nullifier)?;
                log::debug!("Note {short} spent in block {}", result.block);
                batch.spent.push(commitment);
            }
            last_root = Some((result.block, result.new_merkle_root));
        }

        let computed = tree.recompute_root();
        if let Some((block, expected)) = last_root
            && computed != expected
        {
            return Err(WalletError::MerkleRootMismatch {
                block,
                expected: hex::encode(expected),
                computed: hex::encode(computed),
            });
        }

        state.next_block = to + 1;
        batch.state = Some(&state);
        batch.tree = Some(&tree);
        self.store.commit(&batch)?;

        summary.new_notes.extend(batch.new_notes);
        summary.spent.extend(batch.spent);
        self.tree = tree;
        self.state = state;
        Ok(())
    }

    /// Commitment of the owned note behind a revealed nullifier
    fn resolve_spent(
        &self,
        pending: &[NoteDescription],
        short: &str,
        nullifier: &shroud_privacy::Nullifier,
    ) -> Result<Commitment> {
        let a_sk = &self.keys.secret.a_sk;
        let stored = self.store.notes_with_prefix(short)?;
        pending
            .iter()
            .chain(stored.iter())
            .find(|n| n.commitment.short() == short && n.note.nullifier(a_sk) == *nullifier)
            .map(|n| n.commitment)
            .ok_or_else(|| WalletError::NoteNotFound(short.to_string()))
    }

    /// Notes that can still be spent
    pub fn unspent_notes(&self) -> Result<Vec<NoteDescription>> {
        let mut notes = self.store.notes()?;
        notes.sort_by_key(|n| n.address);
        Ok(notes)
    }

    pub fn spent_notes(&self) -> Result<Vec<NoteDescription>> {
        let mut notes = self.store.spent_notes()?;
        notes.sort_by_key(|n| n.address);
        Ok(notes)
    }

    /// Looks up an unspent note by tree address or short-commitment prefix
    ///
    /// A numeric key is tried as an address first.
    pub fn find_note(&self, key: &str) -> Result<NoteDescription> {
        let key = key.trim();
        if let Ok(address) = key.parse::<u64>()
            && let Some(note) = self.unspent_notes()?.into_iter().find(|n| n.address == address)
        {
            return Ok(note);
        }

        let mut matches = self.store.notes_with_prefix(&key.to_ascii_lowercase())?;
        if matches.len() > 1 {
            log::warn!("Commitment prefix {key} is ambiguous ({} notes)", matches.len());
            return Err(WalletError::NoteNotFound(key.to_string()));
        }
        matches.pop().ok_or_else(|| WalletError::NoteNotFound(key.to_string()))
    }

    pub fn note_summaries(&self) -> Result<Vec<NoteSummary>> {
        Ok(self
            .unspent_notes()?
            .into_iter()
            .map(|n| NoteSummary {
                address: n.address,
                short_commitment: n.commitment.short(),
                value: n.value(),
            })
            .collect())
    }

    pub fn balance(&self) -> Result<u64> {
        Ok(self.unspent_notes()?.iter().map(|n| n.value()).sum())
    }

    /// Up to `JS_INPUTS` unspent notes covering `target`, largest first
    pub fn select_inputs(&self, target: u64) -> Result<Vec<NoteDescription>> {
        let mut notes: Vec<_> = self
            .unspent_notes()?
            .into_iter()
            .filter(|n| n.value() > 0)
            .collect();
        notes.sort_by(|a, b| b.value().cmp(&a.value()).then(a.address.cmp(&b.address)));

        let mut selected = Vec::new();
        let mut total = 0u64;
        for note in notes.into_iter().take(JS_INPUTS) {
            if total >= target {
                break;
            }
            total = total.saturating_add(note.value());
            selected.push(note);
        }
        if total < target {
            return Err(WalletError::InsufficientFunds {
                needed: target,
                available: total,
                max_notes: JS_INPUTS,
            });
        }
        Ok(selected)
    }
}
