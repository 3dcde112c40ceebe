//! RocksDB storage for a wallet
//!
//! Column families:
//!
//! ```text
//! notes        commitment hex → NoteDescription (JSON)   spendable
//! spent_notes  commitment hex → NoteDescription (JSON)   nullifier seen
//! meta         "state" → WalletState (JSON), "tree" → serialized MerkleTree
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::{Deserialize, Serialize};
use shroud_privacy::{Commitment, MerkleTree, NoteDescription};

const CF_NOTES: &str = "notes";
const CF_SPENT_NOTES: &str = "spent_notes";
const CF_META: &str = "meta";

const KEY_STATE: &[u8] = b"state";
const KEY_TREE: &[u8] = b"tree";

/// Scan progress persisted alongside the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    /// First block not yet scanned
    pub next_block: u64,
    /// Owned notes received so far
    pub num_notes: u64,
    /// Nullifier hex → short commitment of the owned, unspent note
    pub nullifier_map: BTreeMap<String, String>,
}

impl Default for WalletState {
    fn default() -> Self {
        Self {
            next_block: 1,
            num_notes: 0,
            nullifier_map: BTreeMap::new(),
        }
    }
}

/// Everything one sync chunk writes
#[derive(Debug, Default)]
pub struct SyncBatch<'a> {
    pub new_notes: Vec<NoteDescription>,
    pub spent: Vec<Commitment>,
    pub state: Option<&'a WalletState>,
    pub tree: Option<&'a MerkleTree>,
}

/// A thread-safe wrapper around the wallet's RocksDB.
#[derive(Clone)]
pub struct WalletStore {
    db: Arc<DB>,
}

impl WalletStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_NOTES, Options::default()),
            ColumnFamilyDescriptor::new(CF_SPENT_NOTES, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path.as_ref(), families)
            .map_err(|e| anyhow::anyhow!("Failed to open wallet database: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn load_state(&self) -> Result<Option<WalletState>> {
        let cf = self.db.cf_handle(CF_META).context("meta CF missing")?;
        match self.db.get_cf(cf, KEY_STATE)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("Corrupt wallet state")?,
            )),
            None => Ok(None),
        }
    }

    pub fn load_tree(&self) -> Result<Option<MerkleTree>> {
        let cf = self.db.cf_handle(CF_META).context("meta CF missing")?;
        match self.db.get_cf(cf, KEY_TREE)? {
            Some(bytes) => Ok(Some(
                MerkleTree::from_bytes(&bytes).context("Corrupt commitment tree")?,
            )),
            None => Ok(None),
        }
    }

    /// Spendable notes, ordered by commitment
    pub fn notes(&self) -> Result<Vec<NoteDescription>> {
        self.scan(CF_NOTES)
    }

    pub fn spent_notes(&self) -> Result<Vec<NoteDescription>> {
        self.scan(CF_SPENT_NOTES)
    }

    /// Spendable notes whose commitment hex starts with `prefix`
    pub fn notes_with_prefix(&self, prefix: &str) -> Result<Vec<NoteDescription>> {
        let cf = self.db.cf_handle(CF_NOTES).context("notes CF missing")?;
        let mut out = Vec::new();
        let iter = self.db.iterator_cf(
            cf,
            IteratorMode::From(prefix.as_bytes(), rocksdb::Direction::Forward),
        );
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            out.push(serde_json::from_slice(&value).context("Corrupt note record")?);
        }
        Ok(out)
    }

    pub fn get_note(&self, commitment: &Commitment) -> Result<Option<NoteDescription>> {
        let cf = self.db.cf_handle(CF_NOTES).context("notes CF missing")?;
        match self.db.get_cf(cf, commitment.to_string())? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("Corrupt note record")?,
            )),
            None => Ok(None),
        }
    }

    /// Applies a sync chunk atomically
    ///
    /// New notes are written before spends are moved, so a note received and
    /// spent in the same chunk ends up in `spent_notes`.
    pub fn commit(&self, batch: &SyncBatch<'_>) -> Result<()> {
        let notes_cf = self.db.cf_handle(CF_NOTES).context("notes CF missing")?;
        let spent_cf = self
            .db
            .cf_handle(CF_SPENT_NOTES)
            .context("spent_notes CF missing")?;
        let meta_cf = self.db.cf_handle(CF_META).context("meta CF missing")?;

        let mut wb = WriteBatch::default();
        for note in &batch.new_notes {
            wb.put_cf(notes_cf, note.commitment.to_string(), serde_json::to_vec(note)?);
        }
        for commitment in &batch.spent {
            let record = match batch.new_notes.iter().find(|n| n.commitment == *commitment) {
                Some(note) => note.clone(),
                None => self
                    .get_note(commitment)?
                    .with_context(|| format!("Spent note {commitment} not in store"))?,
            };
            let key = commitment.to_string();
            wb.delete_cf(notes_cf, &key);
            wb.put_cf(spent_cf, &key, serde_json::to_vec(&record)?);
        }
        if let Some(state) = batch.state {
            wb.put_cf(meta_cf, KEY_STATE, serde_json::to_vec(state)?);
        }
        if let Some(tree) = batch.tree {
            wb.put_cf(meta_cf, KEY_TREE, tree.to_bytes());
        }

        self.db.write(wb).context("Failed to commit wallet batch")?;
        Ok(())
    }

    fn scan(&self, cf_name: &str) -> Result<Vec<NoteDescription>> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .with_context(|| format!("{cf_name} CF missing"))?;
        self.db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|item| -> Result<NoteDescription> {
                let (_, value) = item?;
                Ok(serde_json::from_slice(&value).context("Corrupt note record")?)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use shroud_privacy::{Note, OwnershipKeyPair};
    use tempfile::tempdir;

    fn note(value: u64, address: u64) -> NoteDescription {
        let owner = OwnershipKeyPair::random(&mut OsRng).public;
        NoteDescription::new(Note::new(owner, value, &mut OsRng), address)
    }

    #[test]
    fn test_fresh_store_is_empty() {
        let dir = tempdir().unwrap();
        let store = WalletStore::open(dir.path()).unwrap();
        assert!(store.load_state().unwrap().is_none());
        assert!(store.load_tree().unwrap().is_none());
        assert!(store.notes().unwrap().is_empty());
    }

    #[test]
    fn test_commit_and_reload() {
        let dir = tempdir().unwrap();
        let a = note(10, 0);
        let b = note(20, 1);
        let mut tree = MerkleTree::new(4);
        tree.insert(&a.commitment).unwrap();
        tree.insert(&b.commitment).unwrap();
        let root = tree.recompute_root();
        let state = WalletState {
            next_block: 5,
            num_notes: 2,
            ..Default::default()
        };

        {
            let store = WalletStore::open(dir.path()).unwrap();
            store
                .commit(&SyncBatch {
                    new_notes: vec![a.clone(), b.clone()],
                    spent: vec![],
                    state: Some(&state),
                    tree: Some(&tree),
                })
                .unwrap();
        }

        let store = WalletStore::open(dir.path()).unwrap();
        assert_eq!(store.load_state().unwrap(), Some(state));
        assert_eq!(store.load_tree().unwrap().unwrap().root().unwrap(), root);
        assert_eq!(store.notes().unwrap().len(), 2);
        assert_eq!(store.get_note(&a.commitment).unwrap(), Some(a.clone()));

        let by_prefix = store.notes_with_prefix(&b.commitment.short()).unwrap();
        assert!(by_prefix.contains(&b));
    }

    #[test]
    fn test_spend_moves_note() {
        let dir = tempdir().unwrap();
        let store = WalletStore::open(dir.path()).unwrap();
        let a = note(10, 0);
        let b = note(20, 1);
        store
            .commit(&SyncBatch {
                new_notes: vec![a.clone()],
                ..Default::default()
            })
            .unwrap();

        // `b` arrives and is spent in the same batch, `a` was stored earlier
        store
            .commit(&SyncBatch {
                new_notes: vec![b.clone()],
                spent: vec![a.commitment, b.commitment],
                ..Default::default()
            })
            .unwrap();

        assert!(store.notes().unwrap().is_empty());
        let spent = store.spent_notes().unwrap();
        assert_eq!(spent.len(), 2);
        assert!(spent.contains(&a) && spent.contains(&b));
    }

    #[test]
    fn test_unknown_spend_fails_atomically() {
        let dir = tempdir().unwrap();
        let store = WalletStore::open(dir.path()).unwrap();
        let a = note(10, 0);
        let missing = note(5, 9);
        let result = store.commit(&SyncBatch {
            new_notes: vec![a],
            spent: vec![missing.commitment],
            ..Default::default()
        });
        assert!(result.is_err());
        assert!(store.notes().unwrap().is_empty());
    }
}
