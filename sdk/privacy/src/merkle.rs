//! Merkle Tree for Note Commitments
//!
//! Append-only tree of fixed depth over commitment leaves, combined with
//! MiMC7 (see [`crate::mimc`]).
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    H23
//!                /  \   /   \
//!               H0  H1 H2   [d0]
//!               |   |   |
//!              C0  C1  C2        (Note Commitments)
//! ```
//!
//! Only the populated prefix of each layer is stored; anything to the right
//! is the layer's default node (`d0 = 0`, `d_{i+1} = H(d_i, d_i)`).
//!
//! Insertions are cheap: they only append a leaf and remember the lowest
//! touched index. [`MerkleTree::recompute_root`] then rehashes the ancestors
//! of the touched leaves in one pass. Reading the root or a path while
//! insertions are pending is an error.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::error::{PrivacyError, Result};
use crate::mimc;

const MAGIC: &[u8; 4] = b"SHMT";
const VERSION: u16 = 1;
const CLEAN: u64 = u64::MAX;

/// A Merkle path proving inclusion of a leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// The leaf position
    pub address: u64,
    /// Sibling hashes from leaf to root
    #[serde(with = "crate::hex_serde::words")]
    pub siblings: Vec<[u8; 32]>,
}

impl MerklePath {
    /// Fold the path over `leaf`
    pub fn compute_root(&self, leaf: &[u8; 32]) -> [u8; 32] {
        self.siblings
            .iter()
            .enumerate()
            .fold(*leaf, |node, (layer, sibling)| {
                if (self.address >> layer) & 1 == 0 {
                    mimc::combine(&node, sibling)
                } else {
                    mimc::combine(sibling, &node)
                }
            })
    }

    /// Verify that this path proves inclusion of `leaf` in `root`
    pub fn verify(&self, leaf: &Commitment, root: &[u8; 32]) -> bool {
        &self.compute_root(leaf.as_bytes()) == root
    }
}

/// Fill level of a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    Empty,
    Growing,
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    depth: usize,
    /// Default node per layer, `defaults[depth]` is the empty root
    defaults: Vec<[u8; 32]>,
    /// Populated prefix of every layer, `layers[0]` are the leaves
    layers: Vec<Vec<[u8; 32]>>,
    /// Lowest leaf index inserted since the last recomputation
    dirty_from: Option<usize>,
}

impl MerkleTree {
    /// Create an empty tree
    ///
    /// # Panics
    /// If `depth` is 0 or larger than 63.
    pub fn new(depth: usize) -> Self {
        assert!(is_supported_depth(depth), "unsupported tree depth {depth}");
        Self {
            depth,
            defaults: default_nodes(depth),
            layers: vec![Vec::new(); depth + 1],
            dirty_from: None,
        }
    }

    /// Create an empty tree, rejecting unsupported depths
    pub fn try_new(depth: usize) -> Result<Self> {
        if !is_supported_depth(depth) {
            return Err(PrivacyError::InvalidDepth(depth));
        }
        Ok(Self::new(depth))
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn num_entries(&self) -> u64 {
        self.layers[0].len() as u64
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_from.is_some()
    }

    pub fn state(&self) -> TreeState {
        match self.num_entries() {
            0 => TreeState::Empty,
            n if n == self.capacity() => TreeState::Full,
            _ => TreeState::Growing,
        }
    }

    /// Default node of `layer`
    pub fn default_at(&self, layer: usize) -> [u8; 32] {
        self.defaults[layer]
    }

    /// Append a commitment, returning its leaf address. The root is not
    /// updated until [`recompute_root`](Self::recompute_root).
    pub fn insert(&mut self, commitment: &Commitment) -> Result<u64> {
        if self.state() == TreeState::Full {
            return Err(PrivacyError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        let address = self.layers[0].len();
        self.layers[0].push(commitment.0);
        self.dirty_from.get_or_insert(address);
        Ok(address as u64)
    }

    /// Rehash the ancestors of every leaf inserted since the last call and
    /// return the root. Does nothing on a clean tree.
    pub fn recompute_root(&mut self) -> [u8; 32] {
        if let Some(mut start) = self.dirty_from.take() {
            for layer in 0..self.depth {
                let (lower, upper) = self.layers.split_at_mut(layer + 1);
                let children = &lower[layer];
                let parents = &mut upper[0];
                let parent_start = start / 2;
                let parent_len = children.len().div_ceil(2);
                let default = self.defaults[layer];

                parents.truncate(parent_start);
                for p in parent_start..parent_len {
                    let left = children[2 * p];
                    let right = children.get(2 * p + 1).copied().unwrap_or(default);
                    parents.push(mimc::combine(&left, &right));
                }
                start = parent_start;
            }
        }
        self.root_unchecked()
    }

    fn root_unchecked(&self) -> [u8; 32] {
        self.layers[self.depth]
            .first()
            .copied()
            .unwrap_or(self.defaults[self.depth])
    }

    /// Current root. Fails if insertions are pending.
    pub fn root(&self) -> Result<[u8; 32]> {
        if self.is_dirty() {
            return Err(PrivacyError::StaleTree);
        }
        Ok(self.root_unchecked())
    }

    /// Node at `(layer, index)`, or the layer default outside the populated
    /// region. Upper layers reflect the last recomputation.
    pub fn get_node(&self, layer: usize, index: u64) -> [u8; 32] {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.layers[layer].get(i).copied())
            .unwrap_or(self.defaults[layer])
    }

    pub fn get_leaf(&self, index: u64) -> [u8; 32] {
        self.get_node(0, index)
    }

    /// Authentication path of the leaf at `address`, ordered leaf to root
    pub fn get_path(&self, address: u64) -> Result<MerklePath> {
        if self.is_dirty() {
            return Err(PrivacyError::StaleTree);
        }
        if address >= self.capacity() {
            return Err(PrivacyError::AddressOutOfRange {
                address,
                depth: self.depth,
            });
        }
        let siblings = (0..self.depth)
            .map(|layer| self.get_node(layer, (address >> layer) ^ 1))
            .collect();
        Ok(MerklePath { address, siblings })
    }

    /// Binary encoding: header, defaults, then every populated layer
    pub fn to_bytes(&self) -> Vec<u8> {
        let nodes: usize = self.layers.iter().map(Vec::len).sum();
        let mut out = Vec::with_capacity(32 + (nodes + self.defaults.len()) * 32);
        out.extend_from_slice(MAGIC);
        // Writes into a Vec cannot fail.
        let _ = out.write_u16::<BigEndian>(VERSION);
        let _ = out.write_u32::<BigEndian>(self.depth as u32);
        let _ = out.write_u64::<BigEndian>(self.dirty_from.map_or(CLEAN, |d| d as u64));
        for node in &self.defaults {
            out.extend_from_slice(node);
        }
        for layer in &self.layers {
            let _ = out.write_u64::<BigEndian>(layer.len() as u64);
            for node in layer {
                out.extend_from_slice(node);
            }
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let corrupt = |what: &str| PrivacyError::CorruptTree(what.to_string());
        let mut cursor = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic).map_err(|_| corrupt("truncated header"))?;
        if &magic != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = cursor.read_u16::<BigEndian>().map_err(|_| corrupt("truncated header"))?;
        if version != VERSION {
            return Err(PrivacyError::CorruptTree(format!("unsupported version {version}")));
        }
        let depth = cursor.read_u32::<BigEndian>().map_err(|_| corrupt("truncated header"))? as usize;
        if !is_supported_depth(depth) {
            return Err(PrivacyError::CorruptTree(format!("bad depth {depth}")));
        }
        let dirty = cursor.read_u64::<BigEndian>().map_err(|_| corrupt("truncated header"))?;

        let read_node = |cursor: &mut Cursor<&[u8]>| -> Result<[u8; 32]> {
            let mut node = [0u8; 32];
            cursor.read_exact(&mut node).map_err(|_| corrupt("truncated node"))?;
            Ok(node)
        };

        let defaults = (0..=depth)
            .map(|_| read_node(&mut cursor))
            .collect::<Result<Vec<_>>>()?;
        if defaults != default_nodes(depth) {
            return Err(corrupt("default nodes do not match hash function"));
        }

        let mut layers = Vec::with_capacity(depth + 1);
        for layer in 0..=depth {
            let len = cursor.read_u64::<BigEndian>().map_err(|_| corrupt("truncated layer"))?;
            let max = 1u64 << (depth - layer);
            if len > max || len.saturating_mul(32) > bytes.len() as u64 {
                return Err(PrivacyError::CorruptTree(format!("layer {layer} too long")));
            }
            let nodes = (0..len)
                .map(|_| read_node(&mut cursor))
                .collect::<Result<Vec<_>>>()?;
            layers.push(nodes);
        }
        if (cursor.position() as usize) != bytes.len() {
            return Err(corrupt("trailing bytes"));
        }

        let dirty_from = match dirty {
            CLEAN => None,
            d if d < layers[0].len() as u64 => Some(d as usize),
            _ => return Err(corrupt("dirty marker beyond leaves")),
        };

        // Upper layers cover the leaves present at the last recomputation
        let mut expected = dirty_from.unwrap_or(layers[0].len());
        for (layer, nodes) in layers.iter().enumerate().skip(1) {
            expected = expected.div_ceil(2);
            if nodes.len() != expected {
                return Err(PrivacyError::CorruptTree(format!(
                    "layer {layer} has {} nodes, expected {expected}",
                    nodes.len()
                )));
            }
        }

        Ok(Self {
            depth,
            defaults,
            layers,
            dirty_from,
        })
    }
}

fn is_supported_depth(depth: usize) -> bool {
    (1..64).contains(&depth)
}

fn default_nodes(depth: usize) -> Vec<[u8; 32]> {
    let mut defaults = Vec::with_capacity(depth + 1);
    defaults.push([0u8; 32]);
    for layer in 0..depth {
        let d = defaults[layer];
        defaults.push(mimc::combine(&d, &d));
    }
    defaults
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DEPTH: usize = 4;

    fn leaf(i: u8) -> Commitment {
        let mut bytes = [0u8; 32];
        bytes[31] = i;
        bytes[0] = 0x0a;
        Commitment(bytes)
    }

    fn full_rebuild(leaves: &[Commitment]) -> [u8; 32] {
        let defaults = default_nodes(DEPTH);
        let mut layer: Vec<[u8; 32]> = leaves.iter().map(|c| c.0).collect();
        for default in defaults.iter().take(DEPTH) {
            layer = layer
                .chunks(2)
                .map(|pair| mimc::combine(&pair[0], pair.get(1).unwrap_or(default)))
                .collect();
        }
        layer.first().copied().unwrap_or(defaults[DEPTH])
    }

    #[test]
    fn test_empty_tree() {
        let mut tree = MerkleTree::new(DEPTH);
        assert_eq!(tree.state(), TreeState::Empty);
        assert_eq!(tree.root().unwrap(), tree.default_at(DEPTH));
        assert_eq!(tree.recompute_root(), tree.default_at(DEPTH));
        assert_eq!(tree.get_leaf(3), [0u8; 32]);
    }

    #[test]
    fn test_insert_marks_dirty() {
        let mut tree = MerkleTree::new(DEPTH);
        assert_eq!(tree.insert(&leaf(1)).unwrap(), 0);
        assert_eq!(tree.insert(&leaf(2)).unwrap(), 1);
        assert!(tree.is_dirty());
        assert_eq!(tree.root(), Err(PrivacyError::StaleTree));
        assert_eq!(tree.get_path(0), Err(PrivacyError::StaleTree));

        let root = tree.recompute_root();
        assert!(!tree.is_dirty());
        assert_eq!(tree.root().unwrap(), root);
        assert_eq!(tree.state(), TreeState::Growing);
    }

    #[test]
    fn test_recompute_idempotent() {
        let mut tree = MerkleTree::new(DEPTH);
        tree.insert(&leaf(1)).unwrap();
        let first = tree.recompute_root();
        let snapshot = tree.clone();
        assert_eq!(tree.recompute_root(), first);
        assert_eq!(tree, snapshot);
    }

    #[test]
    fn test_single_leaf_root() {
        let mut tree = MerkleTree::new(DEPTH);
        tree.insert(&leaf(7)).unwrap();
        let root = tree.recompute_root();

        let mut expected = leaf(7).0;
        for layer in 0..DEPTH {
            expected = mimc::combine(&expected, &tree.default_at(layer));
        }
        assert_eq!(root, expected);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut tree = MerkleTree::new(DEPTH);
        for i in 0..16 {
            tree.insert(&leaf(i)).unwrap();
        }
        assert_eq!(tree.state(), TreeState::Full);
        assert_eq!(
            tree.insert(&leaf(16)),
            Err(PrivacyError::CapacityExceeded { capacity: 16 })
        );
        tree.recompute_root();
        assert!(tree.get_path(15).is_ok());
        assert!(matches!(
            tree.get_path(16),
            Err(PrivacyError::AddressOutOfRange { address: 16, .. })
        ));
    }

    #[test]
    fn test_nodes_beyond_populated_region() {
        let mut tree = MerkleTree::new(DEPTH);
        tree.insert(&leaf(1)).unwrap();
        tree.recompute_root();
        assert_eq!(tree.get_leaf(0), leaf(1).0);
        assert_eq!(tree.get_leaf(1), tree.default_at(0));
        assert_eq!(tree.get_node(2, 3), tree.default_at(2));
        assert_eq!(tree.get_node(1, u64::MAX), tree.default_at(1));
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut tree = MerkleTree::new(DEPTH);
        for i in 0..5 {
            tree.insert(&leaf(i)).unwrap();
        }
        let root = tree.recompute_root();

        let bytes = tree.to_bytes();
        let mut loaded = MerkleTree::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, tree);
        assert_eq!(loaded.to_bytes(), bytes);
        assert_eq!(loaded.recompute_root(), root);
    }

    #[test]
    fn test_bytes_round_trip_preserves_pending() {
        let mut tree = MerkleTree::new(DEPTH);
        tree.insert(&leaf(1)).unwrap();
        tree.recompute_root();
        tree.insert(&leaf(2)).unwrap();

        let mut loaded = MerkleTree::from_bytes(&tree.to_bytes()).unwrap();
        assert!(loaded.is_dirty());
        assert_eq!(loaded.recompute_root(), tree.recompute_root());
    }

    #[test]
    fn test_corrupt_bytes_rejected() {
        let mut tree = MerkleTree::new(DEPTH);
        tree.insert(&leaf(1)).unwrap();
        tree.recompute_root();
        let bytes = tree.to_bytes();

        assert!(MerkleTree::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(MerkleTree::from_bytes(b"nope").is_err());

        let mut tampered = bytes.clone();
        tampered[4 + 2 + 4 + 8] ^= 1; // first default node
        assert!(matches!(
            MerkleTree::from_bytes(&tampered),
            Err(PrivacyError::CorruptTree(_))
        ));

        let mut trailing = bytes;
        trailing.push(0);
        assert!(MerkleTree::from_bytes(&trailing).is_err());
    }

    #[test]
    fn test_inconsistent_layers_rejected() {
        let mut tree = MerkleTree::new(DEPTH);
        for i in 0..3 {
            tree.insert(&leaf(i)).unwrap();
        }
        tree.recompute_root();

        // Drop the last leaf but keep the parents computed over three
        let mut short = tree.clone();
        short.layers[0].pop();
        assert!(matches!(
            MerkleTree::from_bytes(&short.to_bytes()),
            Err(PrivacyError::CorruptTree(_))
        ));

        let mut extra = tree.clone();
        extra.layers[1].push([0u8; 32]);
        assert!(matches!(
            MerkleTree::from_bytes(&extra.to_bytes()),
            Err(PrivacyError::CorruptTree(_))
        ));
    }

    #[test]
    fn test_try_new_rejects_bad_depth() {
        assert_eq!(MerkleTree::try_new(0), Err(PrivacyError::InvalidDepth(0)));
        assert_eq!(MerkleTree::try_new(64), Err(PrivacyError::InvalidDepth(64)));
        assert_eq!(MerkleTree::try_new(DEPTH).unwrap().depth(), DEPTH);
    }

    proptest! {
        #[test]
        fn prop_incremental_matches_rebuild(
            leaves in proptest::collection::vec(any::<u8>(), 0..=16),
            batch in 1usize..6,
        ) {
            let leaves: Vec<Commitment> = leaves.into_iter().map(leaf).collect();
            let mut tree = MerkleTree::new(DEPTH);
            for chunk in leaves.chunks(batch) {
                for cm in chunk {
                    tree.insert(cm).unwrap();
                }
                tree.recompute_root();
            }
            prop_assert_eq!(tree.root().unwrap(), full_rebuild(&leaves));
        }

        #[test]
        fn prop_paths_verify(leaves in proptest::collection::vec(any::<u8>(), 1..=16)) {
            let leaves: Vec<Commitment> = leaves.into_iter().map(leaf).collect();
            let mut tree = MerkleTree::new(DEPTH);
            for cm in &leaves {
                tree.insert(cm).unwrap();
            }
            let root = tree.recompute_root();
            for (address, cm) in leaves.iter().enumerate() {
                let path = tree.get_path(address as u64).unwrap();
                prop_assert_eq!(path.siblings.len(), DEPTH);
                prop_assert!(path.verify(cm, &root));
            }
        }
    }
}
