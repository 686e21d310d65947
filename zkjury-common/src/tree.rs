//! Append-only fixed-depth Merkle tree over commitment leaves.
//!
//! Interior nodes are `Poseidon2(left, right)`. Empty slots take the zero
//! chain `zeros[0] = 0`, `zeros[l + 1] = Poseidon2(zeros[l], zeros[l])`, so
//! paths are reproducible across implementations. Every insert records the
//! new root, keeping the full root history addressable as immutable values.

use halo2curves_axiom::bn256::Fr;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::poseidon;

/// Depth of the production tree. The proof relations hard-code this value;
/// a tree of any other depth produces paths they cannot verify.
pub const TREE_DEPTH: usize = 20;

/// Largest depth the zero-sibling table covers.
pub const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("tree depth must be between 1 and {MAX_TREE_DEPTH}")]
    DepthOutOfRange,
    #[error("tree is full ({0} leaves)")]
    Full(u64),
    #[error("leaf index {index} out of range, tree holds {leaf_count} leaves")]
    LeafOutOfRange { index: u64, leaf_count: u64 },
}

static ZEROS: Lazy<Vec<Fr>> = Lazy::new(|| {
    let mut zeros = Vec::with_capacity(MAX_TREE_DEPTH + 1);
    let mut current = Fr::zero();
    zeros.push(current);
    for _ in 0..MAX_TREE_DEPTH {
        current = poseidon::hash2(current, current);
        zeros.push(current);
    }
    zeros
});

fn zero_at(level: usize) -> Fr {
    ZEROS[level]
}

/// An inclusion path from a leaf to the root: sibling values bottom-up, and
/// for each level whether the current node is the right child.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    pub siblings: Vec<Fr>,
    pub bits: Vec<bool>,
}

impl MerklePath {
    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Re-derives the root this path commits to for the given leaf.
    pub fn compute_root(&self, leaf: Fr) -> Fr {
        self.siblings
            .iter()
            .zip(&self.bits)
            .fold(leaf, |node, (sibling, is_right)| {
                if *is_right {
                    poseidon::hash2(*sibling, node)
                } else {
                    poseidon::hash2(node, *sibling)
                }
            })
    }
}

/// An immutable capture of a tree state: the root and how many leaves it
/// commits to. Copy it out and prove against it without holding the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub root: Fr,
    pub leaf_count: u64,
}

#[derive(Clone, Debug)]
pub struct MembershipTree {
    depth: usize,
    // levels[0] holds the leaves, levels[depth] the root
    levels: Vec<Vec<Fr>>,
    roots: Vec<Fr>,
}

impl Default for MembershipTree {
    fn default() -> Self {
        Self::build(TREE_DEPTH)
    }
}

impl MembershipTree {
    /// A tree of the production depth (`TREE_DEPTH`).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depth(depth: usize) -> Result<Self, TreeError> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(TreeError::DepthOutOfRange);
        }
        Ok(Self::build(depth))
    }

    fn build(depth: usize) -> Self {
        Self {
            depth,
            levels: vec![Vec::new(); depth + 1],
            roots: vec![zero_at(depth)],
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn leaf_count(&self) -> u64 {
        self.levels[0].len() as u64
    }

    /// Appends a leaf, recomputes the affected interior nodes up to the root,
    /// records the new root, and returns the leaf's index.
    pub fn insert(&mut self, leaf: Fr) -> Result<u64, TreeError> {
        let index = self.levels[0].len();
        if index as u64 >= self.capacity() {
            return Err(TreeError::Full(self.capacity()));
        }
        self.levels[0].push(leaf);

        let mut idx = index;
        for level in 0..self.depth {
            let parent = idx >> 1;
            let left = self.node(level, parent << 1);
            let right = self.node(level, (parent << 1) | 1);
            let digest = poseidon::hash2(left, right);
            let parents = &mut self.levels[level + 1];
            if parent == parents.len() {
                parents.push(digest);
            } else {
                parents[parent] = digest;
            }
            idx = parent;
        }

        self.roots.push(self.root());
        Ok(index as u64)
    }

    /// Position of the first leaf equal to `commitment`. Absence means the
    /// caller is holding material for a leaf that was never registered and
    /// must be treated as a hard error.
    pub fn index_of(&self, commitment: Fr) -> Option<u64> {
        self.levels[0]
            .iter()
            .position(|leaf| *leaf == commitment)
            .map(|idx| idx as u64)
    }

    /// Inclusion path for the leaf at `index`. Deterministic for a fixed
    /// tree state.
    pub fn path(&self, index: u64) -> Result<MerklePath, TreeError> {
        if index >= self.leaf_count() {
            return Err(TreeError::LeafOutOfRange {
                index,
                leaf_count: self.leaf_count(),
            });
        }
        let mut siblings = Vec::with_capacity(self.depth);
        let mut bits = Vec::with_capacity(self.depth);
        let mut idx = index as usize;
        for level in 0..self.depth {
            siblings.push(self.node(level, idx ^ 1));
            bits.push(idx & 1 == 1);
            idx >>= 1;
        }
        Ok(MerklePath { siblings, bits })
    }

    pub fn root(&self) -> Fr {
        self.node(self.depth, 0)
    }

    /// Every root this tree has had, oldest first, starting with the
    /// empty-tree root.
    pub fn roots(&self) -> &[Fr] {
        &self.roots
    }

    pub fn is_known_root(&self, root: Fr) -> bool {
        self.roots.contains(&root)
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            root: self.root(),
            leaf_count: self.leaf_count(),
        }
    }

    fn node(&self, level: usize, idx: usize) -> Fr {
        self.levels[level]
            .get(idx)
            .copied()
            .unwrap_or_else(|| zero_at(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_root_matches_the_zero_chain() {
        let tree = MembershipTree::with_depth(4).unwrap();
        let mut expected = Fr::zero();
        for _ in 0..4 {
            expected = poseidon::hash2(expected, expected);
        }
        assert_eq!(tree.root(), expected);
        assert_eq!(MembershipTree::with_depth(4).unwrap().root(), tree.root());
    }

    #[test]
    fn every_insert_changes_the_root_and_extends_history() {
        let mut tree = MembershipTree::with_depth(4).unwrap();
        let empty = tree.root();
        let first = {
            tree.insert(Fr::from(1u64)).unwrap();
            tree.root()
        };
        let second = {
            tree.insert(Fr::from(2u64)).unwrap();
            tree.root()
        };
        assert_ne!(empty, first);
        assert_ne!(first, second);
        assert_eq!(tree.roots(), &[empty, first, second]);
        assert!(tree.is_known_root(empty));
        assert!(tree.is_known_root(first));
        assert!(!tree.is_known_root(Fr::from(999u64)));
    }

    #[test]
    fn paths_reproduce_the_root() {
        let mut tree = MembershipTree::with_depth(5).unwrap();
        let leaves = [3u64, 17, 99, 4];
        for leaf in leaves {
            tree.insert(Fr::from(leaf)).unwrap();
        }
        for (idx, leaf) in leaves.iter().enumerate() {
            let path = tree.path(idx as u64).unwrap();
            assert_eq!(path.depth(), 5);
            assert_eq!(path.compute_root(Fr::from(*leaf)), tree.root());
        }
    }

    #[test]
    fn single_leaf_path_uses_zero_siblings() {
        let mut tree = MembershipTree::with_depth(4).unwrap();
        tree.insert(Fr::from(42u64)).unwrap();
        let path = tree.path(0).unwrap();
        let mut zero = Fr::zero();
        for sibling in &path.siblings {
            assert_eq!(*sibling, zero);
            zero = poseidon::hash2(zero, zero);
        }
        assert!(path.bits.iter().all(|bit| !bit));
    }

    #[test]
    fn paths_are_deterministic_for_a_fixed_state() {
        let mut tree = MembershipTree::with_depth(4).unwrap();
        tree.insert(Fr::from(7u64)).unwrap();
        tree.insert(Fr::from(8u64)).unwrap();
        assert_eq!(tree.path(1).unwrap(), tree.path(1).unwrap());
    }

    #[test]
    fn index_of_finds_only_registered_leaves() {
        let mut tree = MembershipTree::with_depth(4).unwrap();
        tree.insert(Fr::from(5u64)).unwrap();
        assert_eq!(tree.index_of(Fr::from(5u64)), Some(0));
        assert_eq!(tree.index_of(Fr::from(6u64)), None);
    }

    #[test]
    fn rejects_out_of_range_path_requests() {
        let tree = MembershipTree::with_depth(4).unwrap();
        assert_eq!(
            tree.path(0),
            Err(TreeError::LeafOutOfRange {
                index: 0,
                leaf_count: 0
            })
        );
    }

    #[test]
    fn rejects_inserts_past_capacity() {
        let mut tree = MembershipTree::with_depth(2).unwrap();
        for leaf in 0..4u64 {
            tree.insert(Fr::from(leaf)).unwrap();
        }
        assert_eq!(tree.insert(Fr::from(4u64)), Err(TreeError::Full(4)));
    }

    #[test]
    fn rejects_unusable_depths() {
        assert_eq!(
            MembershipTree::with_depth(0).unwrap_err(),
            TreeError::DepthOutOfRange
        );
        assert_eq!(
            MembershipTree::with_depth(MAX_TREE_DEPTH + 1).unwrap_err(),
            TreeError::DepthOutOfRange
        );
    }

    #[test]
    fn snapshots_are_immutable_values() {
        let mut tree = MembershipTree::with_depth(4).unwrap();
        tree.insert(Fr::from(1u64)).unwrap();
        let snapshot = tree.snapshot();
        tree.insert(Fr::from(2u64)).unwrap();
        assert_eq!(snapshot.leaf_count, 1);
        assert_ne!(snapshot.root, tree.root());
        assert!(tree.is_known_root(snapshot.root));
    }
}
