//! Binary hash tree shared by every configuration topology.
//!
//! A [`Tree::Node`] is an already-hashed subtree: replacing any subtree with a node of its
//! hash leaves the root unchanged, which is what lets topologies hide parts of themselves.

use alloy_primitives::{keccak256, Bytes, B256};

use crate::errors::EncodeError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tree {
    Leaf(Bytes),
    Node(B256),
    Branch(Box<Tree>, Box<Tree>),
}

impl Tree {
    pub fn leaf(value: impl Into<Bytes>) -> Self {
        Tree::Leaf(value.into())
    }

    pub fn branch(left: Tree, right: Tree) -> Self {
        Tree::Branch(Box::new(left), Box::new(right))
    }

    pub fn hash(&self) -> B256 {
        hash(self)
    }
}

/// Root hash of `tree`.
///
/// - node: its embedded hash
/// - leaf: `keccak256(value)`
/// - branch: `keccak256(hash(left) || hash(right))`
pub fn hash(tree: &Tree) -> B256 {
    match tree {
        Tree::Node(hash) => *hash,
        Tree::Leaf(value) => keccak256(value),
        Tree::Branch(left, right) => hash_pair(hash(left), hash(right)),
    }
}

/// `keccak256(left || right)`.
pub fn hash_pair(left: B256, right: B256) -> B256 {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left.as_slice());
    buf[32..].copy_from_slice(right.as_slice());
    keccak256(buf)
}

/// Trees that fold into the generic [`Tree`] to produce their image hash.
///
/// Folding fails only when a leaf cannot be packed into its on-chain encoding.
pub trait ConfigurationTree {
    fn to_generic_tree(&self) -> Result<Tree, EncodeError>;

    /// Image hash of the configuration.
    fn hash_configuration(&self) -> Result<B256, EncodeError> {
        self.to_generic_tree().map(|tree| hash(&tree))
    }
}

impl ConfigurationTree for Tree {
    fn to_generic_tree(&self) -> Result<Tree, EncodeError> {
        Ok(self.clone())
    }

    fn hash_configuration(&self) -> Result<B256, EncodeError> {
        Ok(hash(self))
    }
}
