//! Recovery configuration tree: timelocked signers allowed to queue payloads.

use alloy_primitives::{Address, B256, U256};
use sequence_primitives_types::serde_decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    constants::{MAX_TOPOLOGY_DEPTH, RECOVERY_FLAG_BRANCH, RECOVERY_FLAG_LEAF, RECOVERY_FLAG_NODE, RECOVERY_LEAF_PREFIX},
    errors::{DecodeError, EncodeError, TopologyError},
    generic_tree::{self, ConfigurationTree, Tree},
    utils::bytes::{min_bytes_for, push_len, push_uint, read_address, read_b32, read_len, read_slice, read_u8, read_uint},
};

const MAX_DELTA_TIME_BYTES: usize = 3;
const MAX_MIN_TIMESTAMP_BYTES: usize = 8;
const MAX_BRANCH_LEN: usize = 0xff_ffff;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryLeaf {
    pub signer: Address,
    /// Seconds that must pass between queueing a payload and executing it.
    #[serde(with = "serde_decimal")]
    pub required_delta_time: U256,
    /// Payloads queued before this unix timestamp are rejected.
    #[serde(with = "serde_decimal")]
    pub min_timestamp: U256,
}

impl RecoveryLeaf {
    /// `"Sequence recovery leaf:\n" || signer || uint256(requiredDeltaTime) || uint256(minTimestamp)`.
    pub fn encode_for_hash(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RECOVERY_LEAF_PREFIX.len() + 20 + 32 + 32);
        buf.extend_from_slice(RECOVERY_LEAF_PREFIX);
        buf.extend_from_slice(self.signer.as_slice());
        buf.extend_from_slice(&self.required_delta_time.to_be_bytes::<32>());
        buf.extend_from_slice(&self.min_timestamp.to_be_bytes::<32>());
        buf
    }

    pub fn hash(&self) -> B256 {
        generic_tree::hash(&Tree::leaf(self.encode_for_hash()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecoveryTopologyJson", into = "RecoveryTopologyJson")]
pub enum RecoveryTopology {
    Branch(Box<RecoveryTopology>, Box<RecoveryTopology>),
    Leaf(RecoveryLeaf),
    Node(B256),
}

impl RecoveryTopology {
    pub fn branch(left: RecoveryTopology, right: RecoveryTopology) -> Self {
        RecoveryTopology::Branch(Box::new(left), Box::new(right))
    }

    /// Image hash. Recovery leaves always fit their hashed form.
    pub fn hash(&self) -> B256 {
        match self {
            RecoveryTopology::Branch(left, right) => generic_tree::hash_pair(left.hash(), right.hash()),
            RecoveryTopology::Leaf(leaf) => leaf.hash(),
            RecoveryTopology::Node(hash) => *hash,
        }
    }
}

impl ConfigurationTree for RecoveryTopology {
    fn to_generic_tree(&self) -> Result<Tree, EncodeError> {
        Ok(match self {
            RecoveryTopology::Branch(left, right) => {
                Tree::branch(left.to_generic_tree()?, right.to_generic_tree()?)
            }
            RecoveryTopology::Leaf(leaf) => Tree::leaf(leaf.encode_for_hash()),
            RecoveryTopology::Node(hash) => Tree::Node(*hash),
        })
    }
}

/// Balanced-by-halves tree over `leaves`, in order.
pub fn from_recovery_leaves(leaves: &[RecoveryLeaf]) -> Result<RecoveryTopology, TopologyError> {
    match leaves {
        [] => Err(TopologyError::EmptyLeaves),
        [leaf] => Ok(RecoveryTopology::Leaf(leaf.clone())),
        _ => {
            let (left, right) = leaves.split_at(leaves.len() / 2);
            Ok(RecoveryTopology::branch(
                from_recovery_leaves(left)?,
                from_recovery_leaves(right)?,
            ))
        }
    }
}

/// Visible leaves, in order, and whether no part of the tree is hidden behind a node.
pub fn get_recovery_leaves(topology: &RecoveryTopology) -> (Vec<RecoveryLeaf>, bool) {
    fn walk(topology: &RecoveryTopology, leaves: &mut Vec<RecoveryLeaf>, complete: &mut bool) {
        match topology {
            RecoveryTopology::Branch(left, right) => {
                walk(left, leaves, complete);
                walk(right, leaves, complete);
            }
            RecoveryTopology::Leaf(leaf) => leaves.push(leaf.clone()),
            RecoveryTopology::Node(_) => *complete = false,
        }
    }

    let mut leaves = Vec::new();
    let mut complete = true;
    walk(topology, &mut leaves, &mut complete);
    (leaves, complete)
}

/// Keep only `signer`'s leaves visible; everything else is rolled into nodes.
///
/// Branches with two hidden children become a single node, so the result is as small as
/// the proof allows. The image hash is unchanged.
pub fn trim_topology(topology: &RecoveryTopology, signer: Address) -> RecoveryTopology {
    let trimmed = trim(topology, signer);
    debug!(%signer, "trimmed recovery topology");
    trimmed
}

fn trim(topology: &RecoveryTopology, signer: Address) -> RecoveryTopology {
    match topology {
        RecoveryTopology::Leaf(leaf) if leaf.signer == signer => topology.clone(),
        RecoveryTopology::Leaf(leaf) => RecoveryTopology::Node(leaf.hash()),
        RecoveryTopology::Node(_) => topology.clone(),
        RecoveryTopology::Branch(left, right) => {
            let left = trim(left, signer);
            let right = trim(right, signer);
            match (&left, &right) {
                (RecoveryTopology::Node(l), RecoveryTopology::Node(r)) => {
                    RecoveryTopology::Node(generic_tree::hash_pair(*l, *r))
                }
                _ => RecoveryTopology::branch(left, right),
            }
        }
    }
}

/// Binary form read by the recovery extension.
///
/// - leaf: `0x01 || signer || uint24 requiredDeltaTime || uint64 minTimestamp`
/// - node: `0x03 || hash`
/// - branch: left encoding, then the right encoding. A right child that is itself a
///   branch is wrapped as `0x04 || uint24 len || encoding`.
pub fn encode_topology(topology: &RecoveryTopology) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    encode_into(&mut buf, topology)?;
    Ok(buf)
}

fn encode_into(buf: &mut Vec<u8>, topology: &RecoveryTopology) -> Result<(), EncodeError> {
    match topology {
        RecoveryTopology::Branch(left, right) => {
            encode_into(buf, left)?;
            if let RecoveryTopology::Branch(..) = **right {
                let inner = encode_topology(right)?;
                if inner.len() > MAX_BRANCH_LEN {
                    return Err(EncodeError::BranchTooLarge(inner.len()));
                }
                buf.push(RECOVERY_FLAG_BRANCH);
                push_len(buf, inner.len(), 3);
                buf.extend_from_slice(&inner);
            } else {
                encode_into(buf, right)?;
            }
        }
        RecoveryTopology::Leaf(leaf) => {
            if min_bytes_for(leaf.required_delta_time) > MAX_DELTA_TIME_BYTES {
                return Err(EncodeError::RequiredDeltaTimeTooLarge(leaf.required_delta_time));
            }
            if min_bytes_for(leaf.min_timestamp) > MAX_MIN_TIMESTAMP_BYTES {
                return Err(EncodeError::MinTimestampTooLarge(leaf.min_timestamp));
            }
            buf.push(RECOVERY_FLAG_LEAF);
            buf.extend_from_slice(leaf.signer.as_slice());
            push_uint(buf, leaf.required_delta_time, MAX_DELTA_TIME_BYTES);
            push_uint(buf, leaf.min_timestamp, MAX_MIN_TIMESTAMP_BYTES);
        }
        RecoveryTopology::Node(hash) => {
            buf.push(RECOVERY_FLAG_NODE);
            buf.extend_from_slice(hash.as_slice());
        }
    }
    Ok(())
}

/// Parse the flag stream in `bytes`, folding elements left into branches.
pub fn decode_topology(bytes: &[u8]) -> Result<RecoveryTopology, DecodeError> {
    decode_stream(bytes, 0)
}

fn decode_stream(bytes: &[u8], depth: usize) -> Result<RecoveryTopology, DecodeError> {
    let mut i = 0;
    let mut folded: Option<RecoveryTopology> = None;
    while i < bytes.len() {
        let flag = read_u8(bytes, &mut i)?;
        let element = match flag {
            RECOVERY_FLAG_LEAF => RecoveryTopology::Leaf(RecoveryLeaf {
                signer: read_address(bytes, &mut i)?,
                required_delta_time: read_uint(bytes, &mut i, MAX_DELTA_TIME_BYTES)?,
                min_timestamp: read_uint(bytes, &mut i, MAX_MIN_TIMESTAMP_BYTES)?,
            }),
            RECOVERY_FLAG_NODE => RecoveryTopology::Node(read_b32(bytes, &mut i)?),
            RECOVERY_FLAG_BRANCH => {
                if depth >= MAX_TOPOLOGY_DEPTH {
                    return Err(DecodeError::TooDeep(MAX_TOPOLOGY_DEPTH));
                }
                let len = read_len(bytes, &mut i, 3)?;
                decode_stream(read_slice(bytes, &mut i, len)?, depth + 1)?
            }
            _ => return Err(DecodeError::InvalidFlag(flag)),
        };
        folded = Some(match folded {
            Some(acc) => RecoveryTopology::branch(acc, element),
            None => element,
        });
    }
    folded.ok_or(DecodeError::EmptyTopology)
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RecoveryTopologyJson {
    Branch(Vec<RecoveryTopologyJson>),
    Leaf(RecoveryLeafJson),
    Node(B256),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RecoveryLeafJson {
    RecoveryLeaf(RecoveryLeaf),
}

impl TryFrom<RecoveryTopologyJson> for RecoveryTopology {
    type Error = TopologyError;

    fn try_from(json: RecoveryTopologyJson) -> Result<Self, Self::Error> {
        Ok(match json {
            RecoveryTopologyJson::Branch(children) => {
                let mut children = children.into_iter().map(RecoveryTopology::try_from);
                let (Some(first), Some(second)) = (children.next(), children.next()) else {
                    return Err(TopologyError::InvalidJson(
                        "branch needs at least two children".into(),
                    ));
                };
                let mut folded = RecoveryTopology::branch(first?, second?);
                for child in children {
                    folded = RecoveryTopology::branch(folded, child?);
                }
                folded
            }
            RecoveryTopologyJson::Leaf(RecoveryLeafJson::RecoveryLeaf(leaf)) => RecoveryTopology::Leaf(leaf),
            RecoveryTopologyJson::Node(hash) => RecoveryTopology::Node(hash),
        })
    }
}

impl From<RecoveryTopology> for RecoveryTopologyJson {
    fn from(topology: RecoveryTopology) -> Self {
        match topology {
            RecoveryTopology::Branch(left, right) => {
                // Left-leaning chains become one array; arrays fold left when read back.
                let mut children = vec![(*right).into()];
                let mut spine = *left;
                loop {
                    match spine {
                        RecoveryTopology::Branch(left, right) => {
                            children.push((*right).into());
                            spine = *left;
                        }
                        first => {
                            children.push(first.into());
                            break;
                        }
                    }
                }
                children.reverse();
                RecoveryTopologyJson::Branch(children)
            }
            RecoveryTopology::Leaf(leaf) => RecoveryTopologyJson::Leaf(RecoveryLeafJson::RecoveryLeaf(leaf)),
            RecoveryTopology::Node(hash) => RecoveryTopologyJson::Node(hash),
        }
    }
}

pub fn recovery_topology_to_json(topology: &RecoveryTopology) -> Result<String, TopologyError> {
    serde_json::to_string(topology).map_err(|e| TopologyError::InvalidJson(e.to_string()))
}

pub fn recovery_topology_from_json(json: &str) -> Result<RecoveryTopology, TopologyError> {
    serde_json::from_str(json).map_err(|e| TopologyError::InvalidJson(e.to_string()))
}
