//! Session configuration tree.
//!
//! Leaves are explicit session grants, the implicit-session blacklist and the identity
//! signer that attests implicit sessions. Every edit takes the topology by reference and
//! returns a new one.

use alloy_primitives::{Address, B256};
use sequence_primitives_types::SessionPermissions;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    constants::{SESSIONS_FLAG_BLACKLIST, SESSIONS_FLAG_IDENTITY_SIGNER, SESSIONS_FLAG_PERMISSIONS},
    errors::{EncodeError, TopologyError},
    generic_tree::{self, ConfigurationTree, Tree},
    session::{json::SessionsTopologyJson, permissions::encode_session_permissions},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SessionsTopologyJson", into = "SessionsTopologyJson")]
pub enum SessionsTopology {
    Branch(Box<SessionsTopology>, Box<SessionsTopology>),
    Leaf(SessionLeaf),
    Node(B256),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionLeaf {
    Permissions(SessionPermissions),
    /// Order is significant for encoding, not for membership.
    ImplicitBlacklist(Vec<Address>),
    IdentitySigner(Address),
}

impl SessionsTopology {
    pub fn branch(left: SessionsTopology, right: SessionsTopology) -> Self {
        SessionsTopology::Branch(Box::new(left), Box::new(right))
    }

    pub fn permissions(permissions: SessionPermissions) -> Self {
        SessionsTopology::Leaf(SessionLeaf::Permissions(permissions))
    }

    pub fn blacklist(addresses: Vec<Address>) -> Self {
        SessionsTopology::Leaf(SessionLeaf::ImplicitBlacklist(addresses))
    }

    pub fn identity_signer(signer: Address) -> Self {
        SessionsTopology::Leaf(SessionLeaf::IdentitySigner(signer))
    }

    /// Leaves reachable without crossing an opaque node, left to right.
    pub fn leaves(&self) -> Vec<&SessionLeaf> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(topology: &'a SessionsTopology, out: &mut Vec<&'a SessionLeaf>) {
    match topology {
        SessionsTopology::Branch(left, right) => {
            collect_leaves(left, out);
            collect_leaves(right, out);
        }
        SessionsTopology::Leaf(leaf) => out.push(leaf),
        SessionsTopology::Node(_) => {}
    }
}

impl SessionLeaf {
    /// Preimage hashed as this leaf's generic-tree value.
    pub fn encode_for_hash(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::new();
        match self {
            SessionLeaf::Permissions(permissions) => {
                buf.push(SESSIONS_FLAG_PERMISSIONS);
                buf.extend_from_slice(&encode_session_permissions(permissions)?);
            }
            SessionLeaf::ImplicitBlacklist(addresses) => {
                buf.push(SESSIONS_FLAG_BLACKLIST);
                for address in addresses {
                    buf.extend_from_slice(address.as_slice());
                }
            }
            SessionLeaf::IdentitySigner(signer) => {
                buf.push(SESSIONS_FLAG_IDENTITY_SIGNER);
                buf.extend_from_slice(signer.as_slice());
            }
        }
        Ok(buf)
    }
}

impl ConfigurationTree for SessionsTopology {
    fn to_generic_tree(&self) -> Result<Tree, EncodeError> {
        Ok(match self {
            SessionsTopology::Branch(left, right) => {
                Tree::branch(left.to_generic_tree()?, right.to_generic_tree()?)
            }
            SessionsTopology::Leaf(leaf) => Tree::leaf(leaf.encode_for_hash()?),
            SessionsTopology::Node(hash) => Tree::Node(*hash),
        })
    }
}

/// A topology holding only an empty blacklist and the identity signer.
pub fn empty_sessions_topology(identity_signer: Address) -> SessionsTopology {
    SessionsTopology::branch(
        SessionsTopology::blacklist(Vec::new()),
        SessionsTopology::identity_signer(identity_signer),
    )
}

pub fn merge_sessions_topologies(left: SessionsTopology, right: SessionsTopology) -> SessionsTopology {
    SessionsTopology::branch(left, right)
}

pub fn get_identity_signer(topology: &SessionsTopology) -> Result<Option<Address>, TopologyError> {
    let mut found = None;
    for leaf in topology.leaves() {
        if let SessionLeaf::IdentitySigner(signer) = leaf {
            if found.is_some() {
                return Err(TopologyError::MultipleIdentitySigners);
            }
            found = Some(*signer);
        }
    }
    Ok(found)
}

/// The blacklist leaf itself (as a subtree), if exactly one is reachable.
pub fn get_implicit_blacklist_leaf(
    topology: &SessionsTopology,
) -> Result<Option<&SessionsTopology>, TopologyError> {
    fn search<'a>(
        topology: &'a SessionsTopology,
        found: &mut Option<&'a SessionsTopology>,
    ) -> Result<(), TopologyError> {
        match topology {
            SessionsTopology::Branch(left, right) => {
                search(left, found)?;
                search(right, found)
            }
            SessionsTopology::Leaf(SessionLeaf::ImplicitBlacklist(_)) => {
                if found.is_some() {
                    return Err(TopologyError::MultipleBlacklists);
                }
                *found = Some(topology);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    let mut found = None;
    search(topology, &mut found)?;
    Ok(found)
}

pub fn get_implicit_blacklist(topology: &SessionsTopology) -> Result<Option<&[Address]>, TopologyError> {
    Ok(match get_implicit_blacklist_leaf(topology)? {
        Some(SessionsTopology::Leaf(SessionLeaf::ImplicitBlacklist(addresses))) => Some(addresses.as_slice()),
        _ => None,
    })
}

pub fn get_session_permissions(
    topology: &SessionsTopology,
    signer: Address,
) -> Result<Option<&SessionPermissions>, TopologyError> {
    let mut found = None;
    for leaf in topology.leaves() {
        match leaf {
            SessionLeaf::Permissions(p) if p.signer == signer => {
                if found.is_some() {
                    return Err(TopologyError::MultipleSessionPermissions(signer));
                }
                found = Some(p);
            }
            _ => {}
        }
    }
    Ok(found)
}

/// Signers of every visible explicit session, in tree order.
pub fn get_explicit_signers(topology: &SessionsTopology) -> Vec<Address> {
    topology
        .leaves()
        .into_iter()
        .filter_map(|leaf| match leaf {
            SessionLeaf::Permissions(p) => Some(p.signer),
            _ => None,
        })
        .collect()
}

/// Exactly one visible blacklist, exactly one visible identity signer, and no two visible
/// explicit sessions for the same signer.
pub fn is_complete_sessions_topology(topology: &SessionsTopology) -> bool {
    matches!(get_identity_signer(topology), Ok(Some(_)))
        && matches!(get_implicit_blacklist_leaf(topology), Ok(Some(_)))
        && get_explicit_signers(topology)
            .into_iter()
            .all(|signer| matches!(get_session_permissions(topology, signer), Ok(Some(_))))
}

/// Merge a new session leaf into the tree, then rebalance it.
///
/// The tree stays logarithmically deep however many sessions are added. Rebalancing
/// reshapes the tree, so the image hash depends on the order of additions.
pub fn add_explicit_session(
    topology: &SessionsTopology,
    permissions: SessionPermissions,
) -> Result<SessionsTopology, TopologyError> {
    let signer = permissions.signer;
    if get_session_permissions(topology, signer)?.is_some() {
        return Err(TopologyError::SessionAlreadyExists(signer));
    }
    debug!(%signer, "adding explicit session");
    let merged = merge_sessions_topologies(topology.clone(), SessionsTopology::permissions(permissions));
    Ok(balance_sessions_topology(&merged))
}

/// Drop the explicit session of `signer`. `None` when nothing is left.
pub fn remove_explicit_session(topology: &SessionsTopology, signer: Address) -> Option<SessionsTopology> {
    debug!(%signer, "removing explicit session");
    retain_leaves(topology, &mut |leaf| {
        !matches!(leaf, SessionLeaf::Permissions(p) if p.signer == signer)
    })
}

/// Drop every explicit session whose deadline is at or before `now` (unix seconds).
///
/// `None` when the input was a lone expired session.
pub fn clean_sessions_topology(topology: &SessionsTopology, now: u64) -> Option<SessionsTopology> {
    let mut expired = 0usize;
    let cleaned = retain_leaves(topology, &mut |leaf| match leaf {
        SessionLeaf::Permissions(p) if p.deadline <= now => {
            expired += 1;
            false
        }
        _ => true,
    });
    if expired > 0 {
        debug!(expired, now, "removed expired sessions");
    }
    cleaned
}

/// Rebuild without the leaves `keep` rejects, collapsing single-child branches.
fn retain_leaves(
    topology: &SessionsTopology,
    keep: &mut impl FnMut(&SessionLeaf) -> bool,
) -> Option<SessionsTopology> {
    match topology {
        SessionsTopology::Branch(left, right) => {
            match (retain_leaves(left, keep), retain_leaves(right, keep)) {
                (Some(left), Some(right)) => Some(SessionsTopology::branch(left, right)),
                (Some(only), None) | (None, Some(only)) => Some(only),
                (None, None) => None,
            }
        }
        SessionsTopology::Leaf(leaf) => keep(leaf).then(|| topology.clone()),
        SessionsTopology::Node(_) => Some(topology.clone()),
    }
}

/// Roll every subtree nobody needs to read into an opaque node.
///
/// Explicit sessions not in `explicit_signers` become nodes. The blacklist becomes a node
/// when `implicit_signers` is empty. Identity signers always stay visible. Branches whose
/// children are both nodes collapse into one node. The image hash is unchanged.
pub fn minimise_sessions_topology(
    topology: &SessionsTopology,
    explicit_signers: &[Address],
    implicit_signers: &[Address],
) -> Result<SessionsTopology, EncodeError> {
    let minimised = match topology {
        SessionsTopology::Branch(left, right) => {
            let left = minimise_sessions_topology(left, explicit_signers, implicit_signers)?;
            let right = minimise_sessions_topology(right, explicit_signers, implicit_signers)?;
            match (&left, &right) {
                (SessionsTopology::Node(l), SessionsTopology::Node(r)) => {
                    SessionsTopology::Node(generic_tree::hash_pair(*l, *r))
                }
                _ => SessionsTopology::branch(left, right),
            }
        }
        SessionsTopology::Leaf(SessionLeaf::Permissions(p)) if !explicit_signers.contains(&p.signer) => {
            SessionsTopology::Node(topology.hash_configuration()?)
        }
        SessionsTopology::Leaf(SessionLeaf::ImplicitBlacklist(_)) if implicit_signers.is_empty() => {
            SessionsTopology::Node(topology.hash_configuration()?)
        }
        _ => topology.clone(),
    };
    Ok(minimised)
}

/// Rebuild the visible leaves and nodes, in order, as a tree balanced by halves.
///
/// Balancing reshapes the tree and so changes the image hash.
pub fn balance_sessions_topology(topology: &SessionsTopology) -> SessionsTopology {
    fn flatten(topology: &SessionsTopology, out: &mut Vec<SessionsTopology>) {
        match topology {
            SessionsTopology::Branch(left, right) => {
                flatten(left, out);
                flatten(right, out);
            }
            other => out.push(other.clone()),
        }
    }

    let mut items = Vec::new();
    flatten(topology, &mut items);
    build_balanced(items).unwrap_or_else(|| topology.clone())
}

fn build_balanced(mut items: Vec<SessionsTopology>) -> Option<SessionsTopology> {
    match items.len() {
        0 => None,
        1 => items.pop(),
        len => {
            let right = items.split_off(len / 2);
            Some(SessionsTopology::branch(build_balanced(items)?, build_balanced(right)?))
        }
    }
}

/// Add `address` to the blacklist. Already present addresses leave the topology unchanged.
pub fn add_to_implicit_blacklist(
    topology: &SessionsTopology,
    address: Address,
) -> Result<SessionsTopology, TopologyError> {
    let current = get_implicit_blacklist(topology)?.ok_or(TopologyError::NoBlacklist)?;
    if current.contains(&address) {
        return Ok(topology.clone());
    }
    let mut updated = current.to_vec();
    updated.push(address);
    debug!(%address, "adding address to implicit blacklist");
    Ok(replace_blacklist(topology, &updated))
}

/// Remove `address` from the blacklist. Absent addresses leave the topology unchanged.
pub fn remove_from_implicit_blacklist(
    topology: &SessionsTopology,
    address: Address,
) -> Result<SessionsTopology, TopologyError> {
    let current = get_implicit_blacklist(topology)?.ok_or(TopologyError::NoBlacklist)?;
    if !current.contains(&address) {
        return Ok(topology.clone());
    }
    let updated: Vec<Address> = current.iter().copied().filter(|a| *a != address).collect();
    debug!(%address, "removing address from implicit blacklist");
    Ok(replace_blacklist(topology, &updated))
}

fn replace_blacklist(topology: &SessionsTopology, addresses: &[Address]) -> SessionsTopology {
    match topology {
        SessionsTopology::Branch(left, right) => SessionsTopology::branch(
            replace_blacklist(left, addresses),
            replace_blacklist(right, addresses),
        ),
        SessionsTopology::Leaf(SessionLeaf::ImplicitBlacklist(_)) => {
            SessionsTopology::blacklist(addresses.to_vec())
        }
        other => other.clone(),
    }
}
