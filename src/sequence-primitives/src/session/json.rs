//! Persisted JSON form of a session topology.
//!
//! Branches are arrays, opaque nodes are `0x` hashes and leaves are objects tagged by
//! `type`. Arrays of more than two children fold left.

use alloy_primitives::{Address, B256};
use sequence_primitives_types::SessionPermissions;
use serde::{Deserialize, Serialize};

use crate::{
    errors::TopologyError,
    session::topology::{SessionLeaf, SessionsTopology},
};

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum SessionsTopologyJson {
    Branch(Vec<SessionsTopologyJson>),
    Leaf(SessionLeafJson),
    Node(B256),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub(crate) enum SessionLeafJson {
    SessionPermissions(SessionPermissions),
    ImplicitBlacklist {
        blacklist: Vec<Address>,
    },
    IdentitySigner {
        #[serde(rename = "identitySigner")]
        identity_signer: Address,
    },
}

impl TryFrom<SessionsTopologyJson> for SessionsTopology {
    type Error = TopologyError;

    fn try_from(json: SessionsTopologyJson) -> Result<Self, Self::Error> {
        Ok(match json {
            SessionsTopologyJson::Branch(children) => {
                if children.len() < 2 {
                    return Err(TopologyError::InvalidJson(format!(
                        "branch needs at least two children, got {}",
                        children.len()
                    )));
                }
                let mut children = children.into_iter().map(SessionsTopology::try_from);
                let mut folded = match children.next() {
                    Some(first) => first?,
                    None => return Err(TopologyError::InvalidJson("empty branch".into())),
                };
                for child in children {
                    folded = SessionsTopology::branch(folded, child?);
                }
                folded
            }
            SessionsTopologyJson::Leaf(SessionLeafJson::SessionPermissions(permissions)) => {
                SessionsTopology::permissions(permissions)
            }
            SessionsTopologyJson::Leaf(SessionLeafJson::ImplicitBlacklist { blacklist }) => {
                SessionsTopology::blacklist(blacklist)
            }
            SessionsTopologyJson::Leaf(SessionLeafJson::IdentitySigner { identity_signer }) => {
                SessionsTopology::identity_signer(identity_signer)
            }
            SessionsTopologyJson::Node(hash) => SessionsTopology::Node(hash),
        })
    }
}

impl From<SessionsTopology> for SessionsTopologyJson {
    fn from(topology: SessionsTopology) -> Self {
        match topology {
            SessionsTopology::Branch(left, right) => {
                // Left-leaning chains become one array; arrays fold left when read back.
                let mut children = vec![(*right).into()];
                let mut spine = *left;
                loop {
                    match spine {
                        SessionsTopology::Branch(left, right) => {
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
                SessionsTopologyJson::Branch(children)
            }
            SessionsTopology::Leaf(SessionLeaf::Permissions(permissions)) => {
                SessionsTopologyJson::Leaf(SessionLeafJson::SessionPermissions(permissions))
            }
            SessionsTopology::Leaf(SessionLeaf::ImplicitBlacklist(blacklist)) => {
                SessionsTopologyJson::Leaf(SessionLeafJson::ImplicitBlacklist { blacklist })
            }
            SessionsTopology::Leaf(SessionLeaf::IdentitySigner(identity_signer)) => {
                SessionsTopologyJson::Leaf(SessionLeafJson::IdentitySigner { identity_signer })
            }
            SessionsTopology::Node(hash) => SessionsTopologyJson::Node(hash),
        }
    }
}

pub fn sessions_topology_to_json(topology: &SessionsTopology) -> Result<String, TopologyError> {
    serde_json::to_string(topology).map_err(|e| TopologyError::InvalidJson(e.to_string()))
}

pub fn sessions_topology_from_json(json: &str) -> Result<SessionsTopology, TopologyError> {
    serde_json::from_str(json).map_err(|e| TopologyError::InvalidJson(e.to_string()))
}
