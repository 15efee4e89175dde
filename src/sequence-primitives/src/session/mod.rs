//! Session permission topology.

pub mod encoding;
pub mod json;
pub mod permissions;
pub mod topology;

pub use encoding::{decode_sessions_topology, encode_sessions_topology};
pub use json::{sessions_topology_from_json, sessions_topology_to_json};
pub use permissions::{decode_session_permissions, encode_session_permissions};
pub use topology::{
    add_explicit_session, add_to_implicit_blacklist, balance_sessions_topology,
    clean_sessions_topology, empty_sessions_topology, get_explicit_signers, get_identity_signer,
    get_implicit_blacklist, get_implicit_blacklist_leaf, get_session_permissions,
    is_complete_sessions_topology, merge_sessions_topologies, minimise_sessions_topology,
    remove_explicit_session, remove_from_implicit_blacklist, SessionLeaf, SessionsTopology,
};
