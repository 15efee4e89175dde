//! Recovery topology and the timelocked payload queue of the recovery extension.

pub mod payload;
pub mod queue;
pub mod topology;

pub use payload::{encode_calldata, hash_recovery_payload, to_decoded, RecoverySignature};
pub use queue::{is_payload_ready, queued_payloads, ExtensionQueue, QueuedPayload, StaticCaller};
pub use topology::{
    decode_topology, encode_topology, from_recovery_leaves, get_recovery_leaves,
    recovery_topology_from_json, recovery_topology_to_json, trim_topology, RecoveryLeaf,
    RecoveryTopology,
};
