//! Shared types for Sequence wallet payloads, session permissions and the
//! recovery queue (consumed by the core library and by off-chain tooling).

pub mod attestation;
pub mod payload;
pub mod permission;
pub mod queue;
pub mod serde_decimal;

pub use attestation::{Attestation, AuthData};
pub use payload::{
    BehaviorOnError, Call, Calls, Calls4337, ConfigUpdate, Digest, Message, ParentedPayload,
    Payload, SessionImplicitAuthorize,
};
pub use permission::{ParameterOperation, ParameterRule, Permission, SessionPermissions};
pub use queue::{QueueError, RecoveryQueue};
