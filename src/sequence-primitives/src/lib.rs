//! Sequence wallet primitives: the packed call-batch codec, EIP-712 payload hashing, and
//! the session and recovery configuration trees built on a shared hash tree.

pub mod abi;
pub mod codec;
pub mod constants;
pub mod errors;
pub mod generic_tree;
pub mod recovery;
pub mod session;
pub mod typed_data;
pub mod utils;


pub use codec::{decode_calls, encode_calls};
pub use errors::{DecodeError, EncodeError, Error, TopologyError, TypedDataError};
pub use generic_tree::{ConfigurationTree, Tree};
pub use recovery::{RecoveryLeaf, RecoveryTopology};
pub use sequence_primitives_types as types;
pub use session::{SessionLeaf, SessionsTopology};
pub use typed_data::{hash, to_typed, TypedPayload};
