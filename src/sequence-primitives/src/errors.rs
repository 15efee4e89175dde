use alloy_primitives::{Address, U256};

/// Crate-wide error, one variant per failure family.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    TypedData(#[from] TypedDataError),
}

/// A value does not fit the field the on-chain format reserves for it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("Nonce is too large")]
    NonceTooLarge,
    #[error("Space does not fit in 20 bytes")]
    SpaceTooLarge,
    #[error("Too many calls: {0}")]
    TooManyCalls(usize),
    #[error("Data too large: {0} bytes")]
    DataTooLarge(usize),
    #[error("Blacklist too large: {0} entries")]
    BlacklistTooLarge(usize),
    #[error("Branch too large: {0} bytes")]
    BranchTooLarge(usize),
    #[error("Too many permissions: {0}")]
    TooManyPermissions(usize),
    #[error("Too many rules: {0}")]
    TooManyRules(usize),
    #[error("Required delta time too large: {0}")]
    RequiredDeltaTimeTooLarge(U256),
    #[error("Min timestamp too large: {0}")]
    MinTimestampTooLarge(U256),
    #[error("Application data too large: {0} bytes")]
    ApplicationDataTooLarge(usize),
    #[error("Redirect url too large: {0} bytes")]
    RedirectUrlTooLarge(usize),
}

/// Malformed input bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Truncated input: needed {needed} bytes at offset {offset}, {len} available")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error("Invalid flag: {0:#04x}")]
    InvalidFlag(u8),
    #[error("Invalid behavior on error: {0}")]
    InvalidBehaviorOnError(u8),
    #[error("Invalid parameter operation: {0}")]
    InvalidParameterOperation(u8),
    #[error("Leftover bytes: {0}")]
    LeftoverBytes(usize),
    #[error("missing self address")]
    MissingSelfAddress,
    #[error("Empty topology")]
    EmptyTopology,
    #[error("Topology nested deeper than {0} branches")]
    TooDeep(usize),
}

/// Structural violations of a configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("multiple identity signers")]
    MultipleIdentitySigners,
    #[error("multiple implicit blacklists")]
    MultipleBlacklists,
    #[error("multiple session permissions for {0}")]
    MultipleSessionPermissions(Address),
    #[error("session already exists for {0}")]
    SessionAlreadyExists(Address),
    #[error("no blacklist found")]
    NoBlacklist,
    #[error("cannot build a tree with zero leaves")]
    EmptyLeaves,
    #[error("invalid topology: {0}")]
    InvalidJson(String),
}

/// The payload kind has no typed-data representation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypedDataError {
    #[error("{0} does not support typed data")]
    Unsupported(&'static str),
}
