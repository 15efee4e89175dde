//! Hash domains and tree flags mirrored from the wallet contracts.

// EIP-712 domains (`name`, `version`).
pub const WALLET_DOMAIN_NAME: &str = "Sequence Wallet";
pub const WALLET_DOMAIN_VERSION: &str = "3";
pub const RECOVERY_DOMAIN_NAME: &str = "Sequence Wallet - Recovery Mode";
pub const RECOVERY_DOMAIN_VERSION: &str = "1";

// Session topology type tags (high nibble of the first byte).
pub const SESSIONS_FLAG_PERMISSIONS: u8 = 0;
pub const SESSIONS_FLAG_NODE: u8 = 1;
pub const SESSIONS_FLAG_BRANCH: u8 = 2;
pub const SESSIONS_FLAG_BLACKLIST: u8 = 3;
pub const SESSIONS_FLAG_IDENTITY_SIGNER: u8 = 4;

// Recovery topology flags (whole first byte).
pub const RECOVERY_FLAG_LEAF: u8 = 1;
pub const RECOVERY_FLAG_NODE: u8 = 3;
pub const RECOVERY_FLAG_BRANCH: u8 = 4;

/// Deepest branch nesting the binary topology decoders accept.
pub const MAX_TOPOLOGY_DEPTH: usize = 256;

/// Prefix of every recovery leaf preimage.
pub const RECOVERY_LEAF_PREFIX: &[u8] = b"Sequence recovery leaf:\n";
