//! Packed binary encoding of call batches.

pub mod decoder;
pub mod encoder;

pub use decoder::decode_calls;
pub use encoder::{encode_calls, max_nonce};

/// Bit layout of the global and per-call flag bytes.
pub mod flags {
    pub const SPACE_ZERO: u8 = 0x01;
    /// Bits 1..=3 carry the nonce width in bytes.
    pub const NONCE_SIZE_MASK: u8 = 0x0e;
    pub const SINGLE_CALL: u8 = 0x10;
    pub const CALL_COUNT_U16: u8 = 0x20;

    pub const CALL_TO_SELF: u8 = 0x01;
    pub const CALL_HAS_VALUE: u8 = 0x02;
    pub const CALL_HAS_DATA: u8 = 0x04;
    pub const CALL_HAS_GAS_LIMIT: u8 = 0x08;
    pub const CALL_DELEGATE: u8 = 0x10;
    pub const CALL_ONLY_FALLBACK: u8 = 0x20;
    pub const CALL_BEHAVIOR_SHIFT: u8 = 6;
}
