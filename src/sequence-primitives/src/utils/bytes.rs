//! Minimal big-endian read/write helpers.
//!
//! Readers advance `i` and fail with [`DecodeError::Truncated`] when the buffer is short.

use alloy_primitives::{Address, B256, U256};

use crate::errors::DecodeError;

fn take<'a>(bytes: &'a [u8], i: &mut usize, len: usize) -> Result<&'a [u8], DecodeError> {
    if bytes.len().saturating_sub(*i) < len {
        return Err(DecodeError::Truncated {
            offset: *i,
            needed: len,
            len: bytes.len().saturating_sub(*i),
        });
    }
    let out = &bytes[*i..*i + len];
    *i += len;
    Ok(out)
}

pub fn read_vec(bytes: &[u8], i: &mut usize, len: usize) -> Result<Vec<u8>, DecodeError> {
    take(bytes, i, len).map(<[u8]>::to_vec)
}

pub fn read_slice<'a>(bytes: &'a [u8], i: &mut usize, len: usize) -> Result<&'a [u8], DecodeError> {
    take(bytes, i, len)
}

pub fn read_u8(bytes: &[u8], i: &mut usize) -> Result<u8, DecodeError> {
    take(bytes, i, 1).map(|b| b[0])
}

/// Read an unsigned big-endian integer of `width` bytes (0..=32).
pub fn read_uint(bytes: &[u8], i: &mut usize, width: usize) -> Result<U256, DecodeError> {
    take(bytes, i, width).map(U256::from_be_slice)
}

/// Same as [`read_uint`] for widths that fit a `usize` (lengths and counts).
pub fn read_len(bytes: &[u8], i: &mut usize, width: usize) -> Result<usize, DecodeError> {
    let offset = *i;
    let raw = take(bytes, i, width)?;
    raw.iter()
        .try_fold(0usize, |acc, b| acc.checked_mul(256)?.checked_add(*b as usize))
        // A length that overflows usize can never be satisfied by the buffer.
        .ok_or(DecodeError::Truncated {
            offset,
            needed: usize::MAX,
            len: bytes.len().saturating_sub(offset),
        })
}

pub fn read_u64(bytes: &[u8], i: &mut usize) -> Result<u64, DecodeError> {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(take(bytes, i, 8)?);
    Ok(u64::from_be_bytes(buf))
}

pub fn read_u256(bytes: &[u8], i: &mut usize) -> Result<U256, DecodeError> {
    read_uint(bytes, i, 32)
}

pub fn read_b32(bytes: &[u8], i: &mut usize) -> Result<B256, DecodeError> {
    take(bytes, i, 32).map(B256::from_slice)
}

pub fn read_address(bytes: &[u8], i: &mut usize) -> Result<Address, DecodeError> {
    take(bytes, i, 20).map(Address::from_slice)
}

/// Number of bytes needed to represent `value` big-endian (zero needs none).
pub fn min_bytes_for(value: U256) -> usize {
    value.bit_len().div_ceil(8)
}

/// Append the low `width` bytes of `value`, big-endian.
pub fn push_uint(buf: &mut Vec<u8>, value: U256, width: usize) {
    let word = value.to_be_bytes::<32>();
    buf.extend_from_slice(&word[32 - width..]);
}

/// Append the low `width` bytes of a length or count, big-endian.
pub fn push_len(buf: &mut Vec<u8>, value: usize, width: usize) {
    push_uint(buf, U256::from(value), width);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_bytes_matches_big_endian_width() {
        assert_eq!(min_bytes_for(U256::ZERO), 0);
        assert_eq!(min_bytes_for(U256::from(1u64)), 1);
        assert_eq!(min_bytes_for(U256::from(0xffu64)), 1);
        assert_eq!(min_bytes_for(U256::from(0x100u64)), 2);
        assert_eq!(min_bytes_for(U256::MAX), 32);
    }

    #[test]
    fn uint_round_trips_through_fixed_width() {
        let mut buf = Vec::new();
        push_uint(&mut buf, U256::from(0x0102_03u64), 3);
        assert_eq!(buf, vec![0x01, 0x02, 0x03]);

        let mut i = 0;
        assert_eq!(read_len(&buf, &mut i, 3), Ok(0x0102_03));
        assert_eq!(i, 3);
    }

    #[test]
    fn short_reads_report_position() {
        let mut i = 1;
        let err = read_address(&[0u8; 10], &mut i).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                offset: 1,
                needed: 20,
                len: 9
            }
        );
        assert_eq!(i, 1);
    }
}
