use alloy_primitives::{Address, Bytes, U256};
use sequence_primitives_types::{BehaviorOnError, Call, Calls};

use crate::{
    codec::flags,
    errors::DecodeError,
    utils::bytes::{read_address, read_len, read_u256, read_u8, read_uint, read_vec},
};

/// Decode a packed call batch produced by [`encode_calls`](super::encode_calls).
///
/// `self_address` must be supplied when any call was encoded as a self-call.
/// Trailing bytes after the last call are rejected.
pub fn decode_calls(bytes: &[u8], self_address: Option<Address>) -> Result<Calls, DecodeError> {
    let mut i = 0usize;
    let global_flag = read_u8(bytes, &mut i)?;

    let space = if global_flag & flags::SPACE_ZERO != 0 {
        U256::ZERO
    } else {
        read_uint(bytes, &mut i, 20)?
    };

    let nonce_bytes = ((global_flag & flags::NONCE_SIZE_MASK) >> 1) as usize;
    let nonce = if nonce_bytes > 0 {
        read_uint(bytes, &mut i, nonce_bytes)?
    } else {
        U256::ZERO
    };

    let calls_len = if global_flag & flags::SINGLE_CALL != 0 {
        1
    } else if global_flag & flags::CALL_COUNT_U16 != 0 {
        read_len(bytes, &mut i, 2)?
    } else {
        read_len(bytes, &mut i, 1)?
    };

    let mut calls = Vec::with_capacity(calls_len);
    for _ in 0..calls_len {
        calls.push(decode_call(bytes, &mut i, self_address)?);
    }

    if i != bytes.len() {
        return Err(DecodeError::LeftoverBytes(bytes.len() - i));
    }

    Ok(Calls { calls, space, nonce })
}

fn decode_call(bytes: &[u8], i: &mut usize, self_address: Option<Address>) -> Result<Call, DecodeError> {
    let flag = read_u8(bytes, i)?;

    let to = if flag & flags::CALL_TO_SELF != 0 {
        self_address.ok_or(DecodeError::MissingSelfAddress)?
    } else {
        read_address(bytes, i)?
    };
    let value = if flag & flags::CALL_HAS_VALUE != 0 {
        read_u256(bytes, i)?
    } else {
        U256::ZERO
    };
    let data = if flag & flags::CALL_HAS_DATA != 0 {
        let len = read_len(bytes, i, 3)?;
        Bytes::from(read_vec(bytes, i, len)?)
    } else {
        Bytes::new()
    };
    let gas_limit = if flag & flags::CALL_HAS_GAS_LIMIT != 0 {
        read_u256(bytes, i)?
    } else {
        U256::ZERO
    };

    let behavior = flag >> flags::CALL_BEHAVIOR_SHIFT;
    let behavior_on_error =
        BehaviorOnError::try_from(behavior).map_err(DecodeError::InvalidBehaviorOnError)?;

    Ok(Call {
        to,
        value,
        data,
        gas_limit,
        delegate_call: flag & flags::CALL_DELEGATE != 0,
        only_fallback: flag & flags::CALL_ONLY_FALLBACK != 0,
        behavior_on_error,
    })
}
