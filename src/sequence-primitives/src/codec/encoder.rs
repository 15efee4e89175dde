use alloy_primitives::{Address, U256};
use sequence_primitives_types::{Call, Calls};
use tracing::warn;

use crate::{
    codec::flags,
    errors::EncodeError,
    utils::bytes::{min_bytes_for, push_len, push_uint},
};

/// Largest nonce width accepted by the encoder, in bytes.
const MAX_NONCE_BYTES: usize = 15;
/// Width of the nonce-size field in the global flag, in bytes it can describe.
const NONCE_SIZE_FIELD_MAX: usize = 0x07;
const MAX_CALLS: usize = 0xffff;
const MAX_DATA_LEN: usize = 0xff_ffff;

/// Encode a call batch into the packed layout read by the wallet's `execute`.
///
/// Layout:
/// - u8 global flag
/// - [bytes20 space] unless the space is zero
/// - [uintN nonce] with N taken from the global flag
/// - [u8 | u16 call count] unless there is exactly one call
/// - per call: u8 flag, then [address to], [u256 value], [u24 len + data], [u256 gasLimit]
///
/// A call whose target equals `self_address` omits its target.
///
/// Nonces up to 15 bytes wide are accepted, but the size field holds at most 7. Wider
/// nonces spill into the single-call bit and the bytes cannot be decoded again; only a
/// `warn!` is emitted for them.
pub fn encode_calls(payload: &Calls, self_address: Option<Address>) -> Result<Vec<u8>, EncodeError> {
    let calls_len = payload.calls.len();
    let nonce_bytes = min_bytes_for(payload.nonce);
    if nonce_bytes > MAX_NONCE_BYTES {
        return Err(EncodeError::NonceTooLarge);
    }
    if nonce_bytes > NONCE_SIZE_FIELD_MAX {
        warn!(
            nonce_bytes,
            "nonce width exceeds the 3-bit size field; on-chain decoding will misread it"
        );
    }
    if calls_len > MAX_CALLS {
        return Err(EncodeError::TooManyCalls(calls_len));
    }
    let space_bytes = min_bytes_for(payload.space);
    if space_bytes > 20 {
        return Err(EncodeError::SpaceTooLarge);
    }

    let mut global_flag = 0u8;
    if payload.space.is_zero() {
        global_flag |= flags::SPACE_ZERO;
    }
    global_flag |= (nonce_bytes as u8) << 1;
    if calls_len == 1 {
        global_flag |= flags::SINGLE_CALL;
    }
    let count_bytes = if calls_len > 0xff { 2 } else { 1 };
    if count_bytes == 2 {
        global_flag |= flags::CALL_COUNT_U16;
    }

    let mut buf = Vec::new();
    buf.push(global_flag);

    if !payload.space.is_zero() {
        push_uint(&mut buf, payload.space, 20);
    }
    if nonce_bytes > 0 {
        push_uint(&mut buf, payload.nonce, nonce_bytes);
    }
    if calls_len != 1 {
        push_len(&mut buf, calls_len, count_bytes);
    }

    for call in &payload.calls {
        encode_call(&mut buf, call, self_address)?;
    }

    Ok(buf)
}

fn encode_call(buf: &mut Vec<u8>, call: &Call, self_address: Option<Address>) -> Result<(), EncodeError> {
    let mut flag = 0u8;
    let to_self = self_address.is_some_and(|a| a == call.to);
    if to_self {
        flag |= flags::CALL_TO_SELF;
    }
    if !call.value.is_zero() {
        flag |= flags::CALL_HAS_VALUE;
    }
    if !call.data.is_empty() {
        flag |= flags::CALL_HAS_DATA;
    }
    if !call.gas_limit.is_zero() {
        flag |= flags::CALL_HAS_GAS_LIMIT;
    }
    if call.delegate_call {
        flag |= flags::CALL_DELEGATE;
    }
    if call.only_fallback {
        flag |= flags::CALL_ONLY_FALLBACK;
    }
    flag |= call.behavior_on_error.code() << flags::CALL_BEHAVIOR_SHIFT;

    buf.push(flag);

    if !to_self {
        buf.extend_from_slice(call.to.as_slice());
    }
    if !call.value.is_zero() {
        buf.extend_from_slice(&call.value.to_be_bytes::<32>());
    }
    if !call.data.is_empty() {
        if call.data.len() > MAX_DATA_LEN {
            return Err(EncodeError::DataTooLarge(call.data.len()));
        }
        push_len(buf, call.data.len(), 3);
        buf.extend_from_slice(&call.data);
    }
    if !call.gas_limit.is_zero() {
        buf.extend_from_slice(&call.gas_limit.to_be_bytes::<32>());
    }
    Ok(())
}

/// Largest nonce the encoder accepts.
pub fn max_nonce() -> U256 {
    (U256::from(1u64) << (MAX_NONCE_BYTES * 8)) - U256::from(1u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_calls;
    use alloy_primitives::{address, Bytes};
    use sequence_primitives_types::BehaviorOnError;

    const WALLET: Address = address!("00000000000000000000000000000000000000aa");

    fn single(call: Call) -> Calls {
        Calls {
            calls: vec![call],
            space: U256::ZERO,
            nonce: U256::ZERO,
        }
    }

    #[test]
    fn self_call_with_revert_is_two_bytes() {
        let payload = single(Call {
            to: WALLET,
            behavior_on_error: BehaviorOnError::Revert,
            ..Default::default()
        });

        let encoded = encode_calls(&payload, Some(WALLET)).unwrap();
        // space-zero | single-call, then to-self | behavior(1) << 6
        assert_eq!(encoded, vec![0x11, 0x41]);
    }

    #[test]
    fn fields_follow_the_flag_order() {
        let target = address!("1111111111111111111111111111111111111111");
        let payload = Calls {
            calls: vec![Call {
                to: target,
                value: U256::from(1u64),
                data: Bytes::from(vec![0xde, 0xad]),
                gas_limit: U256::from(2u64),
                delegate_call: true,
                only_fallback: true,
                behavior_on_error: BehaviorOnError::Abort,
            }],
            space: U256::from(9u64),
            nonce: U256::from(0x0102u64),
        };

        let encoded = encode_calls(&payload, Some(WALLET)).unwrap();

        assert_eq!(encoded[0], (2 << 1) | 0x10);
        assert_eq!(&encoded[1..21], &U256::from(9u64).to_be_bytes::<32>()[12..]);
        assert_eq!(&encoded[21..23], &[0x01, 0x02]);
        assert_eq!(encoded[23], 0x02 | 0x04 | 0x08 | 0x10 | 0x20 | (2 << 6));
        assert_eq!(&encoded[24..44], target.as_slice());
        assert_eq!(encoded[44 + 31], 1);
        assert_eq!(&encoded[76..79], &[0, 0, 2]);
        assert_eq!(&encoded[79..81], &[0xde, 0xad]);
        assert_eq!(encoded[81 + 31], 2);
        assert_eq!(encoded.len(), 81 + 32);
    }

    #[test]
    fn nonce_limit_is_fifteen_bytes() {
        let mut payload = single(Call::default());

        payload.nonce = max_nonce();
        assert!(encode_calls(&payload, None).is_ok());

        payload.nonce = max_nonce() + U256::from(1u64);
        let err = encode_calls(&payload, None).unwrap_err();
        assert_eq!(err, EncodeError::NonceTooLarge);
        assert_eq!(err.to_string(), "Nonce is too large");
    }

    #[test]
    fn wide_nonces_overflow_the_size_field() {
        let payload = Calls {
            calls: vec![Call::default(); 2],
            space: U256::ZERO,
            nonce: U256::from(1u64) << 56,
        };
        let encoded = encode_calls(&payload, None).unwrap();
        // Width 8 lands on the single-call bit.
        assert_eq!(encoded[0], flags::SPACE_ZERO | flags::SINGLE_CALL);
        assert_ne!(decode_calls(&encoded, None).ok(), Some(payload.clone()));

        let mut narrow = payload;
        narrow.nonce = (U256::from(1u64) << 56) - U256::from(1u64);
        let encoded = encode_calls(&narrow, None).unwrap();
        assert_eq!(encoded[0], flags::SPACE_ZERO | (7 << 1));
        assert_eq!(decode_calls(&encoded, None), Ok(narrow));
    }

    #[test]
    fn call_count_switches_to_two_bytes_above_255() {
        let payload = Calls {
            calls: vec![Call::default(); 256],
            space: U256::ZERO,
            nonce: U256::ZERO,
        };
        let encoded = encode_calls(&payload, None).unwrap();
        assert_eq!(encoded[0], 0x01 | 0x20);
        assert_eq!(&encoded[1..3], &[0x01, 0x00]);
    }

    #[test]
    fn rejects_oversized_batches() {
        let payload = Calls {
            calls: vec![Call::default(); 65_536],
            space: U256::ZERO,
            nonce: U256::ZERO,
        };
        assert_eq!(
            encode_calls(&payload, None),
            Err(EncodeError::TooManyCalls(65_536))
        );

        let payload = single(Call {
            data: Bytes::from(vec![0u8; 0x100_0000]),
            ..Default::default()
        });
        assert_eq!(
            encode_calls(&payload, None),
            Err(EncodeError::DataTooLarge(0x100_0000))
        );
    }

    #[test]
    fn rejects_space_wider_than_twenty_bytes() {
        let mut payload = single(Call::default());
        payload.space = U256::from(1u64) << 160;
        assert_eq!(encode_calls(&payload, None), Err(EncodeError::SpaceTooLarge));
    }
}
