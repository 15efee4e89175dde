//! Binary session topology, as passed to the session manager contract.
//!
//! Every element starts with a flag byte whose high nibble is the element kind:
//! - `0` permissions: flag, then the packed permission grant
//! - `1` node: flag, then the 32-byte hash
//! - `2` branch: low nibble is the width of the size field, then size, then children
//! - `3` blacklist: low nibble is the count, or `0xf` followed by a u16 count
//! - `4` identity signer: flag, then the 20-byte address

use alloy_primitives::U256;

use crate::{
    constants::{
        MAX_TOPOLOGY_DEPTH, SESSIONS_FLAG_BLACKLIST, SESSIONS_FLAG_BRANCH,
        SESSIONS_FLAG_IDENTITY_SIGNER, SESSIONS_FLAG_NODE, SESSIONS_FLAG_PERMISSIONS,
    },
    errors::{DecodeError, EncodeError},
    session::{
        permissions::{decode_session_permissions, encode_session_permissions},
        topology::{SessionLeaf, SessionsTopology},
    },
    utils::bytes::{min_bytes_for, push_len, read_address, read_b32, read_len, read_slice, read_u8},
};

const BLACKLIST_EXTENDED_COUNT: u8 = 0x0f;
const MAX_BLACKLIST_LEN: usize = 0xffff;
const MAX_BRANCH_LEN: usize = 0xff_ffff;

pub fn encode_sessions_topology(topology: &SessionsTopology) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    encode_into(&mut buf, topology)?;
    Ok(buf)
}

fn encode_into(buf: &mut Vec<u8>, topology: &SessionsTopology) -> Result<(), EncodeError> {
    match topology {
        SessionsTopology::Branch(left, right) => {
            let mut inner = Vec::new();
            encode_into(&mut inner, left)?;
            encode_into(&mut inner, right)?;
            if inner.len() > MAX_BRANCH_LEN {
                return Err(EncodeError::BranchTooLarge(inner.len()));
            }
            let size_of_size = min_bytes_for(U256::from(inner.len()));
            buf.push((SESSIONS_FLAG_BRANCH << 4) | size_of_size as u8);
            push_len(buf, inner.len(), size_of_size);
            buf.extend_from_slice(&inner);
        }
        SessionsTopology::Node(hash) => {
            buf.push(SESSIONS_FLAG_NODE << 4);
            buf.extend_from_slice(hash.as_slice());
        }
        SessionsTopology::Leaf(SessionLeaf::Permissions(permissions)) => {
            buf.push(SESSIONS_FLAG_PERMISSIONS << 4);
            buf.extend_from_slice(&encode_session_permissions(permissions)?);
        }
        SessionsTopology::Leaf(SessionLeaf::ImplicitBlacklist(addresses)) => {
            let count = addresses.len();
            if count >= BLACKLIST_EXTENDED_COUNT as usize {
                if count > MAX_BLACKLIST_LEN {
                    return Err(EncodeError::BlacklistTooLarge(count));
                }
                buf.push((SESSIONS_FLAG_BLACKLIST << 4) | BLACKLIST_EXTENDED_COUNT);
                push_len(buf, count, 2);
            } else {
                buf.push((SESSIONS_FLAG_BLACKLIST << 4) | count as u8);
            }
            for address in addresses {
                buf.extend_from_slice(address.as_slice());
            }
        }
        SessionsTopology::Leaf(SessionLeaf::IdentitySigner(signer)) => {
            buf.push(SESSIONS_FLAG_IDENTITY_SIGNER << 4);
            buf.extend_from_slice(signer.as_slice());
        }
    }
    Ok(())
}

/// Parse one topology element spanning all of `bytes`.
pub fn decode_sessions_topology(bytes: &[u8]) -> Result<SessionsTopology, DecodeError> {
    let mut i = 0;
    let topology = decode_element(bytes, &mut i, 0)?;
    if i != bytes.len() {
        return Err(DecodeError::LeftoverBytes(bytes.len() - i));
    }
    Ok(topology)
}

fn decode_element(bytes: &[u8], i: &mut usize, depth: usize) -> Result<SessionsTopology, DecodeError> {
    let flag = read_u8(bytes, i)?;
    let low = flag & 0x0f;
    match flag >> 4 {
        SESSIONS_FLAG_PERMISSIONS => {
            Ok(SessionsTopology::permissions(decode_session_permissions(bytes, i)?))
        }
        SESSIONS_FLAG_NODE => Ok(SessionsTopology::Node(read_b32(bytes, i)?)),
        SESSIONS_FLAG_BRANCH => {
            if depth >= MAX_TOPOLOGY_DEPTH {
                return Err(DecodeError::TooDeep(MAX_TOPOLOGY_DEPTH));
            }
            let size = read_len(bytes, i, low as usize)?;
            let inner = read_slice(bytes, i, size)?;
            // Children are folded left, as the contract hashes them.
            let mut j = 0;
            let mut folded: Option<SessionsTopology> = None;
            while j < inner.len() {
                let child = decode_element(inner, &mut j, depth + 1)?;
                folded = Some(match folded {
                    Some(acc) => SessionsTopology::branch(acc, child),
                    None => child,
                });
            }
            folded.ok_or(DecodeError::EmptyTopology)
        }
        SESSIONS_FLAG_BLACKLIST => {
            let count = if low == BLACKLIST_EXTENDED_COUNT {
                read_len(bytes, i, 2)?
            } else {
                low as usize
            };
            let mut addresses = Vec::with_capacity(count);
            for _ in 0..count {
                addresses.push(read_address(bytes, i)?);
            }
            Ok(SessionsTopology::blacklist(addresses))
        }
        SESSIONS_FLAG_IDENTITY_SIGNER => Ok(SessionsTopology::identity_signer(read_address(bytes, i)?)),
        _ => Err(DecodeError::InvalidFlag(flag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::topology::{add_explicit_session, empty_sessions_topology};
    use crate::session::permissions::{MAX_PERMISSIONS_COUNT, MAX_RULES_COUNT};
    use alloy_primitives::{address, Address, B256};
    use sequence_primitives_types::{ParameterOperation, ParameterRule, Permission, SessionPermissions};

    const IDENTITY: Address = address!("1000000000000000000000000000000000000001");

    #[test]
    fn empty_topology_layout() {
        let encoded = encode_sessions_topology(&empty_sessions_topology(IDENTITY)).unwrap();
        // branch(size 22 in one byte) [blacklist(0)] [identity ++ address]
        assert_eq!(&encoded[..4], &[0x21, 22, 0x30, 0x40]);
        assert_eq!(&encoded[4..], IDENTITY.as_slice());
    }

    #[test]
    fn blacklist_count_switches_to_u16_at_fifteen() {
        let short = SessionsTopology::blacklist(vec![Address::ZERO; 14]);
        assert_eq!(encode_sessions_topology(&short).unwrap()[0], 0x3e);

        let long = SessionsTopology::blacklist(vec![Address::ZERO; 15]);
        let encoded = encode_sessions_topology(&long).unwrap();
        assert_eq!(&encoded[..3], &[0x3f, 0x00, 0x0f]);
        assert_eq!(encoded.len(), 3 + 15 * 20);
        assert_eq!(decode_sessions_topology(&encoded), Ok(long));

        let too_long = SessionsTopology::blacklist(vec![Address::ZERO; 65_536]);
        assert_eq!(
            encode_sessions_topology(&too_long),
            Err(EncodeError::BlacklistTooLarge(65_536))
        );
    }

    #[test]
    fn decodes_what_it_encodes() {
        let signer = address!("2000000000000000000000000000000000000002");
        let mut topology = empty_sessions_topology(IDENTITY);
        topology = add_explicit_session(
            &topology,
            SessionPermissions {
                signer,
                chain_id: U256::from(1u64),
                value_limit: U256::from(5u64),
                deadline: 99,
                permissions: vec![],
            },
        )
        .unwrap();
        topology = SessionsTopology::branch(topology, SessionsTopology::Node(B256::repeat_byte(7)));

        let encoded = encode_sessions_topology(&topology).unwrap();
        assert_eq!(decode_sessions_topology(&encoded), Ok(topology));
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let wrap = |inner: &[u8]| {
            let len = inner.len();
            let mut wrapped = vec![0x23, (len >> 16) as u8, (len >> 8) as u8, len as u8];
            wrapped.extend_from_slice(inner);
            wrapped
        };
        let leaf = SessionsTopology::identity_signer(IDENTITY);
        let mut encoded = encode_sessions_topology(&leaf).unwrap();
        for _ in 0..MAX_TOPOLOGY_DEPTH {
            encoded = wrap(&encoded);
        }
        // Single-child branches fold down to the child.
        assert_eq!(decode_sessions_topology(&encoded), Ok(leaf));

        encoded = wrap(&encoded);
        assert_eq!(
            decode_sessions_topology(&encoded),
            Err(DecodeError::TooDeep(MAX_TOPOLOGY_DEPTH))
        );
        for _ in 0..4_000 {
            encoded = wrap(&encoded);
        }
        assert_eq!(
            decode_sessions_topology(&encoded),
            Err(DecodeError::TooDeep(MAX_TOPOLOGY_DEPTH))
        );
    }

    #[test]
    fn branch_size_must_fit_three_bytes() {
        let rule = ParameterRule {
            cumulative: false,
            operation: ParameterOperation::Equal,
            value: B256::ZERO,
            offset: U256::ZERO,
            mask: B256::ZERO,
        };
        let permission = Permission {
            target: Address::ZERO,
            rules: vec![rule; MAX_RULES_COUNT],
        };
        // About 3.1 MB packed.
        let leaf = SessionsTopology::permissions(SessionPermissions {
            signer: Address::ZERO,
            chain_id: U256::ZERO,
            value_limit: U256::ZERO,
            deadline: 0,
            permissions: vec![permission; MAX_PERMISSIONS_COUNT],
        });
        let five = (1..5).fold(leaf.clone(), |acc, _| SessionsTopology::branch(acc, leaf.clone()));
        assert!(encode_sessions_topology(&five).is_ok());

        let six = SessionsTopology::branch(five, leaf);
        assert!(matches!(
            encode_sessions_topology(&six),
            Err(EncodeError::BranchTooLarge(len)) if len > MAX_BRANCH_LEN
        ));
    }

    #[test]
    fn rejects_unknown_flags_and_trailing_bytes() {
        assert_eq!(decode_sessions_topology(&[0x50]), Err(DecodeError::InvalidFlag(0x50)));

        let mut encoded = encode_sessions_topology(&SessionsTopology::identity_signer(IDENTITY)).unwrap();
        encoded.push(0);
        assert_eq!(decode_sessions_topology(&encoded), Err(DecodeError::LeftoverBytes(1)));

        assert_eq!(decode_sessions_topology(&[0x20]), Err(DecodeError::EmptyTopology));
    }
}
