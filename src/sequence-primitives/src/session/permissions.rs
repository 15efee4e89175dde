//! Packed encoding of an explicit session's permission grant.
//!
//! Layout:
//! - bytes20 signer
//! - u256 chainId
//! - u256 valueLimit
//! - u64 deadline
//! - u8 permission count, then per permission:
//!   - bytes20 target
//!   - u8 rule count, then per rule:
//!     - u8 `(operation << 1) | cumulative`
//!     - bytes32 value, u256 offset, bytes32 mask

use sequence_primitives_types::{ParameterOperation, ParameterRule, Permission, SessionPermissions};

use crate::{
    errors::{DecodeError, EncodeError},
    utils::bytes::{read_address, read_b32, read_len, read_u256, read_u64, read_u8},
};

pub const MAX_PERMISSIONS_COUNT: usize = (1 << 7) - 1;
pub const MAX_RULES_COUNT: usize = (1 << 8) - 1;

pub fn encode_session_permissions(permissions: &SessionPermissions) -> Result<Vec<u8>, EncodeError> {
    if permissions.permissions.len() > MAX_PERMISSIONS_COUNT {
        return Err(EncodeError::TooManyPermissions(permissions.permissions.len()));
    }

    let mut buf = Vec::with_capacity(20 + 32 + 32 + 8 + 1);
    buf.extend_from_slice(permissions.signer.as_slice());
    buf.extend_from_slice(&permissions.chain_id.to_be_bytes::<32>());
    buf.extend_from_slice(&permissions.value_limit.to_be_bytes::<32>());
    buf.extend_from_slice(&permissions.deadline.to_be_bytes());
    buf.push(permissions.permissions.len() as u8);
    for permission in &permissions.permissions {
        encode_permission(&mut buf, permission)?;
    }
    Ok(buf)
}

fn encode_permission(buf: &mut Vec<u8>, permission: &Permission) -> Result<(), EncodeError> {
    if permission.rules.len() > MAX_RULES_COUNT {
        return Err(EncodeError::TooManyRules(permission.rules.len()));
    }
    buf.extend_from_slice(permission.target.as_slice());
    buf.push(permission.rules.len() as u8);
    for rule in &permission.rules {
        buf.push(((rule.operation as u8) << 1) | rule.cumulative as u8);
        buf.extend_from_slice(rule.value.as_slice());
        buf.extend_from_slice(&rule.offset.to_be_bytes::<32>());
        buf.extend_from_slice(rule.mask.as_slice());
    }
    Ok(())
}

pub fn decode_session_permissions(bytes: &[u8], i: &mut usize) -> Result<SessionPermissions, DecodeError> {
    let signer = read_address(bytes, i)?;
    let chain_id = read_u256(bytes, i)?;
    let value_limit = read_u256(bytes, i)?;
    let deadline = read_u64(bytes, i)?;
    let count = read_len(bytes, i, 1)?;

    let mut permissions = Vec::with_capacity(count);
    for _ in 0..count {
        permissions.push(decode_permission(bytes, i)?);
    }

    Ok(SessionPermissions {
        signer,
        chain_id,
        value_limit,
        deadline,
        permissions,
    })
}

fn decode_permission(bytes: &[u8], i: &mut usize) -> Result<Permission, DecodeError> {
    let target = read_address(bytes, i)?;
    let count = read_len(bytes, i, 1)?;
    let mut rules = Vec::with_capacity(count);
    for _ in 0..count {
        let packed = read_u8(bytes, i)?;
        let operation = ParameterOperation::try_from(packed >> 1)
            .map_err(|_| DecodeError::InvalidParameterOperation(packed >> 1))?;
        rules.push(ParameterRule {
            cumulative: packed & 1 == 1,
            operation,
            value: read_b32(bytes, i)?,
            offset: read_u256(bytes, i)?,
            mask: read_b32(bytes, i)?,
        });
    }
    Ok(Permission { target, rules })
}
