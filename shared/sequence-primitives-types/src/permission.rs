use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::serde_decimal;

/// Comparison applied by a parameter rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum ParameterOperation {
    Equal = 0,
    NotEqual = 1,
    GreaterThanOrEqual = 2,
    LessThanOrEqual = 3,
}

impl From<ParameterOperation> for u8 {
    fn from(value: ParameterOperation) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for ParameterOperation {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ParameterOperation::*;
        let op = match value {
            0 => Equal,
            1 => NotEqual,
            2 => GreaterThanOrEqual,
            3 => LessThanOrEqual,
            _ => return Err(format!("unknown parameter operation {value}")),
        };
        Ok(op)
    }
}

/// Constraint on a 32-byte word of the call data (`(word(offset) & mask) <op> value`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterRule {
    /// Accumulate the masked value across calls within the session.
    pub cumulative: bool,
    pub operation: ParameterOperation,
    pub value: B256,
    #[serde(with = "serde_decimal")]
    pub offset: U256,
    pub mask: B256,
}

/// Contract a session may call, plus the rules its call data must satisfy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub target: Address,
    #[serde(default)]
    pub rules: Vec<ParameterRule>,
}

/// Explicit session grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPermissions {
    pub signer: Address,
    /// Zero means the grant is valid on every chain.
    #[serde(with = "serde_decimal")]
    pub chain_id: U256,
    #[serde(with = "serde_decimal")]
    pub value_limit: U256,
    /// Unix timestamp (seconds) after which the grant is void.
    #[serde(with = "serde_decimal")]
    pub deadline: u64,
    pub permissions: Vec<Permission>,
}
