use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{attestation::Attestation, serde_decimal};

/// What the wallet does when a call in the batch reverts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum BehaviorOnError {
    /// Keep executing the remaining calls.
    #[default]
    Ignore = 0,
    /// Revert the whole batch.
    Revert = 1,
    /// Stop executing but keep the effects of earlier calls.
    Abort = 2,
}

impl BehaviorOnError {
    /// Two-bit code used by both the packed encoding and the typed-data struct.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for BehaviorOnError {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use BehaviorOnError::*;
        let behavior = match value {
            0 => Ignore,
            1 => Revert,
            2 => Abort,
            _ => return Err(value),
        };
        Ok(behavior)
    }
}

/// A single on-chain call executed by the wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub to: Address,
    #[serde(with = "serde_decimal")]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
    #[serde(with = "serde_decimal")]
    pub gas_limit: U256,
    #[serde(default)]
    pub delegate_call: bool,
    /// Only execute if the previous call failed.
    #[serde(default)]
    pub only_fallback: bool,
    #[serde(default)]
    pub behavior_on_error: BehaviorOnError,
}

/// A signable batch of calls, scoped by nonce space.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calls {
    pub calls: Vec<Call>,
    #[serde(with = "serde_decimal")]
    pub space: U256,
    #[serde(with = "serde_decimal")]
    pub nonce: U256,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: Bytes,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    pub image_hash: B256,
}

/// A pre-computed digest, signed as-is.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub digest: B256,
}

/// Authorisation of an implicit session key, proven by an attestation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionImplicitAuthorize {
    pub session_address: Address,
    pub attestation: Attestation,
}

/// ERC-4337 (EntryPoint v0.7) packed user operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calls4337 {
    pub sender: Address,
    #[serde(with = "serde_decimal")]
    pub nonce: U256,
    #[serde(default)]
    pub init_code: Bytes,
    #[serde(default)]
    pub call_data: Bytes,
    pub account_gas_limits: B256,
    #[serde(with = "serde_decimal")]
    pub pre_verification_gas: U256,
    pub gas_fees: B256,
    #[serde(default)]
    pub paymaster_and_data: Bytes,
    pub entrypoint: Address,
}

/// Every payload kind a wallet can be asked to sign.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Payload {
    Call(Calls),
    Message(Message),
    ConfigUpdate(ConfigUpdate),
    Digest(Digest),
    SessionImplicitAuthorize(SessionImplicitAuthorize),
    #[serde(rename = "call_4337_07")]
    Call4337(Calls4337),
}

impl Payload {
    pub const KIND_TRANSACTIONS: u8 = 0x00;
    pub const KIND_MESSAGE: u8 = 0x01;
    pub const KIND_CONFIG_UPDATE: u8 = 0x02;
    pub const KIND_DIGEST: u8 = 0x03;

    /// Payload kind as understood by the on-chain decoder, if it has one.
    pub const fn kind(&self) -> Option<u8> {
        match self {
            Payload::Call(_) => Some(Self::KIND_TRANSACTIONS),
            Payload::Message(_) => Some(Self::KIND_MESSAGE),
            Payload::ConfigUpdate(_) => Some(Self::KIND_CONFIG_UPDATE),
            Payload::Digest(_) => Some(Self::KIND_DIGEST),
            Payload::SessionImplicitAuthorize(_) | Payload::Call4337(_) => None,
        }
    }
}

impl From<Calls> for Payload {
    fn from(value: Calls) -> Self {
        Payload::Call(value)
    }
}

impl From<Message> for Payload {
    fn from(value: Message) -> Self {
        Payload::Message(value)
    }
}

impl From<ConfigUpdate> for Payload {
    fn from(value: ConfigUpdate) -> Self {
        Payload::ConfigUpdate(value)
    }
}

impl From<Digest> for Payload {
    fn from(value: Digest) -> Self {
        Payload::Digest(value)
    }
}

impl From<Calls4337> for Payload {
    fn from(value: Calls4337) -> Self {
        Payload::Call4337(value)
    }
}

/// A payload together with the chain of wallets it is nested in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentedPayload {
    pub payload: Payload,
    #[serde(default)]
    pub parent_wallets: Vec<Address>,
    /// Signed under the recovery-mode domain.
    #[serde(default)]
    pub recovery: bool,
}

impl ParentedPayload {
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            parent_wallets: Vec::new(),
            recovery: false,
        }
    }

    pub fn with_parent_wallets(mut self, parent_wallets: Vec<Address>) -> Self {
        self.parent_wallets = parent_wallets;
        self
    }

    /// Same payload, flagged for the recovery-mode domain.
    pub fn into_recovery(mut self) -> Self {
        self.recovery = true;
        self
    }
}
