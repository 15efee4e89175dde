//! EIP-712 hashing of wallet payloads.
//!
//! Every payload kind except digests and implicit-session authorisations is hashed as
//! typed data under the wallet's domain. The domain name/version switch to the
//! recovery-mode pair when the payload is flagged for recovery.

use std::borrow::Cow;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{Eip712Domain, SolStruct, SolValue};
use sequence_primitives_types::{Attestation, Calls4337, ParentedPayload, Payload};

use crate::{
    abi,
    constants::{
        RECOVERY_DOMAIN_NAME, RECOVERY_DOMAIN_VERSION, WALLET_DOMAIN_NAME, WALLET_DOMAIN_VERSION,
    },
    errors::{EncodeError, Error, TypedDataError},
    utils::bytes::push_len,
};

/// The struct half of a typed-data value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypedMessage {
    Calls(abi::Calls),
    Message(abi::Message),
    ConfigUpdate(abi::ConfigUpdate),
}

impl TypedMessage {
    /// `hashStruct(message)`.
    pub fn struct_hash(&self) -> B256 {
        match self {
            TypedMessage::Calls(m) => m.eip712_hash_struct(),
            TypedMessage::Message(m) => m.eip712_hash_struct(),
            TypedMessage::ConfigUpdate(m) => m.eip712_hash_struct(),
        }
    }

    pub fn primary_type(&self) -> &'static str {
        match self {
            TypedMessage::Calls(_) => "Calls",
            TypedMessage::Message(_) => "Message",
            TypedMessage::ConfigUpdate(_) => "ConfigUpdate",
        }
    }
}

/// Domain plus message, ready to be signed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedPayload {
    pub domain: Eip712Domain,
    pub message: TypedMessage,
}

impl TypedPayload {
    /// `keccak256("\x19\x01" || domainSeparator || hashStruct(message))`.
    pub fn signing_hash(&self) -> B256 {
        eip712_digest(self.domain.separator(), self.message.struct_hash())
    }
}

/// Final EIP-712 digest from its two halves.
pub fn eip712_digest(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(domain_separator.as_slice());
    buf.extend_from_slice(struct_hash.as_slice());
    keccak256(buf)
}

/// Wallet domain, or the recovery-mode domain when `recovery` is set.
pub fn wallet_domain(wallet: Address, chain_id: U256, recovery: bool) -> Eip712Domain {
    let (name, version) = if recovery {
        (RECOVERY_DOMAIN_NAME, RECOVERY_DOMAIN_VERSION)
    } else {
        (WALLET_DOMAIN_NAME, WALLET_DOMAIN_VERSION)
    };
    Eip712Domain::new(
        Some(Cow::Borrowed(name)),
        Some(Cow::Borrowed(version)),
        Some(chain_id),
        Some(wallet),
        None,
    )
}

/// Build the typed-data value signed for `payload`.
///
/// Digests and implicit-session authorisations have no typed-data form.
pub fn to_typed(
    wallet: Address,
    chain_id: U256,
    payload: &ParentedPayload,
) -> Result<TypedPayload, TypedDataError> {
    let domain = wallet_domain(wallet, chain_id, payload.recovery);
    let message = typed_message(chain_id, payload)?;
    Ok(TypedPayload { domain, message })
}

pub(crate) fn typed_message(
    chain_id: U256,
    payload: &ParentedPayload,
) -> Result<TypedMessage, TypedDataError> {
    let wallets = payload.parent_wallets.clone();
    let message = match &payload.payload {
        Payload::Call(calls) => TypedMessage::Calls(abi::Calls {
            calls: calls.calls.iter().map(abi::Call::from).collect(),
            space: calls.space,
            nonce: calls.nonce,
            wallets,
        }),
        Payload::Message(m) => TypedMessage::Message(abi::Message {
            message: m.message.clone(),
            wallets,
        }),
        Payload::ConfigUpdate(c) => TypedMessage::ConfigUpdate(abi::ConfigUpdate {
            imageHash: c.image_hash,
            wallets,
        }),
        Payload::Call4337(op) => TypedMessage::Message(abi::Message {
            message: Bytes::copy_from_slice(user_operation_hash(op, chain_id).as_slice()),
            wallets,
        }),
        Payload::Digest(_) => return Err(TypedDataError::Unsupported("Digest")),
        Payload::SessionImplicitAuthorize(_) => {
            return Err(TypedDataError::Unsupported("Session implicit authorize"))
        }
    };
    Ok(message)
}

/// The digest a wallet signer signs for `payload`.
///
/// Digests pass through unchanged and implicit-session authorisations hash their attestation.
pub fn hash(wallet: Address, chain_id: U256, payload: &ParentedPayload) -> Result<B256, Error> {
    match &payload.payload {
        Payload::Digest(d) => Ok(d.digest),
        Payload::SessionImplicitAuthorize(auth) => Ok(attestation_hash(&auth.attestation)?),
        _ => Ok(to_typed(wallet, chain_id, payload)?.signing_hash()),
    }
}

/// ERC-4337 v0.7 user operation hash, bound to the entrypoint and chain.
pub fn user_operation_hash(op: &Calls4337, chain_id: U256) -> B256 {
    let packed = (
        op.sender,
        op.nonce,
        keccak256(&op.init_code),
        keccak256(&op.call_data),
        op.account_gas_limits,
        op.pre_verification_gas,
        op.gas_fees,
        keccak256(&op.paymaster_and_data),
    )
        .abi_encode();
    keccak256((keccak256(packed), op.entrypoint, chain_id).abi_encode())
}

/// Packed attestation encoding (the bytes an identity provider signs over).
pub fn encode_attestation(attestation: &Attestation) -> Result<Vec<u8>, EncodeError> {
    let app_data = &attestation.application_data;
    if app_data.len() > 0xff_ffff {
        return Err(EncodeError::ApplicationDataTooLarge(app_data.len()));
    }
    let redirect_url = attestation.auth_data.redirect_url.as_bytes();
    if redirect_url.len() > 0xff_ffff {
        return Err(EncodeError::RedirectUrlTooLarge(redirect_url.len()));
    }

    let mut buf = Vec::with_capacity(20 + 4 + 32 + 32 + 3 + app_data.len() + 3 + redirect_url.len() + 8);
    buf.extend_from_slice(attestation.approved_signer.as_slice());
    buf.extend_from_slice(attestation.identity_type.as_slice());
    buf.extend_from_slice(attestation.issuer_hash.as_slice());
    buf.extend_from_slice(attestation.audience_hash.as_slice());
    push_len(&mut buf, app_data.len(), 3);
    buf.extend_from_slice(app_data);
    push_len(&mut buf, redirect_url.len(), 3);
    buf.extend_from_slice(redirect_url);
    buf.extend_from_slice(&attestation.auth_data.issued_at.to_be_bytes());
    Ok(buf)
}

pub fn attestation_hash(attestation: &Attestation) -> Result<B256, EncodeError> {
    encode_attestation(attestation).map(keccak256)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, bytes};
    use sequence_primitives_types::{
        AuthData, BehaviorOnError, Call, Calls, ConfigUpdate, Digest, Message,
        SessionImplicitAuthorize,
    };

    const WALLET: Address = address!("d0b2f2b2c0a6e4e3b1c2d3e4f5a6b7c8d9e0f1a2");

    fn calls() -> Calls {
        Calls {
            calls: vec![Call {
                to: address!("1111111111111111111111111111111111111111"),
                value: U256::from(7u64),
                data: bytes!("abcd"),
                gas_limit: U256::ZERO,
                delegate_call: false,
                only_fallback: false,
                behavior_on_error: BehaviorOnError::Revert,
            }],
            space: U256::ZERO,
            nonce: U256::from(1u64),
        }
    }

    #[test]
    fn type_strings_match_the_wallet() {
        assert_eq!(
            abi::Calls::eip712_encode_type(),
            "Calls(Call[] calls,uint256 space,uint256 nonce,address[] wallets)Call(address to,uint256 value,bytes data,uint256 gasLimit,bool delegateCall,bool onlyFallback,uint256 behaviorOnError)"
        );
        assert_eq!(
            abi::Message::eip712_encode_type(),
            "Message(bytes message,address[] wallets)"
        );
        assert_eq!(
            abi::ConfigUpdate::eip712_encode_type(),
            "ConfigUpdate(bytes32 imageHash,address[] wallets)"
        );

        let typed = to_typed(WALLET, U256::from(1u64), &ParentedPayload::new(calls())).unwrap();
        assert_eq!(typed.message.primary_type(), "Calls");
    }

    #[test]
    fn call_struct_hash_is_built_from_fields() {
        let call = &calls().calls[0];
        let type_hash = keccak256(
            "Call(address to,uint256 value,bytes data,uint256 gasLimit,bool delegateCall,bool onlyFallback,uint256 behaviorOnError)",
        );
        let expected = keccak256(
            (
                type_hash,
                call.to,
                call.value,
                keccak256(&call.data),
                call.gas_limit,
                false,
                false,
                U256::from(1u64),
            )
                .abi_encode(),
        );
        assert_eq!(abi::Call::from(call).eip712_hash_struct(), expected);
    }

    #[test]
    fn domain_depends_on_recovery_flag() {
        let normal = wallet_domain(WALLET, U256::from(1u64), false);
        assert_eq!(normal.name.as_deref(), Some("Sequence Wallet"));
        assert_eq!(normal.version.as_deref(), Some("3"));

        let recovery = wallet_domain(WALLET, U256::from(1u64), true);
        assert_eq!(recovery.name.as_deref(), Some("Sequence Wallet - Recovery Mode"));
        assert_eq!(recovery.version.as_deref(), Some("1"));

        let payload = ParentedPayload::new(calls());
        assert_ne!(
            hash(WALLET, U256::from(1u64), &payload).unwrap(),
            hash(WALLET, U256::from(1u64), &payload.clone().into_recovery()).unwrap()
        );
    }

    #[test]
    fn signing_hash_uses_the_two_step_digest() {
        let payload = ParentedPayload::new(ConfigUpdate {
            image_hash: b256!("1111111111111111111111111111111111111111111111111111111111111111"),
        });
        let typed = to_typed(WALLET, U256::from(10u64), &payload).unwrap();

        let domain_type_hash = keccak256(
            "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let separator = keccak256(
            (
                domain_type_hash,
                keccak256("Sequence Wallet"),
                keccak256("3"),
                U256::from(10u64),
                WALLET,
            )
                .abi_encode(),
        );
        assert_eq!(typed.domain.separator(), separator);

        let struct_hash = keccak256(
            (
                keccak256("ConfigUpdate(bytes32 imageHash,address[] wallets)"),
                b256!("1111111111111111111111111111111111111111111111111111111111111111"),
                keccak256([0u8; 0]),
            )
                .abi_encode(),
        );
        assert_eq!(typed.signing_hash(), eip712_digest(separator, struct_hash));
        assert_eq!(hash(WALLET, U256::from(10u64), &payload).unwrap(), typed.signing_hash());
    }

    #[test]
    fn parent_wallets_change_the_hash() {
        let payload = ParentedPayload::new(Message {
            message: bytes!("68656c6c6f"),
        });
        let nested = payload
            .clone()
            .with_parent_wallets(vec![address!("3333333333333333333333333333333333333333")]);
        assert_ne!(
            hash(WALLET, U256::from(1u64), &payload).unwrap(),
            hash(WALLET, U256::from(1u64), &nested).unwrap()
        );
    }

    #[test]
    fn digests_pass_through_and_have_no_typed_form() {
        let digest = b256!("abababababababababababababababababababababababababababababababab");
        let payload = ParentedPayload::new(Digest { digest });
        assert_eq!(hash(WALLET, U256::from(1u64), &payload), Ok(digest));
        assert_eq!(
            to_typed(WALLET, U256::from(1u64), &payload),
            Err(TypedDataError::Unsupported("Digest"))
        );
    }

    #[test]
    fn implicit_authorisation_hashes_the_attestation() {
        let attestation = Attestation {
            approved_signer: address!("4444444444444444444444444444444444444444"),
            identity_type: [0, 0, 0, 1].into(),
            issuer_hash: B256::ZERO,
            audience_hash: B256::ZERO,
            application_data: bytes!("01"),
            auth_data: AuthData {
                redirect_url: "https://example.com".into(),
                issued_at: 5,
            },
        };
        let payload = ParentedPayload::new(Payload::SessionImplicitAuthorize(
            SessionImplicitAuthorize {
                session_address: address!("4444444444444444444444444444444444444444"),
                attestation: attestation.clone(),
            },
        ));

        let encoded = encode_attestation(&attestation).unwrap();
        assert_eq!(encoded.len(), 20 + 4 + 32 + 32 + 3 + 1 + 3 + 19 + 8);
        assert_eq!(hash(WALLET, U256::from(1u64), &payload), Ok(keccak256(&encoded)));
        assert!(matches!(
            to_typed(WALLET, U256::from(1u64), &payload),
            Err(TypedDataError::Unsupported(_))
        ));
    }

    #[test]
    fn user_operations_are_signed_as_messages() {
        let op = Calls4337 {
            sender: WALLET,
            nonce: U256::from(3u64),
            call_data: bytes!("b61d27f6"),
            entrypoint: address!("0000000071727de22e5e9d8baf0edac6f37da032"),
            ..Default::default()
        };
        let chain_id = U256::from(8453u64);
        let as_message = ParentedPayload::new(Message {
            message: Bytes::copy_from_slice(user_operation_hash(&op, chain_id).as_slice()),
        });

        assert_eq!(
            hash(WALLET, chain_id, &ParentedPayload::new(op)).unwrap(),
            hash(WALLET, chain_id, &as_message).unwrap()
        );
    }
}
