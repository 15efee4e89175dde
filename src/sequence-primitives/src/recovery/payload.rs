//! Hashing and calldata for payloads queued through the recovery extension.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolStruct, SolValue};
use sequence_primitives_types::{ParentedPayload, Payload};

use crate::{
    abi::{self, IRecovery},
    errors::TypedDataError,
    typed_data::{eip712_digest, typed_message, wallet_domain},
};

/// Proof that a recovery signer approved a payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecoverySignature {
    /// Externally owned signer.
    Ecdsa { r: B256, s: B256, y_parity: bool },
    /// Contract signer, checked through `isValidSignature`.
    Erc1271 { data: Bytes },
}

impl RecoverySignature {
    /// Bytes the extension verifies: `r || s || v` (v = 27/28), or the raw contract signature.
    pub fn pack(&self) -> Bytes {
        match self {
            RecoverySignature::Ecdsa { r, s, y_parity } => {
                let mut buf = Vec::with_capacity(65);
                buf.extend_from_slice(r.as_slice());
                buf.extend_from_slice(s.as_slice());
                buf.push(27 + *y_parity as u8);
                buf.into()
            }
            RecoverySignature::Erc1271 { data } => data.clone(),
        }
    }
}

/// Digest a recovery signer signs for `payload`.
///
/// Always uses the recovery-mode domain. `no_chain_id` hashes with chain id zero so the
/// signature is valid on every chain. Only payloads the extension can queue are accepted.
pub fn hash_recovery_payload(
    payload: &ParentedPayload,
    wallet: Address,
    chain_id: U256,
    no_chain_id: bool,
) -> Result<B256, TypedDataError> {
    let chain_id = if no_chain_id { U256::ZERO } else { chain_id };
    let domain = wallet_domain(wallet, chain_id, true);
    let struct_hash = match &payload.payload {
        Payload::Digest(d) => digest_struct_hash(d.digest, &payload.parent_wallets),
        Payload::Call4337(_) => return Err(TypedDataError::Unsupported("ERC-4337 call")),
        _ => typed_message(chain_id, payload)?.struct_hash(),
    };
    Ok(eip712_digest(domain.separator(), struct_hash))
}

/// A digest is hashed as a `Message` whose message hash is the digest itself.
fn digest_struct_hash(digest: B256, wallets: &[Address]) -> B256 {
    let type_hash = keccak256(abi::Message::eip712_encode_type().as_bytes());
    let mut packed_wallets = Vec::with_capacity(wallets.len() * 32);
    for wallet in wallets {
        packed_wallets.extend_from_slice(B256::left_padding_from(wallet.as_slice()).as_slice());
    }
    keccak256((type_hash, digest, keccak256(packed_wallets)).abi_encode())
}

/// ABI `Payload.Decoded` tuple for `payload`.
pub fn to_decoded(payload: &ParentedPayload, no_chain_id: bool) -> Result<abi::Decoded, TypedDataError> {
    let mut decoded = abi::Decoded {
        kind: 0,
        noChainId: no_chain_id,
        calls: Vec::new(),
        space: U256::ZERO,
        nonce: U256::ZERO,
        message: Bytes::new(),
        imageHash: B256::ZERO,
        digest: B256::ZERO,
        parentWallets: payload.parent_wallets.clone(),
    };
    match &payload.payload {
        Payload::Call(calls) => {
            decoded.kind = Payload::KIND_TRANSACTIONS;
            decoded.calls = calls.calls.iter().map(abi::Call::from).collect();
            decoded.space = calls.space;
            decoded.nonce = calls.nonce;
        }
        Payload::Message(m) => {
            decoded.kind = Payload::KIND_MESSAGE;
            decoded.message = m.message.clone();
        }
        Payload::ConfigUpdate(c) => {
            decoded.kind = Payload::KIND_CONFIG_UPDATE;
            decoded.imageHash = c.image_hash;
        }
        Payload::Digest(d) => {
            decoded.kind = Payload::KIND_DIGEST;
            decoded.digest = d.digest;
        }
        Payload::Call4337(_) => return Err(TypedDataError::Unsupported("ERC-4337 call")),
        Payload::SessionImplicitAuthorize(_) => {
            return Err(TypedDataError::Unsupported("Session implicit authorize"))
        }
    }
    Ok(decoded)
}

/// `queuePayload(wallet, signer, payload, signature)` calldata for the recovery extension.
pub fn encode_calldata(
    wallet: Address,
    payload: &ParentedPayload,
    signer: Address,
    signature: &RecoverySignature,
    no_chain_id: bool,
) -> Result<Vec<u8>, TypedDataError> {
    let call = IRecovery::queuePayloadCall {
        wallet,
        signer,
        payload: to_decoded(payload, no_chain_id)?,
        signature: signature.pack(),
    };
    Ok(call.abi_encode())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, b256, bytes};
    use sequence_primitives_types::{Call, Calls, Calls4337, Digest, Message};

    use crate::typed_data;

    const WALLET: Address = address!("00000000000000000000000000000000000000aa");

    fn calls() -> ParentedPayload {
        ParentedPayload::new(Calls {
            calls: vec![Call {
                to: address!("1111111111111111111111111111111111111111"),
                value: U256::from(7u64),
                ..Default::default()
            }],
            space: U256::ZERO,
            nonce: U256::from(3u64),
        })
    }

    #[test]
    fn uses_the_recovery_domain_regardless_of_the_flag() {
        let chain_id = U256::from(10u64);
        let plain = calls();
        let expected = typed_data::hash(WALLET, chain_id, &plain.clone().into_recovery()).unwrap();

        assert_eq!(hash_recovery_payload(&plain, WALLET, chain_id, false), Ok(expected));
        assert_ne!(
            hash_recovery_payload(&plain, WALLET, chain_id, true),
            Ok(expected)
        );
        assert_eq!(
            hash_recovery_payload(&plain, WALLET, chain_id, true),
            hash_recovery_payload(&plain, WALLET, U256::from(1u64), true)
        );
    }

    #[test]
    fn digests_hash_like_messages() {
        let digest = b256!("0101010101010101010101010101010101010101010101010101010101010101");
        let wallets = vec![address!("2222222222222222222222222222222222222222")];

        let as_digest = ParentedPayload::new(Digest { digest }).with_parent_wallets(wallets.clone());
        let struct_hash = digest_struct_hash(digest, &wallets);

        // A message's struct hash uses keccak256(message) in the same slot.
        let message = abi::Message {
            message: bytes!("deadbeef"),
            wallets: wallets.clone(),
        };
        assert_eq!(
            message.eip712_hash_struct(),
            digest_struct_hash(keccak256(&message.message), &wallets)
        );

        let domain = wallet_domain(WALLET, U256::from(1u64), true);
        assert_eq!(
            hash_recovery_payload(&as_digest, WALLET, U256::from(1u64), false),
            Ok(eip712_digest(domain.separator(), struct_hash))
        );
    }

    #[test]
    fn calldata_round_trips_through_the_abi() {
        let signature = RecoverySignature::Ecdsa {
            r: B256::repeat_byte(0x11),
            s: B256::repeat_byte(0x22),
            y_parity: true,
        };
        let packed = signature.pack();
        assert_eq!(packed.len(), 65);
        assert_eq!(packed[64], 28);

        let signer = address!("3333333333333333333333333333333333333333");
        let calldata = encode_calldata(WALLET, &calls(), signer, &signature, false).unwrap();
        assert_eq!(&calldata[..4], &IRecovery::queuePayloadCall::SELECTOR);

        let decoded = IRecovery::queuePayloadCall::abi_decode(&calldata, true).unwrap();
        assert_eq!(decoded.wallet, WALLET);
        assert_eq!(decoded.signer, signer);
        assert_eq!(decoded.payload.kind, 0);
        assert_eq!(decoded.payload.nonce, U256::from(3u64));
        assert_eq!(decoded.payload.calls.len(), 1);
        assert_eq!(decoded.signature, packed);
    }

    #[test]
    fn user_operations_cannot_be_queued() {
        let op = ParentedPayload::new(Calls4337 {
            sender: WALLET,
            nonce: U256::from(1u64),
            ..Default::default()
        });
        let unsupported = TypedDataError::Unsupported("ERC-4337 call");
        assert_eq!(
            hash_recovery_payload(&op, WALLET, U256::from(1u64), false),
            Err(unsupported.clone())
        );
        assert_eq!(to_decoded(&op, false).err(), Some(unsupported));

        let signature = RecoverySignature::Erc1271 { data: Bytes::new() };
        assert!(encode_calldata(WALLET, &op, WALLET, &signature, false).is_err());
    }

    #[test]
    fn contract_signatures_pass_through() {
        let data = bytes!("cafe");
        assert_eq!(RecoverySignature::Erc1271 { data: data.clone() }.pack(), data);

        let message = ParentedPayload::new(Message {
            message: bytes!("01"),
        });
        let decoded = to_decoded(&message, true).unwrap();
        assert_eq!(decoded.kind, Payload::KIND_MESSAGE);
        assert!(decoded.noChainId);
    }
}
