//! Solidity ABI and EIP-712 bindings mirrored from the wallet contracts.
//!
//! The structs double as EIP-712 types: their `sol!` definitions produce the exact
//! `encodeType` strings the wallet hashes (`Calls(Call[] calls,...)Call(...)`).

use alloy_sol_types::sol;
use sequence_primitives_types::payload;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct Call {
        address to;
        uint256 value;
        bytes data;
        uint256 gasLimit;
        bool delegateCall;
        bool onlyFallback;
        uint256 behaviorOnError;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Calls {
        Call[] calls;
        uint256 space;
        uint256 nonce;
        address[] wallets;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Message {
        bytes message;
        address[] wallets;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ConfigUpdate {
        bytes32 imageHash;
        address[] wallets;
    }

    /// `Payload.Decoded` as accepted by the wallet and its extensions.
    #[derive(Debug, PartialEq, Eq)]
    struct Decoded {
        uint8 kind;
        bool noChainId;
        Call[] calls;
        uint256 space;
        uint256 nonce;
        bytes message;
        bytes32 imageHash;
        bytes32 digest;
        address[] parentWallets;
    }

    /// Recovery extension: timelocked payload queue.
    interface IRecovery {
        function queuePayload(address wallet, address signer, Decoded payload, bytes signature) external;
        function totalQueuedPayloads(address wallet, address signer) external view returns (uint256);
        function queuedPayloadHashes(address wallet, address signer, uint256 index) external view returns (bytes32);
        function timestampForQueuedPayload(address wallet, address signer, bytes32 payloadHash) external view returns (uint256);
    }
}

impl From<&payload::Call> for Call {
    fn from(call: &payload::Call) -> Self {
        Self {
            to: call.to,
            value: call.value,
            data: call.data.clone(),
            gasLimit: call.gas_limit,
            delegateCall: call.delegate_call,
            onlyFallback: call.only_fallback,
            behaviorOnError: alloy_primitives::U256::from(call.behavior_on_error.code()),
        }
    }
}
