//! Read-only queries against the recovery extension's payload queue.
//!
//! [`ExtensionQueue`] turns any `eth_call` transport into a [`RecoveryQueue`]: it builds the
//! calldata, performs one static call per query and decodes the return word.

use core::future::Future;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;
use sequence_primitives_types::{QueueError, RecoveryQueue};

use crate::{abi::IRecovery, recovery::topology::RecoveryLeaf};

pub fn total_queued_payloads_calldata(wallet: Address, signer: Address) -> Vec<u8> {
    IRecovery::totalQueuedPayloadsCall { wallet, signer }.abi_encode()
}

pub fn decode_total_queued_payloads(data: &[u8]) -> Result<U256, QueueError> {
    IRecovery::totalQueuedPayloadsCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|_| QueueError::MalformedReturn)
}

pub fn queued_payload_hashes_calldata(wallet: Address, signer: Address, index: U256) -> Vec<u8> {
    IRecovery::queuedPayloadHashesCall {
        wallet,
        signer,
        index,
    }
    .abi_encode()
}

pub fn decode_queued_payload_hashes(data: &[u8]) -> Result<B256, QueueError> {
    IRecovery::queuedPayloadHashesCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|_| QueueError::MalformedReturn)
}

pub fn timestamp_for_queued_payload_calldata(
    wallet: Address,
    signer: Address,
    payload_hash: B256,
) -> Vec<u8> {
    IRecovery::timestampForQueuedPayloadCall {
        wallet,
        signer,
        payloadHash: payload_hash,
    }
    .abi_encode()
}

pub fn decode_timestamp_for_queued_payload(data: &[u8]) -> Result<U256, QueueError> {
    IRecovery::timestampForQueuedPayloadCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|_| QueueError::MalformedReturn)
}

/// Transport for a single `eth_call` against `to`.
pub trait StaticCaller {
    fn static_call(&self, to: Address, data: Vec<u8>)
        -> impl Future<Output = Result<Bytes, QueueError>> + Send;
}

/// [`RecoveryQueue`] backed by the extension contract at `extension`.
#[derive(Clone, Debug)]
pub struct ExtensionQueue<C> {
    pub extension: Address,
    pub caller: C,
}

impl<C> ExtensionQueue<C> {
    pub fn new(extension: Address, caller: C) -> Self {
        Self { extension, caller }
    }
}

impl<C: StaticCaller + Sync> RecoveryQueue for ExtensionQueue<C> {
    fn total_queued_payloads(
        &self,
        wallet: Address,
        signer: Address,
    ) -> impl Future<Output = Result<U256, QueueError>> + Send {
        let data = total_queued_payloads_calldata(wallet, signer);
        async move {
            let out = self.caller.static_call(self.extension, data).await?;
            decode_total_queued_payloads(&out)
        }
    }

    fn queued_payload_hash(
        &self,
        wallet: Address,
        signer: Address,
        index: U256,
    ) -> impl Future<Output = Result<B256, QueueError>> + Send {
        let data = queued_payload_hashes_calldata(wallet, signer, index);
        async move {
            let out = self.caller.static_call(self.extension, data).await?;
            decode_queued_payload_hashes(&out)
        }
    }

    fn timestamp_for_queued_payload(
        &self,
        wallet: Address,
        signer: Address,
        payload_hash: B256,
    ) -> impl Future<Output = Result<U256, QueueError>> + Send {
        let data = timestamp_for_queued_payload_calldata(wallet, signer, payload_hash);
        async move {
            let out = self.caller.static_call(self.extension, data).await?;
            decode_timestamp_for_queued_payload(&out)
        }
    }
}

/// A payload sitting in the queue and the time it was queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuedPayload {
    pub payload_hash: B256,
    pub queued_at: U256,
}

/// Every payload `signer` has queued for `wallet`, oldest first.
pub async fn queued_payloads<Q: RecoveryQueue>(
    queue: &Q,
    wallet: Address,
    signer: Address,
) -> Result<Vec<QueuedPayload>, QueueError> {
    let total = queue.total_queued_payloads(wallet, signer).await?;
    let total: u64 = total.try_into().map_err(|_| QueueError::MalformedReturn)?;

    let mut out = Vec::new();
    for index in 0..total {
        let payload_hash = queue.queued_payload_hash(wallet, signer, U256::from(index)).await?;
        let queued_at = queue
            .timestamp_for_queued_payload(wallet, signer, payload_hash)
            .await?;
        out.push(QueuedPayload {
            payload_hash,
            queued_at,
        });
    }
    Ok(out)
}

/// Whether a payload queued at `queued_at` may be executed by `leaf` at `now`.
///
/// A zero `queued_at` means the payload was never queued.
pub fn is_payload_ready(leaf: &RecoveryLeaf, queued_at: U256, now: u64) -> bool {
    let now = U256::from(now);
    !queued_at.is_zero()
        && queued_at >= leaf.min_timestamp
        && now >= queued_at
        && now - queued_at >= leaf.required_delta_time
}
