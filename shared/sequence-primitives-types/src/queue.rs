use core::future::Future;

use alloy_primitives::{Address, B256, U256};

/// Errors while reading the recovery queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    /// Used by off-chain mocks or partially implemented readers.
    #[error("recovery queue query not implemented")]
    NotImplemented,
    /// The underlying call failed.
    #[error("recovery queue call failed")]
    CallFailed,
    /// Return data was malformed or could not be decoded.
    #[error("malformed recovery queue return data")]
    MalformedReturn,
}

/// Read-only view of the recovery extension's payload queue.
///
/// Each method is a single request/response round trip. Implementations do not retry;
/// timeouts and retries belong to the caller.
pub trait RecoveryQueue {
    fn total_queued_payloads(
        &self,
        wallet: Address,
        signer: Address,
    ) -> impl Future<Output = Result<U256, QueueError>> + Send;

    fn queued_payload_hash(
        &self,
        wallet: Address,
        signer: Address,
        index: U256,
    ) -> impl Future<Output = Result<B256, QueueError>> + Send;

    /// Zero when the payload was never queued.
    fn timestamp_for_queued_payload(
        &self,
        wallet: Address,
        signer: Address,
        payload_hash: B256,
    ) -> impl Future<Output = Result<U256, QueueError>> + Send;
}
