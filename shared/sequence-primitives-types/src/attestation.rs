use alloy_primitives::{Address, Bytes, FixedBytes, B256};
use serde::{Deserialize, Serialize};

use crate::serde_decimal;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    pub redirect_url: String,
    #[serde(with = "serde_decimal")]
    pub issued_at: u64,
}

/// Identity provider statement binding an implicit session key to an identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    pub approved_signer: Address,
    pub identity_type: FixedBytes<4>,
    pub issuer_hash: B256,
    pub audience_hash: B256,
    #[serde(default)]
    pub application_data: Bytes,
    pub auth_data: AuthData,
}
