use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Outcome of a signing or verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureStatus {
    Passed,
    Failed,
    InvalidSignatureFormat,
    InvalidVerificationKey,
}

impl SignatureStatus {
    pub fn is_passed(self) -> bool {
        self == SignatureStatus::Passed
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureStatus::Passed => write!(f, "PASSED"),
            SignatureStatus::Failed => write!(f, "FAILED"),
            SignatureStatus::InvalidSignatureFormat => write!(f, "INVALID_SIGNATURE_FORMAT"),
            SignatureStatus::InvalidVerificationKey => write!(f, "INVALID_VERIFICATION_KEY"),
        }
    }
}

/// One entry of `inData` / `outData`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataItem {
    pub index: i64,
    #[serde(default)]
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_data_encryption_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_hash: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataItem {
    pub fn new(index: i64, data: impl Into<String>) -> Self {
        Self {
            index,
            data: data.into(),
            encrypted_data_encryption_key: None,
            iv: None,
            data_hash: None,
            extra: Map::new(),
        }
    }

    pub fn with_encrypted_data_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encrypted_data_encryption_key = Some(key.into());
        self
    }

    pub fn with_iv(mut self, iv: impl Into<String>) -> Self {
        self.iv = Some(iv.into());
        self
    }

    pub fn with_data_hash(mut self, hash: impl Into<String>) -> Self {
        self.data_hash = Some(hash.into());
        self
    }
}

/// `params` of a work order submit request.
///
/// The mandatory fields are plain `String`s so that a payload lacking one
/// fails to deserialize. Everything populated during signing is optional.
/// Unknown fields are carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderRequest {
    pub requester_nonce: String,
    pub work_order_id: String,
    pub worker_id: String,
    pub requester_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_id: Option<String>,
    pub in_data: Vec<DataItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_data: Option<Vec<DataItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_key_iv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_session_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_request_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkOrderRequest {
    pub fn new(
        requester_nonce: impl Into<String>,
        work_order_id: impl Into<String>,
        worker_id: impl Into<String>,
        requester_id: impl Into<String>,
        in_data: Vec<DataItem>,
    ) -> Self {
        Self {
            requester_nonce: requester_nonce.into(),
            work_order_id: work_order_id.into(),
            worker_id: worker_id.into(),
            requester_id: requester_id.into(),
            workload_id: None,
            in_data,
            out_data: None,
            session_key_iv: None,
            encrypted_session_key: None,
            encrypted_request_hash: None,
            requester_signature: None,
            verifying_key: None,
            extra: Map::new(),
        }
    }
}

/// A work order result as returned by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderResponse {
    pub worker_nonce: String,
    pub worker_signature: String,
    pub work_order_id: String,
    pub worker_id: String,
    pub requester_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_id: Option<String>,
    #[serde(default)]
    pub out_data: Vec<DataItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_verification_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_verification_key_signature: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A short-lived verification key certified by the worker's long-lived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationKeyAssertion {
    /// PEM encoded public key.
    pub ext_verification_key: String,
    /// Base64 DER signature over `extVerificationKey ++ requesterNonce`.
    pub ext_verification_key_signature: String,
}

/// `params` of a work order receipt create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptCreateRequest {
    pub work_order_id: String,
    pub worker_service_id: String,
    pub worker_id: String,
    pub requester_id: String,
    pub receipt_create_status: i64,
    pub work_order_request_hash: String,
    pub requester_generated_nonce: String,
    pub requester_signature: String,
    pub receipt_verification_key: String,
}

/// A receipt update as returned by the receipt update retrieve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptUpdate {
    pub work_order_id: String,
    pub update_type: i64,
    pub update_data: String,
    pub update_signature: String,
    pub receipt_verification_key: String,
}

/// Worker capability descriptor consumed when signing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerDetails {
    pub hashing_algorithm: String,
    pub signing_algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_key: Option<String>,
}

/// JSON-RPC 2.0 envelope around a request payload.
///
/// Envelope members are kept exactly as received: absent ones stay absent,
/// an explicit `"id": null` stays null, unknown members land in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest<P> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub params: P,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<P> JsonRpcRequest<P> {
    pub fn new(method: impl Into<String>, id: Value, params: P) -> Self {
        Self {
            jsonrpc: Some("2.0".to_string()),
            method: Some(method.into()),
            id: Some(id),
            params,
            extra: Map::new(),
        }
    }
}

/// A member that is present is `Some`, even when it is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
