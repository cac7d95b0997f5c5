//! Requester side of the protocol: sign work order requests, check the
//! worker's responses and receipts.

use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::codec::{byte_array_to_hex, is_valid_hex_str};
use crate::config::{Config, SUPPORTED_HASHING_ALGORITHM, SUPPORTED_SIGNING_ALGORITHM};
use crate::data_items::{encrypt_data, encrypt_work_order_data};
use crate::error::SignatureError;
use crate::hashing::{calculate_request_hash, request_digest};
use crate::metrics::MetricsCollector;
use crate::signing::{Secp, generate_signature};
use crate::types::{
    JsonRpcRequest, ReceiptCreateRequest, ReceiptUpdate, SignatureStatus, WorkOrderRequest,
    WorkOrderResponse, WorkerDetails,
};
use crate::verify;

/// Bytes of randomness in a generated `requesterNonce`.
pub const NONCE_BYTES: usize = 16;

const REQUIRED_PARAMS: [&str; 5] = ["requesterNonce", "workOrderId", "workerId", "requesterId", "inData"];

/// Symmetric material for one work order.
#[derive(Clone)]
pub struct SessionKeys {
    pub session_key: Vec<u8>,
    pub session_iv: Vec<u8>,
    /// `session_key` wrapped for the worker, attached as is.
    pub encrypted_session_key: Vec<u8>,
    pub data_key: Option<Vec<u8>>,
    pub data_iv: Option<Vec<u8>>,
}

impl SessionKeys {
    pub fn new(session_key: Vec<u8>, session_iv: Vec<u8>, encrypted_session_key: Vec<u8>) -> Self {
        Self {
            session_key,
            session_iv,
            encrypted_session_key,
            data_key: None,
            data_iv: None,
        }
    }

    pub fn with_data_key(mut self, data_key: Vec<u8>, data_iv: Vec<u8>) -> Self {
        self.data_key = Some(data_key);
        self.data_iv = Some(data_iv);
        self
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("session_iv", &byte_array_to_hex(&self.session_iv))
            .field("has_data_key", &self.data_key.is_some())
            .finish_non_exhaustive()
    }
}

/// Signs requests and checks signatures.
///
/// Holds only the locally supported algorithms and shared counters, so one
/// instance can serve concurrent callers. Keys are passed to every call.
#[derive(Debug, Clone)]
pub struct ClientSignature {
    hashing_algorithm: String,
    signing_algorithm: String,
    metrics: Arc<MetricsCollector>,
}

impl Default for ClientSignature {
    fn default() -> Self {
        Self::with_algorithms(SUPPORTED_HASHING_ALGORITHM, SUPPORTED_SIGNING_ALGORITHM)
    }
}

impl ClientSignature {
    pub fn new(config: &Config) -> Self {
        Self::with_algorithms(&config.hashing_algorithm, &config.signing_algorithm)
    }

    pub fn with_algorithms(hashing_algorithm: &str, signing_algorithm: &str) -> Self {
        Self {
            hashing_algorithm: hashing_algorithm.to_string(),
            signing_algorithm: signing_algorithm.to_string(),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Sign a JSON-RPC work order request.
    ///
    /// Returns the signed request JSON and `PASSED`, or the input unchanged
    /// and `FAILED`.
    pub fn generate_client_signature(
        &self,
        input_json: &str,
        worker: &WorkerDetails,
        private_key: &Secp,
        keys: &SessionKeys,
    ) -> (String, SignatureStatus) {
        let result = serde_json::from_str::<Value>(input_json)
            .map_err(SignatureError::from)
            .and_then(|value| {
                required_params(&value)?;
                serde_json::from_value::<JsonRpcRequest<WorkOrderRequest>>(value)
                    .map_err(SignatureError::from)
            })
            .and_then(|envelope| self.sign_envelope(envelope, worker, private_key, keys))
            .and_then(|signed| serde_json::to_string(&signed).map_err(SignatureError::from));

        match result {
            Ok(signed) => {
                info!("Request Json successfully Signed");
                self.metrics.record_signing(SignatureStatus::Passed);
                (signed, SignatureStatus::Passed)
            }
            Err(e) => {
                error!("Signing the request failed: {e}");
                self.metrics.record_signing(SignatureStatus::Failed);
                (input_json.to_string(), SignatureStatus::Failed)
            }
        }
    }

    /// Typed form of [`generate_client_signature`](Self::generate_client_signature).
    ///
    /// Consumes the envelope and only hands back a fully signed one. Counted
    /// in the same signing metrics as the JSON form.
    pub fn sign_request(
        &self,
        envelope: JsonRpcRequest<WorkOrderRequest>,
        worker: &WorkerDetails,
        private_key: &Secp,
        keys: &SessionKeys,
    ) -> Result<JsonRpcRequest<WorkOrderRequest>, SignatureError> {
        let result = self.sign_envelope(envelope, worker, private_key, keys);
        let status = match &result {
            Ok(_) => SignatureStatus::Passed,
            Err(_) => SignatureStatus::Failed,
        };
        self.metrics.record_signing(status);
        result
    }

    fn sign_envelope(
        &self,
        mut envelope: JsonRpcRequest<WorkOrderRequest>,
        worker: &WorkerDetails,
        private_key: &Secp,
        keys: &SessionKeys,
    ) -> Result<JsonRpcRequest<WorkOrderRequest>, SignatureError> {
        let params = &mut envelope.params;
        payload_check(params)?;
        self.check_algorithms(worker)?;

        params.session_key_iv = Some(byte_array_to_hex(&keys.session_iv));
        encrypt_work_order_data(
            &mut params.in_data,
            &keys.session_key,
            &keys.session_iv,
            keys.data_key.as_deref(),
            keys.data_iv.as_deref(),
        )?;

        if params.requester_nonce.is_empty() {
            params.requester_nonce = generate_nonce();
        } else if !is_valid_hex_str(&params.requester_nonce) {
            return Err(SignatureError::InvalidNonce);
        }

        let final_hash = request_digest(params);
        let encrypted_request_hash = byte_array_to_hex(&encrypt_data(
            &final_hash,
            &keys.session_key,
            &keys.session_iv,
        )?);
        debug!("encrypted request hash: {encrypted_request_hash}");

        let signed = generate_signature(&final_hash, private_key)?;

        params.encrypted_request_hash = Some(encrypted_request_hash);
        params.requester_signature = Some(signed.signature);
        params.encrypted_session_key = Some(byte_array_to_hex(&keys.encrypted_session_key));
        params.verifying_key = Some(signed.public_key);
        Ok(envelope)
    }

    fn check_algorithms(&self, worker: &WorkerDetails) -> Result<(), SignatureError> {
        if worker.hashing_algorithm != self.hashing_algorithm {
            return Err(SignatureError::UnsupportedAlgorithm {
                kind: "hashing",
                found: worker.hashing_algorithm.clone(),
            });
        }
        if worker.signing_algorithm != self.signing_algorithm {
            return Err(SignatureError::UnsupportedAlgorithm {
                kind: "signing",
                found: worker.signing_algorithm.clone(),
            });
        }
        Ok(())
    }

    /// Hex `workOrderRequestHash` of an already signed request.
    pub fn calculate_request_hash(&self, request: &WorkOrderRequest) -> String {
        calculate_request_hash(request)
    }

    pub fn verify_signature(
        &self,
        response: &WorkOrderResponse,
        worker_key_pem: &str,
        requester_nonce: Option<&str>,
    ) -> SignatureStatus {
        let status = verify::verify_signature(response, worker_key_pem, requester_nonce);
        self.metrics.record_verification(status);
        status
    }

    pub fn verify_create_receipt_signature(&self, receipt: &ReceiptCreateRequest) -> SignatureStatus {
        let status = verify::verify_create_receipt_signature(receipt);
        self.metrics.record_verification(status);
        status
    }

    pub fn verify_update_receipt_signature(&self, update: &ReceiptUpdate) -> SignatureStatus {
        let status = verify::verify_update_receipt_signature(update);
        self.metrics.record_verification(status);
        status
    }
}

fn required_params(request: &Value) -> Result<(), SignatureError> {
    let params = request
        .get("params")
        .and_then(Value::as_object)
        .ok_or(SignatureError::MissingField("params"))?;
    for name in REQUIRED_PARAMS {
        if !params.contains_key(name) {
            return Err(SignatureError::MissingField(name));
        }
    }
    Ok(())
}

/// Every `inData` item needs non-empty `data`.
fn payload_check(params: &WorkOrderRequest) -> Result<(), SignatureError> {
    for (position, item) in params.in_data.iter().enumerate() {
        if item.data.is_empty() {
            return Err(SignatureError::InvalidDataItem {
                position,
                reason: "empty data".to_string(),
            });
        }
    }
    Ok(())
}

/// 16 random bytes, hex encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    byte_array_to_hex(&bytes)
}
