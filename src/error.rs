use thiserror::Error;

use crate::types::SignatureStatus;

/// Failures inside signing, hashing and verification.
///
/// Public protocol entry points never surface these directly; they are
/// folded into a [`SignatureStatus`] with [`SignatureError::status`].
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("missing required parameter: {0}")]
    MissingField(&'static str),
    #[error("invalid data item at position {position}: {reason}")]
    InvalidDataItem { position: usize, reason: String },
    #[error("unsupported {kind} algorithm: {found}")]
    UnsupportedAlgorithm { kind: &'static str, found: String },
    #[error("invalid data format for requesterNonce")]
    InvalidNonce,
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid base64: {0}")]
    InvalidBase64(String),
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("invalid verification key: {0}")]
    InvalidVerificationKey(String),
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
    #[error("item {0} needs a data encryption key and iv")]
    MissingDataKey(i64),
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("signing failed: {0}")]
    Signing(String),
}

impl SignatureError {
    pub fn status(&self) -> SignatureStatus {
        match self {
            SignatureError::InvalidVerificationKey(_) => SignatureStatus::InvalidVerificationKey,
            SignatureError::MalformedSignature(_) => SignatureStatus::InvalidSignatureFormat,
            _ => SignatureStatus::Failed,
        }
    }
}
