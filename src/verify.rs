//! Signature verification for work order responses and receipts.
//!
//! Each check runs the same steps: parse the PEM key, recompute the
//! canonical digest, decode the base64 DER signature, verify. A key that
//! does not parse ends the check with `INVALID_VERIFICATION_KEY`, a signature
//! that does not decode with `INVALID_SIGNATURE_FORMAT`, and any other
//! failure with `FAILED`.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{DerSignature, Signature, VerifyingKey};
use k256::pkcs8::DecodePublicKey;
use tracing::{debug, warn};

use crate::codec::base64_to_byte_array;
use crate::error::SignatureError;
use crate::hashing::{
    Hash256, receipt_create_digest, receipt_update_digest, response_digest, verification_key_digest,
};
use crate::types::{
    ReceiptCreateRequest, ReceiptUpdate, SignatureStatus, VerificationKeyAssertion, WorkOrderResponse,
};

pub fn parse_verification_key(pem: &str) -> Result<VerifyingKey, SignatureError> {
    VerifyingKey::from_public_key_pem(pem.trim())
        .map_err(|e| SignatureError::InvalidVerificationKey(e.to_string()))
}

/// Decode a base64 DER signature. High-S signatures from other signers are
/// accepted by normalizing them first.
///
/// Only a broken encoding is malformed. Well formed DER whose `r` or `s` is
/// zero or not below the group order decodes but can never verify.
pub fn decode_signature(signature_b64: &str) -> Result<Signature, SignatureError> {
    let der = base64_to_byte_array(signature_b64)
        .map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;
    let der = DerSignature::try_from(der.as_slice())
        .map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;
    let sig = Signature::try_from(der).map_err(|_| SignatureError::VerificationFailed)?;
    Ok(sig.normalize_s().unwrap_or(sig))
}

/// Verify `signature_b64` over `digest` with the PEM key.
pub fn verify_digest(signature_b64: &str, digest: &Hash256, key_pem: &str) -> Result<(), SignatureError> {
    let key = parse_verification_key(key_pem)?;
    let sig = decode_signature(signature_b64)?;
    key.verify_prehash(digest, &sig)
        .map_err(|_| SignatureError::VerificationFailed)
}

fn to_status(what: &str, result: Result<(), SignatureError>) -> SignatureStatus {
    match result {
        Ok(()) => {
            debug!("{what} signature verified");
            SignatureStatus::Passed
        }
        Err(e) => {
            let status = e.status();
            warn!(%status, "{what} signature check failed: {e}");
            status
        }
    }
}

/// Verify a response signature against `key_pem` in a single step.
pub fn verify_wo_response_signature(response: &WorkOrderResponse, key_pem: &str) -> SignatureStatus {
    let digest = response_digest(response);
    to_status(
        "work order response",
        verify_digest(&response.worker_signature, &digest, key_pem),
    )
}

/// Verify that the worker key certified `assertion` for this requester nonce.
pub fn verify_wo_verification_key_signature(
    assertion: &VerificationKeyAssertion,
    worker_key_pem: &str,
    requester_nonce: Option<&str>,
) -> SignatureStatus {
    let Some(nonce) = requester_nonce else {
        warn!("missing requester nonce for verification key check");
        return SignatureStatus::Failed;
    };
    let digest = verification_key_digest(&assertion.ext_verification_key, nonce);
    to_status(
        "verification key",
        verify_digest(&assertion.ext_verification_key_signature, &digest, worker_key_pem),
    )
}

/// Verify a work order response.
///
/// When the response carries `extVerificationKey`, the worker key must first
/// certify it over `extVerificationKey ++ requesterNonce`; only then is the
/// response signature checked against the certified key. Otherwise the
/// response is checked directly against the worker key.
pub fn verify_signature(
    response: &WorkOrderResponse,
    worker_key_pem: &str,
    requester_nonce: Option<&str>,
) -> SignatureStatus {
    let Some(ext_key) = response.ext_verification_key.as_deref() else {
        return verify_wo_response_signature(response, worker_key_pem);
    };
    let Some(ext_sig) = response.ext_verification_key_signature.as_deref() else {
        warn!("extVerificationKey present without extVerificationKeySignature");
        return SignatureStatus::Failed;
    };
    let assertion = VerificationKeyAssertion {
        ext_verification_key: ext_key.to_string(),
        ext_verification_key_signature: ext_sig.to_string(),
    };
    match verify_wo_verification_key_signature(&assertion, worker_key_pem, requester_nonce) {
        SignatureStatus::Passed => verify_wo_response_signature(response, ext_key),
        status => status,
    }
}

pub fn verify_create_receipt_signature(receipt: &ReceiptCreateRequest) -> SignatureStatus {
    let digest = receipt_create_digest(receipt);
    to_status(
        "receipt create",
        verify_digest(&receipt.requester_signature, &digest, &receipt.receipt_verification_key),
    )
}

pub fn verify_update_receipt_signature(update: &ReceiptUpdate) -> SignatureStatus {
    let digest = receipt_update_digest(update);
    to_status(
        "receipt update",
        verify_digest(&update.update_signature, &digest, &update.receipt_verification_key),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::compute_message_hash;
    use crate::signing::{Secp, generate_signature};

    const SK: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const OTHER_SK: &str = "8da4ef21b864d2cc526dbdb2a120bd2874c36c9d0a1fb7f8c63d7f7a8b41de8f";

    fn key() -> Secp {
        Secp::from_hex(SK).unwrap()
    }

    #[test]
    fn sign_then_verify_passes() {
        let digest = compute_message_hash(b"payload");
        let sig = generate_signature(&digest, &key()).unwrap();
        assert!(verify_digest(&sig.signature, &digest, &sig.public_key).is_ok());
    }

    #[test]
    fn wrong_key_fails() {
        let digest = compute_message_hash(b"payload");
        let sig = generate_signature(&digest, &key()).unwrap();
        let other_pem = Secp::from_hex(OTHER_SK).unwrap().verifying_key_pem().unwrap();
        let err = verify_digest(&sig.signature, &digest, &other_pem).unwrap_err();
        assert_eq!(err.status(), SignatureStatus::Failed);
    }

    #[test]
    fn garbage_pem_is_invalid_key() {
        let digest = compute_message_hash(b"payload");
        let sig = generate_signature(&digest, &key()).unwrap();
        let err = verify_digest(&sig.signature, &digest, "-----BEGIN PUBLIC KEY-----\nnope\n").unwrap_err();
        assert_eq!(err.status(), SignatureStatus::InvalidVerificationKey);
    }

    #[test]
    fn non_der_signature_is_invalid_format() {
        let digest = compute_message_hash(b"payload");
        let pem = key().verifying_key_pem().unwrap();
        let err = verify_digest("AAEC", &digest, &pem).unwrap_err();
        assert_eq!(err.status(), SignatureStatus::InvalidSignatureFormat);
        let err = verify_digest("***", &digest, &pem).unwrap_err();
        assert_eq!(err.status(), SignatureStatus::InvalidSignatureFormat);
    }

    #[test]
    fn out_of_range_scalar_fails_verification() {
        let digest = compute_message_hash(b"payload");
        let pem = key().verifying_key_pem().unwrap();
        // r = group order, s = 1
        let mut der = vec![0x30, 0x26, 0x02, 0x21, 0x00];
        der.extend(
            hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141").unwrap(),
        );
        der.extend([0x02, 0x01, 0x01]);
        let b64 = crate::codec::byte_array_to_base64(&der);
        let err = verify_digest(&b64, &digest, &pem).unwrap_err();
        assert!(matches!(err, SignatureError::VerificationFailed));
        assert_eq!(err.status(), SignatureStatus::Failed);
    }

    #[test]
    fn high_s_signature_is_accepted() {
        use k256::ecdsa::signature::hazmat::PrehashSigner;

        let sk = key();
        let digest = compute_message_hash(b"payload");
        let sig: Signature = sk.signing_key().sign_prehash(&digest).unwrap();
        let (r_bytes, _) = sig.split_bytes();
        let s: k256::Scalar = *sig.s().as_ref();
        let high = Signature::from_scalars(r_bytes, (-s).to_bytes()).unwrap();
        assert!(high.normalize_s().is_some());

        let b64 = crate::codec::byte_array_to_base64(high.to_der().as_bytes());
        let pem = sk.verifying_key_pem().unwrap();
        assert!(verify_digest(&b64, &digest, &pem).is_ok());
    }

    #[test]
    fn update_receipt_round_trip() {
        let sk = key();
        let mut update = ReceiptUpdate {
            work_order_id: "wo1".into(),
            update_type: 2,
            update_data: "progress".into(),
            update_signature: String::new(),
            receipt_verification_key: sk.verifying_key_pem().unwrap(),
        };
        update.update_signature = generate_signature(&receipt_update_digest(&update), &sk)
            .unwrap()
            .signature;
        assert_eq!(verify_update_receipt_signature(&update), SignatureStatus::Passed);

        update.update_type = 3;
        assert_eq!(verify_update_receipt_signature(&update), SignatureStatus::Failed);

        update.receipt_verification_key = "bogus".into();
        assert_eq!(
            verify_update_receipt_signature(&update),
            SignatureStatus::InvalidVerificationKey
        );
    }
}
