use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use k256::pkcs8::{EncodePublicKey, LineEnding};

use crate::codec::{byte_array_to_base64, hex_to_byte_array};
use crate::error::SignatureError;
use crate::hashing::Hash256;

/// A secp256k1 private key.
///
/// Handed to each signing call by reference; nothing keeps it between calls.
#[derive(Clone)]
pub struct Secp {
    sk: SigningKey,
}

impl Secp {
    pub fn from_hex(sk_hex: &str) -> Result<Self, SignatureError> {
        let bytes = hex_to_byte_array(sk_hex)
            .map_err(|e| SignatureError::InvalidPrivateKey(e.to_string()))?;
        let sk = SigningKey::from_slice(&bytes)
            .map_err(|e| SignatureError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { sk })
    }

    pub fn from_signing_key(sk: SigningKey) -> Self {
        Self { sk }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.sk
    }

    /// SubjectPublicKeyInfo PEM of the matching public key.
    pub fn verifying_key_pem(&self) -> Result<String, SignatureError> {
        self.sk
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SignatureError::Signing(e.to_string()))
    }

    pub fn pubkey_hex_compressed(&self) -> String {
        let vk = self.sk.verifying_key();
        let ep = vk.to_encoded_point(true);
        hex::encode(ep.as_bytes())
    }
}

impl std::fmt::Debug for Secp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secp")
            .field("public_key", &self.pubkey_hex_compressed())
            .finish_non_exhaustive()
    }
}

/// Result of signing a digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSignature {
    /// PEM public key of the signer.
    pub public_key: String,
    /// Base64 of the DER encoded signature.
    pub signature: String,
}

/// DER encoded RFC 6979 signature over a prehashed digest.
pub fn sign_digest_der(digest: &Hash256, private_key: &Secp) -> Result<Vec<u8>, SignatureError> {
    let sig: Signature = private_key
        .sk
        .sign_prehash(digest)
        .map_err(|e| SignatureError::Signing(e.to_string()))?;
    Ok(sig.to_der().as_bytes().to_vec())
}

/// Sign `digest` and return the signer's public key alongside the signature.
///
/// Deterministic: the same digest and key always give the same signature.
pub fn generate_signature(
    digest: &Hash256,
    private_key: &Secp,
) -> Result<GeneratedSignature, SignatureError> {
    let der = sign_digest_der(digest, private_key)?;
    Ok(GeneratedSignature {
        public_key: private_key.verifying_key_pem()?,
        signature: byte_array_to_base64(&der),
    })
}
