//! Selective encryption of work order data items.
//!
//! The `encryptedDataEncryptionKey` of each item picks how its `data` is
//! protected:
//! - empty, absent or `"null"`: session key and session IV
//! - `"-"`: left in clear, only base64 encoded
//! - anything else: the item-specific data key and IV
//!
//! Ciphertext is AES-256-GCM output (`ciphertext || tag`) without the IV.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use tracing::debug;

use crate::codec::{base64_to_byte_array, byte_array_to_base64};
use crate::error::SignatureError;
use crate::types::DataItem;

/// AES-256 key length.
pub const KEY_SIZE: usize = 32;

/// GCM IV length.
pub const IV_SIZE: usize = 12;

/// Sentinel `encryptedDataEncryptionKey` for items sent in clear.
pub const PASS_THROUGH_KEY: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySharing {
    Session,
    PassThrough,
    ItemSpecific,
}

impl KeySharing {
    pub fn of(item: &DataItem) -> Self {
        match item.encrypted_data_encryption_key.as_deref() {
            None | Some("") | Some("null") => KeySharing::Session,
            Some(PASS_THROUGH_KEY) => KeySharing::PassThrough,
            Some(_) => KeySharing::ItemSpecific,
        }
    }
}

fn cipher_for(key: &[u8], iv: &[u8]) -> Result<Aes256Gcm, String> {
    if iv.len() != IV_SIZE {
        return Err(format!("iv must be {IV_SIZE} bytes, got {}", iv.len()));
    }
    Aes256Gcm::new_from_slice(key).map_err(|e| e.to_string())
}

pub fn encrypt_data(data: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let cipher = cipher_for(key, iv).map_err(SignatureError::Encryption)?;
    cipher
        .encrypt(Nonce::from_slice(iv), data)
        .map_err(|e| SignatureError::Encryption(e.to_string()))
}

pub fn decrypt_data(ciphertext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let cipher = cipher_for(key, iv).map_err(SignatureError::Decryption)?;
    cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|e| SignatureError::Decryption(e.to_string()))
}

/// Replace each item's `data` with its base64 wire form, in place.
///
/// Index values and item order are left as they are.
pub fn encrypt_work_order_data(
    items: &mut [DataItem],
    session_key: &[u8],
    session_iv: &[u8],
    data_key: Option<&[u8]>,
    data_iv: Option<&[u8]>,
) -> Result<(), SignatureError> {
    for item in items.iter_mut() {
        let plain = item.data.as_bytes();
        let wire = match KeySharing::of(item) {
            KeySharing::Session => byte_array_to_base64(&encrypt_data(plain, session_key, session_iv)?),
            KeySharing::PassThrough => byte_array_to_base64(plain),
            KeySharing::ItemSpecific => {
                let (key, iv) = data_key
                    .zip(data_iv)
                    .ok_or(SignatureError::MissingDataKey(item.index))?;
                byte_array_to_base64(&encrypt_data(plain, key, iv)?)
            }
        };
        debug!(index = item.index, data = %wire, "encrypted work order data item");
        item.data = wire;
    }
    Ok(())
}

/// Recover plaintext of response items, returned in ascending index order.
pub fn decrypt_data_items(
    items: &[DataItem],
    session_key: &[u8],
    session_iv: &[u8],
    data_key: Option<&[u8]>,
    data_iv: Option<&[u8]>,
) -> Result<Vec<(i64, Vec<u8>)>, SignatureError> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let raw = base64_to_byte_array(&item.data)?;
        let plain = match KeySharing::of(item) {
            KeySharing::Session => decrypt_data(&raw, session_key, session_iv)?,
            KeySharing::PassThrough => raw,
            KeySharing::ItemSpecific => {
                let (key, iv) = data_key
                    .zip(data_iv)
                    .ok_or(SignatureError::MissingDataKey(item.index))?;
                decrypt_data(&raw, key, iv)?
            }
        };
        out.push((item.index, plain));
    }
    out.sort_by_key(|(index, _)| *index);
    Ok(out)
}
