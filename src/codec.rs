//! Text encodings used on the wire.
//!
//! Nonces, IVs and the encrypted request hash travel as hex; hashes,
//! signatures and ciphertext travel as standard (padded) base64.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::SignatureError;

pub fn byte_array_to_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn base64_to_byte_array(s: &str) -> Result<Vec<u8>, SignatureError> {
    STANDARD
        .decode(s)
        .map_err(|e| SignatureError::InvalidBase64(e.to_string()))
}

/// Lowercase hex, no prefix.
pub fn byte_array_to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

pub fn hex_to_byte_array(s: &str) -> Result<Vec<u8>, SignatureError> {
    hex::decode(s).map_err(|e| SignatureError::InvalidHex(e.to_string()))
}

/// True when `s` is a non-empty run of hex digits, with no `0x` prefix.
pub fn is_valid_hex_str(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Concatenate UTF-8 fields with no separator.
pub fn concat_utf8<'a, I>(fields: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = Vec::new();
    for f in fields {
        out.extend_from_slice(f.as_bytes());
    }
    out
}
