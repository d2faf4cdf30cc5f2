//! Token codec
//!
//! Wire format of the cookie value, before transport encoding:
//!
//! ```text
//! <identity_id>:<expiry_ms as decimal>:<signature as base64url>
//! ```
//!
//! The whole text is then base64 encoded so it survives as a cookie value.
//! Decoding is purely structural; no cryptographic check happens here.

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

use super::signature::Signature;

/// Separator between the three token fields
pub const FIELD_SEPARATOR: char = ':';

/// A structurally valid, not yet verified, token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub identity_id: String,
    pub expiry_ms: i64,
    pub signature: Signature,
}

/// Reasons a cookie value cannot be decoded into a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed remember-me token: {0}")]
    Malformed(&'static str),
}

/// Reasons a token cannot be encoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("identity id {0:?} cannot be carried in a remember-me token")]
    InvalidIdentity(String),
}

/// Encode the three token fields into a cookie value
///
/// # Errors
///
/// Returns `EncodeError::InvalidIdentity` if the identity id is empty or contains
/// the field separator, since such a token could never be decoded again.
pub fn encode(identity_id: &str, expiry_ms: i64, signature: &Signature) -> Result<String, EncodeError> {
    if identity_id.is_empty() || identity_id.contains(FIELD_SEPARATOR) {
        return Err(EncodeError::InvalidIdentity(identity_id.to_string()));
    }

    let token = format!(
        "{identity_id}{FIELD_SEPARATOR}{expiry_ms}{FIELD_SEPARATOR}{}",
        signature.to_field()
    );
    Ok(general_purpose::STANDARD.encode(token.as_bytes()))
}

/// Decode a cookie value into its three token fields
///
/// Both the standard and the URL-safe base64 alphabets are accepted for the
/// transport encoding.
///
/// # Errors
///
/// Returns `DecodeError::Malformed` if:
/// - The transport encoding is not valid base64
/// - The decoded bytes are not UTF-8
/// - There are not exactly three fields
/// - The identity field is empty
/// - The expiry field is not a decimal integer
/// - The signature field is not valid base64url
pub fn decode(cookie_value: &str) -> Result<DecodedToken, DecodeError> {
    let raw = general_purpose::STANDARD
        .decode(cookie_value.trim())
        .or_else(|_| general_purpose::URL_SAFE.decode(cookie_value.trim()))
        .or_else(|_| general_purpose::URL_SAFE_NO_PAD.decode(cookie_value.trim()))
        .map_err(|_| DecodeError::Malformed("invalid transport encoding"))?;

    let text =
        String::from_utf8(raw).map_err(|_| DecodeError::Malformed("token is not valid UTF-8"))?;

    let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
    let [identity_id, expiry, signature] = fields.as_slice() else {
        return Err(DecodeError::Malformed("expected exactly three fields"));
    };

    if identity_id.is_empty() {
        return Err(DecodeError::Malformed("empty identity"));
    }

    let expiry_ms = expiry
        .parse::<i64>()
        .map_err(|_| DecodeError::Malformed("expiry is not an integer"))?;

    let signature = Signature::from_field(signature)
        .ok_or(DecodeError::Malformed("signature is not valid base64url"))?;

    Ok(DecodedToken {
        identity_id: (*identity_id).to_string(),
        expiry_ms,
        signature,
    })
}
