//! Signature engine
//!
//! Remember-me tokens are authenticated with HMAC-SHA256 keyed by a per-identity
//! secret. The secret is derived from the application key, the identity's
//! current credential hash and (optionally) its seed, so any change to one of
//! those silently invalidates every token signed before the change.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::utils::crypto::{constant_time_eq, hmac_sha256, length_prefixed, DIGEST_SIZE};

/// Domain tag mixed into every derived secret
const SECRET_DERIVATION_TAG: &[u8] = b"rememberme/secret/v1";

/// Marker bytes distinguishing "seed present" from "no seed participates"
const SEED_PRESENT: u8 = 1;
const SEED_ABSENT: u8 = 0;

/// Per-identity signing key
///
/// Never cached across validations; recomputed from the identity's current
/// credential state each time it is needed.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; DIGEST_SIZE]);

impl SecretKey {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Raw MAC bytes carried in the third token field
///
/// A decoded signature may have any length; only a verify against the expected
/// MAC decides whether it is acceptable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<u8>);

impl Signature {
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Render as the base64url (no padding) token field
    #[must_use]
    pub fn to_field(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    /// Parse the base64url token field, `None` if it is not valid base64url
    #[must_use]
    pub fn from_field(field: &str) -> Option<Self> {
        URL_SAFE_NO_PAD.decode(field).ok().map(Self)
    }
}

/// Pure secret derivation: `(application key, credential hash, seed) -> secret`
///
/// `seed = None` means the seed does not participate, which is what happens
/// when per-user seeds are switched off in configuration.
#[must_use]
pub fn derive_secret(app_key: &[u8], credential_hash: &str, seed: Option<&str>) -> SecretKey {
    let credential = length_prefixed(credential_hash.as_bytes());
    let seed_part = match seed {
        Some(seed) => [&[SEED_PRESENT][..], &length_prefixed(seed.as_bytes())[..]].concat(),
        None => vec![SEED_ABSENT],
    };

    SecretKey(hmac_sha256(
        app_key,
        &[SECRET_DERIVATION_TAG, &credential, &seed_part],
    ))
}

/// Holds the application key and derives per-identity secrets from it
#[derive(Clone)]
pub struct SecretDeriver {
    app_key: Arc<[u8]>,
}

impl SecretDeriver {
    #[must_use]
    pub fn new(app_key: &[u8]) -> Self {
        Self {
            app_key: Arc::from(app_key),
        }
    }

    #[must_use]
    pub fn derive(&self, credential_hash: &str, seed: Option<&str>) -> SecretKey {
        derive_secret(&self.app_key, credential_hash, seed)
    }
}

impl fmt::Debug for SecretDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretDeriver")
            .field("app_key", &"<redacted>")
            .finish()
    }
}

/// The signed message: length-prefixed identity followed by the big-endian expiry
fn signed_message(identity_id: &str, expiry_ms: i64) -> Vec<u8> {
    let mut message = length_prefixed(identity_id.as_bytes());
    message.extend_from_slice(&expiry_ms.to_be_bytes());
    message
}

/// Sign `(identity_id, expiry_ms)` with `secret`
#[must_use]
pub fn sign(identity_id: &str, expiry_ms: i64, secret: &SecretKey) -> Signature {
    let message = signed_message(identity_id, expiry_ms);
    let mac = hmac_sha256(secret.as_bytes(), &[message.as_slice()]);
    Signature(mac.to_vec())
}

/// Verify a signature in constant time
#[must_use]
pub fn verify(identity_id: &str, expiry_ms: i64, signature: &Signature, secret: &SecretKey) -> bool {
    let expected = sign(identity_id, expiry_ms, secret);
    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}
