// Cryptographic primitives shared by the token signer, the secret derivation and the
// in-memory account store

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Output size of HMAC-SHA256 and SHA-256 (256 bits)
pub const DIGEST_SIZE: usize = 32;

/// Size of a generated application secret key (256 bits)
pub const SECRET_KEY_SIZE: usize = 32;

/// Compute HMAC-SHA256 over the concatenation of `parts`
///
/// Each part is fed to the MAC in order; callers are responsible for making the
/// concatenation unambiguous (see [`length_prefixed`]).
#[must_use]
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> [u8; DIGEST_SIZE] {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    for part in parts {
        mac.update(part);
    }
    let mut out = [0u8; DIGEST_SIZE];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Encode `data` as an 8-byte big-endian length followed by the bytes themselves
#[must_use]
pub fn length_prefixed(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + data.len());
    out.extend_from_slice(&(data.len() as u64).to_be_bytes());
    out.extend_from_slice(data);
    out
}

/// Constant-time byte comparison
///
/// The running time depends only on the input lengths, never on the position of
/// the first differing byte.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Generate a cryptographically secure nonce of specified byte length
///
/// # Returns
///
/// A base64url-encoded string representing the specified bytes of random data
#[must_use]
pub fn generate_nonce(length: usize) -> String {
    let mut nonce = vec![0u8; length];
    rand::rng().fill_bytes(&mut nonce);
    general_purpose::URL_SAFE_NO_PAD.encode(nonce)
}

/// Generate a random application secret key, standard base64 encoded
#[must_use]
pub fn generate_secret_key() -> String {
    let mut secret = [0u8; SECRET_KEY_SIZE];
    rand::rng().fill_bytes(&mut secret);
    general_purpose::STANDARD.encode(secret)
}

/// Lowercase hex SHA-256 of the concatenation of `parts`
#[must_use]
pub fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    format!("{:x}", hasher.finalize())
}
