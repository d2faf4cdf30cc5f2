//! Remember-me token protocol
//!
//! A token is `identity_id:expiry_ms:signature`, base64 encoded into a cookie.
//! The signature is an HMAC over the identity and expiry, keyed by a secret
//! derived from the identity's current credential hash and seed.
//!
//! # Modules
//!
//! - [`codec`] - Wire encoding and structural decoding
//! - [`signature`] - Secret derivation, signing and constant-time verification
//! - [`expiration`] - Expiry window policy
//! - [`validator`] - Full validation pipeline and cookie lifecycle decision
//! - [`issuer`] - Token issuance after primary login
//! - [`config`] - Policy values shared by issuer and validator

pub mod codec;
pub mod config;
pub mod expiration;
pub mod issuer;
pub mod signature;
pub mod validator;

pub use codec::{DecodeError, DecodedToken, EncodeError};
pub use config::RememberMeConfig;
pub use expiration::ExpiryVerdict;
pub use issuer::{IssueError, IssuedToken, TokenIssuer};
pub use signature::{derive_secret, SecretDeriver, SecretKey, Signature};
pub use validator::{CookieAction, Rejection, TokenValidator, Validation, ValidationOutcome};
