//! Token issuer
//!
//! Builds a fresh signed token after a successful primary login where the user
//! asked to be remembered.

use chrono::Duration;
use thiserror::Error;

use super::codec::{self, EncodeError};
use super::signature::{self, SecretDeriver};
use crate::identity::IdentityRecord;

/// A freshly issued token and the lifetime its cookie should carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub identity_id: String,
    pub cookie_value: String,
    pub expiry_ms: i64,
    /// Cookie `Max-Age`, equal to the validity window
    pub max_age: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("token validity must be positive, got {0} ms")]
    InvalidValidity(i64),
}

/// Signs tokens for resolved identities
pub struct TokenIssuer<'a> {
    deriver: &'a SecretDeriver,
    user_seed_enabled: bool,
}

impl<'a> TokenIssuer<'a> {
    #[must_use]
    pub fn new(deriver: &'a SecretDeriver, user_seed_enabled: bool) -> Self {
        Self {
            deriver,
            user_seed_enabled,
        }
    }

    /// Issue a token for `record` expiring `max_validity_ms` after `now_ms`
    ///
    /// # Errors
    ///
    /// Returns an error if the validity window is not positive or the identity id
    /// cannot be carried in a token.
    pub fn issue(
        &self,
        record: &IdentityRecord,
        now_ms: i64,
        max_validity_ms: i64,
    ) -> Result<IssuedToken, IssueError> {
        if max_validity_ms <= 0 {
            return Err(IssueError::InvalidValidity(max_validity_ms));
        }

        let expiry_ms = now_ms.saturating_add(max_validity_ms);
        let secret = self.deriver.derive(
            &record.credential_hash,
            self.user_seed_enabled.then_some(record.seed.as_str()),
        );
        let signature = signature::sign(&record.identity_id, expiry_ms, &secret);
        let cookie_value = codec::encode(&record.identity_id, expiry_ms, &signature)?;

        log::debug!(
            "Issued remember-me token for '{}' expiring at {expiry_ms}",
            record.identity_id
        );

        Ok(IssuedToken {
            identity_id: record.identity_id.clone(),
            cookie_value,
            expiry_ms,
            max_age: Duration::milliseconds(max_validity_ms),
        })
    }
}
