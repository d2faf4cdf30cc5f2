//! Token validator
//!
//! Runs a presented cookie value through
//! `decode → resolve identity → verify signature → check expiry` and reports an
//! outcome together with what should happen to the cookie. Every failure is an
//! ordinary outcome; nothing here returns an error or panics on untrusted input.

use std::fmt;

use super::codec::{self, DecodeError, DecodedToken};
use super::config::RememberMeConfig;
use super::expiration::{self, ExpiryVerdict};
use super::signature::{self, SecretDeriver};
use crate::identity::{IdentityRecord, IdentityResolver, ResolveError};

/// Result of a single validation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted(String),
    RejectedNotFound,
    RejectedBadSignature,
    RejectedExpired,
    RejectedExpiryTooFar,
    RejectedFeatureDisabled,
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// The identity to establish for the request
    ///
    /// This is the only view of an outcome that may reach the client: every
    /// rejection collapses to `None`, so "unknown user" and "bad signature" look
    /// the same from outside.
    #[must_use]
    pub fn authenticated_identity(&self) -> Option<&str> {
        match self {
            Self::Accepted(identity_id) => Some(identity_id),
            _ => None,
        }
    }
}

/// What to do with the remember-me cookie after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieAction {
    /// Token accepted; leave the cookie in place
    Keep,
    /// Token is dead; tell the browser to drop it
    Delete,
    /// Token was not examined; leave it untouched
    Ignore,
}

/// Why a token was rejected, kept for logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    FeatureDisabled,
    Malformed(DecodeError),
    IdentityUnresolvable {
        identity_id: String,
        cause: ResolveError,
    },
    SignatureMismatch {
        identity_id: String,
    },
    Expired {
        identity_id: String,
        expiry_ms: i64,
    },
    ExpiryTooFar {
        identity_id: String,
        expiry_ms: i64,
    },
}

impl Rejection {
    /// Outcome reported for this rejection; malformed tokens count as bad signatures
    #[must_use]
    pub fn outcome(&self) -> ValidationOutcome {
        match self {
            Self::FeatureDisabled => ValidationOutcome::RejectedFeatureDisabled,
            Self::Malformed(_) | Self::SignatureMismatch { .. } => {
                ValidationOutcome::RejectedBadSignature
            }
            Self::IdentityUnresolvable { .. } => ValidationOutcome::RejectedNotFound,
            Self::Expired { .. } => ValidationOutcome::RejectedExpired,
            Self::ExpiryTooFar { .. } => ValidationOutcome::RejectedExpiryTooFar,
        }
    }

    /// Cookie action for this rejection
    ///
    /// A disabled feature leaves the cookie alone so it works again once the
    /// feature is switched back on; everything else deletes it.
    #[must_use]
    pub fn cookie_action(&self) -> CookieAction {
        match self {
            Self::FeatureDisabled => CookieAction::Ignore,
            _ => CookieAction::Delete,
        }
    }

    pub(crate) fn log(&self) {
        match self {
            Self::FeatureDisabled => {
                log::debug!("Remember-me is disabled, ignoring remember-me cookie");
            }
            Self::Malformed(e) => log::debug!("Rejecting remember-me cookie: {e}"),
            Self::IdentityUnresolvable {
                identity_id,
                cause: cause @ ResolveError::NotFound(_),
            } => log::debug!(
                "Remember-me cookie contained username '{identity_id}' but was not found: {cause}"
            ),
            Self::IdentityUnresolvable {
                identity_id,
                cause: cause @ ResolveError::Store(_),
            } => log::warn!(
                "Remember-me cookie contained username '{identity_id}' but was not found: {cause}"
            ),
            Self::SignatureMismatch { identity_id } => log::warn!(
                "Remember-me cookie for '{identity_id}' has an invalid signature"
            ),
            Self::Expired {
                identity_id,
                expiry_ms,
            } => log::debug!(
                "Remember-me cookie for '{identity_id}' expired at {expiry_ms}"
            ),
            Self::ExpiryTooFar {
                identity_id,
                expiry_ms,
            } => log::warn!(
                "Remember-me cookie for '{identity_id}' claims expiry {expiry_ms}, beyond the configured validity window"
            ),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeatureDisabled => write!(f, "feature disabled"),
            Self::Malformed(e) => write!(f, "{e}"),
            Self::IdentityUnresolvable { identity_id, cause } => {
                write!(f, "identity '{identity_id}' unresolvable: {cause}")
            }
            Self::SignatureMismatch { identity_id } => {
                write!(f, "signature mismatch for '{identity_id}'")
            }
            Self::Expired { identity_id, .. } => write!(f, "token for '{identity_id}' expired"),
            Self::ExpiryTooFar { identity_id, .. } => {
                write!(f, "token for '{identity_id}' expires too far in the future")
            }
        }
    }
}

/// Outcome of [`TokenValidator::evaluate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub outcome: ValidationOutcome,
    pub cookie_action: CookieAction,
    /// Present only when the token was accepted
    pub record: Option<IdentityRecord>,
}

/// Validates remember-me cookie values against the identity store
pub struct TokenValidator<'a> {
    resolver: &'a dyn IdentityResolver,
    deriver: &'a SecretDeriver,
}

impl<'a> TokenValidator<'a> {
    #[must_use]
    pub fn new(resolver: &'a dyn IdentityResolver, deriver: &'a SecretDeriver) -> Self {
        Self { resolver, deriver }
    }

    /// Validate a cookie value at time `now_ms` under `config`
    ///
    /// `config` is a snapshot taken by the caller; it is never re-read while the
    /// validation runs.
    #[must_use]
    pub fn validate(
        &self,
        cookie_value: &str,
        now_ms: i64,
        config: &RememberMeConfig,
    ) -> (ValidationOutcome, CookieAction) {
        let validation = self.evaluate(cookie_value, now_ms, config);
        (validation.outcome, validation.cookie_action)
    }

    /// [`validate`](Self::validate), keeping the resolved record of an accepted token
    #[must_use]
    pub fn evaluate(
        &self,
        cookie_value: &str,
        now_ms: i64,
        config: &RememberMeConfig,
    ) -> Validation {
        match self.check(cookie_value, now_ms, config) {
            Ok(record) => {
                log::debug!("Remember-me cookie accepted for '{}'", record.identity_id);
                Validation {
                    outcome: ValidationOutcome::Accepted(record.identity_id.clone()),
                    cookie_action: CookieAction::Keep,
                    record: Some(record),
                }
            }
            Err(rejection) => {
                rejection.log();
                Validation {
                    outcome: rejection.outcome(),
                    cookie_action: rejection.cookie_action(),
                    record: None,
                }
            }
        }
    }

    /// Same as [`validate`](Self::validate) but exposes the detailed rejection
    ///
    /// # Errors
    ///
    /// Returns the reason the token was rejected.
    pub fn check(
        &self,
        cookie_value: &str,
        now_ms: i64,
        config: &RememberMeConfig,
    ) -> Result<IdentityRecord, Rejection> {
        if !config.enabled {
            return Err(Rejection::FeatureDisabled);
        }

        let token = codec::decode(cookie_value).map_err(Rejection::Malformed)?;
        let record = self.resolve(&token)?;

        let secret = self.deriver.derive(
            &record.credential_hash,
            config.user_seed_enabled.then_some(record.seed.as_str()),
        );
        if !signature::verify(&token.identity_id, token.expiry_ms, &token.signature, &secret) {
            return Err(Rejection::SignatureMismatch {
                identity_id: token.identity_id,
            });
        }

        match expiration::check(
            token.expiry_ms,
            now_ms,
            config.max_validity_ms(),
            config.skip_future_expiry_check,
        ) {
            ExpiryVerdict::Valid => Ok(record),
            ExpiryVerdict::Expired => Err(Rejection::Expired {
                identity_id: token.identity_id,
                expiry_ms: token.expiry_ms,
            }),
            ExpiryVerdict::TooFarInFuture => Err(Rejection::ExpiryTooFar {
                identity_id: token.identity_id,
                expiry_ms: token.expiry_ms,
            }),
        }
    }

    fn resolve(&self, token: &DecodedToken) -> Result<IdentityRecord, Rejection> {
        let record = self
            .resolver
            .resolve(&token.identity_id)
            .map_err(|cause| Rejection::IdentityUnresolvable {
                identity_id: token.identity_id.clone(),
                cause,
            })?;

        // A resolver must never hand back a different account than the one named
        if record.identity_id == token.identity_id {
            Ok(record)
        } else {
            Err(Rejection::IdentityUnresolvable {
                identity_id: token.identity_id.clone(),
                cause: ResolveError::Store(format!(
                    "resolver returned identity '{}'",
                    record.identity_id
                )),
            })
        }
    }
}
