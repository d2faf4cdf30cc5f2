//! Identity collaborators
//!
//! The remember-me subsystem never owns accounts. It re-resolves the identity
//! named in a token through an [`IdentityResolver`] and reads the credential
//! hash and seed needed to rebuild the signing secret. Seed rotation goes
//! through a [`SeedStore`].
//!
//! - [`memory`] - In-memory account store implementing both traits

pub mod memory;

use std::fmt;

use thiserror::Error;

use crate::utils::crypto::generate_nonce;

pub use memory::InMemoryIdentityStore;

/// Number of random bytes in a freshly generated seed
pub const SEED_BYTES: usize = 16;

/// Opaque per-identity value mixed into the signing secret
///
/// Rotating it invalidates every token issued before the rotation.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed(String);

impl Seed {
    /// Generate a new random seed
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_nonce(SEED_BYTES))
    }

    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

/// What the resolver knows about a live account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    /// Stable identifier carried in tokens
    pub identity_id: String,
    /// Human-facing name, never used for signing
    pub display_name: String,
    /// Current credential hash; changes whenever the password changes
    pub credential_hash: String,
    /// Current seed
    pub seed: Seed,
}

/// Failure to resolve an identity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("identity '{0}' not found")]
    NotFound(String),
    /// The store could not answer; the message is for logs only
    #[error("identity store failure: {0}")]
    Store(String),
}

/// Failure to read or rotate a seed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    #[error("identity '{0}' not found")]
    NotFound(String),
    #[error("seed store failure: {0}")]
    Store(String),
}

/// Re-resolves an identity id into its current credential state
///
/// Implementations may block on an external store. Callers must not hold locks
/// across `resolve`.
pub trait IdentityResolver: Send + Sync {
    /// Look up the identity named in a token
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NotFound` if no such identity exists, or
    /// `ResolveError::Store` if the store itself failed.
    fn resolve(&self, identity_id: &str) -> Result<IdentityRecord, ResolveError>;
}

/// Reads and rotates per-identity seeds
pub trait SeedStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the identity is unknown or the store failed.
    fn current_seed(&self, identity_id: &str) -> Result<Seed, SeedError>;

    /// Replace the identity's seed with a fresh one and return it
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is unknown or the store failed.
    fn rotate_seed(&self, identity_id: &str) -> Result<Seed, SeedError>;
}
