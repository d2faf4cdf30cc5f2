//! Mock identity resolvers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::identity::{IdentityRecord, IdentityResolver, ResolveError};

/// Resolver that never finds anyone
#[derive(Debug, Clone)]
pub struct FailingResolver {
    error: ResolveError,
}

impl FailingResolver {
    /// Every lookup reports an unknown identity
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            error: ResolveError::NotFound(String::new()),
        }
    }

    /// Every lookup reports that the store cannot tell whether the identity exists
    #[must_use]
    pub fn undecided() -> Self {
        Self {
            error: ResolveError::Store("user may or may not exist".to_string()),
        }
    }
}

impl IdentityResolver for FailingResolver {
    fn resolve(&self, identity_id: &str) -> Result<IdentityRecord, ResolveError> {
        Err(match &self.error {
            ResolveError::NotFound(_) => ResolveError::NotFound(identity_id.to_string()),
            store @ ResolveError::Store(_) => store.clone(),
        })
    }
}

/// Wraps a resolver and counts lookups
pub struct CountingResolver {
    inner: Arc<dyn IdentityResolver>,
    calls: AtomicUsize,
}

impl CountingResolver {
    #[must_use]
    pub fn new(inner: Arc<dyn IdentityResolver>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `resolve` calls so far
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentityResolver for CountingResolver {
    fn resolve(&self, identity_id: &str) -> Result<IdentityRecord, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(identity_id)
    }
}
