use std::sync::{Arc, PoisonError, RwLock};

use crate::token::RememberMeConfig;

/// Process-wide remember-me configuration, mutable at runtime
///
/// Request handling only ever sees a copied [`RememberMeConfig`] snapshot, so a
/// concurrent administrative change can never be observed half-applied. The
/// lock is held just long enough to copy the value.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    inner: Arc<RwLock<RememberMeConfig>>,
}

impl RuntimeConfig {
    #[must_use]
    pub fn new(config: RememberMeConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Consistent copy of the current configuration
    #[must_use]
    pub fn snapshot(&self) -> RememberMeConfig {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` atomically and return the resulting configuration
    pub fn update(&self, change: impl FnOnce(&mut RememberMeConfig)) -> RememberMeConfig {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut guard);
        *guard
    }

    pub fn set_enabled(&self, enabled: bool) -> RememberMeConfig {
        log::info!("Remember-me {}", if enabled { "enabled" } else { "disabled" });
        self.update(|config| config.enabled = enabled)
    }

    pub fn set_skip_future_expiry_check(&self, skip: bool) -> RememberMeConfig {
        if skip {
            log::warn!(
                "Remember-me future-expiry check disabled; tokens with forged long expiries will be accepted"
            );
        } else {
            log::info!("Remember-me future-expiry check enabled");
        }
        self.update(|config| config.skip_future_expiry_check = skip)
    }
}
