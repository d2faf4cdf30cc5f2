use chrono::Duration;

/// Default validity window of an issued token (14 days)
pub const DEFAULT_TOKEN_VALIDITY_DAYS: i64 = 14;

/// Policy knobs consulted by the issuer and the validator
///
/// This is a plain value. The process-wide, runtime-mutable copy lives in
/// [`crate::remember::RuntimeConfig`]; each request works on its own snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RememberMeConfig {
    /// Master switch for reading and issuing remember-me tokens
    pub enabled: bool,
    /// How long an issued token stays valid
    pub token_validity: Duration,
    /// Disable the "expiry too far in the future" guard (diagnostics only)
    pub skip_future_expiry_check: bool,
    /// Mix the per-identity seed into the signing secret
    pub user_seed_enabled: bool,
    /// Reissue the token with a fresh expiry whenever it is accepted
    pub refresh_on_accept: bool,
}

impl Default for RememberMeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token_validity: Duration::days(DEFAULT_TOKEN_VALIDITY_DAYS),
            skip_future_expiry_check: false,
            user_seed_enabled: true,
            refresh_on_accept: false,
        }
    }
}

impl RememberMeConfig {
    /// Validity window in milliseconds
    #[must_use]
    pub fn max_validity_ms(&self) -> i64 {
        self.token_validity.num_milliseconds()
    }
}
