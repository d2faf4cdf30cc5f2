//! Expiration policy for the expiry a token claims about itself

/// Verdict on a token's claimed expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryVerdict {
    Valid,
    Expired,
    /// The claimed expiry lies further ahead than any token this server issues
    TooFarInFuture,
}

/// Check `expiry_ms` against the validity window `[now_ms, now_ms + max_validity_ms]`
///
/// Both bounds are inclusive. A token claiming an expiry beyond the window cannot
/// have been issued by this server with the current configuration, so it is
/// treated as forged even when its signature verifies.
///
/// Passing `skip_future_check = true` disables the upper bound entirely. That
/// weakens the guarantee: anyone able to produce a valid signature can then mint
/// an arbitrarily long-lived token. Only meant for diagnostics and tests.
#[must_use]
pub fn check(
    expiry_ms: i64,
    now_ms: i64,
    max_validity_ms: i64,
    skip_future_check: bool,
) -> ExpiryVerdict {
    if expiry_ms < now_ms {
        return ExpiryVerdict::Expired;
    }

    if !skip_future_check && expiry_ms > now_ms.saturating_add(max_validity_ms) {
        return ExpiryVerdict::TooFarInFuture;
    }

    ExpiryVerdict::Valid
}
