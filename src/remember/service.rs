//! Remember-me service
//!
//! Single entry point the HTTP layer talks to. It owns the identity resolver,
//! the application key, the cookie factory and the runtime configuration, and
//! turns issuer and validator results into cookies.
//!
//! Every request takes one configuration snapshot up front, so a concurrent
//! administrative change applies to the next request, never half of this one.

use std::sync::Arc;

use actix_web::cookie::Cookie;
use chrono::Utc;

use super::cookie::RememberMeCookieFactory;
use super::runtime::RuntimeConfig;
use crate::identity::{IdentityRecord, IdentityResolver};
use crate::settings::{RememberMeSettings, SettingsError};
use crate::token::{
    CookieAction, IssueError, RememberMeConfig, SecretDeriver, TokenIssuer, TokenValidator,
    ValidationOutcome,
};

/// Result of an automatic login attempt
#[derive(Debug)]
pub struct AutoLogin {
    pub outcome: ValidationOutcome,
    pub cookie_action: CookieAction,
    /// Cookie to send back: a deletion cookie, a refreshed token, or nothing
    pub cookie: Option<Cookie<'static>>,
}

impl AutoLogin {
    /// Identity established for the request, if any
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.outcome.authenticated_identity()
    }
}

/// Remember-me facade over issuance, validation and cookie handling
#[derive(Clone)]
pub struct RememberMeService {
    resolver: Arc<dyn IdentityResolver>,
    deriver: SecretDeriver,
    cookies: RememberMeCookieFactory,
    runtime: RuntimeConfig,
}

impl std::fmt::Debug for RememberMeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RememberMeService")
            .field("deriver", &self.deriver)
            .field("cookies", &self.cookies)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl RememberMeService {
    #[must_use]
    pub fn new(
        resolver: Arc<dyn IdentityResolver>,
        app_key: &[u8],
        cookies: RememberMeCookieFactory,
        config: RememberMeConfig,
    ) -> Self {
        if config.skip_future_expiry_check {
            log::warn!("Remember-me future-expiry check is disabled by configuration");
        }

        Self {
            resolver,
            deriver: SecretDeriver::new(app_key),
            cookies,
            runtime: RuntimeConfig::new(config),
        }
    }

    /// Build the service from loaded settings
    ///
    /// # Errors
    ///
    /// Returns an error if the remember-me settings are invalid.
    pub fn from_settings(
        resolver: Arc<dyn IdentityResolver>,
        settings: &RememberMeSettings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let cookies =
            RememberMeCookieFactory::new(&settings.remember_me.cookie_name, &settings.context_path());

        Ok(Self::new(
            resolver,
            settings.remember_me.secret_key.as_bytes(),
            cookies,
            settings.remember_me_config()?,
        ))
    }

    /// Called after a successful primary login
    ///
    /// Returns the cookie to set, or `None` when the user did not ask to be
    /// remembered or the feature is off.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be carried in a token.
    pub fn login_success(
        &self,
        record: &IdentityRecord,
        remember_requested: bool,
        secure: bool,
    ) -> Result<Option<Cookie<'static>>, IssueError> {
        self.login_success_at(record, remember_requested, secure, now_ms())
    }

    /// [`login_success`](Self::login_success) at an explicit time
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be carried in a token.
    pub fn login_success_at(
        &self,
        record: &IdentityRecord,
        remember_requested: bool,
        secure: bool,
        now_ms: i64,
    ) -> Result<Option<Cookie<'static>>, IssueError> {
        let config = self.runtime.snapshot();
        if !remember_requested {
            return Ok(None);
        }
        if !config.enabled {
            log::debug!("Remember-me is disabled, not issuing a cookie");
            return Ok(None);
        }

        self.issue_cookie(record, &config, now_ms, secure).map(Some)
    }

    /// Try to authenticate a request from its remember-me cookie value
    #[must_use]
    pub fn auto_login(&self, cookie_value: &str, secure: bool) -> AutoLogin {
        self.auto_login_at(cookie_value, now_ms(), secure)
    }

    /// [`auto_login`](Self::auto_login) at an explicit time
    #[must_use]
    pub fn auto_login_at(&self, cookie_value: &str, now_ms: i64, secure: bool) -> AutoLogin {
        let config = self.runtime.snapshot();
        let validator = TokenValidator::new(self.resolver.as_ref(), &self.deriver);

        let validation = validator.evaluate(cookie_value, now_ms, &config);

        let cookie = match (&validation.record, validation.cookie_action) {
            (Some(record), _) => {
                log::info!("Remember-me auto-login for '{}'", record.identity_id);
                if config.refresh_on_accept {
                    self.issue_cookie(record, &config, now_ms, secure)
                        .map_err(|e| {
                            log::warn!(
                                "Could not refresh remember-me cookie for '{}': {e}",
                                record.identity_id
                            );
                        })
                        .ok()
                } else {
                    None
                }
            }
            (None, CookieAction::Delete) => Some(self.cookies.create_expired_cookie(secure)),
            (None, _) => None,
        };

        AutoLogin {
            outcome: validation.outcome,
            cookie_action: validation.cookie_action,
            cookie,
        }
    }

    /// Deletion cookie for an explicit logout
    #[must_use]
    pub fn logout(&self, secure: bool) -> Cookie<'static> {
        self.cookies.create_expired_cookie(secure)
    }

    fn issue_cookie(
        &self,
        record: &IdentityRecord,
        config: &RememberMeConfig,
        now_ms: i64,
        secure: bool,
    ) -> Result<Cookie<'static>, IssueError> {
        let issued = TokenIssuer::new(&self.deriver, config.user_seed_enabled).issue(
            record,
            now_ms,
            config.max_validity_ms(),
        )?;
        Ok(self.cookies.create_cookie(&issued, secure))
    }

    /// Current configuration snapshot
    #[must_use]
    pub fn config(&self) -> RememberMeConfig {
        self.runtime.snapshot()
    }

    pub fn set_enabled(&self, enabled: bool) -> RememberMeConfig {
        self.runtime.set_enabled(enabled)
    }

    pub fn set_skip_future_check(&self, skip: bool) -> RememberMeConfig {
        self.runtime.set_skip_future_expiry_check(skip)
    }

    /// Shared handle to the runtime configuration
    #[must_use]
    pub fn runtime(&self) -> &RuntimeConfig {
        &self.runtime
    }

    #[must_use]
    pub fn cookie_factory(&self) -> &RememberMeCookieFactory {
        &self.cookies
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InMemoryIdentityStore;

    const NOW: i64 = 1_700_000_000_000;

    fn service_with(config: RememberMeConfig) -> (Arc<InMemoryIdentityStore>, RememberMeService) {
        let store = Arc::new(InMemoryIdentityStore::new());
        store.create_account("alice", "password").unwrap();
        let service = RememberMeService::new(
            store.clone(),
            b"service-test-key",
            RememberMeCookieFactory::default(),
            config,
        );
        (store, service)
    }

    fn alice(store: &InMemoryIdentityStore) -> IdentityRecord {
        store.authenticate("alice", "password").unwrap()
    }

    #[test]
    fn test_login_without_remember_me_sets_no_cookie() {
        let (store, service) = service_with(RememberMeConfig::default());
        assert!(service
            .login_success_at(&alice(&store), false, true, NOW)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_login_while_disabled_sets_no_cookie() {
        let (store, service) = service_with(RememberMeConfig::default());
        service.set_enabled(false);

        assert!(service
            .login_success_at(&alice(&store), true, true, NOW)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_issued_cookie_logs_in_later() {
        let (store, service) = service_with(RememberMeConfig::default());
        let cookie = service
            .login_success_at(&alice(&store), true, true, NOW)
            .unwrap()
            .unwrap();

        let result = service.auto_login_at(cookie.value(), NOW + 60_000, true);

        assert_eq!(result.identity(), Some("alice"));
        assert_eq!(result.cookie_action, CookieAction::Keep);
        assert!(result.cookie.is_none());
    }

    #[test]
    fn test_rejected_cookie_is_deleted() {
        let (_, service) = service_with(RememberMeConfig::default());
        let result = service.auto_login_at("bm9wZQ==", NOW, false);

        assert_eq!(result.identity(), None);
        assert_eq!(result.cookie_action, CookieAction::Delete);
        let cookie = result.cookie.unwrap();
        assert_eq!(cookie.value(), "");
        assert!(cookie.max_age().unwrap().is_negative());
    }

    #[test]
    fn test_disabled_feature_leaves_cookie_alone() {
        let (store, service) = service_with(RememberMeConfig::default());
        let cookie = service
            .login_success_at(&alice(&store), true, true, NOW)
            .unwrap()
            .unwrap();

        service.set_enabled(false);
        let result = service.auto_login_at(cookie.value(), NOW, true);
        assert_eq!(result.outcome, ValidationOutcome::RejectedFeatureDisabled);
        assert_eq!(result.cookie_action, CookieAction::Ignore);
        assert!(result.cookie.is_none());

        service.set_enabled(true);
        assert!(service.auto_login_at(cookie.value(), NOW, true).outcome.is_accepted());
    }

    #[test]
    fn test_refresh_on_accept_reissues_cookie() {
        let (store, service) = service_with(RememberMeConfig {
            refresh_on_accept: true,
            ..RememberMeConfig::default()
        });
        let cookie = service
            .login_success_at(&alice(&store), true, true, NOW)
            .unwrap()
            .unwrap();

        let later = NOW + 24 * 60 * 60 * 1000;
        let result = service.auto_login_at(cookie.value(), later, true);
        let refreshed = result.cookie.unwrap();

        assert_eq!(result.cookie_action, CookieAction::Keep);
        assert_ne!(refreshed.value(), cookie.value());
        assert!(service.auto_login_at(refreshed.value(), later, true).outcome.is_accepted());
    }

    #[test]
    fn test_password_change_invalidates_cookie() {
        let (store, service) = service_with(RememberMeConfig::default());
        let cookie = service
            .login_success_at(&alice(&store), true, true, NOW)
            .unwrap()
            .unwrap();

        store.update_password("alice", "new-password").unwrap();

        let result = service.auto_login_at(cookie.value(), NOW, true);
        assert_eq!(result.outcome, ValidationOutcome::RejectedBadSignature);
        assert_eq!(result.cookie_action, CookieAction::Delete);
    }

    #[test]
    fn test_logout_cookie_expires_immediately() {
        let (_, service) = service_with(RememberMeConfig::default());
        let cookie = service.logout(true);

        assert_eq!(cookie.name(), "remember-me");
        assert!(cookie.max_age().unwrap().is_negative());
    }

    #[test]
    fn test_admin_setters_are_visible_through_clones() {
        let (_, service) = service_with(RememberMeConfig::default());
        let handle = service.clone();

        handle.set_skip_future_check(true);
        assert!(service.config().skip_future_expiry_check);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_validations_see_whole_snapshots() {
        let (store, service) = service_with(RememberMeConfig::default());
        let cookie = service
            .login_success_at(&alice(&store), true, true, NOW)
            .unwrap()
            .unwrap();
        let token = cookie.value().to_string();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let token = token.clone();
            tasks.push(tokio::task::spawn_blocking(move || {
                (0..200)
                    .map(|_| service.auto_login_at(&token, NOW, true))
                    .all(|result| match result.outcome {
                        ValidationOutcome::Accepted(_) => result.cookie_action == CookieAction::Keep,
                        ValidationOutcome::RejectedFeatureDisabled => {
                            result.cookie_action == CookieAction::Ignore
                        }
                        _ => false,
                    })
            }));
        }

        for i in 0..200 {
            service.set_enabled(i % 2 == 1);
            tokio::task::yield_now().await;
        }

        for task in tasks {
            assert!(task.await.unwrap());
        }
        assert!(service.config().enabled);
    }

    #[test]
    fn test_from_settings_uses_cookie_name_and_path() {
        let mut settings = RememberMeSettings::default();
        settings.remember_me.secret_key = "settings-key".to_string();
        settings.remember_me.cookie_name = "keep-me".to_string();
        settings.application.context_path = "/app/".to_string();

        let store: Arc<dyn IdentityResolver> = Arc::new(InMemoryIdentityStore::new());
        let service = RememberMeService::from_settings(store, &settings).unwrap();

        assert_eq!(service.cookie_factory().cookie_name(), "keep-me");
        assert_eq!(service.cookie_factory().path(), "/app");
    }
}
