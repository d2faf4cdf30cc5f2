//! Test fixtures providing pre-built test objects

use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::web;

use super::constants::{OTHER_PASSWORD, OTHER_USER, TEST_APP_KEY, TEST_PASSWORD, TEST_USER};
use crate::handlers::configure_services;
use crate::identity::{IdentityRecord, IdentityResolver, InMemoryIdentityStore};
use crate::remember::{RememberMeCookieFactory, RememberMeService};
use crate::settings::RememberMeSettings;
use crate::token::{codec, derive_secret, signature, RememberMeConfig};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Store holding the two standard test accounts
    ///
    /// # Panics
    ///
    /// Panics if the accounts cannot be created.
    #[must_use]
    pub fn identity_store() -> Arc<InMemoryIdentityStore> {
        let store = Arc::new(InMemoryIdentityStore::new());
        store.create_account(TEST_USER, TEST_PASSWORD).unwrap();
        store.create_account(OTHER_USER, OTHER_PASSWORD).unwrap();
        store
    }

    /// Settings for tests: fixed secret key, admin routes on, plain-HTTP cookies
    #[must_use]
    pub fn settings() -> RememberMeSettings {
        let mut settings = RememberMeSettings::default();
        settings.remember_me.secret_key = TEST_APP_KEY.to_string();
        settings.application.admin_enabled = true;
        settings
    }

    /// Service over `resolver` with the given configuration
    #[must_use]
    pub fn service(
        resolver: Arc<dyn IdentityResolver>,
        config: RememberMeConfig,
    ) -> RememberMeService {
        RememberMeService::new(
            resolver,
            TEST_APP_KEY.as_bytes(),
            RememberMeCookieFactory::default(),
            config,
        )
    }

    /// Full context with default settings
    #[must_use]
    pub fn context() -> TestContext {
        Self::context_with(Self::settings())
    }

    /// Full context built from `settings`
    ///
    /// # Panics
    ///
    /// Panics if `settings` are invalid.
    #[must_use]
    pub fn context_with(settings: RememberMeSettings) -> TestContext {
        let store = Self::identity_store();
        let service = RememberMeService::from_settings(store.clone(), &settings).unwrap();
        TestContext {
            store,
            service,
            settings,
        }
    }

    /// Hand-craft a cookie value for `record`
    ///
    /// The expiry is `now_ms + validity_ms + delta_ms`, which lets tests push it
    /// past the validity window or into the past while keeping a valid signature.
    ///
    /// # Panics
    ///
    /// Panics if the identity cannot be encoded.
    #[must_use]
    pub fn crafted_token(
        record: &IdentityRecord,
        with_seed: bool,
        now_ms: i64,
        validity_ms: i64,
        delta_ms: i64,
    ) -> String {
        let expiry_ms = now_ms + validity_ms + delta_ms;
        let secret = derive_secret(
            TEST_APP_KEY.as_bytes(),
            &record.credential_hash,
            with_seed.then_some(record.seed.as_str()),
        );
        let sig = signature::sign(&record.identity_id, expiry_ms, &secret);
        codec::encode(&record.identity_id, expiry_ms, &sig).unwrap()
    }
}

/// Store, service and settings wired together the way the server wires them
pub struct TestContext {
    pub store: Arc<InMemoryIdentityStore>,
    pub service: RememberMeService,
    pub settings: RememberMeSettings,
}

impl TestContext {
    /// Current record of an account
    ///
    /// # Panics
    ///
    /// Panics if the account does not exist.
    #[must_use]
    pub fn record(&self, identity_id: &str) -> IdentityRecord {
        self.store.resolve(identity_id).unwrap()
    }

    /// Register app data and routes, for use with `App::configure`
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.settings.clone()))
            .app_data(web::Data::from(self.store.clone()))
            .app_data(web::Data::new(self.service.clone()));
        configure_services(
            cfg,
            &self.settings.context_path(),
            self.settings.application.admin_enabled,
        );
    }
}

/// Cookie named `name` set by `resp`, if any
#[must_use]
pub fn response_cookie<B>(resp: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == name)
        .map(Cookie::into_owned)
}
