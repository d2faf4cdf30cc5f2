use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use rememberme::identity::{IdentityResolver, SeedStore};
use rememberme::testing::constants::{ONE_DAY_MS, OTHER_USER, TEST_NOW_MS, TEST_USER};
use log::Level;
use rememberme::testing::{capture_logs, CountingResolver, FailingResolver, TestFixtures};
use rememberme::token::{CookieAction, RememberMeConfig, ValidationOutcome};

const VALIDITY_MS: i64 = 14 * ONE_DAY_MS;

fn issue(service: &rememberme::RememberMeService, record: &rememberme::IdentityRecord) -> String {
    service
        .login_success_at(record, true, true, TEST_NOW_MS)
        .unwrap()
        .expect("cookie should be issued")
        .value()
        .to_string()
}

#[test]
fn test_issued_token_round_trips_until_expiry() {
    let store = TestFixtures::identity_store();
    let service = TestFixtures::service(store.clone(), RememberMeConfig::default());
    let token = issue(&service, &store.resolve(TEST_USER).unwrap());

    for offset in [0, ONE_DAY_MS, VALIDITY_MS] {
        let result = service.auto_login_at(&token, TEST_NOW_MS + offset, true);
        assert_eq!(result.identity(), Some(TEST_USER), "offset {offset}");
        assert_eq!(result.cookie_action, CookieAction::Keep);
    }

    let result = service.auto_login_at(&token, TEST_NOW_MS + VALIDITY_MS + 1, true);
    assert_eq!(result.outcome, ValidationOutcome::RejectedExpired);
    assert_eq!(result.cookie_action, CookieAction::Delete);
}

#[test]
fn test_any_byte_flip_in_signature_is_rejected() {
    let store = TestFixtures::identity_store();
    let service = TestFixtures::service(store.clone(), RememberMeConfig::default());
    let token = issue(&service, &store.resolve(TEST_USER).unwrap());

    let raw = String::from_utf8(general_purpose::STANDARD.decode(&token).unwrap()).unwrap();
    let signature_start = raw.rfind(':').unwrap() + 1;

    for index in signature_start..raw.len() {
        let mut bytes = raw.clone().into_bytes();
        // Swap between two base64url characters so the field stays decodable
        bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
        let tampered = general_purpose::STANDARD.encode(&bytes);

        let result = service.auto_login_at(&tampered, TEST_NOW_MS, true);
        assert!(!result.outcome.is_accepted(), "flip at {index} accepted");
        assert_eq!(result.cookie_action, CookieAction::Delete);
    }
}

#[test]
fn test_token_cannot_be_replayed_for_another_identity() {
    let store = TestFixtures::identity_store();
    let service = TestFixtures::service(store.clone(), RememberMeConfig::default());
    let token = issue(&service, &store.resolve(TEST_USER).unwrap());

    let raw = String::from_utf8(general_purpose::STANDARD.decode(&token).unwrap()).unwrap();
    let swapped = raw.replacen(TEST_USER, OTHER_USER, 1);
    let forged = general_purpose::STANDARD.encode(swapped.as_bytes());

    let result = service.auto_login_at(&forged, TEST_NOW_MS, true);
    assert_eq!(result.outcome, ValidationOutcome::RejectedBadSignature);
}

#[test]
fn test_future_expiry_guard() {
    let store = TestFixtures::identity_store();
    let record = store.resolve(TEST_USER).unwrap();

    let at_limit = TestFixtures::crafted_token(&record, true, TEST_NOW_MS, VALIDITY_MS, 0);
    let beyond = TestFixtures::crafted_token(&record, true, TEST_NOW_MS, VALIDITY_MS, 1);

    let service = TestFixtures::service(store.clone(), RememberMeConfig::default());
    assert!(service.auto_login_at(&at_limit, TEST_NOW_MS, true).outcome.is_accepted());

    let result = service.auto_login_at(&beyond, TEST_NOW_MS, true);
    assert_eq!(result.outcome, ValidationOutcome::RejectedExpiryTooFar);
    assert_eq!(result.cookie_action, CookieAction::Delete);

    service.set_skip_future_check(true);
    assert!(service.auto_login_at(&beyond, TEST_NOW_MS, true).outcome.is_accepted());
}

#[test]
fn test_seed_rotation_invalidates_only_that_identity() {
    let store = TestFixtures::identity_store();
    let service = TestFixtures::service(store.clone(), RememberMeConfig::default());
    let alice = issue(&service, &store.resolve(TEST_USER).unwrap());
    let bob = issue(&service, &store.resolve(OTHER_USER).unwrap());

    store.rotate_seed(TEST_USER).unwrap();

    assert_eq!(
        service.auto_login_at(&alice, TEST_NOW_MS, true).outcome,
        ValidationOutcome::RejectedBadSignature
    );
    assert_eq!(
        service.auto_login_at(&bob, TEST_NOW_MS, true).identity(),
        Some(OTHER_USER)
    );
}

#[test]
fn test_application_key_participates_in_signature() {
    let store = TestFixtures::identity_store();
    let service = TestFixtures::service(store.clone(), RememberMeConfig::default());
    let token = issue(&service, &store.resolve(TEST_USER).unwrap());

    let other_installation = rememberme::RememberMeService::new(
        store.clone(),
        b"a-different-application-key",
        rememberme::remember::RememberMeCookieFactory::default(),
        RememberMeConfig::default(),
    );

    assert_eq!(
        other_installation.auto_login_at(&token, TEST_NOW_MS, true).outcome,
        ValidationOutcome::RejectedBadSignature
    );
}

#[test]
fn test_disabled_feature_does_not_touch_store() {
    let store = TestFixtures::identity_store();
    let counting = Arc::new(CountingResolver::new(store.clone()));
    let service = TestFixtures::service(counting.clone(), RememberMeConfig::default());
    let token = issue(&service, &store.resolve(TEST_USER).unwrap());

    service.set_enabled(false);
    let result = service.auto_login_at(&token, TEST_NOW_MS, true);

    assert_eq!(result.outcome, ValidationOutcome::RejectedFeatureDisabled);
    assert_eq!(result.cookie_action, CookieAction::Ignore);
    assert!(result.cookie.is_none());
    assert_eq!(counting.calls(), 0);

    service.set_enabled(true);
    assert!(service.auto_login_at(&token, TEST_NOW_MS, true).outcome.is_accepted());
    assert_eq!(counting.calls(), 1);
}

#[test]
fn test_malformed_tokens_never_reach_store() {
    let store = TestFixtures::identity_store();
    let counting = Arc::new(CountingResolver::new(store));
    let service = TestFixtures::service(counting.clone(), RememberMeConfig::default());

    for value in [
        "",
        "%%%",
        "YWxpY2U=",
        "YWxpY2U6MTI6ISE=",
        "YWxpY2U6c29vbjpBQUFB",
        "OjE6QUFBQQ==",
    ] {
        let result = service.auto_login_at(value, TEST_NOW_MS, true);
        assert_eq!(result.outcome, ValidationOutcome::RejectedBadSignature, "{value:?}");
        assert_eq!(result.cookie_action, CookieAction::Delete);
    }
    assert_eq!(counting.calls(), 0);
}

#[test]
fn test_unresolvable_identity_is_masked() {
    let store = TestFixtures::identity_store();
    let record = store.resolve(TEST_USER).unwrap();
    let token = TestFixtures::crafted_token(&record, true, TEST_NOW_MS, VALIDITY_MS, 0);

    for resolver in [FailingResolver::not_found(), FailingResolver::undecided()] {
        let service = TestFixtures::service(Arc::new(resolver), RememberMeConfig::default());
        let result = service.auto_login_at(&token, TEST_NOW_MS, true);

        assert_eq!(result.outcome, ValidationOutcome::RejectedNotFound);
        assert_eq!(result.identity(), None);
        assert_eq!(result.cookie_action, CookieAction::Delete);
        assert!(result.cookie.is_some());
    }
}

#[test]
fn test_unresolvable_identity_reason_is_logged() {
    let store = TestFixtures::identity_store();
    let record = store.resolve(TEST_USER).unwrap();
    let token = TestFixtures::crafted_token(&record, true, TEST_NOW_MS, VALIDITY_MS, 0);

    for (resolver, level, cause) in [
        (FailingResolver::not_found(), Level::Debug, "identity 'alice' not found"),
        (FailingResolver::undecided(), Level::Warn, "user may or may not exist"),
    ] {
        let service = TestFixtures::service(Arc::new(resolver), RememberMeConfig::default());
        let (result, logs) = capture_logs(|| service.auto_login_at(&token, TEST_NOW_MS, true));

        assert_eq!(result.outcome, ValidationOutcome::RejectedNotFound);
        let line = logs
            .iter()
            .find(|log| {
                log.message
                    .contains("contained username 'alice' but was not found")
            })
            .unwrap_or_else(|| panic!("no resolution failure logged: {logs:?}"));
        assert_eq!(line.level, level);
        assert!(line.message.contains(cause), "{}", line.message);
    }
}

#[test]
fn test_seed_kill_switch_keeps_tokens_across_rotation() {
    let store = TestFixtures::identity_store();
    let config = RememberMeConfig {
        user_seed_enabled: false,
        ..RememberMeConfig::default()
    };
    let service = TestFixtures::service(store.clone(), config);
    let token = issue(&service, &store.resolve(TEST_USER).unwrap());

    store.rotate_seed(TEST_USER).unwrap();

    assert_eq!(
        service.auto_login_at(&token, TEST_NOW_MS, true).identity(),
        Some(TEST_USER)
    );
}
