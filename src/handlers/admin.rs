// Administrative handlers: runtime remember-me flags and seed rotation
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::error::AppError;
use crate::identity::{InMemoryIdentityStore, SeedStore};
use crate::remember::RememberMeService;
use crate::token::RememberMeConfig;

#[derive(Debug, Default, Deserialize)]
pub struct RememberMeFlags {
    pub enabled: Option<bool>,
    pub skip_future_expiry_check: Option<bool>,
}

/// Externally visible view of the runtime configuration
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RememberMeStatus {
    pub enabled: bool,
    pub skip_future_expiry_check: bool,
    pub user_seed_enabled: bool,
    pub refresh_on_accept: bool,
    pub token_validity_seconds: i64,
}

impl From<RememberMeConfig> for RememberMeStatus {
    fn from(config: RememberMeConfig) -> Self {
        Self {
            enabled: config.enabled,
            skip_future_expiry_check: config.skip_future_expiry_check,
            user_seed_enabled: config.user_seed_enabled,
            refresh_on_accept: config.refresh_on_accept,
            token_validity_seconds: config.token_validity.num_seconds(),
        }
    }
}

/// Current remember-me configuration
pub async fn remember_me_status(service: web::Data<RememberMeService>) -> HttpResponse {
    HttpResponse::Ok().json(RememberMeStatus::from(service.config()))
}

/// Change the runtime flags; omitted fields keep their value
pub async fn update_remember_me_flags(
    service: web::Data<RememberMeService>,
    flags: web::Json<RememberMeFlags>,
) -> HttpResponse {
    if let Some(enabled) = flags.enabled {
        service.set_enabled(enabled);
    }
    if let Some(skip) = flags.skip_future_expiry_check {
        service.set_skip_future_check(skip);
    }

    HttpResponse::Ok().json(RememberMeStatus::from(service.config()))
}

/// Rotate an identity's seed, invalidating every remember-me token issued to it
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown identity.
pub async fn rotate_seed(
    path: web::Path<String>,
    store: web::Data<InMemoryIdentityStore>,
) -> Result<HttpResponse, AppError> {
    let identity_id = InMemoryIdentityStore::canonical_id(&path.into_inner());
    web::block(move || store.rotate_seed(&identity_id)).await??;

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_from_config() {
        let status = RememberMeStatus::from(RememberMeConfig {
            token_validity: Duration::hours(2),
            ..RememberMeConfig::default()
        });

        assert!(status.enabled);
        assert!(!status.skip_future_expiry_check);
        assert_eq!(status.token_validity_seconds, 7200);
    }

    #[test]
    fn test_flags_accept_partial_bodies() {
        let flags: RememberMeFlags = serde_json::from_str(r#"{"enabled": false}"#).unwrap();
        assert_eq!(flags.enabled, Some(false));
        assert_eq!(flags.skip_future_expiry_check, None);
    }
}
