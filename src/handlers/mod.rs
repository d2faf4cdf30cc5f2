// HTTP request handlers for the remember-me demo server
pub mod admin;
pub mod auth;
pub mod error;

use actix_web::{web, HttpResponse};
use serde::Serialize;

pub use admin::{remember_me_status, rotate_seed, update_remember_me_flags};
pub use auth::{is_secure_request, login, logout, who_am_i};
pub use error::AppError;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

/// Health check handler
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        message: "Remember-me service is running",
    })
}

/// Register all routes under `context_path`
///
/// The admin routes are only mounted when `admin_enabled` is set.
pub fn configure_services(cfg: &mut web::ServiceConfig, context_path: &str, admin_enabled: bool) {
    let prefix = context_path.trim_end_matches('/');

    let mut scope = web::scope(prefix)
        .route("/login", web::post().to(login))
        .route("/whoAmI", web::get().to(who_am_i))
        .route("/logout", web::post().to(logout))
        .route("/ping", web::get().to(health));

    if admin_enabled {
        scope = scope
            .route("/admin/remember-me", web::get().to(remember_me_status))
            .route("/admin/remember-me", web::post().to(update_remember_me_flags))
            .route(
                "/admin/users/{identity_id}/seed/rotate",
                web::post().to(rotate_seed),
            );
    }

    cfg.service(scope);
}
