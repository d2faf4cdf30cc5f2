// Authentication handlers: login, whoAmI and logout
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use super::error::AppError;
use crate::identity::InMemoryIdentityStore;
use crate::remember::RememberMeService;
use crate::settings::RememberMeSettings;

/// Name reported by `whoAmI` when no identity is established
pub const ANONYMOUS_NAME: &str = "anonymous";

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Checkbox value; see [`remember_me_requested`]
    pub remember_me: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhoAmIResponse {
    pub name: String,
    pub authenticated: bool,
}

impl WhoAmIResponse {
    fn authenticated(name: &str) -> Self {
        Self {
            name: name.to_string(),
            authenticated: true,
        }
    }

    fn anonymous() -> Self {
        Self {
            name: ANONYMOUS_NAME.to_string(),
            authenticated: false,
        }
    }
}

/// Whether a form value asks to be remembered (`true`, `on`, `yes` or `1`)
#[must_use]
pub fn remember_me_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        ["true", "on", "yes", "1"]
            .iter()
            .any(|accepted| v.eq_ignore_ascii_case(accepted))
    })
}

/// Whether cookies set on this response should carry `Secure`
#[must_use]
pub fn is_secure_request(req: &HttpRequest, settings: &RememberMeSettings) -> bool {
    settings.cookies.force_secure || req.connection_info().scheme() == "https"
}

/// Primary login with optional remember-me
///
/// # Errors
///
/// Returns `AppError::InvalidCredentials` for a bad username/password pair, or an
/// internal error if the token cannot be issued.
pub async fn login(
    req: HttpRequest,
    form: web::Form<LoginForm>,
    store: web::Data<InMemoryIdentityStore>,
    service: web::Data<RememberMeService>,
    settings: web::Data<RememberMeSettings>,
) -> Result<HttpResponse, AppError> {
    let LoginForm {
        username,
        password,
        remember_me,
    } = form.into_inner();
    let remember = remember_me_requested(remember_me.as_deref());

    let record = web::block(move || store.authenticate(&username, &password))
        .await?
        .ok_or(AppError::InvalidCredentials)?;
    log::info!("Primary login succeeded for '{}'", record.identity_id);

    let secure = is_secure_request(&req, &settings);
    let mut response = HttpResponse::Ok();
    if let Some(cookie) = service.login_success(&record, remember, secure)? {
        response.cookie(cookie);
    }

    Ok(response.json(WhoAmIResponse::authenticated(&record.identity_id)))
}

/// Report the identity established for this request
///
/// There is no server-side session: the remember-me cookie is the only way a
/// request can become authenticated here.
///
/// # Errors
///
/// Returns an internal error if the blocking validation task fails.
pub async fn who_am_i(
    req: HttpRequest,
    service: web::Data<RememberMeService>,
    settings: web::Data<RememberMeSettings>,
) -> Result<HttpResponse, AppError> {
    let Some(cookie_value) = service.cookie_factory().extract_cookie_value(&req) else {
        return Ok(HttpResponse::Ok().json(WhoAmIResponse::anonymous()));
    };

    let secure = is_secure_request(&req, &settings);
    let service = service.into_inner();
    let result = web::block(move || service.auto_login(&cookie_value, secure)).await?;

    let body = result
        .identity()
        .map_or_else(WhoAmIResponse::anonymous, WhoAmIResponse::authenticated);

    let mut response = HttpResponse::Ok();
    if let Some(cookie) = result.cookie {
        response.cookie(cookie);
    }
    Ok(response.json(body))
}

/// Drop the remember-me cookie
pub async fn logout(
    req: HttpRequest,
    service: web::Data<RememberMeService>,
    settings: web::Data<RememberMeSettings>,
) -> HttpResponse {
    let secure = is_secure_request(&req, &settings);
    HttpResponse::Ok()
        .cookie(service.logout(secure))
        .json(WhoAmIResponse::anonymous())
}
