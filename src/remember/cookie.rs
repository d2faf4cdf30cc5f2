use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::HttpRequest;

use crate::token::IssuedToken;

/// Default name of the remember-me cookie
pub const DEFAULT_COOKIE_NAME: &str = "remember-me";

/// Options for cookie creation
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age: time::Duration,
}

impl CookieOptions {
    /// HTTP-only, `SameSite=Lax` options; callers always choose the lifetime
    #[must_use]
    pub fn new(secure: bool, path: &str, max_age: time::Duration) -> Self {
        Self {
            http_only: true,
            secure,
            same_site: SameSite::Lax,
            path: path.to_string(),
            max_age,
        }
    }
}

/// Builds the remember-me cookie and its deletion counterpart
///
/// Cookies are host-only (no `Domain`), HTTP-only and scoped to the application
/// root. `Secure` follows the transport of the request being answered.
#[derive(Debug, Clone)]
pub struct RememberMeCookieFactory {
    cookie_name: String,
    path: String,
}

impl Default for RememberMeCookieFactory {
    fn default() -> Self {
        Self::new(DEFAULT_COOKIE_NAME, "/")
    }
}

impl RememberMeCookieFactory {
    #[must_use]
    pub fn new(cookie_name: &str, path: &str) -> Self {
        Self {
            cookie_name: cookie_name.to_string(),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
        }
    }

    #[must_use]
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    fn build(&self, value: String, options: CookieOptions) -> Cookie<'static> {
        Cookie::build(self.cookie_name.clone(), value)
            .http_only(options.http_only)
            .secure(options.secure)
            .same_site(options.same_site)
            .path(options.path)
            .max_age(options.max_age)
            .finish()
    }

    /// Cookie carrying a freshly issued token; `Max-Age` equals the validity window
    #[must_use]
    pub fn create_cookie(&self, token: &IssuedToken, secure: bool) -> Cookie<'static> {
        self.build(
            token.cookie_value.clone(),
            CookieOptions::new(
                secure,
                &self.path,
                time::Duration::seconds(token.max_age.num_seconds()),
            ),
        )
    }

    /// Expired cookie that makes the browser drop the remember-me cookie
    #[must_use]
    pub fn create_expired_cookie(&self, secure: bool) -> Cookie<'static> {
        self.build(
            String::new(),
            CookieOptions::new(secure, &self.path, time::Duration::seconds(-1)),
        )
    }

    /// Value of the remember-me cookie on `req`, if present and non-empty
    #[must_use]
    pub fn extract_cookie_value(&self, req: &HttpRequest) -> Option<String> {
        req.cookie(&self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }
}
