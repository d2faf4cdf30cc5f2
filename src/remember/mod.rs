//! Remember-me integration layer
//!
//! - [`service`] - Facade used by the HTTP handlers
//! - [`cookie`] - Remember-me cookie construction
//! - [`runtime`] - Runtime-mutable configuration with snapshot reads

pub mod cookie;
pub mod runtime;
pub mod service;

pub use cookie::{RememberMeCookieFactory, DEFAULT_COOKIE_NAME};
pub use runtime::RuntimeConfig;
pub use service::{AutoLogin, RememberMeService};
