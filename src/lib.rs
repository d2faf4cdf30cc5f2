#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the rememberme application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod handlers;
pub mod identity;
pub mod remember;
pub mod settings;
pub mod token;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use handlers::{configure_services, health, login, logout, who_am_i, AppError};
pub use identity::{IdentityRecord, IdentityResolver, InMemoryIdentityStore, Seed, SeedStore};
pub use remember::{AutoLogin, RememberMeService, RuntimeConfig};
pub use settings::RememberMeSettings;
pub use token::{CookieAction, RememberMeConfig, ValidationOutcome};
