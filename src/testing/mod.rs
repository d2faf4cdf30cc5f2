//! Testing utilities shared by unit and integration tests
//!
//! - [`fixtures`] - Pre-built stores, services, settings and crafted tokens
//! - [`mock`] - Resolvers that fail or count their calls
//! - [`logs`] - Per-thread capture of `log` output
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rememberme::testing::{constants::TEST_USER, TestFixtures};
//!
//! let ctx = TestFixtures::context();
//! let record = ctx.record(TEST_USER);
//! assert_eq!(record.identity_id, TEST_USER);
//! ```

pub mod fixtures;
pub mod logs;
pub mod mock;

pub use fixtures::{response_cookie, TestContext, TestFixtures};
pub use logs::{capture_logs, CapturedLog};
pub use mock::{CountingResolver, FailingResolver};

/// Common test constants
pub mod constants {
    /// Default test account, password equal to the username
    pub const TEST_USER: &str = "alice";
    pub const TEST_PASSWORD: &str = "alice";

    /// Second account for cross-user checks
    pub const OTHER_USER: &str = "bob";
    pub const OTHER_PASSWORD: &str = "bob";

    /// Application key used by every fixture service
    pub const TEST_APP_KEY: &str = "test_remember_me_application_key";

    /// Fixed clock for deterministic tests: 2023-11-14T22:13:20Z
    pub const TEST_NOW_MS: i64 = 1_700_000_000_000;

    pub const ONE_DAY_MS: i64 = 24 * 60 * 60 * 1000;
}
