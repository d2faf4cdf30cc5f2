use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::remember::DEFAULT_COOKIE_NAME;
use crate::token::RememberMeConfig;
use crate::utils::crypto::generate_secret_key;

/// Environment variable naming a directory whose `Settings.toml` overrides the local one
pub const SECRETS_DIR_ENV: &str = "REMEMBERME_SECRETS_DIR";

/// Default token validity: two weeks
pub const DEFAULT_TOKEN_VALIDITY_SECONDS: u64 = 14 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: basic_toml::Error,
    },
    #[error("failed to initialize logging: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RememberMeSettings {
    pub application: ApplicationSettings,
    pub remember_me: TokenSettings,
    pub cookies: CookieSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Path prefix for every route and for the cookie path
    pub context_path: String,
    /// Expose the unauthenticated `/admin` routes; only for trusted networks
    pub admin_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    pub enabled: bool,
    pub token_validity_seconds: u64,
    /// Accept tokens whose expiry lies beyond the validity window.
    /// Weakens forgery detection; leave off outside of migrations.
    pub skip_future_expiry_check: bool,
    pub cookie_name: String,
    /// Mix the per-user seed into token secrets
    pub user_seed_enabled: bool,
    /// Re-issue the cookie with a fresh expiry on every accepted auto-login
    pub refresh_on_accept: bool,
    /// Application key mixed into every token secret; generated if empty
    pub secret_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CookieSettings {
    /// Mark cookies `Secure` even for requests that arrived over plain HTTP
    pub force_secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            context_path: "/".to_string(),
            admin_enabled: false,
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            token_validity_seconds: DEFAULT_TOKEN_VALIDITY_SECONDS,
            skip_future_expiry_check: false,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            user_seed_enabled: true,
            refresh_on_accept: false,
            secret_key: String::new(), // Will be generated if empty
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Logger filtered by `level`, which takes `env_logger` directive syntax
    #[must_use]
    pub fn logger(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&self.level);
        builder
    }
}

impl RememberMeSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Logger initialization fails
    /// - A settings file cannot be read or parsed
    /// - The resulting settings are invalid
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_env_file(Path::new(".env"));

        let mut settings = Self::load_base_settings()?;
        Self::apply_logging_env_overrides(&mut settings.logging);
        settings.logging.logger().try_init()?;
        log::info!("Logging at level {:?}", settings.logging.level);

        Self::apply_env_overrides(&mut settings);
        settings.validate()?;

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    ///
    /// Priority, highest first:
    /// 1. Environment variables (applied separately)
    /// 2. `Settings.toml` in `REMEMBERME_SECRETS_DIR`
    /// 3. `Settings.toml` in the current directory
    /// 4. Defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or parsed.
    pub fn load_base_settings() -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        let local_path = PathBuf::from("Settings.toml");
        if local_path.exists() {
            settings = Self::from_file(&local_path)?;
            log::info!("Loaded base settings from {}", local_path.display());
        }

        if let Ok(secrets_dir) = std::env::var(SECRETS_DIR_ENV) {
            let secrets_path = Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                log::info!("Overriding settings from {}", secrets_path.display());
            } else {
                log::info!(
                    "{SECRETS_DIR_ENV} set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single settings file; missing keys take their defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        basic_toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_token_env_overrides(&mut settings.remember_me);
        Self::apply_cookie_env_overrides(&mut settings.cookies);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                app_settings.port = port;
            }
        }
        if let Ok(context_path) = std::env::var("CONTEXT_PATH") {
            app_settings.context_path = context_path;
        }
        Self::apply_bool_env_override("ADMIN_ENABLED", &mut app_settings.admin_enabled);
    }

    /// Apply environment overrides for remember-me settings
    pub fn apply_token_env_overrides(token_settings: &mut TokenSettings) {
        Self::apply_bool_env_override("REMEMBER_ME_ENABLED", &mut token_settings.enabled);
        Self::apply_numeric_env_override(
            "REMEMBER_ME_VALIDITY_SECONDS",
            &mut token_settings.token_validity_seconds,
        );
        Self::apply_bool_env_override(
            "REMEMBER_ME_SKIP_FUTURE_CHECK",
            &mut token_settings.skip_future_expiry_check,
        );
        Self::apply_bool_env_override(
            "REMEMBER_ME_USER_SEED_ENABLED",
            &mut token_settings.user_seed_enabled,
        );
        Self::apply_bool_env_override(
            "REMEMBER_ME_REFRESH_ON_ACCEPT",
            &mut token_settings.refresh_on_accept,
        );
        if let Ok(cookie_name) = std::env::var("REMEMBER_ME_COOKIE_NAME") {
            if !cookie_name.is_empty() {
                token_settings.cookie_name = cookie_name;
            }
        }

        Self::handle_secret_key_override(token_settings);
    }

    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value) = std::env::var(env_var) {
            match value.parse::<u64>() {
                Ok(value) => *target = value,
                Err(_) => log::warn!("Ignoring {env_var}={value:?}: not a number"),
            }
        }
    }

    fn apply_bool_env_override(env_var: &str, target: &mut bool) {
        if let Ok(value) = std::env::var(env_var) {
            match value.parse::<bool>() {
                Ok(value) => *target = value,
                Err(_) => log::warn!("Ignoring {env_var}={value:?}: expected true or false"),
            }
        }
    }

    /// Take the secret key from `REMEMBER_ME_SECRET`, or generate one if none is configured
    fn handle_secret_key_override(token_settings: &mut TokenSettings) {
        let env_secret_set = std::env::var("REMEMBER_ME_SECRET").is_ok_and(|secret| {
            if secret.is_empty() {
                false
            } else {
                token_settings.secret_key = secret;
                true
            }
        });

        if !env_secret_set && token_settings.secret_key.is_empty() {
            token_settings.secret_key = generate_secret_key();
            Self::warn_about_generated_secret();
        }
    }

    fn warn_about_generated_secret() {
        log::warn!("Using an auto-generated remember-me secret key");
        log::warn!(
            "Every remember-me cookie becomes invalid on restart; set REMEMBER_ME_SECRET \
             or remember_me.secret_key in Settings.toml"
        );
    }

    fn apply_cookie_env_overrides(cookie_settings: &mut CookieSettings) {
        Self::apply_bool_env_override("COOKIE_FORCE_SECURE", &mut cookie_settings.force_secure);
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Load environment variables from a `KEY=value` file, skipping comments
    fn load_env_file(path: &Path) {
        if let Ok(contents) = fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let key = key.trim();
                    if Self::is_valid_env_pair(key, value) {
                        std::env::set_var(key, value.trim());
                    }
                }
            }
        }
    }

    /// `set_var` panics on an empty key, `=` in the key or NUL anywhere
    fn is_valid_env_pair(key: &str, value: &str) -> bool {
        !key.is_empty() && !key.contains('=') && !key.contains('\0') && !value.contains('\0')
    }

    /// Check values that cannot be expressed by the types alone
    ///
    /// # Errors
    ///
    /// Returns an error for an unusable validity window, cookie name or secret key.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.token_validity()?;
        if self.remember_me.cookie_name.is_empty() {
            return Err(SettingsError::Invalid {
                name: "remember_me.cookie_name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.remember_me.secret_key.is_empty() {
            return Err(SettingsError::Invalid {
                name: "remember_me.secret_key",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Validity window as a duration
    ///
    /// # Errors
    ///
    /// Returns an error if the window is zero or too large to represent.
    pub fn token_validity(&self) -> Result<chrono::Duration, SettingsError> {
        let seconds = self.remember_me.token_validity_seconds;
        let invalid = |reason: &str| SettingsError::Invalid {
            name: "remember_me.token_validity_seconds",
            reason: format!("{reason} (got {seconds})"),
        };

        if seconds == 0 {
            return Err(invalid("must be positive"));
        }
        i64::try_from(seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| invalid("out of range"))
    }

    /// Initial runtime configuration built from these settings
    ///
    /// # Errors
    ///
    /// Returns an error if the validity window is invalid.
    pub fn remember_me_config(&self) -> Result<RememberMeConfig, SettingsError> {
        Ok(RememberMeConfig {
            enabled: self.remember_me.enabled,
            token_validity: self.token_validity()?,
            skip_future_expiry_check: self.remember_me.skip_future_expiry_check,
            user_seed_enabled: self.remember_me.user_seed_enabled,
            refresh_on_accept: self.remember_me.refresh_on_accept,
        })
    }

    /// Context path normalised to start with `/` and carry no trailing `/`, except root
    #[must_use]
    pub fn context_path(&self) -> String {
        let trimmed = self.application.context_path.trim().trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }
}
