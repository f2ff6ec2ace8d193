//! Startup configuration.
//!
//! Values are layered with `figment`: built-in defaults, then an optional
//! TOML file, then the process environment. The result is immutable and is
//! handed to the service explicitly.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format as _, Serialized, Toml};
use postal::{ProviderOrder, ProviderSettings, default_check_period};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "POSTALIA_CONFIG";

/// Configuration file read when present and `POSTALIA_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "postalia.toml";

/// Environment variables mapped onto [`Settings`] fields.
const SETTING_KEYS: &[&str] = &[
    "PORT",
    "RATE_LIMIT_WINDOW_MS",
    "RATE_LIMIT_MAX",
    "CACHE_TTL_SECONDS",
    "CACHE_CHECK_PERIOD_SECONDS",
    "PROVIDERS_ORDER",
    "PROVIDER_CHAIN_DEADLINE_MS",
];

/// Table of the TOML file holding provider credentials.
const CREDENTIALS_TABLE: &str = "credentials";

/// Gateway settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Listening port.
    pub port: u16,
    /// Rate-limit window in milliseconds.
    pub rate_limit_window_ms: u64,
    /// Requests allowed per client within one window.
    pub rate_limit_max: u32,
    /// Cache time-to-live in seconds; 0 disables caching.
    pub cache_ttl_seconds: u64,
    /// Sweep interval in seconds; derived from the TTL when unset.
    pub cache_check_period_seconds: Option<u64>,
    /// Comma-separated provider fallback order.
    pub providers_order: String,
    /// Deadline for one walk of the provider chain; 0 disables it.
    pub provider_chain_deadline_ms: u64,
    /// Provider configuration values keyed by uppercase name.
    #[serde(skip)]
    pub credentials: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 3000,
            rate_limit_window_ms: 60_000,
            rate_limit_max: 200,
            cache_ttl_seconds: 600,
            cache_check_period_seconds: None,
            providers_order: postal::DEFAULT_ORDER.to_string(),
            provider_chain_deadline_ms: 15_000,
            credentials: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("port", &self.port)
            .field("rate_limit_window_ms", &self.rate_limit_window_ms)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("cache_check_period_seconds", &self.cache_check_period_seconds)
            .field("providers_order", &self.providers_order)
            .field("provider_chain_deadline_ms", &self.provider_chain_deadline_ms)
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Settings {
    /// Load settings from the configuration file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `POSTALIA_CONFIG` names a missing file, the file
    /// is not valid TOML, or a value has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        let file = config_file()?;

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = &file {
            figment = figment.merge(Toml::file(path));
        }
        let mut settings: Self = figment.merge(Env::raw().only(SETTING_KEYS)).extract()?;

        settings.credentials = load_credentials(file.as_deref())?;
        Ok(settings)
    }

    /// Cache time-to-live, or `None` when caching is disabled.
    #[must_use]
    pub const fn cache_ttl(&self) -> Option<Duration> {
        match self.cache_ttl_seconds {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }

    /// Interval between cache sweeps, or `None` when caching is disabled.
    #[must_use]
    pub fn cache_check_period(&self) -> Option<Duration> {
        let ttl = self.cache_ttl()?;
        Some(
            self.cache_check_period_seconds
                .filter(|seconds| *seconds > 0)
                .map_or_else(|| default_check_period(ttl), Duration::from_secs),
        )
    }

    /// Length of one rate-limit window.
    #[must_use]
    pub const fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    /// Deadline for one walk of the provider chain.
    #[must_use]
    pub const fn chain_deadline(&self) -> Option<Duration> {
        match self.provider_chain_deadline_ms {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        }
    }

    /// Provider settings for the lookup service.
    #[must_use]
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings::new(ProviderOrder::parse(&self.providers_order))
            .with_chain_deadline(self.chain_deadline())
            .with_credentials(&self.credentials)
    }
}

fn config_file() -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_VAR) {
        let path = PathBuf::from(path);
        if !path.is_file() {
            return Err(ConfigError::MissingFile(path));
        }
        return Ok(Some(path));
    }

    let default = Path::new(DEFAULT_CONFIG_FILE);
    Ok(default.is_file().then(|| default.to_path_buf()))
}

fn load_credentials(file: Option<&Path>) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut credentials = BTreeMap::new();

    if let Some(path) = file {
        let values: BTreeMap<String, serde_json::Value> = Figment::from(Toml::file(path))
            .focus(CREDENTIALS_TABLE)
            .extract()?;
        for (key, value) in values {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            credentials.insert(key.to_uppercase(), value);
        }
    }

    // Environment values are taken verbatim, without figment's type parsing.
    for key in postal::catalog_config_keys() {
        if let Ok(value) = std::env::var(key) {
            credentials.insert(key.to_string(), value);
        }
    }

    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    fn load() -> figment::error::Result<Settings> {
        Settings::load().map_err(|e| figment::Error::from(e.to_string()))
    }

    #[test]
    fn defaults_apply_without_sources() {
        Jail::expect_with(|_jail| {
            let settings = load()?;
            assert_eq!(settings.port, 3000);
            assert_eq!(settings.rate_limit_max, 200);
            assert_eq!(settings.rate_limit_window(), Duration::from_secs(60));
            assert_eq!(settings.cache_ttl(), Some(Duration::from_secs(600)));
            assert_eq!(settings.cache_check_period(), Some(Duration::from_secs(120)));
            assert_eq!(settings.chain_deadline(), Some(Duration::from_secs(15)));
            assert_eq!(settings.providers_order, "geonames");
            assert!(settings.credentials.is_empty());
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "8080");
            jail.set_env("RATE_LIMIT_MAX", "5");
            jail.set_env("CACHE_TTL_SECONDS", "0");
            jail.set_env("PROVIDERS_ORDER", "geonames, openplz");
            jail.set_env("GEONAMES_USERNAME", "demo");
            jail.set_env("ZIPBASE_KEY", "12345");

            let settings = load()?;
            assert_eq!(settings.port, 8080);
            assert_eq!(settings.rate_limit_max, 5);
            assert_eq!(settings.cache_ttl(), None);
            assert_eq!(settings.cache_check_period(), None);
            assert_eq!(settings.credentials["GEONAMES_USERNAME"], "demo");
            assert_eq!(settings.credentials["ZIPBASE_KEY"], "12345");

            let providers = settings.provider_settings();
            assert_eq!(providers.order.to_string(), "geonames,openplz");
            assert_eq!(providers.credential("GEONAMES_USERNAME").as_deref(), Some("demo"));
            Ok(())
        });
    }

    #[test]
    fn file_values_sit_between_defaults_and_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                port = 4000
                cache_ttl_seconds = 60
                providers_order = "openplz"

                [credentials]
                openplz_template = "https://openplz.test/{country}/{code}"
                geonames_username = "from_file"
                "#,
            )?;
            jail.set_env("GEONAMES_USERNAME", "from_env");

            let settings = load()?;
            assert_eq!(settings.port, 4000);
            assert_eq!(settings.cache_check_period(), Some(Duration::from_secs(12)));
            assert_eq!(settings.providers_order, "openplz");
            assert_eq!(
                settings.credentials["OPENPLZ_TEMPLATE"],
                "https://openplz.test/{country}/{code}"
            );
            assert_eq!(settings.credentials["GEONAMES_USERNAME"], "from_env");
            Ok(())
        });
    }

    #[test]
    fn environment_credentials_are_kept_verbatim() {
        Jail::expect_with(|jail| {
            jail.set_env("ZIPBASE_KEY", "00123");
            jail.set_env("GEONAMES_USERNAME", "[team]");
            jail.set_env("ZIPAPI_KEY", "true");

            let settings = load()?;
            assert_eq!(settings.credentials["ZIPBASE_KEY"], "00123");
            assert_eq!(settings.credentials["GEONAMES_USERNAME"], "[team]");
            assert_eq!(settings.credentials["ZIPAPI_KEY"], "true");
            Ok(())
        });
    }

    #[test]
    fn explicit_check_period_wins() {
        Jail::expect_with(|jail| {
            jail.set_env("CACHE_CHECK_PERIOD_SECONDS", "7");
            let settings = load()?;
            assert_eq!(settings.cache_check_period(), Some(Duration::from_secs(7)));
            Ok(())
        });
    }

    #[test]
    fn invalid_port_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("PORT", "not-a-port");
            assert!(Settings::load().is_err());
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env(CONFIG_PATH_VAR, "missing.toml");
            assert!(matches!(Settings::load(), Err(ConfigError::MissingFile(_))));
            Ok(())
        });
    }

    #[test]
    fn debug_hides_credential_values() {
        let mut settings = Settings::default();
        settings
            .credentials
            .insert("ZIPAPI_KEY".to_string(), "secret_key_12345".to_string());
        let debug_str = format!("{settings:?}");
        assert!(debug_str.contains("ZIPAPI_KEY"));
        assert!(!debug_str.contains("secret_key_12345"));
    }
}
