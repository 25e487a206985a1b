//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLKEEP_*)
//! 2. TOML config file (if SHELLKEEP_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The built-in defaults are the generation the binary ships with: the version
//! tag, manifest, fallback document and both host sets.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLKEEP_*)
/// 2. TOML config file (if SHELLKEEP_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite store database.
    ///
    /// Set via SHELLKEEP_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the hosted application; relative identifiers resolve here
    /// and responses from it are same-origin.
    ///
    /// Set via SHELLKEEP_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Version tag naming the current store generation.
    ///
    /// Set via SHELLKEEP_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Asset identifiers provisioned at install, in order.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Document served to offline navigations with no stored match.
    ///
    /// Set via SHELLKEEP_FALLBACK_DOCUMENT environment variable.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// Hosts whose requests are never intercepted.
    #[serde(default = "default_bypass_hosts")]
    pub bypass_hosts: Vec<String>,

    /// Hosts served network-first with a stored fallback.
    #[serde(default = "default_network_first_hosts")]
    pub network_first_hosts: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHELLKEEP_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHELLKEEP_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to read per response.
    ///
    /// Set via SHELLKEEP_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Whether install asks to take over without waiting for old contexts.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Whether activation re-fetches manifest entries missing from the store.
    #[serde(default = "default_true")]
    pub reprovision_on_activate: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellkeep-stores.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_version() -> String {
    "app-v1".into()
}

fn default_manifest() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_fallback_document() -> String {
    "/index.html".into()
}

fn default_bypass_hosts() -> Vec<String> {
    vec!["www.googleapis.com".into(), "apis.google.com".into(), "accounts.google.com".into()]
}

fn default_network_first_hosts() -> Vec<String> {
    vec!["fonts.googleapis.com".into(), "fonts.gstatic.com".into()]
}

fn default_user_agent() -> String {
    "shellkeep/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            version: default_version(),
            manifest: default_manifest(),
            fallback_document: default_fallback_document(),
            bypass_hosts: default_bypass_hosts(),
            network_first_hosts: default_network_first_hosts(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            skip_waiting_on_install: true,
            reprovision_on_activate: true,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLKEEP_`
    /// 2. TOML file from `SHELLKEEP_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// List fields (`manifest`, host sets) are best set in the TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLKEEP_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLKEEP_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./shellkeep-stores.sqlite"));
        assert_eq!(config.version, "app-v1");
        assert_eq!(config.fallback_document, "/index.html");
        assert!(config.manifest.contains(&config.fallback_document));
        assert_eq!(config.bypass_hosts.len(), 3);
        assert_eq!(config.network_first_hosts.len(), 2);
        assert!(config.skip_waiting_on_install);
        assert!(config.reprovision_on_activate);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(
                r#"
                version = "app-v7"
                manifest = ["/", "/app.js"]
                network_first_hosts = []
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.version, "app-v7");
        assert_eq!(config.manifest, vec!["/".to_string(), "/app.js".to_string()]);
        assert!(config.network_first_hosts.is_empty());
        assert_eq!(config.fallback_document, "/index.html");
    }
}
