//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::location::{parse_origin, resolve};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `version` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - a manifest entry or the fallback document cannot be resolved
    /// - a host appears in both `bypass_hosts` and `network_first_hosts`
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }

        let origin = parse_origin(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;

        for entry in &self.manifest {
            resolve(entry, &origin).map_err(|e| invalid("manifest", format!("{entry:?}: {e}")))?;
        }
        let fallback = resolve(&self.fallback_document, &origin)
            .map_err(|e| invalid("fallback_document", e.to_string()))?;

        if let Some(host) = self
            .bypass_hosts
            .iter()
            .find(|h| self.network_first_hosts.iter().any(|n| n.eq_ignore_ascii_case(h)))
        {
            return Err(invalid("network_first_hosts", format!("{host} is also a bypass host")));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 100MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let fallback_provisioned = self
            .manifest
            .iter()
            .filter_map(|entry| resolve(entry, &origin).ok())
            .any(|url| url == fallback);
        if !fallback_provisioned {
            tracing::warn!(
                fallback = %fallback,
                "fallback_document is not in the manifest; \
                 offline navigations only succeed once it has been cached at runtime"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { version: "  ".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "version");
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "file:///srv/app".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "origin");
    }

    #[test]
    fn test_validate_manifest_entry() {
        let config = AppConfig { manifest: vec!["/".into(), "ftp://x/y".into()], ..Default::default() };
        assert_eq!(field_of(config.validate()), "manifest");
    }

    #[test]
    fn test_validate_overlapping_hosts() {
        let config = AppConfig {
            bypass_hosts: vec!["fonts.gstatic.com".into()],
            network_first_hosts: vec!["FONTS.GSTATIC.COM".into()],
            ..Default::default()
        };
        assert_eq!(field_of(config.validate()), "network_first_hosts");
    }

    #[test]
    fn test_validate_max_bytes_zero() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()), "max_bytes");
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()), "timeout_ms");

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert_eq!(field_of(config.validate()), "timeout_ms");

        let config = AppConfig { timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()), "user_agent");
    }

    #[test]
    fn test_fallback_outside_manifest_is_allowed() {
        let config = AppConfig { fallback_document: "/offline.html".into(), ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
