use std::path::PathBuf;
use std::time::Duration;

use loupe_providers::ProviderEndpoints;

use crate::settings::ConfigFailure;
use crate::{Error, Result};

/// Tracing filter used when `LOUPE_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Overrides the tracing filter directive.
pub const LOG_VAR: &str = "LOUPE_LOG";
/// Overrides the GitHub REST base URL.
pub const GITHUB_API_VAR: &str = "LOUPE_GITHUB_API_URL";
/// Overrides the per-request HTTP timeout in seconds; `0` disables it.
pub const HTTP_TIMEOUT_VAR: &str = "LOUPE_HTTP_TIMEOUT_SECS";
/// Enables pushing read markers to backends that keep their own.
pub const SYNC_READ_STATE_VAR: &str = "LOUPE_SYNC_REMOTE_READ_STATE";

/// Runtime configuration of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Directory holding the read-state database.
    pub data_dir: PathBuf,
    /// Tracing filter directive.
    pub log_filter: String,
    /// Transport settings for provider clients.
    pub endpoints: ProviderEndpoints,
    /// Push read markers to backends after the local write.
    pub sync_remote_read_state: bool,
}

impl CoreConfig {
    /// Defaults rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            endpoints: ProviderEndpoints::default(),
            sync_remote_read_state: false,
        }
    }

    /// Defaults rooted at `data_dir` with process environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] when an override cannot be parsed.
    pub fn from_env(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::new(data_dir).with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up through `var`; blank values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] listing every unparsable override.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |name: &str| {
            var(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let mut failures = Vec::new();

        if let Some(filter) = lookup(LOG_VAR) {
            self.log_filter = filter;
        }
        if let Some(url) = lookup(GITHUB_API_VAR) {
            self.endpoints.github_api = url;
        }
        if let Some(raw) = lookup(HTTP_TIMEOUT_VAR) {
            match raw.parse::<u64>() {
                Ok(0) => self.endpoints.timeout = None,
                Ok(secs) => self.endpoints.timeout = Some(Duration::from_secs(secs)),
                Err(_) => failures.push(ConfigFailure::new(
                    HTTP_TIMEOUT_VAR,
                    format!("'{raw}' is not a number of seconds"),
                )),
            }
        }
        if let Some(raw) = lookup(SYNC_READ_STATE_VAR) {
            match parse_flag(&raw) {
                Some(flag) => self.sync_remote_read_state = flag,
                None => failures.push(ConfigFailure::new(
                    SYNC_READ_STATE_VAR,
                    format!("'{raw}' is not a boolean"),
                )),
            }
        }

        if failures.is_empty() {
            Ok(self)
        } else {
            Err(Error::InvalidConfiguration { failures })
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = CoreConfig::new("/tmp/loupe")
            .with_overrides(overrides(&[]))
            .expect("config");
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.endpoints, ProviderEndpoints::default());
        assert!(!config.sync_remote_read_state);
    }

    #[test]
    fn overrides_are_applied() {
        let config = CoreConfig::new("/tmp/loupe")
            .with_overrides(overrides(&[
                (LOG_VAR, "loupe_core=debug"),
                (GITHUB_API_VAR, "https://github.example.com/api/v3"),
                (HTTP_TIMEOUT_VAR, "0"),
                (SYNC_READ_STATE_VAR, "Yes"),
            ]))
            .expect("config");
        assert_eq!(config.log_filter, "loupe_core=debug");
        assert_eq!(config.endpoints.github_api, "https://github.example.com/api/v3");
        assert_eq!(config.endpoints.timeout, None);
        assert!(config.sync_remote_read_state);
    }

    #[test]
    fn bad_overrides_are_all_reported() {
        let err = CoreConfig::new("/tmp/loupe")
            .with_overrides(overrides(&[
                (HTTP_TIMEOUT_VAR, "soon"),
                (SYNC_READ_STATE_VAR, "maybe"),
            ]))
            .expect_err("invalid overrides");
        match err {
            Error::InvalidConfiguration { failures } => {
                let ids: Vec<_> = failures.iter().map(|failure| failure.id.as_str()).collect();
                assert_eq!(ids, [HTTP_TIMEOUT_VAR, SYNC_READ_STATE_VAR]);
            }
            other => panic!("expected InvalidConfiguration, got {other:?}"),
        }
    }
}
