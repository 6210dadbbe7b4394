use std::{path::PathBuf, time::Duration};

use crate::{
    error::{Result, SynopsisError},
    paths::get_state_path,
};

pub const API_URL_VAR: &str = "SYNOPSIS_API_URL";
pub const POLL_INTERVAL_VAR: &str = "SYNOPSIS_POLL_INTERVAL_MS";
pub const TIMEOUT_VAR: &str = "SYNOPSIS_TIMEOUT_SECS";
pub const STATE_FILE_VAR: &str = "SYNOPSIS_STATE_FILE";

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of jobs kept in history.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub state_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_TIMEOUT,
            state_file: get_state_path(),
        }
    }
}

impl ClientConfig {
    /// Read configuration from `SYNOPSIS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from any variable source; unset variables keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_VAR) {
            let url = url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SynopsisError::InvalidConfig {
                    var: API_URL_VAR.to_string(),
                    reason: format!("must be an http(s) url, got {url:?}"),
                });
            }
            config.api_url = url.to_string();
        }
        if let Some(ms) = lookup(POLL_INTERVAL_VAR) {
            config.poll_interval = Duration::from_millis(parse_positive(POLL_INTERVAL_VAR, &ms)?);
        }
        if let Some(secs) = lookup(TIMEOUT_VAR) {
            config.request_timeout = Duration::from_secs(parse_positive(TIMEOUT_VAR, &secs)?);
        }
        if let Some(path) = lookup(STATE_FILE_VAR) {
            config.state_file = PathBuf::from(path);
        }

        Ok(config)
    }
}

fn parse_positive(var: &str, raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(SynopsisError::InvalidConfig {
            var: var.to_string(),
            reason: format!("must be a positive integer, got {raw:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn overrides_from_variables() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://summaries.example.com/"),
            (POLL_INTERVAL_VAR, "250"),
            (STATE_FILE_VAR, "/tmp/state.json"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://summaries.example.com/");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.state_file, PathBuf::from("/tmp/state.json"));
    }

    #[test]
    fn rejects_bad_values() {
        let err = ClientConfig::from_lookup(lookup(&[(POLL_INTERVAL_VAR, "0")])).unwrap_err();
        assert!(matches!(err, SynopsisError::InvalidConfig { ref var, .. } if var == POLL_INTERVAL_VAR));

        assert!(ClientConfig::from_lookup(lookup(&[(API_URL_VAR, "localhost:8000")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "soon")])).is_err());
    }
}
