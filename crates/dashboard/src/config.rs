//! 대시보드 설정
//!
//! 환경변수(.env 포함)에서 읽고, CLI 플래그가 있으면 그 값으로 덮어쓴다.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use trading_api::DEFAULT_BASE_URL;

use crate::sync::{SyncConfig, DEFAULT_POLL_INTERVAL};

pub const ENV_API_URL: &str = "PAPERTRADER_API_URL";
pub const ENV_POLL_MS: &str = "PAPERTRADER_POLL_MS";
pub const ENV_TIMEOUT_MS: &str = "PAPERTRADER_TIMEOUT_MS";
pub const ENV_REFRESH_PRICES: &str = "PAPERTRADER_REFRESH_PRICES";
pub const ENV_LOG_DIR: &str = "PAPERTRADER_LOG_DIR";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub refresh_prices: bool,
    pub log_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_TIMEOUT,
            refresh_prices: true,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 → 값 조회 함수로부터 설정을 만든다. 없는 키는 기본값을 쓴다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.api_url = parse_url(ENV_API_URL, &url)?;
        }
        if let Some(raw) = lookup(ENV_POLL_MS) {
            config.poll_interval = parse_millis(ENV_POLL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            config.request_timeout = parse_millis(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_REFRESH_PRICES) {
            config.refresh_prices = parse_bool(ENV_REFRESH_PRICES, &raw)?;
        }
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_url = parse_url("--api-url", url)?;
        Ok(self)
    }

    pub fn with_poll_ms(mut self, millis: u64) -> Result<Self, ConfigError> {
        self.poll_interval = positive_millis("--poll-ms", millis)?;
        Ok(self)
    }

    pub fn with_timeout_ms(mut self, millis: u64) -> Result<Self, ConfigError> {
        self.request_timeout = positive_millis("--timeout-ms", millis)?;
        Ok(self)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            poll_interval: self.poll_interval,
            refresh_prices: self.refresh_prices,
        }
    }
}

fn parse_url(key: &'static str, raw: &str) -> Result<String, ConfigError> {
    let url = raw.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected an http(s) url",
        })
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let millis = raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: "expected milliseconds",
    })?;
    positive_millis(key, millis)
}

fn positive_millis(key: &'static str, millis: u64) -> Result<Duration, ConfigError> {
    if millis == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: millis.to_string(),
            reason: "must be greater than zero",
        });
    }
    Ok(Duration::from_millis(millis))
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected true or false",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.api_url, "http://127.0.0.1:8000");
        assert_eq!(config.poll_interval, Duration::from_millis(3000));
        assert!(config.refresh_prices);
    }

    #[test]
    fn test_env_values() {
        let config = DashboardConfig::from_lookup(lookup(&[
            (ENV_API_URL, "http://trader.local:9000/"),
            (ENV_POLL_MS, "1500"),
            (ENV_TIMEOUT_MS, "2500"),
            (ENV_REFRESH_PRICES, "off"),
            (ENV_LOG_DIR, "/var/log/papertrader"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "http://trader.local:9000");
        assert_eq!(config.poll_interval, Duration::from_millis(1500));
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert!(!config.refresh_prices);
        assert_eq!(config.log_dir, PathBuf::from("/var/log/papertrader"));

        let sync = config.sync_config();
        assert_eq!(sync.poll_interval, Duration::from_millis(1500));
        assert!(!sync.refresh_prices);
    }

    #[test]
    fn test_invalid_values() {
        let err = DashboardConfig::from_lookup(lookup(&[(ENV_POLL_MS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ENV_POLL_MS, .. }));

        let err = DashboardConfig::from_lookup(lookup(&[(ENV_POLL_MS, "soon")])).unwrap_err();
        assert!(err.to_string().contains("expected milliseconds"));

        assert!(DashboardConfig::from_lookup(lookup(&[(ENV_API_URL, "localhost:8000")])).is_err());
        assert!(DashboardConfig::from_lookup(lookup(&[(ENV_REFRESH_PRICES, "maybe")])).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let config = DashboardConfig::default()
            .with_api_url("https://paper.example.com")
            .unwrap()
            .with_poll_ms(500)
            .unwrap()
            .with_timeout_ms(750)
            .unwrap();
        assert_eq!(config.api_url, "https://paper.example.com");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.request_timeout, Duration::from_millis(750));
        assert!(DashboardConfig::default().with_poll_ms(0).is_err());
    }
}
