use std::time::Duration;

use clap::Args;
use reqwest::Url;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("base url {0:?} must use http or https")]
    Scheme(String),
    #[error("poll interval must be greater than zero")]
    PollInterval,
}

#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Root of the web application that serves `refinery/activities`.
    #[arg(long, env = "REFINERY_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    #[arg(long, env = "REFINERY_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS, global = true)]
    pub poll_interval_ms: u64,

    #[arg(long, env = "REFINERY_REQUEST_TIMEOUT_SECS", global = true)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: Url,
    pub poll_interval: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url parses"),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: None,
        }
    }
}

impl Config {
    pub fn from_args(args: &ConnectionArgs) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&args.base_url).map_err(|err| ConfigError::BaseUrl {
            url: args.base_url.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::Scheme(args.base_url.clone()));
        }
        if args.poll_interval_ms == 0 {
            return Err(ConfigError::PollInterval);
        }

        Ok(Self {
            base_url,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            request_timeout: args.request_timeout_secs.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(base_url: &str, poll_interval_ms: u64) -> ConnectionArgs {
        ConnectionArgs {
            base_url: base_url.to_string(),
            poll_interval_ms,
            request_timeout_secs: Some(5),
        }
    }

    #[test]
    fn defaults_poll_every_thirty_seconds() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.base_url.as_str(), DEFAULT_BASE_URL);
    }

    #[test]
    fn accepts_http_urls() {
        let config = Config::from_args(&args("https://dataload.example.com/app", 1000)).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Config::from_args(&args("not a url", 1000)),
            Err(ConfigError::BaseUrl { .. })
        ));
        assert!(matches!(
            Config::from_args(&args("ftp://host/", 1000)),
            Err(ConfigError::Scheme(_))
        ));
        assert!(matches!(
            Config::from_args(&args(DEFAULT_BASE_URL, 0)),
            Err(ConfigError::PollInterval)
        ));
    }
}
