//! Reqwest client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use klararety_core::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the backend HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct ReqwestConfig {
    /// Base URL of the backend REST API
    #[cfg_attr(
        feature = "config",
        arg(long = "api-url", env = "API_URL", default_value = DEFAULT_API_URL)
    )]
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "http-timeout", env = "HTTP_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ReqwestConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            http_timeout: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl ReqwestConfig {
    /// Creates a configuration for the given backend.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.http_timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.http_timeout)
        }
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(Self::default_user_agent)
    }

    fn default_user_agent() -> String {
        format!("klararety/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Parses the base URL, normalised to end with `/` so that relative
    /// endpoint paths resolve below it.
    pub fn base_url(&self) -> Result<Url> {
        let mut url = Url::parse(self.api_url.trim()).map_err(|e| {
            Error::configuration()
                .with_message(format!("invalid api_url {:?}", self.api_url))
                .with_source(e)
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::configuration()
                .with_message(format!("api_url must use http or https, got {}", url.scheme())));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);

        Ok(url)
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReqwestConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000/api");
        assert_eq!(config.effective_timeout(), Duration::from_secs(30));
        assert!(config.effective_user_agent().starts_with("klararety/"));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = ReqwestConfig::default().base_url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/");
        assert_eq!(
            url.join("users/me/").unwrap().as_str(),
            "http://localhost:8000/api/users/me/"
        );

        let url = ReqwestConfig::new("https://api.example.com/v1/").base_url().unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ReqwestConfig::new("not a url").base_url().is_err());
        assert!(ReqwestConfig::new("ftp://example.com").base_url().is_err());
    }

    #[test]
    fn test_effective_timeout_uses_default_when_zero() {
        let config = ReqwestConfig::default().with_timeout(0);
        assert_eq!(
            config.effective_timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }
}
