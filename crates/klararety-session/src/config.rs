//! Session configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use jiff::SignedDuration;
use klararety_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default session lifetime and idle timeout: 15 minutes.
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 900;

/// Longest accepted session lifetime: 100 years.
pub const MAX_SESSION_MAX_AGE_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Default number of rejected one-time codes before a challenge is discarded.
pub const DEFAULT_TWO_FACTOR_MAX_ATTEMPTS: u32 = 5;

/// Configuration of the session store, idle timer and login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct SessionConfig {
    /// Session lifetime in seconds; also the idle timeout
    #[cfg_attr(
        feature = "config",
        arg(long = "session-max-age", env = "SESSION_MAX_AGE", default_value = "900")
    )]
    #[serde(default = "default_session_max_age")]
    pub session_max_age: u64,

    /// Mark persisted session entries as secure (HTTPS only)
    #[cfg_attr(
        feature = "config",
        arg(
            long = "secure-cookies",
            env = "SECURE_COOKIES",
            default_value = "false",
            action = clap::ArgAction::Set
        )
    )]
    #[serde(default)]
    pub secure_cookies: bool,

    /// Rejected two-factor codes allowed per login before starting over
    #[cfg_attr(
        feature = "config",
        arg(
            long = "two-factor-max-attempts",
            env = "TWO_FACTOR_MAX_ATTEMPTS",
            default_value = "5"
        )
    )]
    #[serde(default = "default_two_factor_max_attempts")]
    pub two_factor_max_attempts: u32,
}

fn default_session_max_age() -> u64 {
    DEFAULT_SESSION_MAX_AGE_SECS
}

fn default_two_factor_max_attempts() -> u32 {
    DEFAULT_TWO_FACTOR_MAX_ATTEMPTS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_max_age: default_session_max_age(),
            secure_cookies: false,
            two_factor_max_attempts: default_two_factor_max_attempts(),
        }
    }
}

impl SessionConfig {
    /// Returns the session lifetime, using the default if zero.
    ///
    /// Values above [`MAX_SESSION_MAX_AGE_SECS`] are clamped to it.
    pub fn session_duration(&self) -> Duration {
        match self.session_max_age {
            0 => Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS),
            secs => Duration::from_secs(secs.min(MAX_SESSION_MAX_AGE_SECS)),
        }
    }

    /// Returns the session lifetime as a signed duration for timestamp arithmetic.
    pub(crate) fn session_span(&self) -> SignedDuration {
        let secs = i64::try_from(self.session_duration().as_secs()).unwrap_or(i64::MAX);
        SignedDuration::from_secs(secs)
    }

    /// Set the session lifetime in seconds.
    #[must_use]
    pub fn with_session_max_age(mut self, secs: u64) -> Self {
        self.session_max_age = secs;
        self
    }

    /// Set whether persisted entries are marked secure.
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Set the two-factor attempt limit.
    #[must_use]
    pub fn with_two_factor_max_attempts(mut self, attempts: u32) -> Self {
        self.two_factor_max_attempts = attempts;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.two_factor_max_attempts == 0 {
            return Err(Error::configuration()
                .with_message("two_factor_max_attempts must be at least 1"));
        }
        if self.session_max_age > MAX_SESSION_MAX_AGE_SECS {
            return Err(Error::configuration().with_message(format!(
                "session_max_age must be at most {MAX_SESSION_MAX_AGE_SECS} seconds"
            )));
        }
        Ok(())
    }
}
