//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── reqwest: ReqwestConfig   # Backend URL, timeout, user agent
//! ├── session: SessionConfig   # Session lifetime, secure flag, 2FA attempts
//! ├── session_file             # Where the session is persisted
//! └── command: Command         # What to do
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//!
//! # Example
//!
//! ```bash
//! klararety --api-url https://api.klararety.com/api login
//!
//! API_URL=https://api.klararety.com/api SESSION_MAX_AGE=1800 klararety dashboard
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use klararety_reqwest::ReqwestConfig;
use klararety_session::SessionConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::commands::Command;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Default location of the persisted session, relative to the working directory.
pub const DEFAULT_SESSION_FILE: &str = ".klararety/session.json";

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "klararety")]
#[command(about = "Klararety healthcare platform client")]
#[command(version)]
pub struct Cli {
    /// Backend connection configuration.
    #[clap(flatten)]
    pub reqwest: ReqwestConfig,

    /// Session lifetime and login configuration.
    #[clap(flatten)]
    pub session: SessionConfig,

    /// File the session is persisted to between invocations
    #[arg(long, env = "KLARARETY_SESSION_FILE", default_value = DEFAULT_SESSION_FILE)]
    pub session_file: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering, writing to stderr.
    pub fn init_tracing() -> anyhow::Result<()> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("failed to initialize tracing")
    }

    /// Rejects option values the session layer cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.session
            .validate()
            .context("invalid session configuration")
    }

    /// Logs configuration at debug level (no sensitive information).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            api_url = %self.reqwest.api_url,
            http_timeout_secs = self.reqwest.http_timeout,
            session_max_age_secs = self.session.session_max_age,
            secure_cookies = self.session.secure_cookies,
            two_factor_max_attempts = self.session.two_factor_max_attempts,
            session_file = %self.session_file.display(),
            "Client configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_apply() {
        let cli = Cli::try_parse_from(["klararety", "whoami"]).unwrap();
        assert_eq!(cli.session_file, PathBuf::from(DEFAULT_SESSION_FILE));
        assert_eq!(cli.session.two_factor_max_attempts, 5);
    }

    #[test]
    fn test_oversized_session_max_age_is_rejected() {
        let cli = Cli::try_parse_from(["klararety", "whoami"]).unwrap();
        assert!(cli.validate().is_ok());

        let cli = Cli::try_parse_from([
            "klararety",
            "--session-max-age",
            "18446744073709551615",
            "whoami",
        ])
        .unwrap();
        let error = cli.validate().unwrap_err();
        assert!(format!("{error:#}").contains("session_max_age"));
    }

    #[test]
    fn test_global_options_precede_command() {
        let cli = Cli::try_parse_from([
            "klararety",
            "--api-url",
            "https://api.example.com/api",
            "--session-file",
            "/tmp/session.json",
            "guard",
            "/records",
        ])
        .unwrap();
        assert_eq!(cli.reqwest.api_url, "https://api.example.com/api");
        assert!(matches!(cli.command, Command::Guard { ref path } if path == "/records"));
    }
}
