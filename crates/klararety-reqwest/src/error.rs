//! Internal error types for klararety-reqwest.

use thiserror::Error;

/// Result type alias for transport-level operations.
pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Transport-level error, converted into [`klararety_core::Error`] at the
/// crate boundary.
#[derive(Debug, Error)]
pub(crate) enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Endpoint path could not be resolved against the base URL.
    #[error("Invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
}

impl From<Error> for klararety_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) => {
                if e.is_timeout() {
                    klararety_core::Error::timeout()
                        .with_message("Request timed out")
                        .with_source(e)
                } else if e.is_connect() {
                    klararety_core::Error::network_error()
                        .with_message("Connection failed")
                        .with_source(e)
                } else if e.is_decode() {
                    klararety_core::Error::serialization()
                        .with_message(e.to_string())
                        .with_source(e)
                } else {
                    klararety_core::Error::network_error()
                        .with_message(e.to_string())
                        .with_source(e)
                }
            }
            Error::Serde(e) => klararety_core::Error::serialization()
                .with_message(e.to_string())
                .with_source(e),
            Error::Url(e) => klararety_core::Error::configuration()
                .with_message(e.to_string())
                .with_source(e),
        }
    }
}
