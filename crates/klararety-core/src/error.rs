//! Common error type definitions.

use std::collections::BTreeMap;

use strum::{AsRefStr, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur in klararety operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Input validation failed (field-level or `detail` messages from the backend).
    InvalidInput,
    /// Credentials or a one-time code were rejected.
    Authentication,
    /// The session token is missing, expired or revoked.
    Authorization,
    /// The session is valid but lacks permission for the resource.
    Forbidden,
    /// The operation is not valid in the current session state.
    InvalidState,
    /// Too many attempts.
    RateLimited,
    /// Network-related error occurred.
    NetworkError,
    /// Timeout occurred.
    Timeout,
    /// The backend answered with a server error.
    ServiceUnavailable,
    /// Resource not found.
    NotFound,
    /// Serialization/deserialization error.
    Serialization,
    /// Session persistence failed.
    Storage,
    /// Configuration error.
    Configuration,
    /// The capability exists in the interface but has no backing operation.
    Unsupported,
    /// Unknown error occurred.
    Unknown,
}

impl ErrorKind {
    /// Returns the snake_case name of this kind.
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Wraps this kind into an [`Error`].
    #[inline]
    pub fn into_error(self) -> Error {
        Error::new(self)
    }

    /// Creates an [`Error`] of this kind with the given message.
    #[inline]
    pub fn with_message(self, message: impl Into<String>) -> Error {
        Error::new(self).with_message(message)
    }
}

/// A structured error type for klararety operations.
#[derive(Debug, Error)]
#[error("{}{}", .kind.as_str(), .message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional error message.
    pub message: Option<String>,
    /// Field-level validation messages, keyed by field name.
    pub field_errors: BTreeMap<String, Vec<String>>,
    /// Optional source error.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            field_errors: BTreeMap::new(),
            source: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds a source error to this error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Appends a validation message for the given field.
    pub fn with_field_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new authentication error.
    pub fn authentication() -> Self {
        Self::new(ErrorKind::Authentication)
    }

    /// Creates a new authorization error.
    pub fn authorization() -> Self {
        Self::new(ErrorKind::Authorization)
    }

    /// Creates a new forbidden error.
    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden)
    }

    /// Creates a new invalid state error.
    pub fn invalid_state() -> Self {
        Self::new(ErrorKind::InvalidState)
    }

    /// Creates a new rate limited error.
    pub fn rate_limited() -> Self {
        Self::new(ErrorKind::RateLimited)
    }

    /// Creates a new network error.
    pub fn network_error() -> Self {
        Self::new(ErrorKind::NetworkError)
    }

    /// Creates a new timeout error.
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout)
    }

    /// Creates a new service unavailable error.
    pub fn service_unavailable() -> Self {
        Self::new(ErrorKind::ServiceUnavailable)
    }

    /// Creates a new not found error.
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates a new serialization error.
    pub fn serialization() -> Self {
        Self::new(ErrorKind::Serialization)
    }

    /// Creates a new storage error.
    pub fn storage() -> Self {
        Self::new(ErrorKind::Storage)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new unsupported error.
    pub fn unsupported() -> Self {
        Self::new(ErrorKind::Unsupported)
    }

    /// Creates a new unknown error.
    pub fn unknown() -> Self {
        Self::new(ErrorKind::Unknown)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns `true` if the session was invalidated by this error.
    pub fn is_authorization(&self) -> bool {
        self.kind == ErrorKind::Authorization
    }

    /// Returns `true` for transient failures the user may retry by hand.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::NetworkError | ErrorKind::Timeout | ErrorKind::ServiceUnavailable
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization()
            .with_message(err.to_string())
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let error = Error::authentication().with_message("Invalid credentials");
        assert_eq!(error.to_string(), "authentication: Invalid credentials");
        assert_eq!(Error::not_found().to_string(), "not_found");
    }

    #[test]
    fn test_field_errors_accumulate() {
        let error = Error::invalid_input()
            .with_field_error("email", "Enter a valid email address.")
            .with_field_error("email", "This field is required.")
            .with_field_error("username", "Already taken.");

        assert_eq!(error.field_errors["email"].len(), 2);
        assert_eq!(error.field_errors["username"], vec!["Already taken."]);
    }

    #[test]
    fn test_classification() {
        assert!(Error::authorization().is_authorization());
        assert!(Error::timeout().is_transient());
        assert!(Error::service_unavailable().is_transient());
        assert!(!Error::invalid_input().is_transient());
        assert_eq!(ErrorKind::RateLimited.into_error().kind_str(), "rate_limited");
    }
}
