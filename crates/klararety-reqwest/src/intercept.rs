//! Response interception.
//!
//! Every failed exchange goes through [`ResponseInterceptor`], which is the
//! single place where an unauthorized response ends the session. Server and
//! network failures only produce a notice; the session is left untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use klararety_core::{Error, Navigator, Notice, Notifier};
use klararety_session::{LOGIN_PATH, SessionStore};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::TRACING_TARGET_INTERCEPT;

/// Notice shown when the backend rejects the session token.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Notice shown on any 5xx response.
pub const SERVER_ERROR_MESSAGE: &str = "A server error occurred. Please try again later.";

/// Notice shown when the backend cannot be reached.
pub const NETWORK_ERROR_MESSAGE: &str = "Unable to reach the server. Check your connection and try again.";

/// Token revocation endpoint; a 401 there means the session was already gone.
pub(crate) const LOGOUT_ENDPOINT: &str = "users/logout/";

/// Conventional error body of the backend.
///
/// Validation failures list messages per field; other failures carry a
/// single `detail`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    non_field_errors: Vec<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, serde_json::Value>,
}

impl ErrorBody {
    fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    /// Message to show the user: `detail`, else the first non-field error.
    fn message(&self) -> Option<&str> {
        self.detail
            .as_deref()
            .or_else(|| self.non_field_errors.first().map(String::as_str))
    }

    fn field_messages(&self) -> impl Iterator<Item = (&str, String)> {
        self.fields.iter().flat_map(|(field, value)| {
            let messages: Vec<String> = match value {
                serde_json::Value::String(s) => vec![s.clone()],
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
                _ => Vec::new(),
            };
            messages.into_iter().map(move |m| (field.as_str(), m))
        })
    }
}

/// Applies the session and notification side effects of failed requests.
pub(crate) struct ResponseInterceptor {
    store: SessionStore,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
}

impl ResponseInterceptor {
    pub fn new(
        store: SessionStore,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            store,
            notifier,
            navigator,
        }
    }

    /// Sends the user to `location` through the host navigator.
    pub fn navigate(&self, location: &str) {
        self.navigator.navigate(location);
    }

    /// Converts a non-success response into an error, applying side effects.
    pub fn on_status(&self, method: &str, path: &str, status: StatusCode, body: &[u8]) -> Error {
        let parsed = ErrorBody::parse(body);
        let message = parsed.message().map(str::to_owned);

        tracing::debug!(
            target: TRACING_TARGET_INTERCEPT,
            method,
            path,
            status = status.as_u16(),
            "Request failed"
        );

        if status == StatusCode::UNAUTHORIZED {
            self.store.clear();
            if path != LOGOUT_ENDPOINT {
                self.notifier.notify(Notice::error(SESSION_EXPIRED_MESSAGE));
            }
            self.navigator.navigate(LOGIN_PATH);

            tracing::info!(
                target: TRACING_TARGET_INTERCEPT,
                path,
                "Session rejected by backend, cleared"
            );
            return Error::authorization()
                .with_message(message.unwrap_or_else(|| SESSION_EXPIRED_MESSAGE.to_owned()));
        }

        if status.is_server_error() {
            self.notifier.notify(Notice::error(SERVER_ERROR_MESSAGE));
        }
        if let Some(detail) = &parsed.detail {
            self.notifier.notify(Notice::error(detail.clone()));
        }

        let mut error = match status {
            s if s.is_server_error() => Error::service_unavailable(),
            StatusCode::FORBIDDEN => Error::forbidden(),
            StatusCode::NOT_FOUND => Error::not_found(),
            StatusCode::TOO_MANY_REQUESTS => Error::rate_limited(),
            _ => Error::invalid_input(),
        };

        error = error.with_message(
            message.unwrap_or_else(|| format!("{method} {path} failed with status {status}")),
        );
        for (field, text) in parsed.field_messages() {
            error = error.with_field_error(field, text);
        }
        error
    }

    /// Converts a transport failure into an error and notifies the user.
    pub fn on_transport(&self, method: &str, path: &str, error: crate::error::Error) -> Error {
        let error = Error::from(error);
        if error.is_transient() {
            self.notifier.notify(Notice::error(NETWORK_ERROR_MESSAGE));
        }

        tracing::warn!(
            target: TRACING_TARGET_INTERCEPT,
            method,
            path,
            error = %error,
            "Request could not be completed"
        );
        error
    }
}

#[cfg(test)]
mod tests {
    use klararety_core::mock::{MockAuthProvider, RecordingNavigator, RecordingNotifier};
    use klararety_core::types::SessionToken;
    use klararety_core::{ErrorKind, NoticeLevel};
    use klararety_session::SessionConfig;

    use super::*;

    struct Fixture {
        interceptor: ResponseInterceptor,
        store: SessionStore,
        notifier: RecordingNotifier,
        navigator: RecordingNavigator,
    }

    fn fixture() -> Fixture {
        let store = SessionStore::in_memory(SessionConfig::default());
        store
            .set(&SessionToken::new("t"), &MockAuthProvider::patient(1))
            .unwrap();
        let notifier = RecordingNotifier::default();
        let navigator = RecordingNavigator::default();
        let interceptor = ResponseInterceptor::new(
            store.clone(),
            Arc::new(notifier.clone()),
            Arc::new(navigator.clone()),
        );
        Fixture {
            interceptor,
            store,
            notifier,
            navigator,
        }
    }

    #[test]
    fn test_unauthorized_clears_session_and_redirects() {
        let f = fixture();
        let error = f.interceptor.on_status(
            "GET",
            "healthcare/medications/",
            StatusCode::UNAUTHORIZED,
            br#"{"detail": "Invalid token."}"#,
        );

        assert_eq!(error.kind(), ErrorKind::Authorization);
        assert!(f.store.session().is_none());
        assert_eq!(f.navigator.locations(), vec!["/login"]);

        let notices = f.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn test_unauthorized_logout_is_silent() {
        let f = fixture();
        let error = f.interceptor.on_status(
            "POST",
            LOGOUT_ENDPOINT,
            StatusCode::UNAUTHORIZED,
            br#"{"detail": "Invalid token."}"#,
        );

        assert!(error.is_authorization());
        assert!(f.store.session().is_none());
        assert_eq!(f.navigator.locations(), vec!["/login"]);
        assert!(f.notifier.notices().is_empty());
    }

    #[test]
    fn test_server_error_keeps_session() {
        let f = fixture();
        let error = f.interceptor.on_status(
            "GET",
            "users/me/",
            StatusCode::BAD_GATEWAY,
            b"<html>bad gateway</html>",
        );

        assert_eq!(error.kind(), ErrorKind::ServiceUnavailable);
        assert!(error.is_transient());
        assert!(f.store.session().is_some());
        assert!(f.navigator.locations().is_empty());
        assert_eq!(f.notifier.notices()[0].message, SERVER_ERROR_MESSAGE);
    }

    #[test]
    fn test_validation_error_collects_fields() {
        let f = fixture();
        let error = f.interceptor.on_status(
            "POST",
            "users/",
            StatusCode::BAD_REQUEST,
            br#"{"username": ["A user with that username already exists."], "password": ["Too short.", "Too common."]}"#,
        );

        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        assert_eq!(error.field_errors["password"].len(), 2);
        assert_eq!(
            error.field_errors["username"],
            vec!["A user with that username already exists."]
        );
        assert!(f.notifier.notices().is_empty());
        assert!(f.store.session().is_some());
    }

    #[test]
    fn test_detail_is_notified() {
        let f = fixture();
        let error = f.interceptor.on_status(
            "GET",
            "audit/events/",
            StatusCode::FORBIDDEN,
            br#"{"detail": "You do not have permission to perform this action."}"#,
        );

        assert_eq!(error.kind(), ErrorKind::Forbidden);
        assert!(!error.is_authorization());
        let notices = f.notifier.notices();
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(
            notices[0].message,
            "You do not have permission to perform this action."
        );
    }

    #[test]
    fn test_non_field_error_becomes_message() {
        let f = fixture();
        let error = f.interceptor.on_status(
            "POST",
            "users/login/",
            StatusCode::BAD_REQUEST,
            br#"{"non_field_errors": ["Unable to log in with provided credentials."]}"#,
        );
        assert_eq!(
            error.message.as_deref(),
            Some("Unable to log in with provided credentials.")
        );
    }
}
