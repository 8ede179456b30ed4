//! Session and credential types.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{User, UserId};

/// Opaque bearer token issued by the backend.
///
/// The token never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value of the `Authorization` header for this token.
    pub fn authorization_header(&self) -> String {
        format!("Token {}", self.0)
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(**redacted**)")
    }
}

/// Client-held proof of authentication paired with the cached user identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: SessionToken,
    pub user: User,
    pub expires_at: Timestamp,
}

impl Session {
    /// Returns `true` if the session expired at or before `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Returns `true` if the session has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Timestamp::now())
    }
}

/// Username and password submitted to the login endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Creates a new credentials pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Token and user returned by a successful login or two-factor verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthGrant {
    pub token: SessionToken,
    pub user: User,
}

/// Backend signal that a second factor is required before a token is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoFactorRequired {
    pub requires_2fa: bool,
    pub user_id: UserId,
}

/// Response of the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoginResponse {
    /// Password accepted and no second factor configured.
    Authenticated(AuthGrant),
    /// Password accepted; a one-time code must be verified next.
    TwoFactorRequired(TwoFactorRequired),
}

/// Result of a login attempt as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A session was created for this user.
    Authenticated(User),
    /// No session yet; call `verify_two_factor` with the one-time code.
    TwoFactorRequired { user_id: UserId },
}

/// Material returned when starting two-factor enrolment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoFactorSetup {
    /// Shared secret for manual entry into an authenticator app.
    #[serde(default)]
    pub secret: Option<String>,
    /// QR code (SVG markup or data URI) encoding the provisioning URI.
    #[serde(default)]
    pub qr_code: Option<String>,
}
