//! Mock implementations of the provider traits for testing.
//!
//! # Feature Flag
//!
//! This module is only available when the `test-utils` feature is enabled:
//!
//! ```toml
//! [dev-dependencies]
//! klararety-core = { version = "...", features = ["test-utils"] }
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use klararety_core::mock::MockAuthProvider;
//!
//! let provider = MockAuthProvider::new(MockAuthProvider::patient(42))
//!     .with_password("correct horse")
//!     .with_two_factor_code("123456");
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use crate::notify::{Navigator, Notice, Notifier};
use crate::types::{
    AuthGrant, Credentials, LoginResponse, ProfileUpdate, Registration, Role, SessionToken,
    TwoFactorRequired, TwoFactorSetup, User, UserId,
};
use crate::{AuthProvider, Error, ErrorKind, Result};

#[derive(Debug)]
struct MockState {
    user: User,
    password: String,
    token: String,
    two_factor_code: String,
    logout_error: Option<ErrorKind>,
    current_user_error: Option<ErrorKind>,
    calls: Vec<&'static str>,
}

/// In-memory backend with a single account.
///
/// Login requires a second factor whenever the account has
/// `two_factor_enabled` set, mirroring the real backend.
#[derive(Debug, Clone)]
pub struct MockAuthProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockAuthProvider {
    /// Creates a mock backend holding `user` with password `password`.
    pub fn new(user: User) -> Self {
        let state = MockState {
            user,
            password: "password".to_owned(),
            token: "mock-token".to_owned(),
            two_factor_code: "123456".to_owned(),
            logout_error: None,
            current_user_error: None,
            calls: Vec::new(),
        };

        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Returns a patient account with the given id.
    pub fn patient(id: u64) -> User {
        User {
            id: UserId(id),
            username: format!("patient{id}"),
            email: format!("patient{id}@example.com"),
            first_name: "Pat".to_owned(),
            last_name: "Ient".to_owned(),
            role: Role::Patient,
            two_factor_enabled: false,
        }
    }

    pub fn with_password(self, password: impl Into<String>) -> Self {
        self.lock().password = password.into();
        self
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.lock().token = token.into();
        self
    }

    pub fn with_two_factor_code(self, code: impl Into<String>) -> Self {
        self.lock().two_factor_code = code.into();
        self
    }

    /// Makes the account require a second factor on login.
    pub fn with_two_factor_enabled(self) -> Self {
        self.lock().user.two_factor_enabled = true;
        self
    }

    /// Makes `logout` fail with the given kind.
    pub fn failing_logout(self, kind: ErrorKind) -> Self {
        self.lock().logout_error = Some(kind);
        self
    }

    /// Makes `current_user` fail with the given kind.
    pub fn failing_current_user(&self, kind: Option<ErrorKind>) {
        self.lock().current_user_error = kind;
    }

    /// Returns the account as the backend currently sees it.
    pub fn user(&self) -> User {
        self.lock().user.clone()
    }

    /// Returns the names of the operations called so far.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: &'static str) -> MutexGuard<'_, MockState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }
}

#[async_trait::async_trait]
impl AuthProvider for MockAuthProvider {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let state = self.record("login");
        if credentials.username != state.user.username || credentials.password != state.password {
            return Err(Error::authentication().with_message("Invalid credentials"));
        }

        if state.user.two_factor_enabled {
            return Ok(LoginResponse::TwoFactorRequired(TwoFactorRequired {
                requires_2fa: true,
                user_id: state.user.id,
            }));
        }

        Ok(LoginResponse::Authenticated(AuthGrant {
            token: SessionToken::new(state.token.clone()),
            user: state.user.clone(),
        }))
    }

    async fn verify_two_factor(&self, user_id: UserId, code: &str) -> Result<AuthGrant> {
        let state = self.record("verify_two_factor");
        if user_id != state.user.id || code != state.two_factor_code {
            return Err(Error::authentication().with_message("Invalid verification code"));
        }

        Ok(AuthGrant {
            token: SessionToken::new(state.token.clone()),
            user: state.user.clone(),
        })
    }

    async fn register(&self, registration: &Registration) -> Result<User> {
        let state = self.record("register");
        if registration.password != registration.password_confirm {
            return Err(Error::invalid_input()
                .with_field_error("password_confirm", "Passwords do not match."));
        }

        Ok(User {
            id: UserId(state.user.id.0 + 1),
            username: registration.username.clone(),
            email: registration.email.clone(),
            first_name: registration.first_name.clone(),
            last_name: registration.last_name.clone(),
            role: registration.role,
            two_factor_enabled: false,
        })
    }

    async fn logout(&self) -> Result<()> {
        let state = self.record("logout");
        match state.logout_error {
            Some(kind) => Err(Error::new(kind)),
            None => Ok(()),
        }
    }

    async fn current_user(&self) -> Result<User> {
        let state = self.record("current_user");
        match state.current_user_error {
            Some(kind) => Err(Error::new(kind)),
            None => Ok(state.user.clone()),
        }
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let mut state = self.record("update_profile");
        if let Some(email) = &update.email {
            state.user.email = email.clone();
        }
        if let Some(first_name) = &update.first_name {
            state.user.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            state.user.last_name = last_name.clone();
        }
        Ok(state.user.clone())
    }

    async fn setup_two_factor(&self) -> Result<TwoFactorSetup> {
        let _state = self.record("setup_two_factor");
        Ok(TwoFactorSetup {
            secret: Some("JBSWY3DPEHPK3PXP".to_owned()),
            qr_code: Some("<svg/>".to_owned()),
        })
    }

    async fn confirm_two_factor(&self, code: &str) -> Result<()> {
        let mut state = self.record("confirm_two_factor");
        if code != state.two_factor_code {
            return Err(Error::authentication().with_message("Invalid verification code"));
        }
        state.user.two_factor_enabled = true;
        Ok(())
    }

    async fn disable_two_factor(&self, password: &str) -> Result<()> {
        let mut state = self.record("disable_two_factor");
        if password != state.password {
            return Err(Error::authentication().with_message("Incorrect password"));
        }
        state.user.two_factor_enabled = false;
        Ok(())
    }
}

/// [`Notifier`] that keeps every notice for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notice);
    }
}

/// [`Navigator`] that keeps every location for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    locations: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn locations(&self) -> Vec<String> {
        self.locations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, location: &str) {
        self.locations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(location.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_requires_second_factor_when_enabled() {
        let provider = MockAuthProvider::new(MockAuthProvider::patient(42)).with_two_factor_enabled();
        let response = provider
            .login(&Credentials::new("patient42", "password"))
            .await
            .unwrap();
        assert!(matches!(response, LoginResponse::TwoFactorRequired(_)));
        assert_eq!(provider.calls(), vec!["login"]);
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let provider = MockAuthProvider::new(MockAuthProvider::patient(1));
        let error = provider
            .login(&Credentials::new("patient1", "nope"))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Authentication);
    }
}
