//! Authentication state machine.
//!
//! [`SessionManager`] is the single owner of the authentication state of a
//! client. It composes the backend [`AuthProvider`], the [`SessionStore`] and
//! the [`IdleTimer`], and exposes the login, two-factor and logout flows as
//! well as the account mutations that keep the cached user snapshot in sync.
//!
//! ```text
//! Anonymous ──login──▶ Authenticating ──2FA required──▶ TwoFactorPending
//!     ▲                      │                                │
//!     │                      └──────────token─────────┐   verify
//!     │                                               ▼       │
//!     └──────────────logout / idle / 401────── Authenticated ◀┘
//! ```

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use klararety_core::types::{
    AuthGrant, Credentials, LoginOutcome, LoginResponse, ProfileUpdate, Registration,
    TwoFactorSetup, User, UserId,
};
use klararety_core::{AuthProvider, Error, ErrorKind, Navigator, Result};

use crate::guard::LOGIN_PATH;
use crate::idle::{IdleHandler, IdleTimer, InteractionEvent};
use crate::store::SessionStore;
use crate::TRACING_TARGET_MANAGER;

/// Login that passed the password check and awaits a one-time code.
///
/// Lives only in memory; it is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTwoFactorChallenge {
    pub user_id: UserId,
    pub failed_attempts: u32,
}

impl PendingTwoFactorChallenge {
    fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            failed_attempts: 0,
        }
    }
}

/// Authentication state of the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Anonymous,
    /// A login request is in flight.
    Authenticating,
    TwoFactorPending(PendingTwoFactorChallenge),
    Authenticated(User),
}

impl AuthState {
    /// Returns the state name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Authenticating => "authenticating",
            Self::TwoFactorPending(_) => "two_factor_pending",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

struct SessionManagerInner {
    provider: Arc<dyn AuthProvider>,
    store: SessionStore,
    idle: IdleTimer,
    navigator: Arc<dyn Navigator>,
    state: Mutex<AuthState>,
}

/// Logs the manager out when the idle countdown expires.
struct IdleLogout {
    manager: Weak<SessionManagerInner>,
}

#[async_trait::async_trait]
impl IdleHandler for IdleLogout {
    async fn on_idle(&self) {
        if let Some(inner) = self.manager.upgrade() {
            SessionManager { inner }.logout().await;
        }
    }
}

/// Session manager service.
///
/// Cheap to clone; all clones share one state. Constructed once by the host
/// and torn down with [`dispose`](Self::dispose).
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionManagerInner>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.lock_state().name())
            .field("store", &self.inner.store)
            .field("idle", &self.inner.idle)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager in the [`AuthState::Anonymous`] state.
    ///
    /// The idle timeout equals the configured session lifetime of `store`.
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        store: SessionStore,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let timeout = store.config().session_duration();
        let inner = Arc::new_cyclic(|weak| {
            let handler = Arc::new(IdleLogout {
                manager: weak.clone(),
            });

            SessionManagerInner {
                provider,
                store,
                idle: IdleTimer::new(timeout, handler),
                navigator,
                state: Mutex::new(AuthState::Anonymous),
            }
        });

        Self { inner }
    }

    /// Restores a persisted session and re-validates it against the backend.
    ///
    /// A rejected token leaves the manager anonymous. Any other failure keeps
    /// the cached snapshot so that an offline start does not log the user out.
    pub async fn init(&self) -> Result<Option<User>> {
        let Some(session) = self.inner.store.session() else {
            self.set_state(AuthState::Anonymous);
            tracing::debug!(target: TRACING_TARGET_MANAGER, "No persisted session");
            return Ok(None);
        };

        self.set_state(AuthState::Authenticated(session.user.clone()));
        self.inner.idle.start();

        tracing::info!(
            target: TRACING_TARGET_MANAGER,
            user_id = %session.user.id,
            "Restored persisted session"
        );

        match self.inner.provider.current_user().await {
            Ok(user) => self.resync(user).map(Some),
            Err(err) if err.is_authorization() => {
                self.session_rejected();
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_MANAGER,
                    error = %err,
                    "Could not revalidate session, keeping cached user"
                );
                Ok(Some(session.user))
            }
        }
    }

    /// Stops the idle timer and releases its listeners without logging out.
    pub fn dispose(&self) {
        self.inner.idle.stop();
        tracing::debug!(target: TRACING_TARGET_MANAGER, "Session manager disposed");
    }

    /// Submits credentials.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::InvalidState`] when already authenticated or
    /// when another login is in flight. Backend errors are returned as is and
    /// leave the manager anonymous.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome> {
        {
            let mut state = self.lock_state();
            match &*state {
                AuthState::Authenticated(_) => {
                    return Err(Error::invalid_state().with_message("Already logged in"));
                }
                AuthState::Authenticating => {
                    return Err(Error::invalid_state().with_message("A login is already in progress"));
                }
                AuthState::Anonymous | AuthState::TwoFactorPending(_) => {}
            }
            *state = AuthState::Authenticating;
        }

        tracing::info!(
            target: TRACING_TARGET_MANAGER,
            username = %credentials.username,
            "Logging in"
        );

        let response = match self.inner.provider.login(credentials).await {
            Ok(response) => response,
            Err(err) => {
                self.replace_state_if(|s| matches!(s, AuthState::Authenticating), AuthState::Anonymous);
                tracing::info!(
                    target: TRACING_TARGET_MANAGER,
                    error = %err,
                    "Login rejected"
                );
                return Err(err);
            }
        };

        match response {
            LoginResponse::Authenticated(grant) => {
                let user = self.establish(grant, |s| matches!(s, AuthState::Authenticating))?;
                Ok(LoginOutcome::Authenticated(user))
            }
            LoginResponse::TwoFactorRequired(challenge) if challenge.requires_2fa => {
                let pending = AuthState::TwoFactorPending(PendingTwoFactorChallenge::new(
                    challenge.user_id,
                ));
                if !self.replace_state_if(|s| matches!(s, AuthState::Authenticating), pending) {
                    return Err(Error::invalid_state().with_message("Login was interrupted"));
                }

                tracing::info!(
                    target: TRACING_TARGET_MANAGER,
                    user_id = %challenge.user_id,
                    "Two-factor verification required"
                );
                Ok(LoginOutcome::TwoFactorRequired {
                    user_id: challenge.user_id,
                })
            }
            LoginResponse::TwoFactorRequired(_) => {
                self.replace_state_if(|s| matches!(s, AuthState::Authenticating), AuthState::Anonymous);
                Err(Error::authentication().with_message("Login response did not include a token"))
            }
        }
    }

    /// Completes a pending login with a one-time code.
    ///
    /// A rejected code keeps the challenge for another try until the
    /// configured attempt limit is reached; the challenge is then discarded
    /// and [`ErrorKind::RateLimited`] is returned.
    pub async fn verify_two_factor(&self, code: &str) -> Result<User> {
        let user_id = match &*self.lock_state() {
            AuthState::TwoFactorPending(challenge) => challenge.user_id,
            _ => {
                return Err(
                    Error::invalid_state().with_message("No two-factor verification is pending")
                );
            }
        };

        let code = code.trim();
        if code.is_empty() {
            return Err(Error::invalid_input().with_message("Verification code is required"));
        }

        let is_challenge = move |state: &AuthState| {
            matches!(state, AuthState::TwoFactorPending(c) if c.user_id == user_id)
        };

        match self.inner.provider.verify_two_factor(user_id, code).await {
            Ok(grant) => self.establish(grant, is_challenge),
            Err(err) if matches!(err.kind(), ErrorKind::Authentication | ErrorKind::InvalidInput) => {
                Err(self.reject_code(user_id, err))
            }
            Err(err) => Err(err),
        }
    }

    /// Ends the session.
    ///
    /// The backend is asked to revoke the token, but local state is cleared
    /// whatever the outcome.
    ///
    /// A revocation rejected as unauthorized has already redirected to the
    /// login page, so no second redirect is issued.
    pub async fn logout(&self) {
        let mut redirected = false;
        if self.inner.store.is_authenticated()
            && let Err(err) = self.inner.provider.logout().await
        {
            redirected = err.is_authorization();
            tracing::warn!(
                target: TRACING_TARGET_MANAGER,
                error = %err,
                "Backend logout failed, clearing local session anyway"
            );
        }

        self.inner.store.clear();
        self.inner.idle.stop();
        self.set_state(AuthState::Anonymous);
        if !redirected {
            self.inner.navigator.navigate(LOGIN_PATH);
        }

        tracing::info!(target: TRACING_TARGET_MANAGER, "Logged out");
    }

    /// Creates an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> Result<User> {
        let user = self.inner.provider.register(registration).await?;
        tracing::info!(
            target: TRACING_TARGET_MANAGER,
            user_id = %user.id,
            role = %user.role,
            "Account registered"
        );
        Ok(user)
    }

    /// Re-fetches the user snapshot from the backend.
    pub async fn refresh_user(&self) -> Result<User> {
        self.require_authenticated()?;
        let user = self.observe(self.inner.provider.current_user().await)?;
        self.resync(user)
    }

    /// Updates the profile and re-persists the returned snapshot.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let current = self.require_authenticated()?;
        if update.is_empty() {
            return Ok(current);
        }

        let user = self.observe(self.inner.provider.update_profile(update).await)?;
        tracing::info!(
            target: TRACING_TARGET_MANAGER,
            user_id = %user.id,
            "Profile updated"
        );
        self.resync(user)
    }

    /// Starts two-factor enrolment and returns the provisioning material.
    pub async fn setup_two_factor(&self) -> Result<TwoFactorSetup> {
        self.require_authenticated()?;
        let setup = self.observe(self.inner.provider.setup_two_factor().await)?;
        self.sync_two_factor(None).await?;
        Ok(setup)
    }

    /// Confirms enrolment with a code from the authenticator app.
    pub async fn confirm_two_factor(&self, code: &str) -> Result<User> {
        self.require_authenticated()?;
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::invalid_input().with_message("Verification code is required"));
        }

        self.observe(self.inner.provider.confirm_two_factor(code).await)?;
        tracing::info!(target: TRACING_TARGET_MANAGER, "Two-factor authentication enabled");
        self.sync_two_factor(Some(true)).await
    }

    /// Disables two-factor authentication after re-checking the password.
    pub async fn disable_two_factor(&self, password: &str) -> Result<User> {
        self.require_authenticated()?;
        if password.is_empty() {
            return Err(Error::invalid_input().with_message("Password is required"));
        }

        self.observe(self.inner.provider.disable_two_factor(password).await)?;
        tracing::info!(target: TRACING_TARGET_MANAGER, "Two-factor authentication disabled");
        self.sync_two_factor(Some(false)).await
    }

    /// Forwards a user interaction to the idle timer and extends the session.
    ///
    /// Returns `false` if the interaction was ignored.
    pub fn record_interaction(&self, event: InteractionEvent) -> bool {
        if !self.inner.idle.record(event) {
            return false;
        }

        if let Err(err) = self.inner.store.touch() {
            tracing::warn!(
                target: TRACING_TARGET_MANAGER,
                error = %err,
                "Failed to extend session"
            );
        }
        true
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> AuthState {
        self.lock_state().clone()
    }

    /// Returns the authenticated user.
    pub fn current_user(&self) -> Option<User> {
        match &*self.lock_state() {
            AuthState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.lock_state(), AuthState::Authenticated(_))
    }

    /// Returns the pending two-factor challenge, if any.
    pub fn pending_challenge(&self) -> Option<PendingTwoFactorChallenge> {
        match &*self.lock_state() {
            AuthState::TwoFactorPending(challenge) => Some(*challenge),
            _ => None,
        }
    }

    /// Returns the underlying session store.
    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    /// Returns `true` while the idle countdown is armed.
    pub fn is_idle_timer_armed(&self) -> bool {
        self.inner.idle.is_armed()
    }

    fn require_authenticated(&self) -> Result<User> {
        self.current_user()
            .ok_or_else(|| Error::invalid_state().with_message("Not logged in"))
    }

    /// Persists the grant and enters `Authenticated` if `expected` still holds.
    fn establish(&self, grant: AuthGrant, expected: impl Fn(&AuthState) -> bool) -> Result<User> {
        {
            let mut state = self.lock_state();
            if !expected(&state) {
                return Err(Error::invalid_state().with_message("Login was interrupted"));
            }

            if let Err(err) = self.inner.store.set(&grant.token, &grant.user) {
                *state = AuthState::Anonymous;
                return Err(err);
            }
            *state = AuthState::Authenticated(grant.user.clone());
        }

        self.inner.idle.start();
        tracing::info!(
            target: TRACING_TARGET_MANAGER,
            user_id = %grant.user.id,
            role = %grant.user.role,
            "Logged in"
        );
        Ok(grant.user)
    }

    fn reject_code(&self, user_id: UserId, err: Error) -> Error {
        let max_attempts = self.inner.store.config().two_factor_max_attempts.max(1);
        let mut state = self.lock_state();

        let AuthState::TwoFactorPending(challenge) = &mut *state else {
            return err;
        };
        if challenge.user_id != user_id {
            return err;
        }

        challenge.failed_attempts += 1;
        let attempts = challenge.failed_attempts;
        if attempts < max_attempts {
            tracing::info!(
                target: TRACING_TARGET_MANAGER,
                user_id = %user_id,
                attempts,
                "Verification code rejected"
            );
            return err;
        }

        *state = AuthState::Anonymous;
        tracing::warn!(
            target: TRACING_TARGET_MANAGER,
            user_id = %user_id,
            attempts,
            "Too many rejected verification codes, challenge discarded"
        );
        Error::rate_limited()
            .with_message("Too many invalid verification codes. Please log in again.")
            .with_source(err)
    }

    /// Re-fetches the snapshot after a two-factor change.
    ///
    /// If the backend cannot be read, the flag the mutation is known to have
    /// set is applied to the cached snapshot instead.
    async fn sync_two_factor(&self, enabled: Option<bool>) -> Result<User> {
        match self.inner.provider.current_user().await {
            Ok(user) => self.resync(user),
            Err(err) if err.is_authorization() => {
                self.session_rejected();
                Err(err)
            }
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_MANAGER,
                    error = %err,
                    "Could not re-fetch user, patching cached snapshot"
                );
                let mut user = self.require_authenticated()?;
                if let Some(enabled) = enabled {
                    user.two_factor_enabled = enabled;
                }
                self.resync(user)
            }
        }
    }

    /// Replaces the snapshot and re-persists it with the existing token.
    fn resync(&self, user: User) -> Result<User> {
        let mut state = self.lock_state();
        if !matches!(*state, AuthState::Authenticated(_)) {
            return Err(Error::invalid_state().with_message("Session ended during the update"));
        }

        let Some(token) = self.inner.store.token() else {
            *state = AuthState::Anonymous;
            drop(state);
            self.inner.idle.stop();
            return Err(Error::authorization().with_message("Session has expired"));
        };

        self.inner.store.set(&token, &user)?;
        *state = AuthState::Authenticated(user.clone());
        Ok(user)
    }

    /// Drops to `Anonymous` after the backend rejected the session.
    ///
    /// Persisted entries are owned by the HTTP layer, which clears them on
    /// the same response.
    fn session_rejected(&self) {
        self.set_state(AuthState::Anonymous);
        self.inner.idle.stop();
        tracing::info!(target: TRACING_TARGET_MANAGER, "Session rejected by backend");
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result
            && err.is_authorization()
        {
            self.session_rejected();
        }
        result
    }

    fn replace_state_if(&self, expected: impl Fn(&AuthState) -> bool, next: AuthState) -> bool {
        let mut state = self.lock_state();
        if !expected(&state) {
            return false;
        }
        *state = next;
        true
    }

    fn set_state(&self, next: AuthState) {
        *self.lock_state() = next;
    }

    fn lock_state(&self) -> MutexGuard<'_, AuthState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
