//! Backend authentication contract.

use crate::Result;
use crate::types::{
    AuthGrant, Credentials, LoginResponse, ProfileUpdate, Registration, TwoFactorSetup, User,
    UserId,
};

/// Core trait for the backend's account and authentication endpoints.
///
/// Implementations attach the current session token themselves; callers never
/// pass it explicitly. An implementation backed by HTTP must invalidate the
/// local session when the backend rejects the token.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Submits username and password.
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse>;

    /// Submits the one-time code for a pending two-factor challenge.
    async fn verify_two_factor(&self, user_id: UserId, code: &str) -> Result<AuthGrant>;

    /// Creates a new account.
    async fn register(&self, registration: &Registration) -> Result<User>;

    /// Revokes the current token on the backend.
    async fn logout(&self) -> Result<()>;

    /// Fetches the authenticated user.
    async fn current_user(&self) -> Result<User>;

    /// Applies a partial profile update and returns the updated user.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User>;

    /// Starts two-factor enrolment.
    async fn setup_two_factor(&self) -> Result<TwoFactorSetup>;

    /// Completes two-factor enrolment with a code from the authenticator.
    async fn confirm_two_factor(&self, code: &str) -> Result<()>;

    /// Turns two-factor authentication off; requires the account password.
    async fn disable_two_factor(&self, password: &str) -> Result<()>;
}
