//! Account and authentication endpoints.

use klararety_core::types::{
    AuthGrant, Credentials, LoginResponse, ProfileUpdate, Registration, TwoFactorSetup, User,
    UserId,
};
use klararety_core::{AuthProvider, Result};
use reqwest::Method;
use serde::Serialize;

use crate::intercept::LOGOUT_ENDPOINT;
use crate::{ApiClient, TRACING_TARGET_API};

#[derive(Serialize)]
struct VerifyTwoFactorBody<'a> {
    user_id: UserId,
    token: &'a str,
}

#[derive(Serialize)]
struct ConfirmTwoFactorBody<'a> {
    token: &'a str,
}

#[derive(Serialize)]
struct DisableTwoFactorBody<'a> {
    password: &'a str,
}

#[async_trait::async_trait]
impl AuthProvider for ApiClient {
    #[tracing::instrument(skip_all, target = TRACING_TARGET_API, fields(username = %credentials.username))]
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        self.post("users/login/", credentials).await
    }

    #[tracing::instrument(skip_all, target = TRACING_TARGET_API, fields(user_id = %user_id))]
    async fn verify_two_factor(&self, user_id: UserId, code: &str) -> Result<AuthGrant> {
        let body = VerifyTwoFactorBody {
            user_id,
            token: code,
        };
        self.post("users/verify-2fa/", &body).await
    }

    async fn register(&self, registration: &Registration) -> Result<User> {
        self.post("users/", registration).await
    }

    async fn logout(&self) -> Result<()> {
        self.send(Method::POST, LOGOUT_ENDPOINT, None).await
    }

    async fn current_user(&self) -> Result<User> {
        self.get("users/me/").await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        self.patch("users/me/", update).await
    }

    async fn setup_two_factor(&self) -> Result<TwoFactorSetup> {
        self.post_with("users/setup-2fa/", &[]).await
    }

    async fn confirm_two_factor(&self, code: &str) -> Result<()> {
        let body = ConfirmTwoFactorBody { token: code };
        let _: serde_json::Value = self.post("users/confirm-2fa/", &body).await?;
        Ok(())
    }

    async fn disable_two_factor(&self, password: &str) -> Result<()> {
        let body = DisableTwoFactorBody { password };
        let _: serde_json::Value = self.post("users/disable-2fa/", &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use klararety_core::ErrorKind;
    use klararety_core::types::Role;

    use klararety_core::mock::MockAuthProvider;
    use klararety_core::types::SessionToken;

    use super::*;
    use crate::test_server::{TestServer, client_for};

    #[tokio::test]
    async fn test_logout_with_stale_token_redirects_without_notice() {
        let server = TestServer::start(vec![(
            "/api/users/logout/",
            401,
            r#"{"detail": "Invalid token."}"#,
        )])
        .await;
        let (client, notifier, navigator) = client_for(&server);
        client
            .store()
            .set(&SessionToken::new("stale"), &MockAuthProvider::patient(1))
            .unwrap();

        let error = AuthProvider::logout(&client).await.unwrap_err();
        assert!(error.is_authorization());
        assert!(client.store().session().is_none());
        assert_eq!(navigator.locations(), vec!["/login"]);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_login_with_token() {
        let server = TestServer::start(vec![(
            "/api/users/login/",
            200,
            r#"{"token": "tok", "user": {"id": 5, "username": "doc", "role": "provider"}}"#,
        )])
        .await;
        let (client, _, _) = client_for(&server);

        let response = client
            .login(&Credentials::new("doc", "secret"))
            .await
            .unwrap();
        let LoginResponse::Authenticated(grant) = response else {
            panic!("expected a token");
        };
        assert_eq!(grant.user.role, Role::Provider);

        let request = server.last_request().unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(
            request.json(),
            serde_json::json!({"username": "doc", "password": "secret"})
        );
    }

    #[tokio::test]
    async fn test_login_requiring_two_factor() {
        let server = TestServer::start(vec![
            ("/api/users/login/", 200, r#"{"requires_2fa": true, "user_id": 42}"#),
            (
                "/api/users/verify-2fa/",
                200,
                r#"{"token": "tok", "user": {"id": 42, "username": "p", "role": "patient"}}"#,
            ),
        ])
        .await;
        let (client, _, _) = client_for(&server);

        let response = client.login(&Credentials::new("p", "pw")).await.unwrap();
        assert!(matches!(
            response,
            LoginResponse::TwoFactorRequired(ref c) if c.user_id == UserId(42)
        ));

        let grant = client.verify_two_factor(UserId(42), "123456").await.unwrap();
        assert_eq!(grant.user.id, UserId(42));
        assert_eq!(
            server.request_to("/api/users/verify-2fa/").unwrap().json(),
            serde_json::json!({"user_id": 42, "token": "123456"})
        );
    }

    #[tokio::test]
    async fn test_bad_credentials_are_invalid_input() {
        let server = TestServer::start(vec![(
            "/api/users/login/",
            400,
            r#"{"non_field_errors": ["Unable to log in with provided credentials."]}"#,
        )])
        .await;
        let (client, _, navigator) = client_for(&server);

        let error = client
            .login(&Credentials::new("p", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
        assert!(navigator.locations().is_empty());
    }

    #[tokio::test]
    async fn test_two_factor_endpoints() {
        let server = TestServer::start(vec![
            ("/api/users/setup-2fa/", 200, r#"{"qr_code": "<svg/>"}"#),
            ("/api/users/confirm-2fa/", 200, r#"{"detail": "2FA enabled"}"#),
            ("/api/users/disable-2fa/", 200, ""),
        ])
        .await;
        let (client, _, _) = client_for(&server);

        let setup = client.setup_two_factor().await.unwrap();
        assert_eq!(setup.qr_code.as_deref(), Some("<svg/>"));
        client.confirm_two_factor("123456").await.unwrap();
        client.disable_two_factor("pw").await.unwrap();

        assert_eq!(
            server.request_to("/api/users/disable-2fa/").unwrap().json(),
            serde_json::json!({"password": "pw"})
        );
    }

    #[tokio::test]
    async fn test_update_profile_sends_only_set_fields() {
        let server = TestServer::start(vec![(
            "/api/users/me/",
            200,
            r#"{"id": 1, "username": "p", "first_name": "Ada", "role": "patient"}"#,
        )])
        .await;
        let (client, _, _) = client_for(&server);

        let update = ProfileUpdate {
            first_name: Some("Ada".to_owned()),
            ..ProfileUpdate::default()
        };
        let user = client.update_profile(&update).await.unwrap();
        assert_eq!(user.first_name, "Ada");

        let request = server.last_request().unwrap();
        assert_eq!(request.method, "PATCH");
        assert_eq!(request.json(), serde_json::json!({"first_name": "Ada"}));
    }
}
