//! Withings device linking and synchronisation.

use std::collections::BTreeMap;

use jiff::Span;
use jiff::civil::Date;
use klararety_core::types::{
    VitalSign, WithingsAuthorization, WithingsCallbackParams, WithingsProfile, WithingsSync,
};
use klararety_core::{Error, ErrorKind, Result};
use klararety_session::{CALLBACK_PARAM, LOGIN_PATH};
use serde::Serialize;
use url::form_urlencoded;

use super::healthcare::VitalSignQuery;
use crate::{ApiClient, TRACING_TARGET_API};

/// Page listing linked devices; every callback outcome returns there.
pub const HEALTH_DEVICES_PATH: &str = "/health-devices";

/// Number of days pulled by a default sync.
pub const DEFAULT_SYNC_WINDOW_DAYS: i64 = 30;

/// Most recent vital sign per measurement type.
pub type LatestMeasurements = BTreeMap<String, VitalSign>;

/// Result of handling the vendor's OAuth redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The backend accepted the authorization code.
    Connected,
    /// The vendor reported an error instead of a code.
    VendorError(String),
    MissingCode,
    /// No session to attach the device to.
    LoginRequired,
    /// The backend rejected the code.
    AuthorizationFailed,
}

impl CallbackOutcome {
    /// Returns where the user is sent after the callback.
    pub fn location(&self) -> String {
        let with_query = |key: &str, value: &str| {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair(key, value)
                .finish();
            format!("{HEALTH_DEVICES_PATH}?{query}")
        };

        match self {
            Self::Connected => with_query("success", "true"),
            Self::VendorError(error) => with_query("error", error),
            Self::MissingCode => with_query("error", "missing_code"),
            Self::LoginRequired => format!("{LOGIN_PATH}?{CALLBACK_PARAM}={HEALTH_DEVICES_PATH}"),
            Self::AuthorizationFailed => with_query("error", "authorization_failed"),
        }
    }
}

#[derive(Serialize)]
struct CallbackBody<'a> {
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
}

/// Keeps the newest reading of each measurement type.
pub fn latest_by_type(signs: impl IntoIterator<Item = VitalSign>) -> LatestMeasurements {
    let mut latest = LatestMeasurements::new();
    for sign in signs {
        match latest.get(&sign.measurement_type) {
            Some(current) if current.measured_at >= sign.measured_at => {}
            _ => {
                latest.insert(sign.measurement_type.clone(), sign);
            }
        }
    }
    latest
}

impl ApiClient {
    /// Returns the linked Withings profile, or `None` if no device is linked.
    pub async fn withings_profile(&self) -> Result<Option<WithingsProfile>> {
        match self.get("wearables/withings/profile/").await {
            Ok(profile) => Ok(Some(profile)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Starts linking a device; the user must visit the returned URL.
    pub async fn connect_withings(&self) -> Result<WithingsAuthorization> {
        self.get("wearables/withings/connect/").await
    }

    /// Pulls measurements for the given date range into the backend.
    pub async fn fetch_withings_data(
        &self,
        start: Option<Date>,
        end: Option<Date>,
    ) -> Result<WithingsSync> {
        let mut query = Vec::new();
        if let Some(start) = start {
            query.push(("start_date", start.to_string()));
        }
        if let Some(end) = end {
            query.push(("end_date", end.to_string()));
        }
        self.get_with("wearables/withings/fetch-data/", &query).await
    }

    /// Syncs the last `days` days and returns the newest reading per type.
    pub async fn latest_measurements(
        &self,
        today: Date,
        days: i64,
    ) -> Result<LatestMeasurements> {
        let start = today.checked_sub(Span::new().days(days)).map_err(|e| {
            Error::invalid_input()
                .with_message(format!("invalid sync window of {days} days"))
                .with_source(e)
        })?;

        let sync = self.fetch_withings_data(Some(start), Some(today)).await?;
        tracing::info!(
            target: TRACING_TARGET_API,
            saved = sync.saved_entries_ids.len(),
            %start,
            end = %today,
            "Withings data synced"
        );

        if sync.saved_entries_ids.is_empty() {
            return Ok(LatestMeasurements::new());
        }

        let query = VitalSignQuery {
            medical_record: None,
            measurement_ids: sync.saved_entries_ids,
        };
        let signs = self.vital_signs(&query).await?;
        Ok(latest_by_type(signs))
    }

    /// Completes the vendor's OAuth redirect and navigates to the outcome.
    pub async fn complete_withings_authorization(
        &self,
        params: &WithingsCallbackParams,
    ) -> CallbackOutcome {
        let outcome = self.withings_callback_outcome(params).await;
        self.navigate(&outcome.location());
        outcome
    }

    async fn withings_callback_outcome(&self, params: &WithingsCallbackParams) -> CallbackOutcome {
        if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
            return CallbackOutcome::VendorError(error.to_owned());
        }

        let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
            return CallbackOutcome::MissingCode;
        };

        if self.store().token().is_none() {
            return CallbackOutcome::LoginRequired;
        }

        let body = CallbackBody {
            code,
            state: params.state.as_deref(),
        };
        let result: Result<serde_json::Value> =
            self.post("wearables/withings/callback/", &body).await;

        match result {
            Ok(_) => {
                tracing::info!(target: TRACING_TARGET_API, "Withings device linked");
                CallbackOutcome::Connected
            }
            Err(err) if err.is_authorization() => CallbackOutcome::LoginRequired,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_API,
                    error = %err,
                    "Withings authorization failed"
                );
                CallbackOutcome::AuthorizationFailed
            }
        }
    }

    /// Unlinking a device has no backend operation yet.
    pub async fn disconnect_withings(&self) -> Result<()> {
        Err(Error::unsupported()
            .with_message("Disconnecting a Withings device is not supported yet"))
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use jiff::civil::date;
    use klararety_core::mock::MockAuthProvider;
    use klararety_core::types::SessionToken;

    use super::*;
    use crate::test_server::{TestServer, client_for};

    fn sign(id: u64, kind: &str, at: &str) -> VitalSign {
        VitalSign {
            id,
            measurement_type: kind.to_owned(),
            measured_at: at.parse::<Timestamp>().unwrap(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_latest_by_type_keeps_newest() {
        let latest = latest_by_type(vec![
            sign(1, "weight", "2025-01-01T08:00:00Z"),
            sign(2, "weight", "2025-01-03T08:00:00Z"),
            sign(3, "weight", "2025-01-02T08:00:00Z"),
            sign(4, "steps", "2025-01-01T23:00:00Z"),
        ]);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["weight"].id, 2);
        assert_eq!(latest["steps"].id, 4);
    }

    #[test]
    fn test_callback_locations() {
        assert_eq!(
            CallbackOutcome::Connected.location(),
            "/health-devices?success=true"
        );
        assert_eq!(
            CallbackOutcome::VendorError("access_denied".to_owned()).location(),
            "/health-devices?error=access_denied"
        );
        assert_eq!(
            CallbackOutcome::MissingCode.location(),
            "/health-devices?error=missing_code"
        );
        assert_eq!(
            CallbackOutcome::LoginRequired.location(),
            "/login?callbackUrl=/health-devices"
        );
        assert_eq!(
            CallbackOutcome::AuthorizationFailed.location(),
            "/health-devices?error=authorization_failed"
        );
    }

    #[tokio::test]
    async fn test_missing_profile_is_none() {
        let server = TestServer::start(vec![]).await;
        let (client, _, _) = client_for(&server);
        assert_eq!(client.withings_profile().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_callback_outcomes() {
        let server = TestServer::start(vec![("/api/wearables/withings/callback/", 200, "{}")]).await;
        let (client, _, navigator) = client_for(&server);

        let vendor_error = WithingsCallbackParams {
            error: Some("access_denied".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            client.complete_withings_authorization(&vendor_error).await,
            CallbackOutcome::VendorError("access_denied".to_owned())
        );

        let no_code = WithingsCallbackParams::default();
        assert_eq!(
            client.complete_withings_authorization(&no_code).await,
            CallbackOutcome::MissingCode
        );

        let params = WithingsCallbackParams {
            code: Some("abc".to_owned()),
            state: Some("xyz".to_owned()),
            error: None,
        };
        assert_eq!(
            client.complete_withings_authorization(&params).await,
            CallbackOutcome::LoginRequired
        );
        assert!(server.requests().is_empty());

        client
            .store()
            .set(&SessionToken::new("t"), &MockAuthProvider::patient(1))
            .unwrap();
        assert_eq!(
            client.complete_withings_authorization(&params).await,
            CallbackOutcome::Connected
        );
        assert_eq!(
            server.last_request().unwrap().json(),
            serde_json::json!({"code": "abc", "state": "xyz"})
        );
        assert_eq!(
            navigator.locations().last().map(String::as_str),
            Some("/health-devices?success=true")
        );
    }

    #[tokio::test]
    async fn test_backend_rejection_is_authorization_failed() {
        let server = TestServer::start(vec![(
            "/api/wearables/withings/callback/",
            400,
            r#"{"detail": "Invalid code"}"#,
        )])
        .await;
        let (client, _, _) = client_for(&server);
        client
            .store()
            .set(&SessionToken::new("t"), &MockAuthProvider::patient(1))
            .unwrap();

        let params = WithingsCallbackParams {
            code: Some("abc".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            client.complete_withings_authorization(&params).await,
            CallbackOutcome::AuthorizationFailed
        );
    }

    #[tokio::test]
    async fn test_sync_picks_latest_measurements() {
        let server = TestServer::start(vec![
            (
                "/api/wearables/withings/fetch-data/",
                200,
                r#"{"saved_entries_ids": [1, 2]}"#,
            ),
            (
                "/api/healthcare/vital-signs/",
                200,
                r#"[
                    {"id": 1, "measurement_type": "heart_rate", "measured_at": "2025-01-01T08:00:00Z", "value": 61},
                    {"id": 2, "measurement_type": "heart_rate", "measured_at": "2025-01-02T08:00:00Z", "value": 64}
                ]"#,
            ),
        ])
        .await;
        let (client, _, _) = client_for(&server);

        let latest = client
            .latest_measurements(date(2025, 1, 31), 30)
            .await
            .unwrap();
        assert_eq!(latest["heart_rate"].value(), Some(&serde_json::json!(64)));
        assert_eq!(
            server
                .request_to("/api/wearables/withings/fetch-data/")
                .unwrap()
                .target,
            "/api/wearables/withings/fetch-data/?start_date=2025-01-01&end_date=2025-01-31"
        );
    }

    #[tokio::test]
    async fn test_disconnect_is_unsupported() {
        let server = TestServer::start(vec![]).await;
        let (client, _, _) = client_for(&server);
        let error = client.disconnect_withings().await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Unsupported);
        assert!(server.requests().is_empty());
    }
}
