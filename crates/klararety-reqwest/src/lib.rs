#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for request dispatch and response timing.
pub const TRACING_TARGET_CLIENT: &str = "klararety_reqwest::client";

/// Tracing target for failed responses and their side effects.
pub const TRACING_TARGET_INTERCEPT: &str = "klararety_reqwest::intercept";

/// Tracing target for resource group operations.
pub const TRACING_TARGET_API: &str = "klararety_reqwest::api";

/// Tracing target for dashboard aggregation.
pub const TRACING_TARGET_DASHBOARD: &str = "klararety_reqwest::dashboard";

mod api;
mod connect;
mod dashboard;
mod error;
mod intercept;

#[cfg(test)]
mod test_server;

pub use api::{
    CallbackOutcome, DEFAULT_SYNC_WINDOW_DAYS, HEALTH_DEVICES_PATH, LatestMeasurements,
    VitalSignQuery, latest_by_type,
};
pub use connect::{ApiClient, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, ReqwestConfig};
pub use dashboard::{
    AdminDashboard, Dashboard, DashboardSource, PatientOverview, ProviderDashboard,
    RECENT_AUDIT_EVENTS,
};
pub use intercept::{NETWORK_ERROR_MESSAGE, SERVER_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE};
