//! Typed bindings for the backend resource groups.
//!
//! Each submodule adds methods to [`ApiClient`](crate::ApiClient) for one
//! resource group. Authentication endpoints are exposed through the
//! [`AuthProvider`](klararety_core::AuthProvider) implementation so that the
//! session manager stays independent of the transport.

mod audit;
mod auth;
mod communication;
mod healthcare;
mod telemedicine;
mod wearables;

pub use healthcare::VitalSignQuery;
pub use wearables::{
    CallbackOutcome, DEFAULT_SYNC_WINDOW_DAYS, HEALTH_DEVICES_PATH, LatestMeasurements,
    latest_by_type,
};
