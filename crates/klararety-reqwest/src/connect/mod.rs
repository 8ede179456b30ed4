//! Backend connection.
//!
//! This module provides the authenticated client every resource binding
//! goes through, and its configuration.

mod client;
mod config;

pub use client::ApiClient;
pub use config::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, ReqwestConfig};
