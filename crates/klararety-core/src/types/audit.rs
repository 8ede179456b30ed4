//! Audit trail resources (admin only).

use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::{Extra, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: u64,
    pub event_type: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Query filters shared by audit listing and export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub user: Option<UserId>,
    pub event_type: Option<String>,
    pub resource_type: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

impl AuditFilter {
    /// Returns the filters as query pairs, skipping unset ones.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(user) = self.user {
            pairs.push(("user", user.to_string()));
        }
        if let Some(event_type) = &self.event_type {
            pairs.push(("event_type", event_type.clone()));
        }
        if let Some(resource_type) = &self.resource_type {
            pairs.push(("resource_type", resource_type.clone()));
        }
        if let Some(start) = self.start_date {
            pairs.push(("start_date", start.to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("end_date", end.to_string()));
        }
        pairs
    }
}

/// Handle of an audit export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditExport {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}
