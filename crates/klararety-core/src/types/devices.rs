//! Wearable device (Withings) resources.

use serde::{Deserialize, Serialize};

use super::Extra;

/// Linked Withings account, present only once the user connected a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithingsProfile {
    #[serde(default)]
    pub withings_user_id: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Vendor authorization URL the user must visit to link a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithingsAuthorization {
    pub authorize_url: String,
}

/// Result of pulling measurements from the vendor into the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WithingsSync {
    #[serde(default)]
    pub saved_entries_ids: Vec<u64>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Query parameters delivered by the vendor to the OAuth callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithingsCallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
