//! Medical record resources.

use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::{Extra, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: u64,
    pub patient: UserId,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allergy {
    pub id: u64,
    pub agent: String,
    #[serde(default)]
    pub reaction: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub diagnosed_date: Option<Date>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Immunization {
    pub id: u64,
    #[serde(default)]
    pub vaccine: Option<String>,
    #[serde(default)]
    pub administration_date: Option<Date>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Status of a lab test as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabTestStatus {
    Pending,
    Completed,
    Cancelled,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabTest {
    pub id: u64,
    pub name: String,
    pub status: LabTestStatus,
    #[serde(default)]
    pub ordered_date: Option<Date>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl LabTest {
    /// Returns `true` while results are outstanding.
    pub fn is_pending(&self) -> bool {
        self.status == LabTestStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    pub id: u64,
    pub lab_test: u64,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A single vital-sign measurement, either entered manually or synced from a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalSign {
    pub id: u64,
    pub measurement_type: String,
    pub measured_at: Timestamp,
    #[serde(flatten)]
    pub extra: Extra,
}

impl VitalSign {
    /// Returns the measured value, whose shape depends on the measurement type.
    pub fn value(&self) -> Option<&serde_json::Value> {
        self.extra.get("value")
    }
}
