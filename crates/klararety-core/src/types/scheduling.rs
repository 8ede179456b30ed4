//! Telemedicine scheduling resources.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Extra, UserId};

/// Names of the practitioner attached to an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDetails {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: u64,
    pub scheduled_time: Timestamp,
    pub end_time: Timestamp,
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
    pub appointment_type: String,
    #[serde(default)]
    pub appointment_type_display: Option<String>,
    #[serde(default)]
    pub provider_details: Option<ProviderDetails>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Appointment {
    /// Display name of the appointment type, preferring the backend label.
    pub fn type_label(&self) -> &str {
        self.appointment_type_display
            .as_deref()
            .unwrap_or(&self.appointment_type)
    }
}

/// Query filters for listing appointments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub status: Option<String>,
    pub patient: Option<UserId>,
    pub provider: Option<UserId>,
}

impl AppointmentFilter {
    /// Returns the filters as query pairs, skipping unset ones.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = &self.status {
            pairs.push(("status", status.clone()));
        }
        if let Some(patient) = self.patient {
            pairs.push(("patient", patient.to_string()));
        }
        if let Some(provider) = self.provider {
            pairs.push(("provider", provider.to_string()));
        }
        pairs
    }
}

/// Payload for booking a new appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub provider: UserId,
    pub scheduled_time: Timestamp,
    pub end_time: Timestamp,
    pub appointment_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Partial appointment update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: u64,
    pub appointment: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Connection details for joining a video consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinInfo {
    #[serde(default)]
    pub join_url: Option<String>,
    #[serde(default)]
    pub meeting_id: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: u64,
    #[serde(default)]
    pub medication_name: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_query_pairs() {
        let filter = AppointmentFilter {
            status: Some("scheduled".into()),
            provider: Some(UserId(7)),
            ..Default::default()
        };
        assert_eq!(
            filter.query_pairs(),
            vec![("status", "scheduled".to_owned()), ("provider", "7".to_owned())]
        );
        assert!(AppointmentFilter::default().query_pairs().is_empty());
    }

    #[test]
    fn test_appointment_type_label() {
        let appointment: Appointment = serde_json::from_value(serde_json::json!({
            "id": 1,
            "scheduled_time": "2024-06-01T09:00:00Z",
            "end_time": "2024-06-01T09:30:00Z",
            "status": "scheduled",
            "appointment_type": "video",
        }))
        .unwrap();
        assert_eq!(appointment.type_label(), "video");
    }
}
