//! Backend reads the dashboards are built from.

use async_trait::async_trait;
use klararety_core::Result;
use klararety_core::types::{
    Allergy, Appointment, AuditEvent, AuditFilter, LabTest, MedicalRecord, Medication, UserId,
    WithingsProfile,
};

use crate::ApiClient;

/// Read-only view of the backend used to assemble dashboards.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn upcoming_appointments(&self) -> Result<Vec<Appointment>>;

    async fn medical_records(&self, patient: UserId) -> Result<Vec<MedicalRecord>>;

    async fn medications(&self, medical_record: u64) -> Result<Vec<Medication>>;

    async fn allergies(&self, medical_record: u64) -> Result<Vec<Allergy>>;

    async fn lab_tests(&self, medical_record: u64) -> Result<Vec<LabTest>>;

    /// Returns the linked wearable profile, `None` when nothing is linked.
    async fn withings_profile(&self) -> Result<Option<WithingsProfile>>;

    async fn audit_events(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>>;
}

#[async_trait]
impl DashboardSource for ApiClient {
    async fn upcoming_appointments(&self) -> Result<Vec<Appointment>> {
        ApiClient::upcoming_appointments(self).await
    }

    async fn medical_records(&self, patient: UserId) -> Result<Vec<MedicalRecord>> {
        ApiClient::medical_records(self, patient).await
    }

    async fn medications(&self, medical_record: u64) -> Result<Vec<Medication>> {
        ApiClient::medications(self, medical_record).await
    }

    async fn allergies(&self, medical_record: u64) -> Result<Vec<Allergy>> {
        ApiClient::allergies(self, medical_record).await
    }

    async fn lab_tests(&self, medical_record: u64) -> Result<Vec<LabTest>> {
        ApiClient::lab_tests(self, medical_record).await
    }

    async fn withings_profile(&self) -> Result<Option<WithingsProfile>> {
        ApiClient::withings_profile(self).await
    }

    async fn audit_events(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>> {
        ApiClient::audit_events(self, filter).await
    }
}
