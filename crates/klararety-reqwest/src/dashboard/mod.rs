//! Role-specific dashboards assembled from several backend reads.
//!
//! Every section of a dashboard is loaded independently: a failed read is
//! logged and leaves its section empty, so one unavailable service never
//! blanks the whole page. An authorization failure is different, it means the
//! session is gone and the whole aggregation is aborted.

mod source;

use klararety_core::types::{Appointment, AuditEvent, AuditFilter, Medication, Role, User};
use klararety_core::{Error, Result};

pub use self::source::DashboardSource;
use crate::TRACING_TARGET_DASHBOARD;

/// Number of audit events shown on the administrator dashboard.
pub const RECENT_AUDIT_EVENTS: usize = 10;

/// Landing page content of a patient.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientOverview {
    pub user: User,
    pub upcoming_appointments: Vec<Appointment>,
    /// First medical record of the patient, if one exists.
    pub medical_record: Option<u64>,
    pub active_medications: Vec<Medication>,
    pub allergy_count: usize,
    pub pending_lab_tests: usize,
    pub withings_connected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDashboard {
    pub user: User,
    pub upcoming_appointments: Vec<Appointment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminDashboard {
    pub user: User,
    /// Most recent audit events, newest first as returned by the backend.
    pub recent_events: Vec<AuditEvent>,
}

/// Dashboard of the authenticated user, one variant per [`Role`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dashboard {
    Patient(PatientOverview),
    Provider(ProviderDashboard),
    /// Pharmaceutical partners only get their identity summary for now.
    Pharmco(User),
    Insurer(User),
    Admin(AdminDashboard),
}

impl Dashboard {
    /// Gets the user the dashboard was built for.
    pub fn user(&self) -> &User {
        match self {
            Self::Patient(overview) => &overview.user,
            Self::Provider(dashboard) => &dashboard.user,
            Self::Pharmco(user) | Self::Insurer(user) => user,
            Self::Admin(dashboard) => &dashboard.user,
        }
    }

    /// Loads the dashboard matching the user's role.
    ///
    /// # Errors
    ///
    /// Only an authorization failure is returned; every other failed read
    /// degrades its section.
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET_DASHBOARD,
        fields(user_id = %user.id, role = %user.role)
    )]
    pub async fn load(source: &dyn DashboardSource, user: &User) -> Result<Self> {
        let dashboard = match user.role {
            Role::Patient => Self::Patient(load_patient(source, user).await?),
            Role::Provider => {
                let upcoming = source.upcoming_appointments().await;
                Self::Provider(ProviderDashboard {
                    user: user.clone(),
                    upcoming_appointments: degrade("upcoming_appointments", upcoming)?,
                })
            }
            Role::Admin => {
                let events = source.audit_events(&AuditFilter::default()).await;
                let mut recent_events = degrade("audit_events", events)?;
                recent_events.truncate(RECENT_AUDIT_EVENTS);
                Self::Admin(AdminDashboard {
                    user: user.clone(),
                    recent_events,
                })
            }
            Role::Pharmco => Self::Pharmco(user.clone()),
            Role::Insurer => Self::Insurer(user.clone()),
        };

        tracing::debug!(target: TRACING_TARGET_DASHBOARD, "Dashboard loaded");
        Ok(dashboard)
    }
}

async fn load_patient(source: &dyn DashboardSource, user: &User) -> Result<PatientOverview> {
    let (appointments, records, profile) = futures::join!(
        source.upcoming_appointments(),
        source.medical_records(user.id),
        source.withings_profile(),
    );

    let upcoming_appointments = degrade("upcoming_appointments", appointments)?;
    let medical_record = degrade("medical_records", records)?
        .first()
        .map(|record| record.id);
    let withings_connected = degrade("withings_profile", profile)?.is_some();

    let mut overview = PatientOverview {
        user: user.clone(),
        upcoming_appointments,
        medical_record,
        active_medications: Vec::new(),
        allergy_count: 0,
        pending_lab_tests: 0,
        withings_connected,
    };

    let Some(record) = medical_record else {
        return Ok(overview);
    };

    let (medications, allergies, lab_tests) = futures::join!(
        source.medications(record),
        source.allergies(record),
        source.lab_tests(record),
    );

    overview.active_medications = degrade("medications", medications)?
        .into_iter()
        .filter(|medication| medication.active)
        .collect();
    overview.allergy_count = degrade("allergies", allergies)?.len();
    overview.pending_lab_tests = degrade("lab_tests", lab_tests)?
        .iter()
        .filter(|test| test.is_pending())
        .count();

    Ok(overview)
}

/// Replaces a failed section with its empty value unless the session is gone.
fn degrade<T: Default>(section: &'static str, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(error) if error.is_authorization() => Err(error),
        Err(error) => {
            log_degraded(section, &error);
            Ok(T::default())
        }
    }
}

fn log_degraded(section: &'static str, error: &Error) {
    tracing::warn!(
        target: TRACING_TARGET_DASHBOARD,
        section,
        kind = error.kind_str(),
        error = %error,
        "Dashboard section unavailable"
    );
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use klararety_core::ErrorKind;
    use klararety_core::mock::MockAuthProvider;
    use klararety_core::types::{Allergy, LabTest, MedicalRecord, UserId, WithingsProfile};

    use super::*;

    #[derive(Default)]
    struct MockSource {
        failures: HashMap<&'static str, ErrorKind>,
        records: Vec<MedicalRecord>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl MockSource {
        fn with_record(mut self, id: u64) -> Self {
            self.records.push(json(serde_json::json!({"id": id, "patient": 1})));
            self
        }

        fn failing(mut self, section: &'static str, kind: ErrorKind) -> Self {
            self.failures.insert(section, kind);
            self
        }

        fn read<T>(&self, section: &'static str, value: T) -> Result<T> {
            self.calls.lock().unwrap().push(section);
            match self.failures.get(section) {
                Some(kind) => Err(Error::new(*kind)),
                None => Ok(value),
            }
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    fn appointment(id: u64) -> Appointment {
        json(serde_json::json!({
            "id": id,
            "scheduled_time": "2025-03-01T09:00:00Z",
            "end_time": "2025-03-01T09:30:00Z",
            "status": "scheduled",
            "appointment_type": "video"
        }))
    }

    #[async_trait]
    impl DashboardSource for MockSource {
        async fn upcoming_appointments(&self) -> Result<Vec<Appointment>> {
            self.read("upcoming_appointments", vec![appointment(1), appointment(2)])
        }

        async fn medical_records(&self, _patient: UserId) -> Result<Vec<MedicalRecord>> {
            self.read("medical_records", self.records.clone())
        }

        async fn medications(&self, _medical_record: u64) -> Result<Vec<Medication>> {
            self.read(
                "medications",
                vec![
                    json(serde_json::json!({"id": 1, "name": "Lisinopril", "active": true})),
                    json(serde_json::json!({"id": 2, "name": "Amoxicillin", "active": false})),
                ],
            )
        }

        async fn allergies(&self, _medical_record: u64) -> Result<Vec<Allergy>> {
            self.read(
                "allergies",
                vec![json::<Allergy>(serde_json::json!({"id": 1, "agent": "Penicillin"}))],
            )
        }

        async fn lab_tests(&self, _medical_record: u64) -> Result<Vec<LabTest>> {
            self.read(
                "lab_tests",
                vec![
                    json(serde_json::json!({"id": 1, "name": "CBC", "status": "pending"})),
                    json(serde_json::json!({"id": 2, "name": "Lipids", "status": "pending"})),
                    json(serde_json::json!({"id": 3, "name": "A1C", "status": "completed"})),
                ],
            )
        }

        async fn withings_profile(&self) -> Result<Option<WithingsProfile>> {
            self.read(
                "withings_profile",
                Some(json(serde_json::json!({"withings_user_id": "w-1"}))),
            )
        }

        async fn audit_events(&self, _filter: &AuditFilter) -> Result<Vec<AuditEvent>> {
            let events = (1..=15)
                .map(|id| json(serde_json::json!({"id": id, "event_type": "view"})))
                .collect();
            self.read("audit_events", events)
        }
    }

    fn user_with_role(role: Role) -> User {
        User {
            role,
            ..MockAuthProvider::patient(1)
        }
    }

    #[tokio::test]
    async fn test_patient_overview_merges_all_sections() {
        let source = MockSource::default().with_record(11);
        let user = user_with_role(Role::Patient);

        let Dashboard::Patient(overview) = Dashboard::load(&source, &user).await.unwrap() else {
            panic!("expected a patient dashboard");
        };
        assert_eq!(overview.upcoming_appointments.len(), 2);
        assert_eq!(overview.medical_record, Some(11));
        assert_eq!(overview.active_medications.len(), 1);
        assert_eq!(overview.active_medications[0].name, "Lisinopril");
        assert_eq!(overview.allergy_count, 1);
        assert_eq!(overview.pending_lab_tests, 2);
        assert!(overview.withings_connected);
    }

    #[tokio::test]
    async fn test_patient_without_record_skips_record_reads() {
        let source = MockSource::default();
        let user = user_with_role(Role::Patient);

        let dashboard = Dashboard::load(&source, &user).await.unwrap();
        let Dashboard::Patient(overview) = dashboard else {
            panic!("expected a patient dashboard");
        };
        assert_eq!(overview.medical_record, None);
        assert!(overview.active_medications.is_empty());
        assert!(!source.calls().contains(&"medications"));
    }

    #[tokio::test]
    async fn test_failed_section_degrades() {
        let source = MockSource::default()
            .with_record(11)
            .failing("allergies", ErrorKind::ServiceUnavailable)
            .failing("withings_profile", ErrorKind::NetworkError);
        let user = user_with_role(Role::Patient);

        let Dashboard::Patient(overview) = Dashboard::load(&source, &user).await.unwrap() else {
            panic!("expected a patient dashboard");
        };
        assert_eq!(overview.allergy_count, 0);
        assert!(!overview.withings_connected);
        assert_eq!(overview.pending_lab_tests, 2);
        assert_eq!(overview.upcoming_appointments.len(), 2);
    }

    #[tokio::test]
    async fn test_authorization_failure_aborts() {
        let source = MockSource::default()
            .with_record(11)
            .failing("lab_tests", ErrorKind::Authorization);
        let user = user_with_role(Role::Patient);

        let error = Dashboard::load(&source, &user).await.unwrap_err();
        assert!(error.is_authorization());
    }

    #[tokio::test]
    async fn test_dashboard_follows_role() {
        let source = MockSource::default();

        let provider = Dashboard::load(&source, &user_with_role(Role::Provider))
            .await
            .unwrap();
        assert!(matches!(
            &provider,
            Dashboard::Provider(d) if d.upcoming_appointments.len() == 2
        ));

        let admin = Dashboard::load(&source, &user_with_role(Role::Admin))
            .await
            .unwrap();
        let Dashboard::Admin(admin) = admin else {
            panic!("expected an admin dashboard");
        };
        assert_eq!(admin.recent_events.len(), RECENT_AUDIT_EVENTS);

        let insurer = Dashboard::load(&source, &user_with_role(Role::Insurer))
            .await
            .unwrap();
        assert_eq!(insurer.user().role, Role::Insurer);
        assert!(matches!(insurer, Dashboard::Insurer(_)));
    }
}
