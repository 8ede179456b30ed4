//! Domain types shared by the session manager and the HTTP client.
//!
//! The identity types ([`User`], [`Role`], [`Session`]) are strict: every field
//! the session logic relies on must be present. Resource models returned by the
//! backend keep any field they do not name in a flattened [`Extra`] map so that
//! newer backend versions do not break deserialization.

mod audit;
mod devices;
mod messaging;
mod records;
mod scheduling;
mod session;
mod user;

pub use audit::{AuditEvent, AuditExport, AuditFilter};
pub use devices::{WithingsAuthorization, WithingsCallbackParams, WithingsProfile, WithingsSync};
pub use messaging::{Conversation, InboxNotification, Message, NewConversation, NewMessage};
pub use records::{
    Allergy, Condition, Immunization, LabResult, LabTest, LabTestStatus, MedicalRecord,
    Medication, VitalSign,
};
pub use scheduling::{
    Appointment, AppointmentFilter, AppointmentUpdate, Consultation, JoinInfo, NewAppointment,
    Prescription, ProviderDetails,
};
pub use session::{
    AuthGrant, Credentials, LoginOutcome, LoginResponse, Session, SessionToken, TwoFactorRequired,
    TwoFactorSetup,
};
pub use user::{ProfileUpdate, Registration, Role, User, UserId};

/// Backend fields not modelled explicitly.
pub type Extra = serde_json::Map<String, serde_json::Value>;
