//! Appointment, consultation and prescription endpoints.

use klararety_core::Result;
use klararety_core::types::{
    Appointment, AppointmentFilter, AppointmentUpdate, Consultation, JoinInfo, NewAppointment,
    Prescription, UserId,
};
use serde::Serialize;

use crate::{ApiClient, TRACING_TARGET_API};

#[derive(Serialize)]
struct CancelBody<'a> {
    reason: &'a str,
}

#[derive(Serialize)]
struct EndConsultationBody<'a> {
    notes: &'a str,
}

impl ApiClient {
    pub async fn appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>> {
        self.list("telemedicine/appointments/", &filter.query_pairs())
            .await
    }

    /// Lists the caller's upcoming appointments.
    pub async fn upcoming_appointments(&self) -> Result<Vec<Appointment>> {
        self.list("telemedicine/appointments/upcoming/", &[]).await
    }

    pub async fn appointment(&self, id: u64) -> Result<Appointment> {
        self.get(&format!("telemedicine/appointments/{id}/")).await
    }

    pub async fn create_appointment(&self, appointment: &NewAppointment) -> Result<Appointment> {
        let created: Appointment = self.post("telemedicine/appointments/", appointment).await?;
        tracing::info!(
            target: TRACING_TARGET_API,
            appointment_id = created.id,
            "Appointment booked"
        );
        Ok(created)
    }

    pub async fn update_appointment(
        &self,
        id: u64,
        update: &AppointmentUpdate,
    ) -> Result<Appointment> {
        self.patch(&format!("telemedicine/appointments/{id}/"), update)
            .await
    }

    /// Cancels an appointment with a reason shown to the other party.
    pub async fn cancel_appointment(&self, id: u64, reason: &str) -> Result<Appointment> {
        self.post(
            &format!("telemedicine/appointments/{id}/cancel/"),
            &CancelBody { reason },
        )
        .await
    }

    pub async fn consultation(&self, id: u64) -> Result<Consultation> {
        self.get(&format!("telemedicine/consultations/{id}/")).await
    }

    pub async fn consultations_for_appointment(
        &self,
        appointment: u64,
    ) -> Result<Vec<Consultation>> {
        self.list(
            "telemedicine/consultations/",
            &[("appointment", appointment.to_string())],
        )
        .await
    }

    pub async fn start_consultation(&self, id: u64) -> Result<Consultation> {
        self.post_with(&format!("telemedicine/consultations/{id}/start/"), &[])
            .await
    }

    pub async fn end_consultation(&self, id: u64, notes: &str) -> Result<Consultation> {
        self.post(
            &format!("telemedicine/consultations/{id}/end/"),
            &EndConsultationBody { notes },
        )
        .await
    }

    /// Returns the video session details for joining a consultation.
    pub async fn join_info(&self, consultation: u64) -> Result<JoinInfo> {
        self.get(&format!(
            "telemedicine/consultations/{consultation}/join_info/"
        ))
        .await
    }

    pub async fn prescriptions(&self, patient: UserId) -> Result<Vec<Prescription>> {
        self.list(
            "telemedicine/prescriptions/",
            &[("patient", patient.to_string())],
        )
        .await
    }
}
