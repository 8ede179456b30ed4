//! Plain-text rendering of command output.

use klararety_core::types::{Appointment, InboxNotification, User};
use klararety_reqwest::{
    AdminDashboard, Dashboard, LatestMeasurements, PatientOverview, ProviderDashboard,
};

pub fn user(user: &User) -> String {
    let two_factor = if user.two_factor_enabled { "on" } else { "off" };
    format!(
        "{} ({}, {}), two-factor {two_factor}",
        user.display_name(),
        user.username,
        user.role.label()
    )
}

pub fn appointment(appointment: &Appointment) -> String {
    let mut line = format!(
        "#{} {} {}",
        appointment.id,
        appointment.scheduled_time.strftime("%Y-%m-%d %H:%M UTC"),
        appointment.type_label()
    );
    if let Some(provider) = &appointment.provider_details {
        line.push_str(&format!(
            " with Dr. {} {}",
            provider.first_name, provider.last_name
        ));
    }
    line.push_str(&format!(" [{}]", appointment.status));
    line
}

pub fn appointments(appointments: &[Appointment]) -> String {
    if appointments.is_empty() {
        return "No appointments.".to_owned();
    }
    appointments
        .iter()
        .map(appointment)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn notifications(notifications: &[InboxNotification]) -> String {
    if notifications.is_empty() {
        return "No notifications.".to_owned();
    }
    notifications
        .iter()
        .map(|n| {
            let marker = if n.read { ' ' } else { '*' };
            let title = n.title.as_deref().unwrap_or("Notification");
            match n.message.as_deref() {
                Some(message) => format!("{marker} #{} {title}: {message}", n.id),
                None => format!("{marker} #{} {title}", n.id),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn measurements(latest: &LatestMeasurements) -> String {
    if latest.is_empty() {
        return "No new measurements.".to_owned();
    }
    latest
        .iter()
        .map(|(kind, sign)| {
            let value = sign
                .value()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_owned());
            format!(
                "{kind}: {value} ({})",
                sign.measured_at.strftime("%Y-%m-%d %H:%M UTC")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn dashboard(dashboard: &Dashboard) -> String {
    let header = format!(
        "Welcome, {} ({})",
        dashboard.user().display_name(),
        dashboard.user().role.label()
    );
    let body = match dashboard {
        Dashboard::Patient(overview) => patient(overview),
        Dashboard::Provider(provider) => provider_body(provider),
        Dashboard::Admin(admin) => admin_body(admin),
        Dashboard::Pharmco(_) => "Medication analytics are not available yet.".to_owned(),
        Dashboard::Insurer(_) => "Claims overview is not available yet.".to_owned(),
    };
    format!("{header}\n\n{body}")
}

fn patient(overview: &PatientOverview) -> String {
    let medications = if overview.active_medications.is_empty() {
        "none".to_owned()
    } else {
        overview
            .active_medications
            .iter()
            .map(|m| m.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let device = if overview.withings_connected {
        "connected"
    } else {
        "not connected"
    };

    [
        format!(
            "Upcoming appointments:\n{}",
            indent(&appointments(&overview.upcoming_appointments))
        ),
        format!("Active medications: {medications}"),
        format!("Allergies: {}", overview.allergy_count),
        format!("Pending lab tests: {}", overview.pending_lab_tests),
        format!("Withings: {device}"),
    ]
    .join("\n")
}

fn provider_body(provider: &ProviderDashboard) -> String {
    format!(
        "Upcoming appointments:\n{}",
        indent(&appointments(&provider.upcoming_appointments))
    )
}

fn admin_body(admin: &AdminDashboard) -> String {
    if admin.recent_events.is_empty() {
        return "Recent audit events: none".to_owned();
    }
    let events = admin
        .recent_events
        .iter()
        .map(|e| {
            let resource = e.resource_type.as_deref().unwrap_or("-");
            format!("#{} {} {resource}", e.id, e.event_type)
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("Recent audit events:\n{}", indent(&events))
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
