//! Dashboard, appointment and notification commands.

use anyhow::Context;
use clap::Args;
use klararety_core::types::AppointmentFilter;
use klararety_reqwest::Dashboard;

use super::App;
use crate::render;

#[derive(Debug, Clone, Args)]
pub struct AppointmentsArgs {
    /// Only show upcoming appointments
    #[arg(long, conflicts_with = "status")]
    pub upcoming: bool,

    /// Filter by status, e.g. `scheduled` or `cancelled`
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct NotificationsArgs {
    /// Mark a notification as read instead of listing
    #[arg(long, value_name = "ID")]
    pub mark_read: Option<u64>,
}

pub async fn dashboard(app: &App) -> anyhow::Result<()> {
    let user = app.require_user().await?;
    let dashboard = Dashboard::load(&app.client, &user)
        .await
        .context("failed to load the dashboard")?;
    println!("{}", render::dashboard(&dashboard));
    Ok(())
}

pub async fn appointments(app: &App, args: AppointmentsArgs) -> anyhow::Result<()> {
    app.require_user().await?;

    let appointments = if args.upcoming {
        app.client.upcoming_appointments().await
    } else {
        let filter = AppointmentFilter {
            status: args.status,
            ..AppointmentFilter::default()
        };
        app.client.appointments(&filter).await
    }
    .context("failed to list appointments")?;

    println!("{}", render::appointments(&appointments));
    Ok(())
}

pub async fn notifications(app: &App, args: NotificationsArgs) -> anyhow::Result<()> {
    app.require_user().await?;

    if let Some(id) = args.mark_read {
        app.client
            .mark_notification_read(id)
            .await
            .context("failed to mark the notification as read")?;
        println!("Notification #{id} marked as read.");
        return Ok(());
    }

    let notifications = app
        .client
        .notifications()
        .await
        .context("failed to list notifications")?;
    println!("{}", render::notifications(&notifications));
    Ok(())
}
