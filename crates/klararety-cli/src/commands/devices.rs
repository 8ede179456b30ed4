//! Wearable device commands.

use anyhow::Context;
use clap::Subcommand;
use jiff::Zoned;
use klararety_core::types::WithingsCallbackParams;
use klararety_reqwest::{CallbackOutcome, DEFAULT_SYNC_WINDOW_DAYS};

use super::App;
use crate::render;

#[derive(Debug, Clone, Subcommand)]
pub enum DevicesCommand {
    /// Show whether a Withings device is linked
    Status,
    /// Print the Withings authorization URL
    Connect,
    /// Pull recent measurements and show the latest of each type
    Sync {
        /// Number of days to pull
        #[arg(long, default_value_t = DEFAULT_SYNC_WINDOW_DAYS)]
        days: i64,
    },
    /// Complete linking with the parameters of the Withings redirect
    Callback {
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        error: Option<String>,
    },
    /// Unlink the Withings device
    Disconnect,
}

pub async fn execute(app: &App, command: DevicesCommand) -> anyhow::Result<()> {
    match command {
        DevicesCommand::Status => status(app).await,
        DevicesCommand::Connect => connect(app).await,
        DevicesCommand::Sync { days } => sync(app, days).await,
        DevicesCommand::Callback { code, state, error } => {
            callback(app, &WithingsCallbackParams { code, state, error }).await
        }
        DevicesCommand::Disconnect => {
            app.require_user().await?;
            app.client.disconnect_withings().await?;
            Ok(())
        }
    }
}

async fn status(app: &App) -> anyhow::Result<()> {
    app.require_user().await?;
    match app.client.withings_profile().await? {
        Some(profile) => {
            let id = profile.withings_user_id.as_deref().unwrap_or("unknown");
            println!("Withings: connected (account {id})");
        }
        None => println!("No device linked. Run `klararety devices connect`."),
    }
    Ok(())
}

async fn connect(app: &App) -> anyhow::Result<()> {
    app.require_user().await?;
    let authorization = app
        .client
        .connect_withings()
        .await
        .context("failed to start device linking")?;
    println!("Open this URL to link your Withings account:");
    println!("{}", authorization.authorize_url);
    Ok(())
}

async fn sync(app: &App, days: i64) -> anyhow::Result<()> {
    app.require_user().await?;
    let today = Zoned::now().date();
    let latest = app
        .client
        .latest_measurements(today, days)
        .await
        .context("failed to sync measurements")?;
    println!("{}", render::measurements(&latest));
    Ok(())
}

/// Session presence is checked by the client, so the session is not restored here.
async fn callback(app: &App, params: &WithingsCallbackParams) -> anyhow::Result<()> {
    match app.client.complete_withings_authorization(params).await {
        CallbackOutcome::Connected => {
            println!("Withings device linked.");
            Ok(())
        }
        outcome => anyhow::bail!("device linking failed ({})", outcome.location()),
    }
}
