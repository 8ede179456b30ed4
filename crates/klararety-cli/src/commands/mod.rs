//! Subcommands and the services they share.

mod account;
mod devices;
mod records;

use std::sync::Arc;

use anyhow::Context;
use clap::Subcommand;
use klararety_core::types::User;
use klararety_core::{Navigator, Notifier};
use klararety_reqwest::ApiClient;
use klararety_session::{
    FileStorage, InteractionEvent, RouteDecision, RouteGuard, SessionManager, SessionStore,
};

pub use self::account::{LoginArgs, ProfileArgs, RegisterArgs, TwoFactorCommand};
pub use self::devices::DevicesCommand;
pub use self::records::{AppointmentsArgs, NotificationsArgs};
use crate::TRACING_TARGET_COMMAND;
use crate::config::Cli;
use crate::terminal::{StderrNavigator, StderrNotifier};

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Log in, prompting for the one-time code when two-factor is enabled
    Login(LoginArgs),
    /// Log out and forget the persisted session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Create an account
    Register(RegisterArgs),
    /// Show or update the profile
    Profile(ProfileArgs),
    /// Manage two-factor authentication
    #[command(subcommand)]
    TwoFactor(TwoFactorCommand),
    /// Show the dashboard for the user's role
    Dashboard,
    /// Check whether a page may be opened with the current session
    Guard {
        /// Page path, e.g. `/records`
        path: String,
    },
    /// Manage linked wearable devices
    #[command(subcommand)]
    Devices(DevicesCommand),
    /// List appointments
    Appointments(AppointmentsArgs),
    /// List notifications
    Notifications(NotificationsArgs),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Login(_) => "login",
            Self::Logout => "logout",
            Self::Whoami => "whoami",
            Self::Register(_) => "register",
            Self::Profile(_) => "profile",
            Self::TwoFactor(_) => "two-factor",
            Self::Dashboard => "dashboard",
            Self::Guard { .. } => "guard",
            Self::Devices(_) => "devices",
            Self::Appointments(_) => "appointments",
            Self::Notifications(_) => "notifications",
        }
    }
}

/// Services shared by every command.
pub struct App {
    store: SessionStore,
    client: ApiClient,
    manager: SessionManager,
}

impl App {
    /// Wires the file-backed session store, the API client and the session manager.
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let storage = Arc::new(FileStorage::new(&cli.session_file));
        let store = SessionStore::new(storage, cli.session.clone());

        let notifier: Arc<dyn Notifier> = Arc::new(StderrNotifier);
        let navigator: Arc<dyn Navigator> = Arc::new(StderrNavigator);

        let client = ApiClient::new(
            cli.reqwest.clone(),
            store.clone(),
            notifier,
            navigator.clone(),
        )
        .context("failed to create API client")?;
        let manager = SessionManager::new(Arc::new(client.clone()), store.clone(), navigator);

        Ok(Self {
            store,
            client,
            manager,
        })
    }

    /// Stops the idle timer before the process exits.
    pub fn dispose(&self) {
        self.manager.dispose();
    }

    /// Restores and revalidates the persisted session.
    ///
    /// Running a command counts as user activity and extends the session.
    async fn restore(&self) -> anyhow::Result<Option<User>> {
        let user = self
            .manager
            .init()
            .await
            .context("failed to restore the session")?;
        if user.is_some() {
            self.manager.record_interaction(InteractionEvent::Key);
        }
        Ok(user)
    }

    async fn require_user(&self) -> anyhow::Result<User> {
        self.restore()
            .await?
            .context("not logged in, run `klararety login` first")
    }
}

/// Runs one command to completion.
pub async fn execute(app: &App, command: Command) -> anyhow::Result<()> {
    tracing::debug!(
        target: TRACING_TARGET_COMMAND,
        command = command.name(),
        "Running command"
    );

    match command {
        Command::Login(args) => account::login(app, args).await,
        Command::Logout => account::logout(app).await,
        Command::Whoami => account::whoami(app).await,
        Command::Register(args) => account::register(app, args).await,
        Command::Profile(args) => account::profile(app, args).await,
        Command::TwoFactor(command) => account::two_factor(app, command).await,
        Command::Dashboard => records::dashboard(app).await,
        Command::Guard { path } => {
            guard(app, &path);
            Ok(())
        }
        Command::Devices(command) => devices::execute(app, command).await,
        Command::Appointments(args) => records::appointments(app, args).await,
        Command::Notifications(args) => records::notifications(app, args).await,
    }
}

fn guard(app: &App, path: &str) {
    match RouteGuard::default().check(path, &app.store) {
        RouteDecision::Allow => println!("allow {path}"),
        decision => {
            let location = decision.location().unwrap_or_default();
            println!("redirect {location}");
        }
    }
}
