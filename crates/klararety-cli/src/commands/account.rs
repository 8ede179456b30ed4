//! Login, logout, registration, profile and two-factor commands.

use anyhow::Context;
use clap::{Args, Subcommand};
use jiff::civil::Date;
use klararety_core::ErrorKind;
use klararety_core::types::{Credentials, LoginOutcome, ProfileUpdate, Registration, Role, User};

use super::App;
use crate::terminal::{prompt_secret, secret_or_prompt, value_or_prompt};
use crate::{TRACING_TARGET_COMMAND, render};

#[derive(Clone, Args)]
pub struct LoginArgs {
    /// Account username
    #[arg(long, env = "KLARARETY_USERNAME")]
    pub username: Option<String>,

    /// Account password; prompted for when absent
    #[arg(long, env = "KLARARETY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// One-time code, used for the first verification attempt
    #[arg(long)]
    pub code: Option<String>,
}

impl std::fmt::Debug for LoginArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginArgs")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    /// Account role: patient, provider, pharmco, insurer or admin
    #[arg(long, default_value = "patient")]
    pub role: Role,

    #[arg(long)]
    pub phone_number: Option<String>,

    /// Date of birth, e.g. 1990-04-21
    #[arg(long)]
    pub date_of_birth: Option<Date>,

    /// Accept the terms of service
    #[arg(long)]
    pub accept_terms: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    #[arg(long)]
    pub phone_number: Option<String>,
}

impl From<ProfileArgs> for ProfileUpdate {
    fn from(args: ProfileArgs) -> Self {
        Self {
            email: args.email,
            first_name: args.first_name,
            last_name: args.last_name,
            phone_number: args.phone_number,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum TwoFactorCommand {
    /// Start enrolment and print the authenticator secret
    Setup,
    /// Finish enrolment with a code from the authenticator
    Confirm {
        #[arg(long)]
        code: Option<String>,
    },
    /// Turn two-factor authentication off (asks for the password)
    Disable,
}

pub async fn login(app: &App, args: LoginArgs) -> anyhow::Result<()> {
    if let Some(user) = app.restore().await? {
        println!("Already logged in as {}", render::user(&user));
        return Ok(());
    }

    let username = value_or_prompt(args.username, "Username")?;
    let password = secret_or_prompt(args.password, "Password")?;

    let outcome = app
        .manager
        .login(&Credentials::new(username, password))
        .await
        .context("login failed")?;

    let user = match outcome {
        LoginOutcome::Authenticated(user) => user,
        LoginOutcome::TwoFactorRequired { user_id } => {
            tracing::debug!(
                target: TRACING_TARGET_COMMAND,
                %user_id,
                "Second factor required"
            );
            verify(app, args.code).await?
        }
    };

    println!("Logged in as {}", render::user(&user));
    Ok(())
}

/// Prompts for one-time codes until one is accepted or the challenge is dropped.
async fn verify(app: &App, mut code: Option<String>) -> anyhow::Result<User> {
    loop {
        let value = value_or_prompt(code.take(), "Verification code")?;
        match app.manager.verify_two_factor(&value).await {
            Ok(user) => return Ok(user),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Authentication | ErrorKind::InvalidInput
                ) =>
            {
                eprintln!("The code was not accepted, try again.");
            }
            Err(err) => return Err(err).context("two-factor verification failed"),
        }
    }
}

pub async fn logout(app: &App) -> anyhow::Result<()> {
    app.restore().await?;
    if !app.manager.is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }

    app.manager.logout().await;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(app: &App) -> anyhow::Result<()> {
    let user = app.require_user().await?;
    println!("{}", render::user(&user));
    Ok(())
}

pub async fn register(app: &App, args: RegisterArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        args.accept_terms,
        "the terms of service must be accepted (--accept-terms)"
    );

    let password = prompt_secret("Password")?;
    let password_confirm = prompt_secret("Confirm password")?;
    anyhow::ensure!(password == password_confirm, "passwords do not match");

    let registration = Registration {
        username: args.username,
        email: args.email,
        first_name: args.first_name,
        last_name: args.last_name,
        password,
        password_confirm,
        phone_number: args.phone_number,
        date_of_birth: args.date_of_birth,
        role: args.role,
        terms_accepted: args.accept_terms,
    };

    let user = app
        .manager
        .register(&registration)
        .await
        .context("registration failed")?;
    println!("Account created for {}. You can now log in.", user.username);
    Ok(())
}

pub async fn profile(app: &App, args: ProfileArgs) -> anyhow::Result<()> {
    let current = app.require_user().await?;
    let update = ProfileUpdate::from(args);

    let user = if update.is_empty() {
        current
    } else {
        app.manager
            .update_profile(&update)
            .await
            .context("failed to update the profile")?
    };

    println!("{}", render::user(&user));
    if !user.email.is_empty() {
        println!("Email: {}", user.email);
    }
    Ok(())
}

pub async fn two_factor(app: &App, command: TwoFactorCommand) -> anyhow::Result<()> {
    app.require_user().await?;

    match command {
        TwoFactorCommand::Setup => {
            let setup = app
                .manager
                .setup_two_factor()
                .await
                .context("failed to start two-factor enrolment")?;
            let secret = setup
                .secret
                .context("the backend did not return an authenticator secret")?;
            println!("Secret: {secret}");
            println!("Add it to your authenticator app, then run `klararety two-factor confirm`.");
        }
        TwoFactorCommand::Confirm { code } => {
            let code = value_or_prompt(code, "Verification code")?;
            app.manager
                .confirm_two_factor(&code)
                .await
                .context("failed to enable two-factor authentication")?;
            println!("Two-factor authentication enabled.");
        }
        TwoFactorCommand::Disable => {
            let password = prompt_secret("Password")?;
            app.manager
                .disable_two_factor(&password)
                .await
                .context("failed to disable two-factor authentication")?;
            println!("Two-factor authentication disabled.");
        }
    }

    Ok(())
}
