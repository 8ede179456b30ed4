//! Terminal implementations of the notification and navigation seams.

use std::io::{self, BufRead, Write};

use anyhow::Context;
use klararety_core::{Navigator, Notice, NoticeLevel, Notifier};
use klararety_session::LOGIN_PATH;

use crate::TRACING_TARGET_COMMAND;

/// Prints notices to stderr so they never mix with command output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, notice: Notice) {
        eprintln!("{}: {notice}", level_label(notice.level));
    }
}

fn level_label(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Info => "info",
        NoticeLevel::Success => "ok",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    }
}

/// There are no pages in a terminal; redirects become hints.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrNavigator;

impl Navigator for StderrNavigator {
    fn navigate(&self, location: &str) {
        tracing::debug!(target: TRACING_TARGET_COMMAND, location, "Redirect");
        if location.starts_with(LOGIN_PATH) {
            eprintln!("Run `klararety login` to sign in again.");
        }
    }
}

/// Reads one trimmed line from stdin after printing `label` to stderr.
pub fn prompt(label: &str) -> anyhow::Result<String> {
    prompt_secret(label).map(|line| line.trim().to_owned())
}

/// Like [`prompt`], but keeps surrounding whitespace; used for passwords.
pub fn prompt_secret(label: &str) -> anyhow::Result<String> {
    {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{label}: ")?;
        stderr.flush()?;
    }

    read_answer(io::stdin().lock(), label)
}

/// Reads one line and strips only its terminator.
fn read_answer(mut input: impl BufRead, label: &str) -> anyhow::Result<String> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    anyhow::ensure!(read > 0, "no input given for {}", label.to_lowercase());

    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// Uses `value` when given on the command line, prompting otherwise.
pub fn value_or_prompt(value: Option<String>, label: &str) -> anyhow::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt(label),
    }
}

/// Uses `value` when given, prompting for a secret otherwise.
pub fn secret_or_prompt(value: Option<String>, label: &str) -> anyhow::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => prompt_secret(label),
    }
}
