//! Debounced idle countdown.
//!
//! The timer owns at most one countdown task. Recording a registered
//! interaction moves the deadline forward; the task only fires once the
//! deadline passes with no further interaction.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_IDLE;
use crate::config::MAX_SESSION_MAX_AGE_SECS;

/// Kind of user interaction that counts as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum InteractionEvent {
    Pointer,
    Key,
    Scroll,
    Touch,
}

/// Action taken when the countdown expires.
#[async_trait::async_trait]
pub trait IdleHandler: Send + Sync {
    async fn on_idle(&self);
}

struct Countdown {
    deadline: watch::Sender<Instant>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Countdown {
    fn cancel(self) {
        self.cancel.cancel();
        // The task may be inside the handler; let it finish rather than abort it.
        drop(self.task);
    }
}

#[derive(Default)]
struct TimerState {
    listeners: HashSet<InteractionEvent>,
    countdown: Option<Countdown>,
}

struct IdleTimerInner {
    timeout: Duration,
    handler: Arc<dyn IdleHandler>,
    state: Mutex<TimerState>,
}

impl Drop for IdleTimerInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Some(countdown) = state.countdown.take() {
            countdown.cancel();
        }
    }
}

/// Single countdown that invokes an [`IdleHandler`] after a quiet period.
///
/// Must be used from within a tokio runtime: [`start`](Self::start) spawns
/// the countdown task.
#[derive(Clone)]
pub struct IdleTimer {
    inner: Arc<IdleTimerInner>,
}

impl std::fmt::Debug for IdleTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleTimer")
            .field("timeout", &self.inner.timeout)
            .field("armed", &self.is_armed())
            .finish_non_exhaustive()
    }
}

impl IdleTimer {
    /// Creates a stopped timer; `timeout` is capped at [`MAX_SESSION_MAX_AGE_SECS`].
    pub fn new(timeout: Duration, handler: Arc<dyn IdleHandler>) -> Self {
        let inner = IdleTimerInner {
            timeout: timeout.min(Duration::from_secs(MAX_SESSION_MAX_AGE_SECS)),
            handler,
            state: Mutex::new(TimerState::default()),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns the quiet period after which the handler runs.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Arms a fresh countdown and registers every interaction listener.
    ///
    /// Any countdown already running is cancelled first.
    pub fn start(&self) {
        let mut state = self.lock();
        if let Some(previous) = state.countdown.take() {
            previous.cancel();
        }

        state.listeners = InteractionEvent::iter().collect();
        state.countdown = Some(self.spawn_countdown());

        tracing::debug!(
            target: TRACING_TARGET_IDLE,
            timeout_secs = self.inner.timeout.as_secs(),
            "Idle timer armed"
        );
    }

    /// Records an interaction and pushes the deadline out by the full timeout.
    ///
    /// Returns `false` when the timer is stopped or the event has no listener.
    pub fn record(&self, event: InteractionEvent) -> bool {
        let state = self.lock();
        if !state.listeners.contains(&event) {
            return false;
        }

        let Some(countdown) = state.countdown.as_ref() else {
            return false;
        };
        if countdown.cancel.is_cancelled() || countdown.task.is_finished() {
            return false;
        }

        countdown
            .deadline
            .send_replace(Instant::now() + self.inner.timeout);

        tracing::trace!(
            target: TRACING_TARGET_IDLE,
            event = <&'static str>::from(event),
            "Idle countdown reset"
        );
        true
    }

    /// Cancels the countdown and removes the listeners.
    pub fn stop(&self) {
        let mut state = self.lock();
        state.listeners.clear();
        if let Some(countdown) = state.countdown.take() {
            countdown.cancel();
            tracing::debug!(target: TRACING_TARGET_IDLE, "Idle timer stopped");
        }
    }

    /// Returns `true` while a countdown is pending.
    pub fn is_armed(&self) -> bool {
        self.lock()
            .countdown
            .as_ref()
            .is_some_and(|c| !c.cancel.is_cancelled() && !c.task.is_finished())
    }

    fn spawn_countdown(&self) -> Countdown {
        let (deadline, mut rx) = watch::channel(Instant::now() + self.inner.timeout);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handler = Arc::clone(&self.inner.handler);
        let timeout = self.inner.timeout;

        let task = tokio::spawn(async move {
            loop {
                let until = *rx.borrow_and_update();
                tokio::select! {
                    biased;
                    () = token.cancelled() => return,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    () = tokio::time::sleep_until(until) => break,
                }
            }

            if token.is_cancelled() {
                return;
            }

            tracing::info!(
                target: TRACING_TARGET_IDLE,
                timeout_secs = timeout.as_secs(),
                "Idle timeout reached"
            );
            handler.on_idle().await;
        });

        Countdown {
            deadline,
            cancel,
            task,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
