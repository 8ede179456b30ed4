#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for session persistence backends.
pub const TRACING_TARGET_STORAGE: &str = "klararety_session::storage";

/// Tracing target for session store reads and writes.
pub const TRACING_TARGET_STORE: &str = "klararety_session::store";

/// Tracing target for the idle countdown.
pub const TRACING_TARGET_IDLE: &str = "klararety_session::idle";

/// Tracing target for login, two-factor and logout transitions.
///
/// Use this target for logging state changes of the session manager.
pub const TRACING_TARGET_MANAGER: &str = "klararety_session::manager";

/// Tracing target for route guard decisions.
pub const TRACING_TARGET_GUARD: &str = "klararety_session::guard";

mod config;
mod guard;
mod idle;
mod manager;
mod store;

pub mod storage;

pub use config::{
    DEFAULT_SESSION_MAX_AGE_SECS, DEFAULT_TWO_FACTOR_MAX_ATTEMPTS, MAX_SESSION_MAX_AGE_SECS,
    SessionConfig,
};
pub use guard::{
    CALLBACK_PARAM, DASHBOARD_PATH, LOGIN_PATH, RouteDecision, RouteGuard, security_headers,
};
pub use idle::{IdleHandler, IdleTimer, InteractionEvent};
pub use manager::{AuthState, PendingTwoFactorChallenge, SessionManager};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::SessionStore;
