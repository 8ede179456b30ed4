#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for notices and navigation.
pub const TRACING_TARGET_NOTIFY: &str = "klararety_core::notify";

mod error;
mod provider;

pub mod notify;
pub mod types;

#[cfg(feature = "test-utils")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use notify::{Navigator, Notice, NoticeLevel, Notifier, TracingNavigator, TracingNotifier};
pub use provider::AuthProvider;
