//! Navigation guard.
//!
//! Decides, before a page loads any data, whether the navigation proceeds or
//! is redirected based on the presence of a session.

use url::form_urlencoded;

use crate::store::SessionStore;
use crate::TRACING_TARGET_GUARD;

/// Login page.
pub const LOGIN_PATH: &str = "/login";

/// Landing page for authenticated users.
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Query parameter carrying the post-login destination.
pub const CALLBACK_PARAM: &str = "callbackUrl";

const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/login",
    "/register",
    "/forgot-password",
    "/reset-password",
    "/verify-email",
];

const DEFAULT_BYPASS_PREFIXES: &[&str] = &["/api/", "/_next/", "/favicon.ico", "/images/"];

const DEFAULT_ENTRY_PATHS: &[&str] = &["/login", "/register"];

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    /// Send the user to the login page, returning to `callback_url` afterwards.
    RedirectToLogin { callback_url: String },
    /// Entry pages are pointless once logged in.
    RedirectToDashboard,
}

impl RouteDecision {
    /// Returns the redirect target, or `None` for [`RouteDecision::Allow`].
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin { callback_url } => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(CALLBACK_PARAM, callback_url)
                    .finish();
                Some(format!("{LOGIN_PATH}?{query}"))
            }
            Self::RedirectToDashboard => Some(DASHBOARD_PATH.to_owned()),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Route guard with configurable path sets.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    public_paths: Vec<String>,
    bypass_prefixes: Vec<String>,
    entry_paths: Vec<String>,
}

impl Default for RouteGuard {
    fn default() -> Self {
        let owned = |paths: &[&str]| paths.iter().map(|p| (*p).to_owned()).collect();
        Self {
            public_paths: owned(DEFAULT_PUBLIC_PATHS),
            bypass_prefixes: owned(DEFAULT_BYPASS_PREFIXES),
            entry_paths: owned(DEFAULT_ENTRY_PATHS),
        }
    }
}

impl RouteGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a public path. Its sub-paths become public too.
    #[must_use]
    pub fn with_public_path(mut self, path: impl Into<String>) -> Self {
        self.public_paths.push(path.into());
        self
    }

    /// Adds a prefix that skips the check entirely.
    #[must_use]
    pub fn with_bypass_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.bypass_prefixes.push(prefix.into());
        self
    }

    /// Returns `true` if `path` is reachable without a session.
    pub fn is_public(&self, path: &str) -> bool {
        let path = strip_query(path);
        self.public_paths.iter().any(|public| matches_route(path, public))
    }

    /// Returns `true` if `path` is a static or API path that is never guarded.
    pub fn is_bypassed(&self, path: &str) -> bool {
        let path = strip_query(path);
        self.bypass_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Decides the navigation to `path` (which may include a query string).
    pub fn decide(&self, path: &str, authenticated: bool) -> RouteDecision {
        let route = strip_query(path);

        if self.is_bypassed(route) {
            return RouteDecision::Allow;
        }

        if self.is_public(route) {
            if authenticated && self.entry_paths.iter().any(|entry| entry == route) {
                tracing::debug!(
                    target: TRACING_TARGET_GUARD,
                    path = route,
                    "Authenticated user on entry page"
                );
                return RouteDecision::RedirectToDashboard;
            }
            return RouteDecision::Allow;
        }

        if authenticated {
            return RouteDecision::Allow;
        }

        tracing::debug!(
            target: TRACING_TARGET_GUARD,
            path = route,
            "Unauthenticated navigation redirected to login"
        );
        RouteDecision::RedirectToLogin {
            callback_url: path.to_owned(),
        }
    }

    /// Decides the navigation using the session persisted in `store`.
    pub fn check(&self, path: &str, store: &SessionStore) -> RouteDecision {
        self.decide(path, store.is_authenticated())
    }
}

/// Returns the response headers attached to every guarded page.
///
/// HSTS is only sent in production, where TLS is guaranteed.
pub fn security_headers(production: bool) -> Vec<(&'static str, &'static str)> {
    let mut headers = vec![
        ("X-Content-Type-Options", "nosniff"),
        ("X-Frame-Options", "DENY"),
        ("X-XSS-Protection", "1; mode=block"),
        ("Referrer-Policy", "strict-origin-when-cross-origin"),
    ];
    if production {
        headers.push((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains",
        ));
    }
    headers
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}

fn matches_route(path: &str, route: &str) -> bool {
    path == route
        || path
            .strip_prefix(route)
            .is_some_and(|rest| rest.starts_with('/'))
}
