//! Authenticated reqwest client for the backend REST API.

use std::sync::Arc;
use std::time::Instant;

use klararety_core::{Navigator, Notifier, Result};
use klararety_session::SessionStore;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use super::ReqwestConfig;
use crate::TRACING_TARGET_CLIENT;
use crate::error::Error;
use crate::intercept::ResponseInterceptor;

/// Header carrying a per-request correlation id.
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// List endpoints answer either with a bare array or with a page.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ListResponse<T> {
    Page { results: Vec<T> },
    Items(Vec<T>),
}

impl<T> ListResponse<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Page { results } => results,
            Self::Items(items) => items,
        }
    }
}

struct ApiClientInner {
    http: Client,
    base_url: Url,
    config: ReqwestConfig,
    store: SessionStore,
    interceptor: ResponseInterceptor,
}

/// HTTP client that authenticates every request with the stored session.
///
/// Failed responses pass through the response interceptor: an unauthorized
/// status clears the session and redirects to the login page, a server error
/// raises a notice. Callers only see the resulting [`klararety_core::Error`].
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
///
/// use klararety_core::{TracingNavigator, TracingNotifier};
/// use klararety_reqwest::{ApiClient, ReqwestConfig};
/// use klararety_session::{SessionConfig, SessionStore};
///
/// let store = SessionStore::in_memory(SessionConfig::default());
/// let client = ApiClient::new(
///     ReqwestConfig::default(),
///     store,
///     Arc::new(TracingNotifier),
///     Arc::new(TracingNavigator),
/// )?;
/// let upcoming = client.upcoming_appointments().await?;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Creates a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(
        config: ReqwestConfig,
        store: SessionStore,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let base_url = config.base_url()?;
        let timeout = config.effective_timeout();

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            base_url = %base_url,
            timeout_ms = timeout.as_millis(),
            "Creating API client"
        );

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(config.effective_user_agent())
            .build()
            .map_err(|e| {
                klararety_core::Error::configuration()
                    .with_message("failed to create HTTP client")
                    .with_source(e)
            })?;

        let interceptor = ResponseInterceptor::new(store.clone(), notifier, navigator);
        let inner = ApiClientInner {
            http,
            base_url,
            config,
            store,
            interceptor,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Gets the client configuration.
    pub fn config(&self) -> &ReqwestConfig {
        &self.inner.config
    }

    /// Gets the normalised backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Gets the session store the client reads its token from.
    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub(crate) fn navigate(&self, location: &str) {
        self.inner.interceptor.navigate(location);
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, &[], None).await
    }

    pub(crate) async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.request(Method::GET, path, query, None).await
    }

    /// Fetches a list endpoint, accepting both plain and paginated bodies.
    pub(crate) async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let list: ListResponse<T> = self.request(Method::GET, path, query, None).await?;
        Ok(list.into_vec())
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, &[], Some(body)).await
    }

    pub(crate) async fn post_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.request(Method::POST, path, query, None).await
    }

    pub(crate) async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, path, &[], Some(body)).await
    }

    /// Sends a request and discards the response body.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<()> {
        self.execute(method, path, &[], body).await.map(drop)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let bytes = self.execute(method, path, query, body).await?;
        let bytes: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
        serde_json::from_slice(bytes).map_err(|e| {
            tracing::warn!(
                target: TRACING_TARGET_CLIENT,
                path,
                error = %e,
                "Unexpected response body"
            );
            klararety_core::Error::from(e)
        })
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<Vec<u8>> {
        let url = self.inner.base_url.join(path).map_err(Error::from)?;
        let request_id = Uuid::now_v7();
        let started_at = Instant::now();

        let mut builder = self
            .inner
            .http
            .request(method.clone(), url)
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(token) = self.inner.store.token() {
            builder = builder.header(AUTHORIZATION, token.authorization_header());
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            %request_id,
            method = %method,
            path,
            "Sending request"
        );

        let interceptor = &self.inner.interceptor;
        let response = builder
            .send()
            .await
            .map_err(|e| interceptor.on_transport(method.as_str(), path, e.into()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| interceptor.on_transport(method.as_str(), path, e.into()))?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            %request_id,
            status = status.as_u16(),
            elapsed_ms = started_at.elapsed().as_millis(),
            "Response received"
        );

        if status.is_success() {
            Ok(bytes.to_vec())
        } else {
            Err(interceptor.on_status(method.as_str(), path, status, &bytes))
        }
    }
}
