//! Canned-response HTTP server for client tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use klararety_core::mock::{RecordingNavigator, RecordingNotifier};
use klararety_session::{SessionConfig, SessionStore};
use tokio::net::TcpListener;

use crate::{ApiClient, ReqwestConfig};

const NOT_FOUND_BODY: &str = r#"{"detail": "Not found."}"#;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or(&self.target)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct ServerState {
    routes: Arc<HashMap<String, (StatusCode, String)>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Serves a fixed response per path (query ignored); unknown paths get 404.
pub(crate) struct TestServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, u16, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let routes = routes
            .into_iter()
            .map(|(path, status, body)| {
                let status = StatusCode::from_u16(status).unwrap();
                (path.to_owned(), (status, body.to_owned()))
            })
            .collect();
        let state = ServerState {
            routes: Arc::new(routes),
            requests: Arc::default(),
        };
        let requests = state.requests.clone();

        let router = Router::new().fallback(respond).with_state(state);
        tokio::spawn(async move { axum::serve(listener, router).await });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests().pop()
    }

    pub fn request_to(&self, path: &str) -> Option<RecordedRequest> {
        self.requests().into_iter().find(|r| r.path() == path)
    }
}

async fn respond(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_owned())))
        .collect();
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned());

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        target,
        headers,
        body,
    });

    let (status, body) = state
        .routes
        .get(uri.path())
        .cloned()
        .unwrap_or_else(|| (StatusCode::NOT_FOUND, NOT_FOUND_BODY.to_owned()));

    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

/// Builds a client pointed at `server` with recording seams.
pub(crate) fn client_for(server: &TestServer) -> (ApiClient, RecordingNotifier, RecordingNavigator) {
    let notifier = RecordingNotifier::default();
    let navigator = RecordingNavigator::default();
    let client = ApiClient::new(
        ReqwestConfig::new(server.url()),
        SessionStore::in_memory(SessionConfig::default()),
        Arc::new(notifier.clone()),
        Arc::new(navigator.clone()),
    )
    .unwrap();
    (client, notifier, navigator)
}
