//! Scripted in-process backend for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agriconnect_client::auth::MemoryTokenPersistence;
use agriconnect_client::transport::{ApiRequest, ApiResponse, Transport};
use agriconnect_client::{AppState, ClientError, Config};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tower::service_fn;
use tower::util::BoxCloneSyncService;

pub const TOKEN_PATH: &str = "/api/token/";
pub const REFRESH_PATH: &str = "/api/token/refresh/";
pub const SIGNUP_PATH: &str = "/api/signup/";
pub const DASHBOARD_PATH: &str = "/api/users/dashboard/";

/// Request as received by the backend
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
    pub retried: bool,
}

#[derive(Default)]
struct Inner {
    accepted_access: Mutex<Option<String>>,
    login_reply: Mutex<Option<(StatusCode, Value)>>,
    signup_reply: Mutex<Option<(StatusCode, Value)>>,
    refresh_reply: Mutex<Option<Value>>,
    refresh_delay: Mutex<Duration>,
    refresh_calls: AtomicUsize,
    reject_all: AtomicBool,
    offline: AtomicBool,
    requests: Mutex<Vec<Recorded>>,
}

/// Fake AgriConnect backend.
///
/// Token endpoints answer with whatever the test scripted; marketplace
/// endpoints accept exactly one access token. A successful refresh makes
/// the issued access token the accepted one.
#[derive(Clone, Default)]
pub struct Backend {
    inner: Arc<Inner>,
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_access(&self, token: &str) {
        *self.inner.accepted_access.lock().unwrap() = Some(token.to_string());
    }

    pub fn login_returns(&self, status: StatusCode, body: Value) {
        *self.inner.login_reply.lock().unwrap() = Some((status, body));
    }

    pub fn signup_returns(&self, status: StatusCode, body: Value) {
        *self.inner.signup_reply.lock().unwrap() = Some((status, body));
    }

    /// Successful refresh body, e.g. `{"access": "a2"}`
    pub fn refresh_returns(&self, body: Value) {
        *self.inner.refresh_reply.lock().unwrap() = Some(body);
    }

    pub fn refresh_rejects(&self) {
        *self.inner.refresh_reply.lock().unwrap() = None;
    }

    pub fn refresh_delay(&self, delay: Duration) {
        *self.inner.refresh_delay.lock().unwrap() = delay;
    }

    /// Marketplace endpoints answer 401 to every token
    pub fn reject_all(&self) {
        self.inner.reject_all.store(true, Ordering::SeqCst);
    }

    /// Every call fails at the transport level
    pub fn go_offline(&self) {
        self.inner.offline.store(true, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.requests.lock().unwrap().clone()
    }

    /// Requests that hit `path`
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn transport(&self) -> Transport {
        let backend = self.clone();
        BoxCloneSyncService::new(service_fn(move |request: ApiRequest| {
            let backend = backend.clone();
            async move { backend.handle(request).await }
        }))
    }

    async fn handle(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(ClientError::Network("connection refused".to_string()));
        }

        self.inner.requests.lock().unwrap().push(Recorded {
            path: request.path.clone(),
            body: request.body.clone(),
            bearer: request.bearer.clone(),
            retried: request.retried,
        });

        match request.path.as_str() {
            TOKEN_PATH => Ok(self.scripted(&self.inner.login_reply)),
            SIGNUP_PATH => Ok(self.scripted(&self.inner.signup_reply)),
            REFRESH_PATH => Ok(self.refresh().await),
            path => Ok(self.marketplace(path, request.bearer.as_deref())),
        }
    }

    fn scripted(&self, reply: &Mutex<Option<(StatusCode, Value)>>) -> ApiResponse {
        match reply.lock().unwrap().clone() {
            Some((status, body)) => ApiResponse::new(status, body),
            None => ApiResponse::new(
                StatusCode::UNAUTHORIZED,
                json!({"detail": "No active account found with the given credentials"}),
            ),
        }
    }

    async fn refresh(&self) -> ApiResponse {
        self.inner.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.inner.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reply = self.inner.refresh_reply.lock().unwrap().clone();
        match reply {
            Some(body) => {
                if let Some(access) = body.get("access").and_then(Value::as_str) {
                    self.accept_access(access);
                }
                ApiResponse::new(StatusCode::OK, body)
            }
            None => ApiResponse::new(
                StatusCode::UNAUTHORIZED,
                json!({"detail": "Token is invalid or expired", "code": "token_not_valid"}),
            ),
        }
    }

    fn marketplace(&self, path: &str, bearer: Option<&str>) -> ApiResponse {
        let accepted = self.inner.accepted_access.lock().unwrap().clone();
        let authorized = !self.inner.reject_all.load(Ordering::SeqCst)
            && bearer.is_some()
            && bearer == accepted.as_deref();

        if !authorized {
            return ApiResponse::new(
                StatusCode::UNAUTHORIZED,
                json!({"detail": "Given token not valid for any token type"}),
            );
        }

        let body = match path {
            DASHBOARD_PATH => json!({
                "username": "wanjiru",
                "email": "wanjiru@example.com",
                "is_farmer": true,
                "is_buyer": false,
                "products_count": 2,
                "orders_count": 1
            }),
            _ => json!([]),
        };
        ApiResponse::new(StatusCode::OK, body)
    }
}

/// Client wired over `backend` with in-memory persistence
pub fn app(backend: &Backend, persistence: &MemoryTokenPersistence) -> AppState {
    AppState::with_transport(
        Arc::new(Config::for_base_url("http://backend.test")),
        backend.transport(),
        Arc::new(persistence.clone()),
    )
}

pub fn token_pair(access: &str, refresh: &str) -> Value {
    json!({"access": access, "refresh": refresh})
}
