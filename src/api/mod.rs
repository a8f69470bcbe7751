//! Marketplace API client
//!
//! Typed calls for products, orders, updates, weather, the user dashboard
//! and the AI assistant. Every call goes through the auth interceptor, so a
//! caller never deals with tokens directly.

mod assistant;
mod orders;
mod products;
mod updates;
mod users;
mod weather;

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tower::{Layer, ServiceExt};

use crate::auth::SessionManager;
use crate::error::ClientResult;
use crate::middleware::{AuthLayer, Authorized};
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Authenticated client for the marketplace endpoints
#[derive(Clone)]
pub struct ApiClient {
    service: Authorized<Transport>,
}

impl ApiClient {
    pub fn new(transport: Transport, session: Arc<SessionManager>) -> Self {
        Self {
            service: AuthLayer::new(session).layer(transport),
        }
    }

    /// Send through the interceptor and map non-2xx to errors
    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        self.service.clone().oneshot(request).await?.error_for_status()
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::post(path).json(body)?).await?.json()
    }

    async fn patch<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        self.send(ApiRequest::patch(path).json(body)?).await?.json()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::auth::{MemoryTokenPersistence, TokenStore};
    use crate::error::ClientError;
    use reqwest::Method;
    use serde_json::Value;
    use std::sync::Mutex;
    use tower::service_fn;
    use tower::util::BoxCloneSyncService;

    /// Request as seen by the fake backend
    #[derive(Debug, Clone)]
    pub struct Seen {
        pub method: Method,
        pub path: String,
        pub body: Option<Value>,
        pub bearer: Option<String>,
    }

    /// Client with a signed-in session whose backend answers every call
    /// with `respond(request)`.
    pub fn client<F>(respond: F) -> (ApiClient, Arc<Mutex<Vec<Seen>>>)
    where
        F: Fn(&ApiRequest) -> ApiResponse + Clone + Send + Sync + 'static,
    {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let transport: Transport = BoxCloneSyncService::new(service_fn(move |request: ApiRequest| {
            let respond = respond.clone();
            let log = log.clone();
            async move {
                log.lock().unwrap().push(Seen {
                    method: request.method.clone(),
                    path: request.path.clone(),
                    body: request.body.clone(),
                    bearer: request.bearer.clone(),
                });
                Ok::<_, ClientError>(respond(&request))
            }
        }));

        let store = TokenStore::open(Arc::new(MemoryTokenPersistence::new()));
        store.set_session("a1", "r1");
        let session = Arc::new(SessionManager::new(transport.clone(), store));

        (ApiClient::new(transport, session), seen)
    }
}
