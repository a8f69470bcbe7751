//! Authentication middleware
//!
//! Tower layer that attaches the session's access token to every outbound
//! request and recovers from an expired access token with one refresh and
//! one replay.

use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

use crate::auth::SessionManager;
use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, ApiResponse};

/// Layer producing [`Authorized`] services
#[derive(Clone)]
pub struct AuthLayer {
    session: Arc<SessionManager>,
}

impl AuthLayer {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = Authorized<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Authorized {
            inner,
            session: self.session.clone(),
        }
    }
}

/// Bearer-authenticated service with refresh-and-retry on 401
#[derive(Clone)]
pub struct Authorized<S> {
    inner: S,
    session: Arc<SessionManager>,
}

impl<S> Service<ApiRequest> for Authorized<S>
where
    S: Service<ApiRequest, Response = ApiResponse, Error = ClientError> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = ApiResponse;
    type Error = ClientError;
    type Future = BoxFuture<'static, ClientResult<ApiResponse>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        // Keep the instance that was polled ready; leave a fresh clone behind
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(intercept(inner, self.session.clone(), request))
    }
}

async fn intercept<S>(
    mut inner: S,
    session: Arc<SessionManager>,
    mut request: ApiRequest,
) -> ClientResult<ApiResponse>
where
    S: Service<ApiRequest, Response = ApiResponse, Error = ClientError>,
{
    let epoch = session.authorize(&mut request);
    let mut replay = request.clone();

    let response = inner.call(request).await?;
    if !response.is_unauthorized() {
        return Ok(response);
    }

    if replay.retried {
        tracing::warn!(path = %replay.path, "Request rejected after retry");
        return Err(ClientError::Unauthorized);
    }
    replay.retried = true;

    // Concurrent 401s queue here; only the first one hits the network
    let Some(token) = session.refresh_after(epoch).await else {
        tracing::warn!(path = %replay.path, "Request rejected and session could not be refreshed");
        return Err(ClientError::Unauthorized);
    };
    replay.bearer = Some(token);

    let path = replay.path.clone();
    let response = inner.ready().await?.call(replay).await?;
    if response.is_unauthorized() {
        tracing::warn!(path = %path, "Request rejected after retry");
        return Err(ClientError::Unauthorized);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryTokenPersistence, TokenStore};
    use crate::transport::Transport;
    use reqwest::StatusCode;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::service_fn;
    use tower::util::BoxCloneSyncService;

    /// Session whose token endpoints always answer the refresh with `a_new`
    fn session(
        persistence: MemoryTokenPersistence,
        refreshes: Arc<AtomicUsize>,
    ) -> Arc<SessionManager> {
        let transport = BoxCloneSyncService::new(service_fn(move |_request: ApiRequest| {
            let refreshes = refreshes.clone();
            async move {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ClientError>(ApiResponse::new(StatusCode::OK, json!({"access": "a_new"})))
            }
        }));
        Arc::new(SessionManager::new(
            transport,
            TokenStore::open(Arc::new(persistence)),
        ))
    }

    /// Backend that records bearers and accepts only `accepted`
    fn backend(accepted: &'static str, seen: Arc<Mutex<Vec<Option<String>>>>) -> Transport {
        BoxCloneSyncService::new(service_fn(move |request: ApiRequest| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(request.bearer.clone());
                let status = if request.bearer.as_deref() == Some(accepted) {
                    StatusCode::OK
                } else {
                    StatusCode::UNAUTHORIZED
                };
                Ok::<_, ClientError>(ApiResponse::new(status, Value::Null))
            }
        }))
    }

    #[tokio::test]
    async fn test_sends_unauthenticated_without_token() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let service = backend("anything", seen.clone());
        let refreshes = Arc::new(AtomicUsize::new(0));
        let session = session(MemoryTokenPersistence::new(), refreshes.clone());

        let err = AuthLayer::new(session.clone())
            .layer(service)
            .oneshot(ApiRequest::get("/api/orders/"))
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::Unauthorized);
        assert_eq!(*seen.lock().unwrap(), vec![None]);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_refreshes_and_replays_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let service = backend("a_new", seen.clone());
        let refreshes = Arc::new(AtomicUsize::new(0));
        let session = session(MemoryTokenPersistence::with_refresh_token("r1"), refreshes.clone());

        let response = AuthLayer::new(session.clone())
            .layer(service)
            .oneshot(ApiRequest::get("/api/orders/"))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("a_new".to_string())]
        );
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_already_retried_request_is_not_refreshed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let service = backend("never", seen.clone());
        let refreshes = Arc::new(AtomicUsize::new(0));
        let session = session(MemoryTokenPersistence::with_refresh_token("r1"), refreshes.clone());

        let mut request = ApiRequest::get("/api/products/");
        request.retried = true;

        let err = AuthLayer::new(session)
            .layer(service)
            .oneshot(request)
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::Unauthorized);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_rejection_fails_without_second_refresh() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let service = backend("never", seen.clone());
        let refreshes = Arc::new(AtomicUsize::new(0));
        let session = session(MemoryTokenPersistence::with_refresh_token("r1"), refreshes.clone());

        let err = AuthLayer::new(session)
            .layer(service)
            .oneshot(ApiRequest::get("/api/products/"))
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::Unauthorized);
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }
}
