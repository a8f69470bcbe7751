//! Request tracing middleware

use futures_util::future::BoxFuture;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::transport::{ApiRequest, ApiResponse};

/// Layer producing [`RequestTracing`] services
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestTracingLayer;

impl<S> Layer<S> for RequestTracingLayer {
    type Service = RequestTracing<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTracing { inner }
    }
}

/// Logs every outbound call with timing
#[derive(Debug, Clone)]
pub struct RequestTracing<S> {
    inner: S,
}

impl<S> Service<ApiRequest> for RequestTracing<S>
where
    S: Service<ApiRequest, Response = ApiResponse, Error = ClientError>,
    S::Future: Send + 'static,
{
    type Response = ApiResponse;
    type Error = ClientError;
    type Future = BoxFuture<'static, ClientResult<ApiResponse>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        let request_id = Uuid::new_v4();
        let method = request.method.clone();
        let path = request.path.clone();
        let retried = request.retried;

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            retried = retried,
            "Request started"
        );

        let start = Instant::now();
        let future = self.inner.call(request);

        Box::pin(async move {
            let result = future.await;
            let duration = start.elapsed();

            match &result {
                Ok(response) if response.status.is_server_error() => {
                    tracing::error!(
                        request_id = %request_id,
                        method = %method,
                        path = %path,
                        retried = retried,
                        status = %response.status.as_u16(),
                        duration_ms = %duration.as_millis(),
                        "Request completed with server error"
                    );
                }
                Ok(response) if response.status.is_client_error() => {
                    tracing::warn!(
                        request_id = %request_id,
                        method = %method,
                        path = %path,
                        retried = retried,
                        status = %response.status.as_u16(),
                        duration_ms = %duration.as_millis(),
                        "Request completed with client error"
                    );
                }
                Ok(response) => {
                    tracing::info!(
                        request_id = %request_id,
                        method = %method,
                        path = %path,
                        retried = retried,
                        status = %response.status.as_u16(),
                        duration_ms = %duration.as_millis(),
                        "Request completed"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %request_id,
                        method = %method,
                        path = %path,
                        retried = retried,
                        error = %e,
                        duration_ms = %duration.as_millis(),
                        "Request failed"
                    );
                }
            }

            result
        })
    }
}
