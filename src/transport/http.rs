//! reqwest-backed transport

use futures_util::future::BoxFuture;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

use super::{ApiRequest, ApiResponse};
use crate::config::Config;
use crate::error::{ClientError, ClientResult};

/// Sends [`ApiRequest`]s to the configured backend origin
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl HttpTransport {
    pub fn new(config: Arc<Config>) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { client, config })
    }
}

impl Service<ApiRequest> for HttpTransport {
    type Response = ApiResponse;
    type Error = ClientError;
    type Future = BoxFuture<'static, ClientResult<ApiResponse>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        let client = self.client.clone();
        let url = self.config.endpoint(&request.path);

        Box::pin(async move {
            let mut builder = client
                .request(request.method, &url)
                .header(ACCEPT, "application/json");

            if let Some(token) = &request.bearer {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;

            let body = if bytes.is_empty() {
                Value::Null
            } else {
                // Non-JSON error pages are kept as text for error_message()
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            };

            Ok(ApiResponse { status, body })
        })
    }
}
