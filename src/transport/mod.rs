//! Wire-neutral request/response types and the HTTP transport
//!
//! Everything that talks to the backend is a `tower::Service<ApiRequest>`.
//! The reqwest transport sits at the bottom; tracing and the auth
//! interceptor are layered on top of it (see [`crate::middleware`]).

mod http;

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;
use tower::util::BoxCloneSyncService;

use crate::error::{ClientError, ClientResult};

pub use http::HttpTransport;

/// Type-erased transport shared by the session manager and the interceptor
pub type Transport = BoxCloneSyncService<ApiRequest, ApiResponse, ClientError>;

/// Outbound API call
#[derive(Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the API origin, e.g. `/api/products/`
    pub path: String,
    pub body: Option<Value>,
    /// Bearer credential attached by the interceptor
    pub bearer: Option<String>,
    /// Set once the interceptor has replayed this request after a refresh
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            bearer: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> ClientResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

// Credentials never end up in logs.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("has_body", &self.body.is_some())
            .field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
            .field("retried", &self.retried)
            .finish()
    }
}

/// Response as seen by the client: status plus the decoded JSON body
/// (`Value::Null` when the body was empty).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Decode the body into `T`
    pub fn json<T: DeserializeOwned>(self) -> ClientResult<T> {
        Ok(serde_json::from_value(self.body)?)
    }

    /// Best-effort human message from an error body
    pub fn error_message(&self) -> String {
        for key in ["detail", "error", "message"] {
            if let Some(message) = self.body.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }

        // DRF validation errors: {"field": ["msg", ...], ...}
        if let Some(fields) = self.body.as_object() {
            let messages: Vec<String> = fields
                .iter()
                .filter_map(|(field, value)| {
                    let first = value.as_array()?.first()?.as_str()?;
                    Some(format!("{}: {}", field, first))
                })
                .collect();
            if !messages.is_empty() {
                return messages.join("; ");
            }
        }

        if let Some(text) = self.body.as_str() {
            if !text.is_empty() {
                return text.to_string();
            }
        }

        self.status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    }

    /// Map non-2xx statuses to [`ClientError`]
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else if self.is_unauthorized() {
            Err(ClientError::Unauthorized)
        } else {
            Err(ClientError::Api {
                status: self.status.as_u16(),
                message: self.error_message(),
            })
        }
    }
}
