//! Middleware for the AgriConnect client
//!
//! Tower layers composed around the HTTP transport: request tracing and
//! bearer authentication with refresh-and-retry.

pub mod auth;
mod trace;

pub use auth::{AuthLayer, Authorized};
pub use trace::{RequestTracing, RequestTracingLayer};
