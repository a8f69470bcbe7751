//! AgriConnect marketplace client
//!
//! Session core (token store, session manager, auth interceptor, route
//! guard) plus typed calls for the marketplace API.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod transport;

pub use api::ApiClient;
pub use auth::{RouteGuard, SessionManager, SessionStatus};
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use state::AppState;
