//! Application state shared across collaborators

use std::sync::Arc;

use tower::util::BoxCloneSyncService;
use tower::Layer;

use crate::api::ApiClient;
use crate::auth::{FileTokenPersistence, RouteGuard, SessionManager, TokenPersistence, TokenStore};
use crate::config::Config;
use crate::error::ClientResult;
use crate::middleware::RequestTracingLayer;
use crate::transport::{HttpTransport, Transport};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<SessionManager>,
    pub api: ApiClient,
    pub guard: RouteGuard,
}

impl AppState {
    /// Wire the HTTP stack and the file-backed session from `config`
    pub fn from_config(config: &Config) -> ClientResult<Self> {
        let config = Arc::new(config.clone());

        let http = HttpTransport::new(config.clone())?;
        let transport: Transport = BoxCloneSyncService::new(RequestTracingLayer.layer(http));
        let persistence = Arc::new(FileTokenPersistence::new(config.token_file.clone()));

        tracing::debug!(
            api = %config.api_base_url,
            token_file = %config.token_file.display(),
            "Client state initialized"
        );

        Ok(Self::with_transport(config, transport, persistence))
    }

    /// Wire the state over an arbitrary transport and persistence
    pub fn with_transport(
        config: Arc<Config>,
        transport: Transport,
        persistence: Arc<dyn TokenPersistence>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(
            transport.clone(),
            TokenStore::open(persistence),
        ));
        let api = ApiClient::new(transport, session.clone());
        let guard = RouteGuard::new(config.login_path.clone());

        Self {
            config,
            session,
            api,
            guard,
        }
    }
}
