//! Session manager
//!
//! Owns the token store and drives every session transition: credential
//! login, signup, logout, access-token refresh and the one-time startup
//! recovery. Observers follow the session through a `watch` channel.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{watch, Mutex, OnceCell};
use tower::ServiceExt;
use validator::Validate;

use super::store::TokenStore;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    LoginRequest, RefreshRequest, RefreshResponse, SignupOutcome, SignupProfile, SignupResponse,
    TokenPair, Tokens,
};
use crate::transport::{ApiRequest, ApiResponse, Transport};

const TOKEN_PATH: &str = "/api/token/";
const REFRESH_PATH: &str = "/api/token/refresh/";
const SIGNUP_PATH: &str = "/api/signup/";

/// Externally visible session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Startup recovery has not finished yet
    Unknown,
    Authenticated,
    Unauthenticated,
}

/// Single logical session for one client instance
pub struct SessionManager {
    transport: Transport,
    store: TokenStore,
    /// Serializes refreshes; see [`SessionManager::refresh_after`]
    refresh_lock: Mutex<()>,
    /// Serializes login/signup against each other
    credential_lock: Mutex<()>,
    recovery: OnceCell<()>,
    ready: AtomicBool,
    status: watch::Sender<SessionStatus>,
}

impl SessionManager {
    /// Create a session over an un-intercepted transport.
    ///
    /// Token endpoints must not go through the auth interceptor, otherwise a
    /// 401 from the refresh endpoint would try to refresh itself.
    pub fn new(transport: Transport, store: TokenStore) -> Self {
        let (status, _) = watch::channel(SessionStatus::Unknown);

        Self {
            transport,
            store,
            refresh_lock: Mutex::new(()),
            credential_lock: Mutex::new(()),
            recovery: OnceCell::new(),
            ready: AtomicBool::new(false),
            status,
        }
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// An access token is currently held
    pub fn is_authenticated(&self) -> bool {
        self.store.access_token().is_some()
    }

    /// Startup recovery has completed. Never reverts to false.
    pub fn is_auth_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Follow status transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn tokens(&self) -> Tokens {
        self.store.get()
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.access_token()
    }

    /// Suspend until startup recovery has completed
    pub async fn wait_ready(&self) {
        let mut status = self.status.subscribe();
        // The sender lives as long as self, so this cannot fail
        let _ = status.wait_for(|s| *s != SessionStatus::Unknown).await;
    }

    fn current_status(&self) -> SessionStatus {
        if !self.is_auth_ready() {
            SessionStatus::Unknown
        } else if self.is_authenticated() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Unauthenticated
        }
    }

    fn publish(&self) {
        let next = self.current_status();
        self.status.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::debug!(from = ?current, to = ?next, "Session status changed");
            *current = next;
            true
        });
    }

    async fn send(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        self.transport.clone().oneshot(request).await
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    /// Exchange credentials for a token pair.
    ///
    /// A rejected login leaves the previous session exactly as it was.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<()> {
        let _guard = self.credential_lock.lock().await;

        let request = ApiRequest::post(TOKEN_PATH).json(&LoginRequest { username, password })?;
        let response = self.send(request).await?;

        if !response.is_success() {
            tracing::warn!(
                username = %username,
                status = %response.status.as_u16(),
                "Login rejected"
            );
            return Err(ClientError::AuthenticationFailed(response.error_message()));
        }

        let pair: TokenPair = response.json().map_err(|e| {
            tracing::warn!(username = %username, error = %e, "Login response carried no tokens");
            ClientError::AuthenticationFailed(format!("malformed token response: {}", e))
        })?;
        self.store.set_session(pair.access, pair.refresh);
        self.publish();

        tracing::info!(username = %username, "Logged in");
        Ok(())
    }

    /// Register a new account.
    ///
    /// When the backend answers with a token pair the user is signed in
    /// straight away; otherwise they still have to log in.
    pub async fn signup(&self, profile: &SignupProfile) -> ClientResult<SignupOutcome> {
        profile
            .validate()
            .map_err(|e| ClientError::RegistrationFailed(e.to_string()))?;

        let _guard = self.credential_lock.lock().await;

        let request = ApiRequest::post(SIGNUP_PATH).json(profile)?;
        let response = self.send(request).await?;

        if !response.is_success() {
            tracing::warn!(
                username = %profile.username,
                status = %response.status.as_u16(),
                "Signup rejected"
            );
            return Err(ClientError::RegistrationFailed(response.error_message()));
        }

        // A body without tokens (or no body at all) just means "registered"
        let body: SignupResponse = response.json().unwrap_or_default();

        match body.into_token_pair() {
            Some(pair) => {
                self.store.set_session(pair.access, pair.refresh);
                self.publish();
                tracing::info!(username = %profile.username, "Signed up and logged in");
                Ok(SignupOutcome::Authenticated)
            }
            None => {
                tracing::info!(username = %profile.username, "Signed up, login required");
                Ok(SignupOutcome::Registered)
            }
        }
    }

    /// Drop both tokens and the persisted refresh token. No network call.
    pub fn logout(&self) {
        self.store.clear();
        self.publish();
        tracing::info!("Logged out");
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Trade the refresh token for a new access token.
    ///
    /// Returns `None` (and signs out) when there is no refresh token or the
    /// backend refuses it. Never retried.
    pub async fn refresh(&self) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Like [`refresh`](Self::refresh), for a caller whose request was sent
    /// with the tokens of `seen_epoch`.
    ///
    /// If the tokens changed while this caller waited for the lock, another
    /// refresh (or a login/logout) already settled the outcome and its
    /// result is returned without another network call.
    pub async fn refresh_after(&self, seen_epoch: u64) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        let (tokens, epoch) = self.store.snapshot();
        if epoch != seen_epoch {
            tracing::debug!("Tokens changed while waiting, reusing refresh outcome");
            return tokens.access;
        }

        self.refresh_locked().await
    }

    /// [`refresh`](Self::refresh) for callers that want an error
    pub async fn renew(&self) -> ClientResult<String> {
        self.refresh().await.ok_or(ClientError::SessionExpired)
    }

    async fn refresh_locked(&self) -> Option<String> {
        let (tokens, epoch) = self.store.snapshot();

        let Some(refresh) = tokens.refresh else {
            tracing::info!("No refresh token available, signing out");
            return self.sign_out_unless_replaced(epoch);
        };

        match self.request_refresh(&refresh).await {
            Ok(RefreshResponse { access, refresh }) => {
                if self.store.set_access_if(epoch, access.clone(), refresh) {
                    self.publish();
                    tracing::info!("Access token refreshed");
                    Some(access)
                } else {
                    tracing::debug!("Session replaced during refresh, discarding result");
                    self.store.access_token()
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, signing out");
                self.sign_out_unless_replaced(epoch)
            }
        }
    }

    /// Sign out unless the session changed since `epoch`. A login that
    /// landed meanwhile stands, and its access token is returned.
    fn sign_out_unless_replaced(&self, epoch: u64) -> Option<String> {
        if self.store.clear_if(epoch) {
            self.publish();
            None
        } else {
            tracing::debug!("Session replaced before sign-out, keeping it");
            self.store.access_token()
        }
    }

    async fn request_refresh(&self, refresh: &str) -> ClientResult<RefreshResponse> {
        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest { refresh })?;
        self.send(request).await?.error_for_status()?.json()
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Restore the persisted session. Runs once per instance; concurrent
    /// callers all wait on the same attempt.
    pub async fn recover(&self) {
        self.recovery
            .get_or_init(|| async move {
                if self.store.has_refresh_token() {
                    tracing::info!("Recovering persisted session");
                    self.refresh().await;
                } else {
                    tracing::debug!("No persisted session");
                }

                self.ready.store(true, Ordering::Release);
                self.publish();

                tracing::info!(authenticated = self.is_authenticated(), "Session ready");
            })
            .await;
    }

    // ========================================================================
    // Interceptor support
    // ========================================================================

    /// Attach the current access token to `request`.
    ///
    /// Returns the token epoch the request was authorized under, for a later
    /// [`refresh_after`](Self::refresh_after).
    pub fn authorize(&self, request: &mut ApiRequest) -> u64 {
        let (tokens, epoch) = self.store.snapshot();
        request.bearer = tokens.access;
        epoch
    }
}
