//! Route protection for views that need a signed-in user

use std::future::Future;

use tokio_util::sync::CancellationToken;

use super::session::SessionManager;
use crate::error::{ClientError, ClientResult};
use crate::routes::Route;

/// What a protected view should do right now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Recovery still running; show a loading state
    Pending,
    /// Signed out; go to the login route
    Redirect(String),
    Proceed,
}

/// Outcome of a guarded view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    Rendered(T),
    Redirect(String),
}

impl<T> Guarded<T> {
    pub fn rendered(self) -> Option<T> {
        match self {
            Guarded::Rendered(value) => Some(value),
            Guarded::Redirect(_) => None,
        }
    }
}

/// The one gate every protected view goes through
#[derive(Debug, Clone)]
pub struct RouteGuard {
    login_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(Route::Login.path())
    }
}

impl RouteGuard {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Decide without waiting
    pub fn decide(&self, session: &SessionManager) -> GuardDecision {
        if !session.is_auth_ready() {
            GuardDecision::Pending
        } else if !session.is_authenticated() {
            GuardDecision::Redirect(self.login_path.clone())
        } else {
            GuardDecision::Proceed
        }
    }

    /// Wait for recovery, then either redirect or run the view's fetch.
    ///
    /// A fetch that fails because the session ended underneath it (refresh
    /// failed during the call) is turned into a redirect as well.
    pub async fn protect<T, F, Fut>(
        &self,
        session: &SessionManager,
        view: F,
    ) -> ClientResult<Guarded<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        session.wait_ready().await;

        if let GuardDecision::Redirect(path) = self.decide(session) {
            tracing::debug!(redirect = %path, "Protected view requires login");
            return Ok(Guarded::Redirect(path));
        }

        match view().await {
            Ok(value) => Ok(Guarded::Rendered(value)),
            Err(e) if e.is_session_terminal() && !session.is_authenticated() => {
                tracing::info!(error = %e, redirect = %self.login_path, "Session ended during view fetch");
                Ok(Guarded::Redirect(self.login_path.clone()))
            }
            Err(e) => Err(e),
        }
    }
}

/// Cancellation scope owned by a mounted view.
///
/// Cancelling the scope (navigating away) makes every fetch still running
/// through it resolve to [`ClientError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    token: CancellationToken,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nested scope, cancelled together with this one
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `fut` unless the scope is cancelled first
    pub async fn run<T, Fut>(&self, fut: Fut) -> ClientResult<T>
    where
        Fut: Future<Output = ClientResult<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ClientError::Cancelled),
            result = fut => result,
        }
    }
}
