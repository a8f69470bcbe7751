//! In-memory token store backed by refresh-token persistence
//!
//! The store is the single source of truth for the current tokens. Every
//! mutation bumps an epoch counter; callers that read the tokens before a
//! network call can later ask "did anything change since?" by comparing
//! epochs, without holding a lock across the await.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::persistence::TokenPersistence;
use crate::models::Tokens;

#[derive(Debug, Default)]
struct TokenState {
    access: Option<String>,
    refresh: Option<String>,
    epoch: u64,
}

/// Current access/refresh tokens
pub struct TokenStore {
    state: RwLock<TokenState>,
    persistence: Arc<dyn TokenPersistence>,
}

impl TokenStore {
    /// Open the store, rehydrating the persisted refresh token.
    ///
    /// The access token always starts empty. A persistence read failure or
    /// a revocation marker starts the store signed out.
    pub fn open(persistence: Arc<dyn TokenPersistence>) -> Self {
        let refresh = match persistence.load() {
            Ok(refresh) => refresh.filter(|token| !token.trim().is_empty()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read persisted session, starting signed out");
                None
            }
        };

        if refresh.is_some() {
            tracing::debug!("Rehydrated persisted refresh token");
        }

        Self {
            state: RwLock::new(TokenState {
                access: None,
                refresh,
                epoch: 0,
            }),
            persistence,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TokenState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TokenState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current tokens
    pub fn get(&self) -> Tokens {
        self.snapshot().0
    }

    /// Current tokens together with the epoch they were read at
    pub fn snapshot(&self) -> (Tokens, u64) {
        let state = self.read();
        (
            Tokens {
                access: state.access.clone(),
                refresh: state.refresh.clone(),
            },
            state.epoch,
        )
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access.clone()
    }

    pub fn has_refresh_token(&self) -> bool {
        self.read().refresh.is_some()
    }

    /// Mutation counter; changes on every write
    pub fn epoch(&self) -> u64 {
        self.read().epoch
    }

    /// Replace the access token only
    pub fn set_access(&self, access: impl Into<String>) {
        let mut state = self.write();
        state.access = Some(access.into());
        state.epoch += 1;
    }

    /// Install a fresh pair and persist the refresh token
    pub fn set_session(&self, access: impl Into<String>, refresh: impl Into<String>) {
        let refresh = refresh.into();
        let mut state = self.write();

        self.persist(&refresh);
        state.access = Some(access.into());
        state.refresh = Some(refresh);
        state.epoch += 1;
    }

    /// Wipe memory and the persisted refresh token
    pub fn clear(&self) {
        let mut state = self.write();
        self.erase();
        state.access = None;
        state.refresh = None;
        state.epoch += 1;
    }

    /// Store a refreshed access token (and a rotated refresh token, if the
    /// backend sent one) unless the tokens changed since `epoch`.
    ///
    /// Returns false when a login or logout got there first.
    pub fn set_access_if(
        &self,
        epoch: u64,
        access: String,
        rotated_refresh: Option<String>,
    ) -> bool {
        let mut state = self.write();
        if state.epoch != epoch {
            return false;
        }

        if let Some(refresh) = rotated_refresh {
            self.persist(&refresh);
            state.refresh = Some(refresh);
        }
        state.access = Some(access);
        state.epoch += 1;
        true
    }

    /// Clear the session unless the tokens changed since `epoch`
    pub fn clear_if(&self, epoch: u64) -> bool {
        let mut state = self.write();
        if state.epoch != epoch {
            return false;
        }

        self.erase();
        state.access = None;
        state.refresh = None;
        state.epoch += 1;
        true
    }

    // Persistence failures never roll back the in-memory change; the
    // session keeps working for this process and the failure is logged.
    fn persist(&self, refresh: &str) {
        if let Err(e) = self.persistence.save(refresh) {
            tracing::error!(error = %e, "Failed to persist refresh token; session will not survive restart");
        }
    }

    // A token that cannot be erased is overwritten with the revocation
    // marker, so a restart never signs the user back in.
    fn erase(&self) {
        let Err(e) = self.persistence.clear() else {
            return;
        };
        tracing::warn!(error = %e, "Failed to erase persisted refresh token, revoking it instead");

        if let Err(e) = self.persistence.save("") {
            tracing::error!(
                error = %e,
                "Failed to revoke persisted refresh token; it will be restored on restart"
            );
        }
    }
}
