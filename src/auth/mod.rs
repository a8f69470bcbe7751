//! Authentication module for AgriConnect
//!
//! Client-side session lifecycle:
//! - Token store with refresh-token persistence
//! - Session manager (login, signup, logout, refresh, startup recovery)
//! - Route guard and per-view cancellation

mod guard;
mod persistence;
mod session;
mod store;

pub use guard::{GuardDecision, Guarded, RouteGuard, ViewScope};
pub use persistence::{FileTokenPersistence, MemoryTokenPersistence, TokenPersistence};
pub use session::{SessionManager, SessionStatus};
pub use store::TokenStore;
