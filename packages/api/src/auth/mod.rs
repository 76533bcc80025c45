//! Authentication: identity provider seam, session data and the session manager.

mod manager;
mod provider;
mod session;

pub use manager::{AuthState, SessionManager};
pub use provider::{AuthEvent, AuthEventKind, IdentityProvider};
pub use session::{Identity, Session, FORCE_RESET_KEY, SESSION_STORAGE_KEY};
