//! Identity provider interface and auth-state events.

use std::future::Future;

use store::Subscription;

use super::session::Session;
use crate::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// An auth-state transition, with the session in effect afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }
}

/// External identity service: session lookup, sign-in, sign-out and change
/// notifications.
pub trait IdentityProvider {
    /// The current session, `Ok(None)` when signed out.
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, ApiError>>;

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, ApiError>>;

    /// Invalidate the session remotely. Local credentials are dropped even
    /// when this returns an error.
    fn sign_out(&self) -> impl Future<Output = Result<(), ApiError>>;

    /// Register for auth-state transitions.
    fn subscribe(&self, listener: Box<dyn Fn(&AuthEvent)>) -> Subscription;
}
