//! # Session manager
//!
//! [`SessionManager`] owns the dashboard's view of who is signed in: the
//! [`Identity`] reported by the identity provider and the [`UserProfile`] row
//! behind it. It is the only writer of [`AuthState`]; observers register with
//! [`SessionManager::on_change`].
//!
//! ## Lifecycle
//!
//! 1. [`bootstrap`](SessionManager::bootstrap) resolves the stored session
//!    once. The session lookup is bounded by the configured timeout; a
//!    timed-out or failed lookup resolves to "signed out". A profile lookup
//!    that outlives the same timeout only releases `loading`: the identity
//!    stays and the profile is filled in when the row arrives.
//! 2. [`subscribe`](SessionManager::subscribe) + [`drive`](SessionManager::drive)
//!    follow provider events for the rest of the session.
//! 3. [`teardown`](SessionManager::teardown) stops all further state updates;
//!    late completions of in-flight lookups are ignored.
//!
//! The profile always belongs to the current identity: a profile lookup that
//! completes after the identity changed is discarded.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::channel::mpsc;
use futures::future::{self, Either};
use futures::StreamExt;
use store::config::SessionConfig;
use store::{LocalStore, Listeners, Subscription};
use tracing::{debug, error, info, warn};

use super::provider::{AuthEvent, IdentityProvider};
use super::session::{Identity, Session, FORCE_RESET_KEY};
use crate::models::UserProfile;
use crate::navigation::{Navigator, LOGIN_ROUTE};
use crate::remote::{Filter, RemoteStore};
use crate::time::{sleep, with_timeout};
use crate::ApiError;

/// Who is signed in, as far as the UI is concerned.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub identity: Option<Identity>,
    pub profile: Option<UserProfile>,
    /// `true` until the first bootstrap settles.
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            identity: None,
            profile: None,
            loading: true,
        }
    }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }
}

/// Resets the single-flight flag however the bootstrap future ends.
struct FlightGuard<'a>(&'a Cell<bool>);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

struct Inner<P, R, L> {
    provider: P,
    remote: R,
    local: L,
    config: SessionConfig,
    state: RefCell<AuthState>,
    bootstrapping: Cell<bool>,
    torn_down: Cell<bool>,
    listeners: Listeners<AuthState>,
}

pub struct SessionManager<P, R, L> {
    inner: Rc<Inner<P, R, L>>,
}

impl<P, R, L> Clone for SessionManager<P, R, L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<P: IdentityProvider, R: RemoteStore, L: LocalStore> SessionManager<P, R, L> {
    pub fn new(provider: P, remote: R, local: L, config: SessionConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                provider,
                remote,
                local,
                config,
                state: RefCell::new(AuthState::default()),
                bootstrapping: Cell::new(false),
                torn_down: Cell::new(false),
                listeners: Listeners::new(),
            }),
        }
    }

    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity.clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.inner.state.borrow().profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    pub fn provider(&self) -> &P {
        &self.inner.provider
    }

    pub fn on_change(&self, listener: impl Fn(&AuthState) + 'static) -> Subscription {
        self.inner.listeners.add(listener)
    }

    /// Apply `change` and notify listeners if anything moved. No-op after
    /// teardown.
    fn update(&self, change: impl FnOnce(&mut AuthState)) {
        if self.inner.torn_down.get() {
            return;
        }
        let snapshot = {
            let mut state = self.inner.state.borrow_mut();
            let before = state.clone();
            change(&mut state);
            if *state == before {
                return;
            }
            state.clone()
        };
        self.inner.listeners.notify(&snapshot);
    }

    /// Resolve the stored session once.
    ///
    /// A second call while one is running returns the current state without
    /// touching the provider.
    pub async fn bootstrap(&self) -> AuthState {
        if self.inner.torn_down.get() {
            return self.state();
        }
        if self.inner.bootstrapping.replace(true) {
            debug!("bootstrap already in flight");
            return self.state();
        }
        let _guard = FlightGuard(&self.inner.bootstrapping);

        let timeout = self.inner.config.timeout();
        let session = match with_timeout(timeout, self.lookup_session()).await {
            Ok(session) => session,
            Err(err) => {
                warn!("session bootstrap gave up: {err}");
                self.update(|s| {
                    s.identity = None;
                    s.profile = None;
                    s.loading = false;
                });
                return self.state();
            }
        };

        let Some(identity_id) = self.set_identity(session) else {
            self.update(|s| s.loading = false);
            return self.state();
        };

        // A slow profile lookup releases `loading` but keeps the identity;
        // the profile lands whenever the lookup finishes.
        let profile = std::pin::pin!(self.fetch_profile(&identity_id));
        let timer = std::pin::pin!(sleep(timeout));
        if let Either::Right(((), profile)) = future::select(profile, timer).await {
            warn!(%identity_id, "profile lookup outlived the bootstrap timeout");
            self.update(|s| s.loading = false);
            profile.await;
        }
        self.update(|s| s.loading = false);
        self.state()
    }

    async fn lookup_session(&self) -> Option<Session> {
        if self.inner.config.force_reset_on_first_load {
            self.force_reset().await;
        }

        match self.inner.provider.get_session().await {
            Ok(session) => session,
            Err(err) if err.is_unauthorized() => {
                info!("stored session rejected: {err}");
                None
            }
            Err(err) => {
                error!("session lookup failed: {err}");
                None
            }
        }
    }

    /// One-time wipe of stored credentials, remembered by a local flag.
    async fn force_reset(&self) {
        if self.inner.local.get(FORCE_RESET_KEY).is_some() {
            return;
        }
        warn!("clearing stored credentials (one-time reset)");
        if let Err(err) = self.inner.provider.sign_out().await {
            warn!("remote sign-out during reset failed: {err}");
        }
        self.inner.local.clear();
        self.inner.local.set(FORCE_RESET_KEY, "true");
    }

    /// Record the session's identity, dropping a profile that belongs to
    /// someone else. Returns the identity id to load a profile for.
    fn set_identity(&self, session: Option<Session>) -> Option<String> {
        match session.map(|s| s.user) {
            Some(identity) => {
                let id = identity.id.clone();
                self.update(|s| {
                    if s.identity.as_ref().map(|i| &i.id) != Some(&identity.id) {
                        s.profile = None;
                    }
                    s.identity = Some(identity);
                });
                Some(id)
            }
            None => {
                self.update(|s| {
                    s.identity = None;
                    s.profile = None;
                });
                None
            }
        }
    }

    async fn apply_session(&self, session: Option<Session>) {
        if let Some(id) = self.set_identity(session) {
            self.fetch_profile(&id).await;
        }
    }

    /// Load the profile row for `identity_id`.
    ///
    /// A missing row or a failed lookup leaves `profile = None`. The result is
    /// dropped if the identity changed meanwhile.
    pub async fn fetch_profile(&self, identity_id: &str) {
        let filter = Filter::eq("id", identity_id);
        let profile = match self.inner.remote.select_one::<UserProfile>(&filter).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => {
                debug!(identity_id, "no profile row");
                None
            }
            Err(err) => {
                error!(identity_id, "profile lookup failed: {err}");
                None
            }
        };

        self.update(|s| {
            if s.identity.as_ref().is_some_and(|i| i.id == identity_id) {
                s.profile = profile;
            } else {
                debug!(identity_id, "identity changed during profile lookup");
            }
        });
    }

    /// Refetch the current identity's profile; no-op when signed out.
    pub async fn refresh_profile(&self) {
        if let Some(identity) = self.identity() {
            self.fetch_profile(&identity.id).await;
        }
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let session = self.inner.provider.sign_in_with_password(email, password).await?;
        info!(user = %session.user.id, "signed in");
        self.apply_session(Some(session)).await;
        self.update(|s| s.loading = false);
        Ok(())
    }

    /// Sign out remotely and reset everything local, then go to the login
    /// route. Remote failure is logged; the local reset happens regardless.
    pub async fn sign_out(&self, navigator: &impl Navigator) {
        info!("signing out");
        self.inner.local.remove(FORCE_RESET_KEY);
        if let Err(err) = self.inner.provider.sign_out().await {
            error!("remote sign-out failed: {err}");
        }
        self.update(|s| {
            s.identity = None;
            s.profile = None;
            s.loading = false;
        });
        self.inner.local.clear();
        navigator.replace(LOGIN_ROUTE);
    }

    /// Register with the provider. Events are queued on the returned
    /// receiver; feed it to [`drive`](Self::drive). Disposing the
    /// subscription closes the receiver.
    pub fn subscribe(&self) -> (Subscription, mpsc::UnboundedReceiver<AuthEvent>) {
        let (tx, rx) = mpsc::unbounded();
        let subscription = self.inner.provider.subscribe(Box::new(move |event: &AuthEvent| {
            let _ = tx.unbounded_send(event.clone());
        }));
        (subscription, rx)
    }

    /// Handle queued events until the receiver closes or the manager is torn down.
    pub async fn drive(&self, mut events: mpsc::UnboundedReceiver<AuthEvent>) {
        while let Some(event) = events.next().await {
            if self.inner.torn_down.get() {
                break;
            }
            self.handle_auth_event(&event).await;
        }
    }

    pub async fn handle_auth_event(&self, event: &AuthEvent) {
        info!(kind = ?event.kind, "auth state changed");
        self.apply_session(event.session.clone()).await;
        self.update(|s| s.loading = false);
    }

    /// Stop applying state changes. Idempotent.
    pub fn teardown(&self) {
        self.inner.torn_down.set(true);
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.get()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use store::{Collection, MemoryStore};

    use super::*;
    use crate::auth::AuthEventKind;
    use crate::navigation::History;
    use crate::MemoryBackend;

    type Manager = SessionManager<MemoryBackend, MemoryBackend, MemoryStore>;

    fn profile_row(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "email": format!("{id}@example.org"),
            "full_name": "Ada Treasurer",
            "role": "treasurer",
            "status": "active",
        })
    }

    fn setup(config: SessionConfig) -> (Manager, MemoryBackend, MemoryStore) {
        let backend = MemoryBackend::new();
        let local = MemoryStore::new();
        let manager = SessionManager::new(backend.clone(), backend.clone(), local.clone(), config);
        (manager, backend, local)
    }

    #[tokio::test]
    async fn test_bootstrap_with_session_loads_profile() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.insert_rows(Collection::Users, vec![profile_row("u-1")]);
        backend.set_session(Some(MemoryBackend::session_for("u-1", "u-1@example.org")));

        let state = manager.bootstrap().await;
        assert!(!state.loading);
        assert_eq!(state.identity.map(|i| i.id).as_deref(), Some("u-1"));
        assert_eq!(state.profile.map(|p| p.full_name).as_deref(), Some("Ada Treasurer"));
    }

    #[tokio::test]
    async fn test_missing_profile_row_is_not_an_error() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.set_session(Some(MemoryBackend::session_for("u-2", "u-2@example.org")));

        let state = manager.bootstrap().await;
        assert!(state.is_authenticated());
        assert!(state.profile.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_failed_lookup_resolves_signed_out() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.fail_session(true);

        let state = manager.bootstrap().await;
        assert_eq!(
            state,
            AuthState {
                identity: None,
                profile: None,
                loading: false
            }
        );
    }

    #[tokio::test]
    async fn test_expired_session_resolves_signed_out() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.set_session(Some(MemoryBackend::session_for("u-1", "u-1@example.org")));
        backend.reject_session(true);

        let state = manager.bootstrap().await;
        assert!(state.identity.is_none());
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_times_out() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.hang_session(true);

        let started = tokio::time::Instant::now();
        let state = manager.bootstrap().await;
        assert!(started.elapsed() >= Duration::from_millis(5000));
        assert!(state.identity.is_none());
        assert!(state.profile.is_none());
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_profile_lookup_keeps_identity() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.insert_rows(Collection::Users, vec![profile_row("u-1")]);
        backend.set_session(Some(MemoryBackend::session_for("u-1", "u-1@example.org")));
        backend.delay_reads(Duration::from_millis(6000));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = manager.on_change(move |state| sink.borrow_mut().push(state.clone()));

        let state = manager.bootstrap().await;
        assert_eq!(state.identity.map(|i| i.id).as_deref(), Some("u-1"));
        assert_eq!(state.profile.map(|p| p.full_name).as_deref(), Some("Ada Treasurer"));
        assert!(!state.loading);

        // Loading was released at the deadline, before the profile arrived.
        let seen = seen.borrow();
        assert!(seen
            .iter()
            .any(|s| !s.loading && s.identity.is_some() && s.profile.is_none()));
        assert!(seen.iter().all(|s| s.identity.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_is_single_flight() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.hang_session(true);

        let (first, second) = futures::join!(manager.bootstrap(), manager.bootstrap());
        assert!(second.loading, "second call returns without waiting");
        assert!(!first.loading);
        assert_eq!(backend.calls().get_session, 1);

        // Flag is released once the first call settles.
        backend.hang_session(false);
        manager.bootstrap().await;
        assert_eq!(backend.calls().get_session, 2);
    }

    #[tokio::test]
    async fn test_forced_reset_runs_once() {
        let config = SessionConfig {
            force_reset_on_first_load: true,
            ..SessionConfig::default()
        };
        let (manager, backend, local) = setup(config);
        local.set("unrelated", "value");
        backend.set_session(Some(MemoryBackend::session_for("u-1", "u-1@example.org")));

        let state = manager.bootstrap().await;
        assert!(state.identity.is_none(), "wipe signs out");
        assert!(!state.loading);
        assert_eq!(local.get("unrelated"), None);
        assert_eq!(local.get(FORCE_RESET_KEY).as_deref(), Some("true"));
        assert_eq!(backend.calls().sign_out, 1);

        manager.bootstrap().await;
        assert_eq!(backend.calls().sign_out, 1);
    }

    #[tokio::test]
    async fn test_refresh_profile_without_identity_is_noop() {
        let (manager, backend, _) = setup(SessionConfig::default());
        manager.refresh_profile().await;
        assert_eq!(backend.calls().selects, 0);
    }

    #[tokio::test]
    async fn test_refresh_profile_picks_up_changes() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.set_session(Some(MemoryBackend::session_for("u-1", "u-1@example.org")));
        manager.bootstrap().await;
        assert!(manager.profile().is_none());

        backend.insert_rows(Collection::Users, vec![profile_row("u-1")]);
        manager.refresh_profile().await;
        assert!(manager.profile().is_some());
    }

    #[tokio::test]
    async fn test_sign_out_resets_even_when_remote_fails() {
        let (manager, backend, local) = setup(SessionConfig::default());
        backend.insert_rows(Collection::Users, vec![profile_row("u-1")]);
        backend.set_session(Some(MemoryBackend::session_for("u-1", "u-1@example.org")));
        manager.bootstrap().await;
        local.set(FORCE_RESET_KEY, "true");
        local.set("cached", "1");
        backend.fail_sign_out(true);

        let history = History::new("/members");
        manager.sign_out(&history).await;

        let state = manager.state();
        assert!(state.identity.is_none());
        assert!(state.profile.is_none());
        assert!(local.is_empty());
        assert_eq!(history.entries(), vec![LOGIN_ROUTE.to_string()]);
    }

    #[tokio::test]
    async fn test_password_sign_in() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.add_account("chair@example.org", "hunter22", "u-1");
        backend.insert_rows(Collection::Users, vec![profile_row("u-1")]);

        let err = manager.sign_in_with_password("chair@example.org", "nope").await;
        assert!(err.is_err());
        manager
            .sign_in_with_password("chair@example.org", "hunter22")
            .await
            .unwrap();
        assert!(manager.state().is_authenticated());
        assert!(manager.profile().is_some());
    }

    #[tokio::test]
    async fn test_events_follow_provider_until_disposed() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.insert_rows(Collection::Users, vec![profile_row("u-1")]);
        let (subscription, events) = manager.subscribe();
        assert_eq!(backend.listener_count(), 1);

        let session = MemoryBackend::session_for("u-1", "u-1@example.org");
        backend.emit(AuthEventKind::SignedIn, Some(session));
        backend.emit(AuthEventKind::SignedOut, None);
        backend.emit(AuthEventKind::SignedIn, Some(MemoryBackend::session_for("u-1", "u-1@example.org")));
        subscription.unsubscribe();
        assert_eq!(backend.listener_count(), 0);

        // Queued events drain, then the closed channel ends the loop.
        manager.drive(events).await;
        let state = manager.state();
        assert!(state.is_authenticated());
        assert!(state.profile.is_some());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_teardown_ignores_late_updates() {
        let (manager, backend, _) = setup(SessionConfig::default());
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        let _watch = manager.on_change(move |_| counter.set(counter.get() + 1));

        manager.teardown();
        backend.set_session(Some(MemoryBackend::session_for("u-1", "u-1@example.org")));
        manager.bootstrap().await;
        let event = AuthEvent::new(AuthEventKind::SignedOut, None);
        manager.handle_auth_event(&event).await;

        assert_eq!(seen.get(), 0);
        assert!(manager.state().loading);
        assert!(manager.is_torn_down());
    }

    #[tokio::test]
    async fn test_stale_profile_lookup_is_discarded() {
        let (manager, backend, _) = setup(SessionConfig::default());
        backend.insert_rows(Collection::Users, vec![profile_row("u-1"), profile_row("u-2")]);
        backend.set_session(Some(MemoryBackend::session_for("u-2", "u-2@example.org")));
        manager.bootstrap().await;

        manager.fetch_profile("u-1").await;
        let profile = manager.profile().unwrap();
        assert_eq!(profile.id.as_str(), "u-2");
    }
}
