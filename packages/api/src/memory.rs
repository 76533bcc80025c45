//! # In-memory backend for tests and demos
//!
//! [`MemoryBackend`] implements both [`IdentityProvider`] and [`RemoteStore`]
//! over plain collections of JSON rows. It mimics the hosted service closely
//! enough for the session and mutation layers: inserts get a server-assigned
//! `id` and `created_at`, selects honour equality filters, ordering and limits.
//!
//! # Features
//!
//! - **Failure injection**: reads, writes, session lookup and sign-out can be
//!   made to fail with a network error.
//! - **Hanging session lookup**: `get_session` never resolves, for exercising
//!   bootstrap timeouts. [`MemoryBackend::delay_reads`] slows every select.
//! - **Write gate**: [`MemoryBackend::hold_writes`] parks every write until
//!   the returned [`WriteGate`] is released, so tests can observe the cache
//!   while a mutation is still in flight.
//! - **Call counting**: see [`Calls`].
//!
//! Clones share state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use chrono::Utc;
use futures::channel::oneshot;
use futures::future::{self, FutureExt, Shared};
use serde_json::Value;
use store::{Collection, Listeners, Subscription};

use crate::auth::{AuthEvent, AuthEventKind, Identity, IdentityProvider, Session};
use crate::remote::{Filter, RemoteStore};
use crate::time::sleep;
use crate::ApiError;

/// Number of calls received, per operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Calls {
    pub get_session: usize,
    pub sign_out: usize,
    pub selects: usize,
    pub writes: usize,
}

/// Holds writes back until released or dropped.
pub struct WriteGate {
    sender: oneshot::Sender<()>,
}

impl WriteGate {
    pub fn release(self) {
        let _ = self.sender.send(());
    }
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<Collection, Vec<Value>>,
    session: Option<Session>,
    accounts: HashMap<String, (String, Identity)>,
    fail_reads: bool,
    fail_writes: bool,
    fail_session: bool,
    reject_session: bool,
    fail_sign_out: bool,
    hang_session: bool,
    read_delay: Option<Duration>,
    write_gate: Option<Shared<oneshot::Receiver<()>>>,
    calls: Calls,
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Rc<RefCell<MemoryState>>,
    listeners: Listeners<AuthEvent>,
}

fn injected(what: &str) -> ApiError {
    ApiError::Network(format!("injected {what} failure"))
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session for `id`, as the provider would issue it.
    pub fn session_for(id: &str, email: &str) -> Session {
        Session {
            access_token: format!("token-{id}"),
            refresh_token: None,
            expires_at: None,
            user: Identity {
                id: id.to_string(),
                email: Some(email.to_string()),
            },
        }
    }

    /// Append rows to a collection as-is.
    pub fn insert_rows(&self, collection: Collection, rows: impl IntoIterator<Item = Value>) {
        self.state
            .borrow_mut()
            .tables
            .entry(collection)
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, collection: Collection) -> Vec<Value> {
        self.state
            .borrow()
            .tables
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the current session without emitting an event.
    pub fn set_session(&self, session: Option<Session>) {
        self.state.borrow_mut().session = session;
    }

    pub fn current_session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    /// Change the session and notify subscribers.
    pub fn emit(&self, kind: AuthEventKind, session: Option<Session>) {
        self.set_session(session.clone());
        self.listeners.notify(&AuthEvent::new(kind, session));
    }

    pub fn add_account(&self, email: &str, password: &str, id: &str) {
        let identity = Identity {
            id: id.to_string(),
            email: Some(email.to_string()),
        };
        self.state
            .borrow_mut()
            .accounts
            .insert(email.to_string(), (password.to_string(), identity));
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    pub fn fail_session(&self, fail: bool) {
        self.state.borrow_mut().fail_session = fail;
    }

    /// Answer session lookups with an auth-expired error.
    pub fn reject_session(&self, reject: bool) {
        self.state.borrow_mut().reject_session = reject;
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.state.borrow_mut().fail_sign_out = fail;
    }

    pub fn hang_session(&self, hang: bool) {
        self.state.borrow_mut().hang_session = hang;
    }

    /// Park all writes until the gate is released.
    /// Make every select wait `delay` before answering.
    pub fn delay_reads(&self, delay: Duration) {
        self.state.borrow_mut().read_delay = Some(delay);
    }

    pub fn hold_writes(&self) -> WriteGate {
        let (sender, receiver) = oneshot::channel();
        self.state.borrow_mut().write_gate = Some(receiver.shared());
        WriteGate { sender }
    }

    pub fn calls(&self) -> Calls {
        self.state.borrow().calls
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Count the write, wait at the gate, then check for injected failure.
    async fn begin_write(&self) -> Result<(), ApiError> {
        let gate = {
            let mut state = self.state.borrow_mut();
            state.calls.writes += 1;
            state.write_gate.clone()
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.state.borrow().fail_writes {
            return Err(injected("write"));
        }
        Ok(())
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_matches(row: &Value, filter: &Filter) -> bool {
    filter
        .eq
        .iter()
        .all(|(column, expected)| row.get(column).is_some_and(|v| value_text(v) == *expected))
}

impl RemoteStore for MemoryBackend {
    async fn select_rows(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, ApiError> {
        let delay = self.state.borrow().read_delay;
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        let mut state = self.state.borrow_mut();
        state.calls.selects += 1;
        if state.fail_reads {
            return Err(injected("read"));
        }

        let mut rows: Vec<Value> = state
            .tables
            .get(&collection)
            .map(|rows| rows.iter().filter(|r| row_matches(r, filter)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = &filter.order {
            rows.sort_by(|a, b| {
                let key = |row: &Value| row.get(&order.column).map(value_text);
                let ordering = key(a).cmp(&key(b));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert_row(&self, collection: Collection, mut row: Value) -> Result<Value, ApiError> {
        self.begin_write().await?;

        if let Some(fields) = row.as_object_mut() {
            if fields.get("id").is_none_or(Value::is_null) {
                fields.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
            }
            if fields.get("created_at").is_none_or(Value::is_null) {
                fields.insert("created_at".into(), Value::String(Utc::now().to_rfc3339()));
            }
        }
        self.state
            .borrow_mut()
            .tables
            .entry(collection)
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update_rows(&self, collection: Collection, patch: Value, filter: &Filter) -> Result<(), ApiError> {
        self.begin_write().await?;

        let mut state = self.state.borrow_mut();
        let Some(rows) = state.tables.get_mut(&collection) else {
            return Ok(());
        };
        for row in rows.iter_mut().filter(|r| row_matches(r, filter)) {
            if let (Some(fields), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
                for (column, value) in changes {
                    fields.insert(column.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    async fn delete_rows(&self, collection: Collection, filter: &Filter) -> Result<(), ApiError> {
        self.begin_write().await?;

        if let Some(rows) = self.state.borrow_mut().tables.get_mut(&collection) {
            rows.retain(|r| !row_matches(r, filter));
        }
        Ok(())
    }
}

impl IdentityProvider for MemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>, ApiError> {
        let (hang, fail, reject) = {
            let mut state = self.state.borrow_mut();
            state.calls.get_session += 1;
            (state.hang_session, state.fail_session, state.reject_session)
        };
        if hang {
            future::pending::<()>().await;
        }
        if fail {
            return Err(injected("session"));
        }
        if reject {
            return Err(ApiError::Unauthorized("refresh token expired".into()));
        }
        Ok(self.current_session())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let identity = {
            let state = self.state.borrow();
            match state.accounts.get(email) {
                Some((expected, identity)) if expected == password => identity.clone(),
                _ => return Err(ApiError::Unauthorized("invalid login credentials".into())),
            }
        };
        let session = Session {
            access_token: uuid::Uuid::new_v4().to_string(),
            refresh_token: Some(uuid::Uuid::new_v4().to_string()),
            expires_at: None,
            user: identity,
        };
        self.emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        let fail = {
            let mut state = self.state.borrow_mut();
            state.calls.sign_out += 1;
            state.fail_sign_out
        };
        self.emit(AuthEventKind::SignedOut, None);
        if fail {
            return Err(injected("sign-out"));
        }
        Ok(())
    }

    fn subscribe(&self, listener: Box<dyn Fn(&AuthEvent)>) -> Subscription {
        self.listeners.add(listener)
    }
}
