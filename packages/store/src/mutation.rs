//! # Optimistic mutations
//!
//! [`MutationCoordinator::run`] drives one [`OptimisticMutation`] through a
//! fixed sequence:
//!
//! 1. cancel in-flight fetches of every affected key and wait for that to finish,
//! 2. capture a [`MutationContext`] (the affected entries, including absent ones),
//! 3. apply the optimistic rewrite, then any side effect such as navigation,
//! 4. dispatch the remote write,
//! 5. on failure restore the captured entries and reverse the side effect,
//! 6. invalidate every affected key, whatever the outcome.
//!
//! Step 1 must complete before step 3: a fetch that is still running could
//! otherwise land after the optimistic value and silently replace it.
//!
//! The context is owned by a single `run` call and consumed (or dropped) at
//! settlement, so a snapshot can never be replayed by a later mutation.

use std::fmt;
use std::future::Future;

use tracing::{debug, warn};

use crate::cache::{CacheEntry, QueryCache};
use crate::query::QueryKey;

/// A remote write with an optimistic local counterpart.
pub trait OptimisticMutation {
    /// Input of one mutation call.
    type Vars: Clone;
    type Output;
    type Error: fmt::Display;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Every cached query the write can affect, list and detail alike.
    fn affected_keys(&self, vars: &Self::Vars) -> Vec<QueryKey>;

    /// Rewrite the cache to the state expected after the write succeeds.
    fn apply(&self, cache: &QueryCache, vars: &Self::Vars);

    /// Perform the remote write.
    fn dispatch(&self, vars: Self::Vars) -> impl Future<Output = Result<Self::Output, Self::Error>>;

    /// Side effect run right after [`apply`](Self::apply).
    fn after_apply(&self, _vars: &Self::Vars) {}

    /// Undo [`after_apply`](Self::after_apply) when the write failed.
    fn after_rollback(&self, _vars: &Self::Vars) {}
}

/// Pre-mutation state of the affected keys.
#[derive(Debug)]
pub struct MutationContext {
    entries: Vec<(QueryKey, Option<CacheEntry>)>,
}

impl MutationContext {
    pub fn capture(cache: &QueryCache, keys: &[QueryKey]) -> Self {
        Self {
            entries: keys.iter().map(|k| (k.clone(), cache.entry(k))).collect(),
        }
    }

    /// Put every captured entry back exactly as it was.
    pub fn rollback(self, cache: &QueryCache) {
        for (key, entry) in self.entries {
            cache.restore_entry(&key, entry);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.iter().map(|(k, _)| k)
    }
}

/// Runs optimistic mutations against one cache.
#[derive(Clone, Default)]
pub struct MutationCoordinator {
    cache: QueryCache,
}

impl MutationCoordinator {
    pub fn new(cache: QueryCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub async fn run<M: OptimisticMutation>(
        &self,
        mutation: &M,
        vars: M::Vars,
    ) -> Result<M::Output, M::Error> {
        let keys = mutation.affected_keys(&vars);

        for key in &keys {
            self.cache.cancel_queries(key).await;
        }

        let context = MutationContext::capture(&self.cache, &keys);
        mutation.apply(&self.cache, &vars);
        mutation.after_apply(&vars);
        debug!(mutation = mutation.name(), keys = keys.len(), "applied optimistic update");

        let result = mutation.dispatch(vars.clone()).await;

        match &result {
            Ok(_) => drop(context),
            Err(err) => {
                warn!(mutation = mutation.name(), error = %err, "mutation failed, rolling back");
                context.rollback(&self.cache);
                mutation.after_rollback(&vars);
            }
        }

        for key in &keys {
            self.cache.invalidate_queries(key);
        }
        result
    }
}

/// Lifecycle of a mutation as shown to the UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

/// Status plus the last error message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutationState {
    pub status: MutationStatus,
    pub error: Option<String>,
}

impl MutationState {
    pub fn pending() -> Self {
        Self {
            status: MutationStatus::Pending,
            error: None,
        }
    }

    pub fn settled<T, E: fmt::Display>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Self {
                status: MutationStatus::Success,
                error: None,
            },
            Err(err) => Self {
                status: MutationStatus::Error,
                error: Some(err.to_string()),
            },
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == MutationStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Member, MemberStatus};
    use crate::query::QueryData;
    use futures::channel::oneshot;
    use futures::future::{FutureExt, Shared};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn member(id: &str, status: MemberStatus) -> Member {
        serde_json::from_value(serde_json::json!({
            "id": id, "first_name": "F", "last_name": "L", "status": status,
        }))
        .unwrap()
    }

    /// Clears the member list; succeeds or fails on demand.
    struct ClearMembers {
        fail: bool,
        events: Rc<RefCell<Vec<&'static str>>>,
    }

    impl OptimisticMutation for ClearMembers {
        type Vars = ();
        type Output = ();
        type Error = String;

        fn name(&self) -> &'static str {
            "clear_members"
        }

        fn affected_keys(&self, _: &()) -> Vec<QueryKey> {
            vec![QueryKey::members(), QueryKey::payments()]
        }

        fn apply(&self, cache: &QueryCache, _: &()) {
            cache.update_query_data(&QueryKey::members(), |data| {
                if let Some(list) = data.as_members_mut() {
                    list.clear();
                }
            });
            cache.set_query_data(QueryKey::payments(), QueryData::Payments(vec![]));
        }

        async fn dispatch(&self, _: ()) -> Result<(), String> {
            self.events.borrow_mut().push("dispatch");
            if self.fail {
                Err("remote unavailable".to_string())
            } else {
                Ok(())
            }
        }

        fn after_apply(&self, _: &()) {
            self.events.borrow_mut().push("after_apply");
        }

        fn after_rollback(&self, _: &()) {
            self.events.borrow_mut().push("after_rollback");
        }
    }

    #[tokio::test]
    async fn test_failure_restores_exact_snapshot() {
        let cache = QueryCache::new();
        cache.set_query_data(
            QueryKey::members(),
            QueryData::Members(vec![member("1", MemberStatus::Active)]),
        );
        let before = cache.get_query_data(&QueryKey::members());

        let events = Rc::new(RefCell::new(Vec::new()));
        let mutation = ClearMembers { fail: true, events: events.clone() };
        let result = MutationCoordinator::new(cache.clone()).run(&mutation, ()).await;

        assert!(result.is_err());
        assert_eq!(cache.get_query_data(&QueryKey::members()), before);
        // Absent before the mutation, absent after rollback.
        assert!(cache.get_query_data(&QueryKey::payments()).is_none());
        assert_eq!(*events.borrow(), vec!["after_apply", "dispatch", "after_rollback"]);
        assert!(cache.is_stale(&QueryKey::members()));
    }

    #[tokio::test]
    async fn test_success_keeps_optimistic_value_and_invalidates() {
        let cache = QueryCache::new();
        cache.set_query_data(
            QueryKey::members(),
            QueryData::Members(vec![member("1", MemberStatus::Active)]),
        );

        let events = Rc::new(RefCell::new(Vec::new()));
        let mutation = ClearMembers { fail: false, events: events.clone() };
        MutationCoordinator::new(cache.clone()).run(&mutation, ()).await.unwrap();

        let entry = cache.entry(&QueryKey::members()).unwrap();
        assert!(entry.data.as_members().unwrap().is_empty());
        assert!(entry.invalidated);
        assert!(cache.entry(&QueryKey::payments()).unwrap().invalidated);
        assert_eq!(*events.borrow(), vec!["after_apply", "dispatch"]);
    }

    /// Pauses member 42 once the gate opens, then fails.
    struct HeldPause {
        gate: Shared<oneshot::Receiver<()>>,
        fetching_at_apply: Rc<Cell<Option<bool>>>,
    }

    impl OptimisticMutation for HeldPause {
        type Vars = ();
        type Output = ();
        type Error = String;

        fn name(&self) -> &'static str {
            "held_pause"
        }

        fn affected_keys(&self, _: &()) -> Vec<QueryKey> {
            vec![QueryKey::members()]
        }

        fn apply(&self, cache: &QueryCache, _: &()) {
            self.fetching_at_apply.set(Some(cache.is_fetching(&QueryKey::members())));
            cache.update_query_data(&QueryKey::members(), |data| {
                for m in data.as_members_mut().into_iter().flatten() {
                    m.status = MemberStatus::Paused;
                }
            });
        }

        async fn dispatch(&self, _: ()) -> Result<(), String> {
            let _ = self.gate.clone().await;
            Err("write rejected".to_string())
        }
    }

    fn status_of(cache: &QueryCache) -> Vec<(String, MemberStatus)> {
        cache
            .get_query_data(&QueryKey::members())
            .and_then(|d| d.as_members().map(|list| list.to_vec()))
            .unwrap_or_default()
            .into_iter()
            .map(|m| (m.id.as_str().to_string(), m.status))
            .collect()
    }

    #[tokio::test]
    async fn test_in_flight_read_is_cancelled_before_optimistic_write() {
        let cache = QueryCache::new();
        let key = QueryKey::members();
        cache.set_query_data(key.clone(), QueryData::Members(vec![member("42", MemberStatus::Active)]));
        cache.invalidate_queries(&key);

        // A read is in flight when the mutation starts.
        let (respond, response) = oneshot::channel::<QueryData>();
        let fetch = cache.refetch_query(key.clone(), || async move {
            Ok::<_, ()>(response.await.unwrap())
        });
        futures::pin_mut!(fetch);
        assert!(futures::poll!(fetch.as_mut()).is_pending());
        assert!(cache.is_fetching(&key));

        let (open, gate) = oneshot::channel::<()>();
        let fetching_at_apply = Rc::new(Cell::new(None));
        let mutation = HeldPause {
            gate: gate.shared(),
            fetching_at_apply: fetching_at_apply.clone(),
        };
        let coordinator = MutationCoordinator::new(cache.clone());
        let run = coordinator.run(&mutation, ());
        futures::pin_mut!(run);
        assert!(futures::poll!(run.as_mut()).is_pending());

        assert_eq!(fetching_at_apply.get(), Some(false));
        assert_eq!(status_of(&cache), vec![("42".to_string(), MemberStatus::Paused)]);

        // The stale response lands while the write is still pending.
        respond
            .send(QueryData::Members(vec![
                member("42", MemberStatus::Active),
                member("99", MemberStatus::Pending),
            ]))
            .unwrap();
        fetch.await.unwrap();
        assert_eq!(status_of(&cache), vec![("42".to_string(), MemberStatus::Paused)]);

        open.send(()).unwrap();
        assert!(run.await.is_err());
        assert_eq!(status_of(&cache), vec![("42".to_string(), MemberStatus::Active)]);
    }

    #[test]
    fn test_settled_state() {
        let ok: Result<(), String> = Ok(());
        let err: Result<(), String> = Err("boom".into());
        assert_eq!(MutationState::settled(&ok).status, MutationStatus::Success);
        let failed = MutationState::settled(&err);
        assert_eq!(failed.status, MutationStatus::Error);
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(MutationState::pending().is_pending());
    }
}
