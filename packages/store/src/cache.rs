//! # Query cache — last-known read results keyed by [`QueryKey`]
//!
//! The cache holds one [`CacheEntry`] per key and tracks which keys have a
//! fetch in flight. It is the shared state between readers (views calling
//! [`QueryCache::fetch_query`]) and the mutation coordinator, which rewrites
//! entries optimistically and invalidates them at settlement.
//!
//! ## Cancellation
//!
//! Every fetch is wrapped in a [`futures::future::Abortable`] and stamped with a
//! generation number. [`QueryCache::cancel_queries`] aborts the matching fetches
//! and forgets their generations, so a response that arrives afterwards is
//! never written into the cache, even if the network call itself could not be
//! stopped.
//!
//! ## Staleness
//!
//! An entry is stale when it was explicitly invalidated or is older than the
//! configured stale time. [`QueryCache::fetch_query`] serves fresh entries from
//! memory and refetches stale or missing ones.
//!
//! The cache is single-threaded (`Rc<RefCell<_>>`); no borrow is held across an
//! `.await` or while listeners run.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{AbortHandle, Abortable};
use tracing::debug;

use crate::query::{QueryData, QueryKey};
use crate::subscription::{Listeners, Subscription};

/// Default freshness window for cached reads.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// A cached read result.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub data: QueryData,
    pub updated_at: DateTime<Utc>,
    /// Set by [`QueryCache::invalidate_queries`]; cleared by the next write.
    pub invalidated: bool,
}

struct InFlight {
    generation: u64,
    abort: AbortHandle,
}

#[derive(Default)]
struct CacheState {
    entries: BTreeMap<QueryKey, CacheEntry>,
    in_flight: HashMap<QueryKey, InFlight>,
    next_generation: u64,
}

/// Shared read cache. Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct QueryCache {
    state: Rc<RefCell<CacheState>>,
    listeners: Listeners<QueryKey>,
    stale_time: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_stale_time(DEFAULT_STALE_TIME)
    }

    pub fn with_stale_time(stale_time: Duration) -> Self {
        Self {
            state: Rc::new(RefCell::new(CacheState::default())),
            listeners: Listeners::new(),
            stale_time,
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.state.borrow().entries.get(key).cloned()
    }

    pub fn get_query_data(&self, key: &QueryKey) -> Option<QueryData> {
        self.state.borrow().entries.get(key).map(|e| e.data.clone())
    }

    /// Replace the entry for `key` with fresh data.
    pub fn set_query_data(&self, key: QueryKey, data: QueryData) {
        self.write_entry(key.clone(), data);
        self.listeners.notify(&key);
    }

    /// Compute the new value from the old one (or its absence) and store it.
    pub fn set_query_data_with(
        &self,
        key: QueryKey,
        update: impl FnOnce(Option<QueryData>) -> QueryData,
    ) {
        let previous = self.get_query_data(&key);
        self.set_query_data(key, update(previous));
    }

    /// Edit an existing entry in place. Returns `false`, leaving the cache
    /// untouched, when nothing is cached under `key`.
    pub fn update_query_data(&self, key: &QueryKey, update: impl FnOnce(&mut QueryData)) -> bool {
        let updated = {
            let mut state = self.state.borrow_mut();
            match state.entries.get_mut(key) {
                Some(entry) => {
                    update(&mut entry.data);
                    entry.updated_at = Utc::now();
                    entry.invalidated = false;
                    true
                }
                None => false,
            }
        };
        if updated {
            self.listeners.notify(key);
        }
        updated
    }

    pub fn remove_query(&self, key: &QueryKey) {
        let removed = self.state.borrow_mut().entries.remove(key).is_some();
        if removed {
            self.listeners.notify(key);
        }
    }

    /// Put back an entry captured earlier, removing the key if it was absent.
    pub(crate) fn restore_entry(&self, key: &QueryKey, entry: Option<CacheEntry>) {
        {
            let mut state = self.state.borrow_mut();
            match entry {
                Some(entry) => {
                    state.entries.insert(key.clone(), entry);
                }
                None => {
                    state.entries.remove(key);
                }
            }
        }
        self.listeners.notify(key);
    }

    /// Mark every entry under `key` stale so the next read refetches it.
    pub fn invalidate_queries(&self, key: &QueryKey) {
        let touched: Vec<QueryKey> = {
            let mut state = self.state.borrow_mut();
            state
                .entries
                .iter_mut()
                .filter(|(k, _)| key.matches(k))
                .map(|(k, entry)| {
                    entry.invalidated = true;
                    k.clone()
                })
                .collect()
        };
        debug!(%key, count = touched.len(), "invalidated queries");
        for k in &touched {
            self.listeners.notify(k);
        }
    }

    /// Abort in-flight fetches under `key`. Responses that still arrive for
    /// them are discarded.
    pub async fn cancel_queries(&self, key: &QueryKey) {
        let handles: Vec<AbortHandle> = {
            let mut state = self.state.borrow_mut();
            let keys: Vec<QueryKey> = state
                .in_flight
                .keys()
                .filter(|k| key.matches(k))
                .cloned()
                .collect();
            keys.iter()
                .filter_map(|k| state.in_flight.remove(k))
                .map(|f| f.abort)
                .collect()
        };
        if !handles.is_empty() {
            debug!(%key, count = handles.len(), "cancelled in-flight queries");
        }
        for handle in handles {
            handle.abort();
        }
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.state.borrow().in_flight.contains_key(key)
    }

    /// Missing entries count as stale.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        match self.state.borrow().entries.get(key) {
            Some(entry) => self.entry_is_stale(entry),
            None => true,
        }
    }

    fn entry_is_stale(&self, entry: &CacheEntry) -> bool {
        if entry.invalidated {
            return true;
        }
        (Utc::now() - entry.updated_at)
            .to_std()
            .map(|age| age > self.stale_time)
            .unwrap_or(false)
    }

    /// Serve `key` from memory when fresh, otherwise run `fetcher`.
    ///
    /// Returns `Ok(None)` only when the fetch was cancelled and nothing is
    /// cached for the key.
    pub async fn fetch_query<F, Fut, E>(&self, key: QueryKey, fetcher: F) -> Result<Option<QueryData>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryData, E>>,
    {
        let cached = {
            let state = self.state.borrow();
            state
                .entries
                .get(&key)
                .filter(|entry| !self.entry_is_stale(entry))
                .map(|entry| entry.data.clone())
        };
        if let Some(data) = cached {
            return Ok(Some(data));
        }
        self.refetch_query(key, fetcher).await
    }

    /// Always run `fetcher`, superseding any fetch already in flight for `key`.
    pub async fn refetch_query<F, Fut, E>(&self, key: QueryKey, fetcher: F) -> Result<Option<QueryData>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryData, E>>,
    {
        let (abort, registration) = AbortHandle::new_pair();
        let generation = {
            let mut state = self.state.borrow_mut();
            state.next_generation += 1;
            let generation = state.next_generation;
            if let Some(previous) = state
                .in_flight
                .insert(key.clone(), InFlight { generation, abort })
            {
                previous.abort.abort();
            }
            generation
        };

        debug!(%key, generation, "fetching query");
        let outcome = Abortable::new(fetcher(), registration).await;

        let current = {
            let mut state = self.state.borrow_mut();
            let current = state
                .in_flight
                .get(&key)
                .is_some_and(|f| f.generation == generation);
            if current {
                state.in_flight.remove(&key);
            }
            current
        };

        match outcome {
            Err(_aborted) => {
                debug!(%key, generation, "query fetch cancelled");
                Ok(self.get_query_data(&key))
            }
            Ok(Err(err)) => Err(err),
            Ok(Ok(data)) if current => {
                self.set_query_data(key, data.clone());
                Ok(Some(data))
            }
            Ok(Ok(_)) => {
                debug!(%key, generation, "discarding superseded query response");
                Ok(self.get_query_data(&key))
            }
        }
    }

    /// Register for change notifications. The listener receives the key that
    /// changed.
    pub fn subscribe(&self, listener: impl Fn(&QueryKey) + 'static) -> Subscription {
        self.listeners.add(listener)
    }

    fn write_entry(&self, key: QueryKey, data: QueryData) {
        self.state.borrow_mut().entries.insert(
            key,
            CacheEntry {
                data,
                updated_at: Utc::now(),
                invalidated: false,
            },
        );
    }
}
