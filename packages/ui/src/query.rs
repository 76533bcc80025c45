//! Query cache context and the `use_query` hook.
//!
//! [`QueryClientProvider`] puts one [`QueryCache`] and its
//! [`MutationCoordinator`] into context. [`use_query`] reads a key through the
//! cache: cached data is shown at once, stale or missing data is fetched, and
//! any later change to the key (optimistic write, rollback, invalidation)
//! re-renders the caller.

use std::rc::Rc;

use dioxus::prelude::*;
use store::{MutationCoordinator, QueryCache, QueryData, QueryKey};

use crate::auth::use_app_config;
use crate::backend::use_backend;

#[derive(Clone)]
pub struct QueryClient {
    pub cache: QueryCache,
    pub coordinator: MutationCoordinator,
}

pub fn use_query_client() -> QueryClient {
    use_context::<QueryClient>()
}

#[component]
pub fn QueryClientProvider(children: Element) -> Element {
    let config = use_app_config();
    use_context_provider(move || {
        let cache = QueryCache::with_stale_time(config.cache.stale_time());
        QueryClient {
            coordinator: MutationCoordinator::new(cache.clone()),
            cache,
        }
    });

    rsx! {
        {children}
    }
}

/// What a view sees of one query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    pub data: Option<QueryData>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Read `key` through the shared cache.
pub fn use_query(key: QueryKey) -> Signal<QueryResult> {
    let client = use_query_client();
    let backend = use_backend();

    // Track the key in a signal so the fetch re-runs on route param change
    let mut key_signal = use_signal(|| key.clone());
    if *key_signal.peek() != key {
        key_signal.set(key.clone());
    }

    let mut version = use_signal(|| 0u64);
    let mut result = use_signal(|| QueryResult {
        loading: true,
        ..QueryResult::default()
    });

    let cache = client.cache.clone();
    let _subscription = use_hook(move || {
        Rc::new(cache.subscribe(move |changed| {
            if *key_signal.peek() == *changed {
                let mut version = version;
                *version.write() += 1;
            }
        }))
    });

    let _loader = use_resource(move || {
        let key = key_signal();
        let _ = version();
        let cache = client.cache.clone();
        let backend = backend.clone();
        async move {
            let cached = cache.get_query_data(&key);
            result.set(QueryResult {
                loading: cached.is_none() || cache.is_stale(&key),
                data: cached,
                error: None,
            });

            let Some(backend) = backend else {
                result.write().loading = false;
                return;
            };
            let fetch_key = key.clone();
            let outcome = cache
                .fetch_query(key.clone(), move || async move { api::queries::fetch(&backend, &fetch_key).await })
                .await;
            match outcome {
                Ok(data) => result.set(QueryResult {
                    data: data.or_else(|| cache.get_query_data(&key)),
                    loading: false,
                    error: None,
                }),
                Err(err) => {
                    tracing::warn!(%key, "query failed: {err}");
                    result.set(QueryResult {
                        data: cache.get_query_data(&key),
                        loading: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
    });

    result
}
