//! # Remote relational store
//!
//! [`RemoteStore`] is the row-level interface to the hosted database:
//! select / insert / update / delete against a named [`Collection`], filtered
//! by equality predicates. Implementations only move JSON rows
//! ([`HttpBackend`](crate::HttpBackend) over REST, [`MemoryBackend`](crate::MemoryBackend)
//! in memory); the provided methods turn rows into typed records, so every row
//! is validated against its [`Table`] type as it crosses the boundary.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use store::{Collection, Table};

use crate::ApiError;

/// Column ordering for a select.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// Equality predicates plus optional ordering and limit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filter {
    pub eq: Vec<(String, String)>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Self::new().and_eq(column, value)
    }

    pub fn and_eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.eq.push((column.into(), value.to_string()));
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Row access to the hosted database.
pub trait RemoteStore {
    fn select_rows(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<Value>, ApiError>>;

    /// Insert one row and return it as stored (with server-assigned columns).
    fn insert_row(
        &self,
        collection: Collection,
        row: Value,
    ) -> impl Future<Output = Result<Value, ApiError>>;

    fn update_rows(
        &self,
        collection: Collection,
        patch: Value,
        filter: &Filter,
    ) -> impl Future<Output = Result<(), ApiError>>;

    fn delete_rows(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> impl Future<Output = Result<(), ApiError>>;

    /// Typed select.
    fn select<T: Table + DeserializeOwned>(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<T>, ApiError>> {
        async move {
            self.select_rows(T::COLLECTION, filter)
                .await?
                .into_iter()
                .map(decode::<T>)
                .collect()
        }
    }

    /// Zero or one row; `Ok(None)` when nothing matches.
    fn select_one<T: Table + DeserializeOwned>(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<Option<T>, ApiError>> {
        async move {
            let filter = filter.clone().limit(1);
            let row = self.select_rows(T::COLLECTION, &filter).await?.into_iter().next();
            row.map(decode::<T>).transpose()
        }
    }

    /// Insert `value` into `T`'s collection and decode the stored row.
    fn insert<T: Table + DeserializeOwned, V: Serialize>(
        &self,
        value: &V,
    ) -> impl Future<Output = Result<T, ApiError>> {
        async move {
            let row = serde_json::to_value(value).map_err(|source| ApiError::Decode {
                collection: T::COLLECTION.as_str(),
                source,
            })?;
            decode(self.insert_row(T::COLLECTION, row).await?)
        }
    }

    fn update<T: Table>(
        &self,
        patch: Value,
        filter: &Filter,
    ) -> impl Future<Output = Result<(), ApiError>> {
        self.update_rows(T::COLLECTION, patch, filter)
    }

    fn delete<T: Table>(&self, filter: &Filter) -> impl Future<Output = Result<(), ApiError>> {
        self.delete_rows(T::COLLECTION, filter)
    }
}

fn decode<T: Table + DeserializeOwned>(row: Value) -> Result<T, ApiError> {
    serde_json::from_value(row).map_err(|source| ApiError::Decode {
        collection: T::COLLECTION.as_str(),
        source,
    })
}

/// Outcome of [`check_connection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// The `members` collection answered.
    Connected,
    /// The backend reports the collection does not exist: wrong project.
    WrongProject,
    /// Some other failure; the project may still be right.
    Unreachable,
}

/// Probe the backend by selecting one member id.
pub async fn check_connection<R: RemoteStore>(remote: &R) -> ConnectionStatus {
    let probe = Filter::new().limit(1);
    match remote.select_rows(Collection::Members, &probe).await {
        Ok(_) => ConnectionStatus::Connected,
        Err(err) if err.is_missing_relation() => {
            tracing::error!("backend has no members collection: {err}");
            ConnectionStatus::WrongProject
        }
        Err(err) => {
            tracing::warn!("connection check failed: {err}");
            ConnectionStatus::Unreachable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_builder() {
        let filter = Filter::eq("member_id", 7)
            .and_eq("member_type", "main")
            .order_by("created_at", false)
            .limit(10);
        assert_eq!(
            filter.eq,
            vec![
                ("member_id".to_string(), "7".to_string()),
                ("member_type".to_string(), "main".to_string()),
            ]
        );
        assert_eq!(filter.order.as_ref().map(|o| o.ascending), Some(false));
        assert_eq!(filter.limit, Some(10));
    }
}
