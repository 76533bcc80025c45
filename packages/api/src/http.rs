//! # Hosted backend over HTTP
//!
//! [`HttpBackend`] talks to a hosted Postgres-as-a-service project:
//!
//! - **Auth** under `<url>/auth/v1`: `token?grant_type=password`,
//!   `token?grant_type=refresh_token`, `logout`.
//! - **Rows** under `<url>/rest/v1/<collection>`, with equality filters as
//!   `column=eq.value`, ordering as `order=column.asc|desc` and `limit=n`.
//!
//! Every request carries the project's anon key in `apikey` and a bearer
//! token: the signed-in user's access token when there is one, the anon key
//! otherwise.
//!
//! The session is persisted as JSON in the [`LocalStore`] under
//! [`SESSION_STORAGE_KEY`], so a reload finds it again. An expired session is
//! refreshed on lookup when a refresh token is available.

use std::rc::Rc;

use chrono::{DateTime, Duration, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use store::config::BackendConfig;
use store::{Collection, Listeners, LocalStore, Subscription};
use tracing::{debug, info, warn};

use crate::auth::{AuthEvent, AuthEventKind, Identity, IdentityProvider, Session, SESSION_STORAGE_KEY};
use crate::remote::{Filter, RemoteStore};
use crate::ApiError;

/// Token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: Identity,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Error bodies come in a few shapes depending on the service.
#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

fn filter_params(filter: &Filter) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = filter
        .eq
        .iter()
        .map(|(column, value)| (column.clone(), format!("eq.{value}")))
        .collect();
    if let Some(order) = &filter.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".into(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = filter.limit {
        params.push(("limit".into(), limit.to_string()));
    }
    params
}

struct HttpInner<L> {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    local: L,
    listeners: Listeners<AuthEvent>,
}

pub struct HttpBackend<L> {
    inner: Rc<HttpInner<L>>,
}

impl<L> Clone for HttpBackend<L> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<L: LocalStore> HttpBackend<L> {
    pub fn new(config: &BackendConfig, local: L) -> Result<Self, ApiError> {
        if !config.is_configured() {
            return Err(ApiError::NotConfigured);
        }
        Ok(Self {
            inner: Rc::new(HttpInner {
                client: reqwest::Client::new(),
                base_url: config.url.trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                local,
                listeners: Listeners::new(),
            }),
        })
    }

    fn rest_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.inner.base_url, collection.as_str())
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.inner.base_url)
    }

    fn stored_session(&self) -> Option<Session> {
        let raw = self.inner.local.get(SESSION_STORAGE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(err) => {
                warn!("discarding unreadable stored session: {err}");
                self.inner.local.remove(SESSION_STORAGE_KEY);
                None
            }
        }
    }

    fn store_session(&self, session: Option<&Session>) {
        match session.map(serde_json::to_string) {
            Some(Ok(raw)) => self.inner.local.set(SESSION_STORAGE_KEY, &raw),
            Some(Err(err)) => warn!("failed to serialize session: {err}"),
            None => self.inner.local.remove(SESSION_STORAGE_KEY),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let token = self
            .stored_session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.inner.anon_key.clone());
        self.inner
            .client
            .request(method, url)
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(token)
    }

    /// Turn non-success responses into [`ApiError`]s.
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = body
            .message
            .or(body.msg)
            .or(body.error_description)
            .unwrap_or(text);
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized(message));
        }
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
        })
    }

    async fn token(&self, grant_type: &str, body: Value) -> Result<Session, ApiError> {
        let url = self.auth_url("token");
        let response = self
            .inner
            .client
            .post(url)
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.inner.anon_key)
            .json(&body)
            .send()
            .await?;
        let token: TokenResponse = Self::check(response).await?.json().await?;
        Ok(token.into_session())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ApiError> {
        debug!("refreshing access token");
        let session = self
            .token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        self.store_session(Some(&session));
        self.inner
            .listeners
            .notify(&AuthEvent::new(AuthEventKind::TokenRefreshed, Some(session.clone())));
        Ok(session)
    }
}

impl<L: LocalStore> IdentityProvider for HttpBackend<L> {
    async fn get_session(&self) -> Result<Option<Session>, ApiError> {
        let Some(session) = self.stored_session() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }
        let Some(refresh_token) = session.refresh_token.as_deref() else {
            self.store_session(None);
            return Err(ApiError::Unauthorized("session expired".into()));
        };
        match self.refresh(refresh_token).await {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                if err.is_unauthorized() {
                    self.store_session(None);
                }
                Err(err)
            }
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let session = self
            .token("password", json!({ "email": email, "password": password }))
            .await?;
        info!(user = %session.user.id, "password sign-in succeeded");
        self.store_session(Some(&session));
        self.inner
            .listeners
            .notify(&AuthEvent::new(AuthEventKind::SignedIn, Some(session.clone())));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        let result = match self.stored_session() {
            Some(_) => {
                let url = self.auth_url("logout");
                match self.request(Method::POST, &url).send().await {
                    Ok(response) => Self::check(response).await.map(drop),
                    Err(err) => Err(err.into()),
                }
            }
            None => Ok(()),
        };
        self.store_session(None);
        self.inner
            .listeners
            .notify(&AuthEvent::new(AuthEventKind::SignedOut, None));
        result
    }

    fn subscribe(&self, listener: Box<dyn Fn(&AuthEvent)>) -> Subscription {
        self.inner.listeners.add(listener)
    }
}

impl<L: LocalStore> RemoteStore for HttpBackend<L> {
    async fn select_rows(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, ApiError> {
        let url = self.rest_url(collection);
        let response = self
            .request(Method::GET, &url)
            .query(&filter_params(filter))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn insert_row(&self, collection: Collection, row: Value) -> Result<Value, ApiError> {
        let url = self.rest_url(collection);
        let response = self
            .request(Method::POST, &url)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let rows: Vec<Value> = Self::check(response).await?.json().await?;
        rows.into_iter().next().ok_or_else(|| ApiError::Http {
            status: StatusCode::OK.as_u16(),
            message: format!("insert into {collection:?} returned no row"),
        })
    }

    async fn update_rows(&self, collection: Collection, patch: Value, filter: &Filter) -> Result<(), ApiError> {
        let url = self.rest_url(collection);
        let response = self
            .request(Method::PATCH, &url)
            .header("Prefer", "return=minimal")
            .query(&filter_params(filter))
            .json(&patch)
            .send()
            .await?;
        Self::check(response).await.map(drop)
    }

    async fn delete_rows(&self, collection: Collection, filter: &Filter) -> Result<(), ApiError> {
        let url = self.rest_url(collection);
        let response = self
            .request(Method::DELETE, &url)
            .query(&filter_params(filter))
            .send()
            .await?;
        Self::check(response).await.map(drop)
    }
}

#[cfg(test)]
mod tests {
    use store::MemoryStore;

    use super::*;

    fn backend(local: MemoryStore) -> HttpBackend<MemoryStore> {
        let config = BackendConfig {
            url: "https://project.example.co/".into(),
            anon_key: "anon".into(),
        };
        HttpBackend::new(&config, local).unwrap()
    }

    #[test]
    fn test_requires_configuration() {
        let result = HttpBackend::new(&BackendConfig::default(), MemoryStore::new());
        assert!(matches!(result, Err(ApiError::NotConfigured)));
    }

    #[test]
    fn test_urls() {
        let http = backend(MemoryStore::new());
        assert_eq!(http.rest_url(Collection::Members), "https://project.example.co/rest/v1/members");
        assert_eq!(http.auth_url("logout"), "https://project.example.co/auth/v1/logout");
    }

    #[test]
    fn test_filter_params() {
        let filter = Filter::eq("member_id", "7").order_by("created_at", false).limit(1);
        assert_eq!(
            filter_params(&filter),
            vec![
                ("member_id".to_string(), "eq.7".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_token_response_expiry() {
        let token: TokenResponse = serde_json::from_value(json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_at": 1_700_000_000,
            "user": { "id": "u-1", "email": "chair@example.org" },
        }))
        .unwrap();
        let session = token.into_session();
        assert_eq!(session.expires_at.map(|t| t.timestamp()), Some(1_700_000_000));
        assert_eq!(session.user.id, "u-1");
    }

    #[tokio::test]
    async fn test_stored_session_round_trip() {
        let local = MemoryStore::new();
        let http = backend(local.clone());
        assert_eq!(http.get_session().await.unwrap(), None);

        let session = Session {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: None,
            user: Identity {
                id: "u-1".into(),
                email: None,
            },
        };
        http.store_session(Some(&session));
        assert_eq!(http.get_session().await.unwrap(), Some(session));

        local.set(SESSION_STORAGE_KEY, "not json");
        assert_eq!(http.get_session().await.unwrap(), None);
        assert_eq!(local.get(SESSION_STORAGE_KEY), None);
    }

    #[tokio::test]
    async fn test_expired_session_without_refresh_token_is_unauthorized() {
        let local = MemoryStore::new();
        let http = backend(local.clone());
        let session = Session {
            access_token: "a".into(),
            refresh_token: None,
            expires_at: Some(Utc::now() - Duration::minutes(1)),
            user: Identity {
                id: "u-1".into(),
                email: None,
            },
        };
        http.store_session(Some(&session));

        let err = http.get_session().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(local.get(SESSION_STORAGE_KEY), None);
    }
}
