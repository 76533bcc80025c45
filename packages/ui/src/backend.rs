//! Platform backend constructors.
//!
//! The hosted backend is the same everywhere; only the [`store::LocalStore`]
//! that persists the session differs:
//! - **Web** (WASM + `web` feature): `localStorage` via [`store::BrowserStorage`]
//! - **Native**: process memory via [`store::MemoryStore`]

use api::{ApiError, HttpBackend, SessionManager};
use dioxus::prelude::*;
use store::config::BackendConfig;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub type Local = store::BrowserStorage;
#[cfg(not(all(target_arch = "wasm32", feature = "web")))]
pub type Local = store::MemoryStore;

/// The backend every view talks to.
pub type Backend = HttpBackend<Local>;

/// Session manager over [`Backend`].
pub type AppSession = SessionManager<Backend, Backend, Local>;

pub fn make_local_store() -> Local {
    Local::new()
}

/// Build the backend, or [`ApiError::NotConfigured`] without a URL and key.
pub fn make_backend(config: &BackendConfig, local: Local) -> Result<Backend, ApiError> {
    HttpBackend::new(config, local)
}

/// Context wrapper; `None` when the app has no backend configured.
#[derive(Clone)]
pub struct BackendHandle(pub Option<Backend>);

pub fn use_backend() -> Option<Backend> {
    use_context::<BackendHandle>().0
}
