//! # Browser storage — `localStorage` / `sessionStorage`
//!
//! [`BrowserStorage`] is the [`LocalStore`] used on the web platform. Reads and
//! writes go to `window.localStorage`; [`LocalStore::clear`] also empties
//! `sessionStorage`, so signing out leaves no per-tab auth state behind.
//!
//! Every call re-fetches the storage handle from `window`. A missing window or
//! a storage access error (private browsing, disabled storage) degrades to
//! "nothing stored".

use web_sys::Storage;

use crate::local::LocalStore;

/// `localStorage`-backed LocalStore for the web platform.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    pub fn new() -> Self {
        Self
    }

    fn local(&self) -> Option<Storage> {
        web_sys::window()?.local_storage().ok()?
    }

    fn session(&self) -> Option<Storage> {
        web_sys::window()?.session_storage().ok()?
    }
}

impl LocalStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.local()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = self.local() {
            if let Err(e) = storage.set_item(key, value) {
                tracing::warn!("localStorage write failed for {key}: {e:?}");
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = self.local() {
            let _ = storage.remove_item(key);
        }
    }

    fn clear(&self) {
        if let Some(storage) = self.local() {
            let _ = storage.clear();
        }
        if let Some(storage) = self.session() {
            let _ = storage.clear();
        }
    }
}
