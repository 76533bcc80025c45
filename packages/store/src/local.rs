//! # Local persisted state
//!
//! A small string key-value interface over whatever survives a page reload on
//! the current platform. The session layer keeps the serialized backend
//! session and the recovery flag here.
//!
//! Implementations live in sibling modules: [`crate::MemoryStore`] for tests
//! and native builds, and `BrowserStorage` (web only) over `localStorage`.
//!
//! Failures are swallowed: unavailable storage reads as empty and writes are
//! dropped. Nothing stored here is authoritative.

/// Key-value storage that outlives the current view.
pub trait LocalStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
    /// Drop everything, including any per-tab state.
    fn clear(&self);
}

impl<S: LocalStore + ?Sized> LocalStore for std::rc::Rc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }

    fn clear(&self) {
        (**self).clear()
    }
}
