use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::local::LocalStore;

/// In-memory LocalStore for testing and native builds.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.borrow_mut().remove(key);
    }

    fn clear(&self) {
        self.values.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("auth_force_reset").is_none());

        store.set("auth_force_reset", "true");
        assert_eq!(store.get("auth_force_reset").as_deref(), Some("true"));

        store.remove("auth_force_reset");
        assert!(store.get("auth_force_reset").is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("a", "1");
        store.set("b", "2");
        assert_eq!(other.len(), 2);

        other.clear();
        assert!(store.is_empty());
    }
}
