//! # Listener registration with explicit disposal
//!
//! Anything in the workspace that pushes change notifications (the query cache,
//! the session manager, the identity providers) keeps its observers in a
//! [`Listeners`] registry. Registering returns a [`Subscription`]: dropping it,
//! or calling [`Subscription::unsubscribe`], removes the listener. The teardown
//! closure runs at most once.
//!
//! Everything here is single-threaded (`Rc`), matching the UI event loop the
//! listeners run on.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handle returned by a listener registration.
#[must_use = "dropping a Subscription immediately unregisters the listener"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a teardown closure.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn noop() -> Self {
        Self { teardown: None }
    }

    /// Unregister now.
    pub fn unsubscribe(mut self) {
        self.dispose();
    }

    /// Whether the teardown has already run.
    pub fn is_disposed(&self) -> bool {
        self.teardown.is_none()
    }

    fn dispose(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

type Listener<T> = Rc<dyn Fn(&T)>;

/// Registry of listeners for values of type `T`.
pub struct Listeners<T: 'static> {
    inner: Rc<RefCell<Vec<(u64, Listener<T>)>>>,
    next_id: Rc<Cell<u64>>,
}

impl<T: 'static> Clone for Listeners<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Vec::new())),
            next_id: Rc::new(Cell::new(0)),
        }
    }
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is disposed.
    pub fn add(&self, listener: impl Fn(&T) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.inner.borrow_mut().push((id, Rc::new(listener)));

        let registry = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().retain(|(entry, _)| *entry != id);
            }
        })
    }

    /// Call every registered listener with `value`.
    ///
    /// The registry is not borrowed while listeners run, so a listener may
    /// register or dispose subscriptions.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Listener<T>> = self
            .inner
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(value);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispose_runs_once() {
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let subscription = Subscription::new(move || counter.set(counter.get() + 1));
        assert!(!subscription.is_disposed());
        subscription.unsubscribe();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_drop_unregisters_listener() {
        let listeners = Listeners::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        let subscription = listeners.add(move |v| sink.borrow_mut().push(*v));
        listeners.notify(&1);
        assert_eq!(listeners.len(), 1);

        drop(subscription);
        listeners.notify(&2);
        assert!(listeners.is_empty());
        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_listener_may_register_during_notify() {
        let listeners = Listeners::<u32>::new();
        let nested = Rc::new(RefCell::new(Vec::new()));

        let registry = listeners.clone();
        let holder = nested.clone();
        let _outer = listeners.add(move |_| {
            holder.borrow_mut().push(registry.add(|_| {}));
        });

        listeners.notify(&7);
        assert_eq!(listeners.len(), 2);
    }
}
