//! Route navigation seam.
//!
//! Sign-out and optimistic delete move the user between routes. They do it
//! through [`Navigator`], which the UI implements on top of its router and
//! tests implement with [`History`].

use std::cell::RefCell;
use std::rc::Rc;

/// Unauthenticated entry point.
pub const LOGIN_ROUTE: &str = "/login";
/// Member list.
pub const MEMBERS_ROUTE: &str = "/members";

/// Detail route for one member.
pub fn member_route(id: impl std::fmt::Display) -> String {
    format!("{MEMBERS_ROUTE}/{id}")
}

pub trait Navigator {
    /// Push a new history entry.
    fn push(&self, route: &str);
    /// Replace the current history entry.
    fn replace(&self, route: &str);
}

impl<N: Navigator + ?Sized> Navigator for Rc<N> {
    fn push(&self, route: &str) {
        (**self).push(route)
    }

    fn replace(&self, route: &str) {
        (**self).replace(route)
    }
}

/// In-memory navigation history.
#[derive(Clone, Debug, Default)]
pub struct History {
    entries: Rc<RefCell<Vec<String>>>,
}

impl History {
    pub fn new(start: &str) -> Self {
        Self {
            entries: Rc::new(RefCell::new(vec![start.to_string()])),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.entries.borrow().last().cloned()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }
}

impl Navigator for History {
    fn push(&self, route: &str) {
        self.entries.borrow_mut().push(route.to_string());
    }

    fn replace(&self, route: &str) {
        let mut entries = self.entries.borrow_mut();
        entries.pop();
        entries.push(route.to_string());
    }
}
