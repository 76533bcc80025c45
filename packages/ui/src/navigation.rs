//! Router-backed [`api::Navigator`].

use dioxus::prelude::*;
use dioxus::router::Navigator;

/// Drives the app router from non-UI code (session manager, mutations).
#[derive(Clone, Copy)]
pub struct RouterNavigator(Navigator);

impl RouterNavigator {
    pub fn new(navigator: Navigator) -> Self {
        Self(navigator)
    }
}

pub fn use_router_navigator() -> RouterNavigator {
    RouterNavigator(use_navigator())
}

impl api::Navigator for RouterNavigator {
    fn push(&self, route: &str) {
        let _ = self.0.push(route.to_string());
    }

    fn replace(&self, route: &str) {
        let _ = self.0.replace(route.to_string());
    }
}
