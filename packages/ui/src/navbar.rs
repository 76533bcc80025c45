use dioxus::prelude::*;

use crate::auth::{use_auth, LogoutButton};

/// Top bar with the signed-in staff member and a sign-out button.
#[component]
pub fn Navbar(children: Element) -> Element {
    let auth = use_auth();
    let state = auth();
    let who = state
        .profile
        .as_ref()
        .map(|p| format!("{} ({:?})", p.display_name(), p.role))
        .or_else(|| state.identity.as_ref().and_then(|i| i.email.clone()))
        .unwrap_or_default();

    rsx! {
        div {
            class: "navbar",
            style: "display: flex; align-items: center; gap: 1rem; padding: 0.75rem 1.5rem; background: #065f46; color: #fff;",
            {children}
            span { style: "margin-left: auto; font-size: 0.875rem;", "{who}" }
            LogoutButton {
                class: "navbar-logout",
            }
        }
    }
}
