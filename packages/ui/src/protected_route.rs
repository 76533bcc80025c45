use dioxus::prelude::*;

use crate::auth::use_auth;
use crate::loading::LoadingPage;
use crate::navigation::use_router_navigator;

/// Renders `children` only for a signed-in user.
///
/// While the session is still resolving a spinner is shown; without an
/// identity the route is replaced by the login page.
#[component]
pub fn ProtectedRoute(children: Element) -> Element {
    let auth = use_auth();
    let navigator = use_router_navigator();
    let state = auth();

    let signed_out = !state.loading && state.identity.is_none();
    use_effect(move || {
        let state = auth();
        if !state.loading && state.identity.is_none() {
            api::Navigator::replace(&navigator, api::LOGIN_ROUTE);
        }
    });

    if state.loading {
        return rsx! {
            LoadingPage {}
        };
    }
    if signed_out {
        return rsx! {};
    }

    rsx! {
        {children}
    }
}
