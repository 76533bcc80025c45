//! Authentication context and hooks for the UI.

use std::rc::Rc;

use api::AuthState;
use dioxus::prelude::*;
use store::AppConfig;

use crate::backend::{make_backend, make_local_store, AppSession, BackendHandle};
use crate::navigation::use_router_navigator;

/// Shared handle to the session manager. `None` when no backend is configured.
#[derive(Clone)]
pub struct SessionHandle(pub Option<AppSession>);

/// Get the current authentication state.
/// Returns a signal that updates when the user signs in or out.
pub fn use_auth() -> Signal<AuthState> {
    use_context::<Signal<AuthState>>()
}

pub fn use_session() -> Option<AppSession> {
    use_context::<SessionHandle>().0
}

pub fn use_app_config() -> AppConfig {
    use_context::<AppConfig>()
}

/// Provider component that owns the session manager.
///
/// Loads the configuration, builds the backend, bootstraps the stored session
/// and then follows provider events. The auth signal mirrors the manager's
/// state; everything below reads it through [`use_auth`].
#[component]
pub fn AuthProvider(children: Element) -> Element {
    let config = use_hook(api::config::load_config);

    let session = use_hook(|| {
        let local = make_local_store();
        match make_backend(&config.backend, local.clone()) {
            Ok(backend) => {
                let manager = AppSession::new(backend.clone(), backend.clone(), local, config.session.clone());
                Ok((backend, manager))
            }
            Err(err) => {
                tracing::error!("backend unavailable: {err}");
                Err(err.to_string())
            }
        }
    });

    // Without a backend there is nothing to wait for.
    let has_backend = session.is_ok();
    let auth_state = use_signal(move || AuthState {
        loading: has_backend,
        ..AuthState::default()
    });

    use_context_provider(|| auth_state);
    use_context_provider(|| config.clone());
    let handle = SessionHandle(session.as_ref().ok().map(|(_, m)| m.clone()));
    use_context_provider(|| handle);
    let backend = BackendHandle(session.as_ref().ok().map(|(b, _)| b.clone()));
    use_context_provider(|| backend);

    // Subscriptions live as long as the provider.
    let _subscriptions = use_hook(|| {
        let Ok((_, manager)) = &session else {
            return None;
        };
        let state_sub = manager.on_change(move |state| {
            let mut auth_state = auth_state;
            auth_state.set(state.clone());
        });
        let (events_sub, events) = manager.subscribe();
        let manager = manager.clone();
        spawn(async move {
            manager.bootstrap().await;
            manager.drive(events).await;
        });
        Some(Rc::new((state_sub, events_sub)))
    });

    let teardown = session.as_ref().ok().map(|(_, m)| m.clone());
    use_drop(move || {
        if let Some(manager) = &teardown {
            manager.teardown();
        }
    });

    match &session {
        Ok(_) => rsx! {
            {children}
        },
        Err(message) => rsx! {
            div {
                style: "display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; padding: 2rem;",
                h1 { style: "color: #b91c1c; font-size: 1.5rem; font-weight: 700;", "Backend not configured" }
                p { style: "color: #4b5563;", "{message}" }
                p {
                    style: "color: #6b7280; font-size: 0.875rem;",
                    "Set MEMBERSHIP_BACKEND_URL and MEMBERSHIP_ANON_KEY, or fill in membership.toml."
                }
            }
        },
    }
}

/// Button to sign out the current user.
#[component]
pub fn LogoutButton(
    #[props(default = "Sign out".to_string())] label: String,
    #[props(default = "".to_string())] class: String,
) -> Element {
    let session = use_session();
    let navigator = use_router_navigator();
    let mut busy = use_signal(|| false);

    let onclick = move |_| {
        let Some(manager) = session.clone() else {
            return;
        };
        busy.set(true);
        spawn(async move {
            manager.sign_out(&navigator).await;
        });
    };

    rsx! {
        button {
            class: "{class}",
            disabled: busy(),
            onclick: onclick,
            "{label}"
        }
    }
}
