//! Staff sign-in page.

use dioxus::prelude::*;
use ui::{use_auth, use_session};

use crate::Route;

/// Email and password sign-in. Signed-in users are sent to the member list.
#[component]
pub fn Login() -> Element {
    let auth = use_auth();
    let session = use_session();
    let nav = use_navigator();

    let mut email = use_signal(String::new);
    let mut password = use_signal(String::new);
    let mut error = use_signal(|| None::<String>);
    let mut busy = use_signal(|| false);

    // If already logged in, redirect to members
    use_effect(move || {
        let state = auth();
        if !state.loading && state.is_authenticated() {
            nav.replace(Route::Members {});
        }
    });

    let onsubmit = move |evt: FormEvent| {
        evt.prevent_default();
        let Some(manager) = session.clone() else {
            return;
        };
        let (address, secret) = (email(), password());
        if address.trim().is_empty() || secret.is_empty() {
            error.set(Some("Enter your email and password.".to_string()));
            return;
        }
        busy.set(true);
        error.set(None);
        spawn(async move {
            match manager.sign_in_with_password(address.trim(), &secret).await {
                Ok(()) => tracing::info!("signed in from login page"),
                Err(err) => {
                    tracing::warn!("sign-in failed: {err}");
                    error.set(Some(err.to_string()));
                }
            }
            // A successful sign-in may already have routed away.
            if let Ok(mut busy) = busy.try_write() {
                *busy = false;
            }
        });
    };

    rsx! {
        div {
            class: "login-container",
            style: "display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; padding: 2rem; background: #f9fafb;",

            h1 {
                style: "margin-bottom: 0.5rem; color: #065f46; font-weight: 700; font-size: 1.75rem;",
                "Membership"
            }

            p {
                style: "margin-bottom: 2rem; color: #6b7280; font-size: 0.9375rem;",
                "Sign in with your staff account"
            }

            form {
                class: "login-form",
                style: "display: flex; flex-direction: column; gap: 0.75rem; width: 100%; max-width: 320px;",
                onsubmit: onsubmit,

                input {
                    class: "login-input",
                    r#type: "email",
                    placeholder: "Email",
                    autocomplete: "username",
                    value: "{email}",
                    oninput: move |evt| email.set(evt.value()),
                }
                input {
                    class: "login-input",
                    r#type: "password",
                    placeholder: "Password",
                    autocomplete: "current-password",
                    value: "{password}",
                    oninput: move |evt| password.set(evt.value()),
                }
                button {
                    class: "login-btn",
                    r#type: "submit",
                    disabled: busy(),
                    if busy() { "Signing in..." } else { "Sign in" }
                }
                if let Some(message) = error() {
                    p { style: "color: #b91c1c; font-size: 0.875rem; margin: 0;", "{message}" }
                }
            }
        }

        style {
            r#"
            .login-input {{
                padding: 0.625rem 0.75rem;
                border: 1px solid #d1d5db;
                border-radius: 4px;
                font-size: 0.9375rem;
            }}

            .login-btn {{
                display: flex;
                align-items: center;
                justify-content: center;
                padding: 0.625rem 1.25rem;
                border: none;
                border-radius: 4px;
                font-size: 0.9375rem;
                font-weight: 500;
                cursor: pointer;
                background-color: #059669;
                color: white;
                transition: background-color 0.15s;
                font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
            }}

            .login-btn:hover:not(:disabled) {{
                background-color: #047857;
            }}

            .login-btn:disabled {{
                opacity: 0.5;
                cursor: not-allowed;
            }}
            "#
        }
    }
}
