//! Warns when the app points at a backend without the membership schema.

use api::ConnectionStatus;
use dioxus::prelude::*;

use crate::activity_log::{log_activity, use_activity_log, LogLevel};
use crate::backend::use_backend;

/// Full-screen warning when the `members` collection does not exist on the
/// configured backend. Renders nothing otherwise.
#[component]
pub fn ConnectionCheck() -> Element {
    let backend = use_backend();
    let mut activity_log = use_activity_log();

    let status = use_resource(move || {
        let backend = backend.clone();
        async move {
            let backend = backend?;
            let status = api::check_connection(&backend).await;
            if status == ConnectionStatus::Unreachable {
                log_activity(&mut activity_log, LogLevel::Warning, "Backend unreachable");
            }
            Some(status)
        }
    });

    let wrong_project = matches!(*status.read(), Some(Some(ConnectionStatus::WrongProject)));
    if !wrong_project {
        return rsx! {};
    }

    rsx! {
        div {
            style: "position: fixed; inset: 0; background: #dc2626; z-index: 9999; display: flex; align-items: center; justify-content: center; padding: 1rem;",
            div {
                style: "background: #fff; border-radius: 12px; padding: 2rem; max-width: 28rem; text-align: center;",
                h1 { style: "color: #dc2626; font-size: 1.5rem; font-weight: 700; margin-bottom: 1rem;", "Wrong database" }
                p { "The app is connected to a backend project without the membership tables." }
                p { style: "color: #6b7280; font-size: 0.875rem; margin-top: 1rem;", "Check MEMBERSHIP_BACKEND_URL." }
            }
        }
    }
}
