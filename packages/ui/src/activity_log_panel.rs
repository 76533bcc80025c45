use dioxus::prelude::*;

use crate::activity_log::{use_activity_log, LogLevel};

fn entry_color(level: &LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "#b91c1c",
        LogLevel::Warning => "#b45309",
        LogLevel::Success => "#047857",
        LogLevel::Info => "#374151",
    }
}

#[component]
pub fn ActivityLogPanel() -> Element {
    let mut log = use_activity_log();

    if !log().visible {
        return rsx! {};
    }

    let entries: Vec<_> = log()
        .entries
        .iter()
        .rev()
        .map(|entry| (entry_color(&entry.level), entry.clone()))
        .collect();

    rsx! {
        div {
            class: "activity-log-panel",
            style: "position: fixed; right: 1rem; bottom: 3.5rem; width: 360px; max-height: 320px; overflow-y: auto; background: #fff; border: 1px solid #e5e7eb; border-radius: 8px; box-shadow: 0 8px 24px rgba(0,0,0,0.12); font-size: 0.8125rem; z-index: 1000;",
            div {
                class: "activity-log-header",
                style: "display: flex; justify-content: space-between; padding: 0.5rem 0.75rem; border-bottom: 1px solid #e5e7eb; font-weight: 600;",
                span { "Activity Log" }
                div {
                    style: "display: flex; gap: 0.5rem;",
                    button {
                        onclick: move |_| log.write().entries.clear(),
                        "Clear"
                    }
                    button {
                        onclick: move |_| log.write().visible = false,
                        "Close"
                    }
                }
            }
            div {
                class: "activity-log-entries",
                for (color, entry) in entries {
                    div {
                        style: "padding: 0.25rem 0.75rem; color: {color};",
                        span { style: "color: #9ca3af;", "{entry.timestamp}" }
                        span { " {entry.message}" }
                    }
                }
            }
        }
    }
}

#[component]
pub fn ActivityLogToggle() -> Element {
    let mut log = use_activity_log();
    let count = log().entries.len();
    let has_errors = log().has_errors();
    let border = if has_errors { "#b91c1c" } else { "#d1d5db" };

    rsx! {
        button {
            class: "activity-log-toggle",
            style: "position: fixed; right: 1rem; bottom: 1rem; padding: 0.375rem 0.75rem; border-radius: 999px; background: #fff; border: 1px solid {border}; z-index: 1000;",
            onclick: move |_| {
                let visible = log().visible;
                log.write().visible = !visible;
            },
            title: "Activity log",
            if count > 0 {
                "{count}"
            } else {
                "Log"
            }
        }
    }
}
