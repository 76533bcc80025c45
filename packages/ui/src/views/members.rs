use dioxus::prelude::*;
use store::{Member, MemberStatus, QueryKey, RecordId};

use crate::loading::LoadingSpinner;
use crate::mutations::{use_member_status_update, use_toggle_favorite};
use crate::query::use_query;
use api::{FavoriteToggle, StatusChange};

pub(crate) fn status_colors(status: &MemberStatus) -> (&'static str, &'static str) {
    match status {
        MemberStatus::Active => ("#d1fae5", "#065f46"),
        MemberStatus::Pending => ("#fef3c7", "#92400e"),
        MemberStatus::Paused => ("#e0e7ff", "#3730a3"),
        MemberStatus::Inactive | MemberStatus::Unknown => ("#f3f4f6", "#374151"),
        MemberStatus::Deceased => ("#fee2e2", "#991b1b"),
    }
}

#[component]
pub fn StatusBadge(status: MemberStatus) -> Element {
    let (bg, fg) = status_colors(&status);
    rsx! {
        span {
            style: "display: inline-block; padding: 0.125rem 0.5rem; border-radius: 9999px; font-size: 0.75rem; font-weight: 600; background: {bg}; color: {fg};",
            "{status}"
        }
    }
}

/// Member list with favorites and quick pause / activate.
#[component]
pub fn MembersView(on_open: EventHandler<RecordId>) -> Element {
    let query = use_query(QueryKey::members());
    let mut filter = use_signal(String::new);
    let mut favorites_only = use_signal(|| false);

    let result = query();
    let needle = filter().to_lowercase();
    let members: Vec<Member> = result
        .data
        .as_ref()
        .and_then(|d| d.as_members())
        .unwrap_or_default()
        .iter()
        .filter(|m| !favorites_only() || m.is_favorite)
        .filter(|m| {
            needle.is_empty()
                || m.full_name().to_lowercase().contains(&needle)
                || m.email.as_deref().is_some_and(|e| e.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();

    rsx! {
        div {
            style: "padding: 1.5rem; max-width: 64rem; margin: 0 auto;",
            div {
                style: "display: flex; align-items: center; gap: 1rem; margin-bottom: 1rem;",
                h1 { style: "font-size: 1.5rem; font-weight: 700; margin: 0;", "Members" }
                if result.loading {
                    LoadingSpinner { size: crate::loading::SpinnerSize::Small }
                }
                input {
                    style: "margin-left: auto; padding: 0.375rem 0.75rem; border: 1px solid #d1d5db; border-radius: 4px;",
                    placeholder: "Search by name or email",
                    value: "{filter}",
                    oninput: move |evt| filter.set(evt.value()),
                }
                label {
                    style: "display: flex; align-items: center; gap: 0.25rem; font-size: 0.875rem;",
                    input {
                        r#type: "checkbox",
                        checked: favorites_only(),
                        onchange: move |evt| favorites_only.set(evt.checked()),
                    }
                    "Favorites"
                }
            }

            if let Some(error) = &result.error {
                div {
                    style: "padding: 0.75rem; margin-bottom: 1rem; background: #fee2e2; color: #991b1b; border-radius: 4px;",
                    "Could not load members: {error}"
                }
            }

            if members.is_empty() && !result.loading {
                p { style: "color: #6b7280;", "No members found." }
            }

            table {
                style: "width: 100%; border-collapse: collapse;",
                tbody {
                    for member in members {
                        MemberRow {
                            key: "{member.id}",
                            member: member.clone(),
                            on_open: on_open,
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn MemberRow(member: Member, on_open: EventHandler<RecordId>) -> Element {
    let status_update = use_member_status_update();
    let favorite = use_toggle_favorite();

    let id = member.id.clone();
    let name = member.full_name();
    let email = member.email.clone().unwrap_or_default();
    let star = if member.is_favorite { "★" } else { "☆" };
    // Placeholders have no server row to act on yet.
    let settled = !member.id.is_placeholder();

    let next_status = match member.status {
        MemberStatus::Active => Some((MemberStatus::Paused, "Pause")),
        MemberStatus::Paused | MemberStatus::Pending => Some((MemberStatus::Active, "Activate")),
        _ => None,
    };

    let open_id = id.clone();
    let favorite_id = id.clone();
    let is_favorite = member.is_favorite;

    rsx! {
        tr {
            style: "border-bottom: 1px solid #e5e7eb;",
            td {
                style: "padding: 0.5rem; width: 2rem;",
                button {
                    style: "background: none; border: none; cursor: pointer; font-size: 1.125rem; color: #d97706;",
                    disabled: !settled || favorite.is_pending(),
                    onclick: move |_| favorite.mutate(FavoriteToggle {
                        member_id: favorite_id.clone(),
                        is_favorite,
                    }),
                    "{star}"
                }
            }
            td {
                style: "padding: 0.5rem; cursor: pointer;",
                onclick: move |_| on_open.call(open_id.clone()),
                div { style: "font-weight: 600;", "{name}" }
                div { style: "font-size: 0.75rem; color: #6b7280;", "{email}" }
            }
            td {
                style: "padding: 0.5rem;",
                StatusBadge { status: member.status.clone() }
            }
            td {
                style: "padding: 0.5rem; text-align: right;",
                if let Some((target, label)) = next_status {
                    button {
                        style: "padding: 0.25rem 0.75rem; border: 1px solid #d1d5db; border-radius: 4px; background: #fff; cursor: pointer;",
                        disabled: !settled || status_update.is_pending(),
                        onclick: move |_| status_update.mutate(StatusChange {
                            member_id: id.clone(),
                            new_status: target.clone(),
                        }),
                        "{label}"
                    }
                }
            }
        }
    }
}
