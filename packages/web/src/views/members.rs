use dioxus::prelude::*;
use ui::views::MembersView;
use ui::{Navbar, ProtectedRoute};

use crate::Route;

#[component]
pub fn Members() -> Element {
    let nav = use_navigator();

    rsx! {
        ProtectedRoute {
            Navbar {
                span { style: "font-weight: 700;", "Membership" }
            }
            MembersView {
                on_open: move |id: store::RecordId| {
                    nav.push(Route::MemberDetail { id: id.to_string() });
                },
            }
        }
    }
}
