use dioxus::prelude::*;
use ui::views::MemberDetailView;
use ui::{Navbar, ProtectedRoute};

use crate::Route;

#[component]
pub fn MemberDetail(id: String) -> Element {
    let nav = use_navigator();

    rsx! {
        ProtectedRoute {
            Navbar {
                Link { to: Route::Members {}, class: "navbar-brand", "Membership" }
            }
            MemberDetailView {
                key: "{id}",
                member_id: id.clone(),
                on_back: move |_| {
                    nav.push(Route::Members {});
                },
            }
        }
    }
}
