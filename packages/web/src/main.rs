use dioxus::prelude::*;

use ui::{ActivityLogPanel, ActivityLogToggle, AuthProvider, ConnectionCheck, QueryClientProvider};
use views::{Login, MemberDetail, Members};

mod views;

#[derive(Debug, Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum Route {
    #[route("/")]
    Root {},
    #[route("/login")]
    Login {},
    #[route("/members")]
    Members {},
    #[route("/members/:id")]
    MemberDetail { id: String },
}

fn main() {
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    ui::use_activity_log_provider();

    rsx! {
        AuthProvider {
            QueryClientProvider {
                ConnectionCheck {}
                Router::<Route> {}
            }
        }
        ActivityLogToggle {}
        ActivityLogPanel {}
    }
}

/// Redirect `/` to `/members`
#[component]
fn Root() -> Element {
    let nav = use_navigator();
    nav.replace(Route::Members {});
    rsx! {}
}
