//! This crate contains all shared UI for the membership dashboard.

pub mod views;

mod backend;
pub use backend::{use_backend, AppSession, Backend, BackendHandle};

mod navigation;
pub use navigation::{use_router_navigator, RouterNavigator};

mod auth;
pub use auth::{use_app_config, use_auth, use_session, AuthProvider, LogoutButton, SessionHandle};
pub use api::AuthState;

mod query;
pub use query::{use_query, use_query_client, QueryClient, QueryClientProvider, QueryResult};

mod mutations;
pub use mutations::{use_add_payment, use_delete_member, use_member_status_update, use_toggle_favorite, Mutation};

mod navbar;
pub use navbar::Navbar;

mod loading;
pub use loading::{LoadingPage, LoadingSpinner, SpinnerSize};

mod protected_route;
pub use protected_route::ProtectedRoute;

mod connection_check;
pub use connection_check::ConnectionCheck;

pub mod activity_log;
pub use activity_log::{log_activity, use_activity_log, use_activity_log_provider, ActivityLog, LogLevel};

mod activity_log_panel;
pub use activity_log_panel::{ActivityLogPanel, ActivityLogToggle};
