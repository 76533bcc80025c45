//! # API crate: backend access for the membership dashboard
//!
//! Everything between the UI and the hosted backend lives here: the identity
//! provider and remote store seams, their HTTP and in-memory implementations,
//! the session manager, and the read and write operations the views use.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Session types, the [`IdentityProvider`] seam and the [`SessionManager`] |
//! | [`remote`] | The [`RemoteStore`] row interface, typed selects and the connection check |
//! | [`http`] | [`HttpBackend`]: both seams over REST with `reqwest` |
//! | [`memory`] | [`MemoryBackend`]: both seams in memory, with failure injection |
//! | [`queries`] | Fetchers for the member list, member detail and payments |
//! | [`mutations`] | The optimistic member and payment writes |
//! | [`navigation`] | Route constants and the [`Navigator`] seam |
//! | [`models`] | Staff profile records |
//! | [`config`] | Loading `membership.toml` plus environment overrides |
//!
//! Everything is single-threaded: futures are `!Send` and shared state sits
//! behind `Rc`.

pub mod auth;
pub mod config;
mod error;
pub mod http;
pub mod memory;
pub mod models;
pub mod mutations;
pub mod navigation;
pub mod queries;
pub mod remote;
pub mod time;

pub use auth::{AuthEvent, AuthEventKind, AuthState, Identity, IdentityProvider, Session, SessionManager};
pub use error::ApiError;
pub use http::HttpBackend;
pub use memory::MemoryBackend;
pub use models::{Role, UserProfile, UserStatus};
pub use mutations::{AddPayment, DeleteMember, FavoriteToggle, MemberStatusUpdate, StatusChange, ToggleFavorite};
pub use navigation::{member_route, Navigator, LOGIN_ROUTE, MEMBERS_ROUTE};
pub use remote::{check_connection, ConnectionStatus, Filter, RemoteStore};
