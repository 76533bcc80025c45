pub mod cache;
pub mod config;
pub mod local;
pub mod models;
pub mod mutation;
pub mod query;
pub mod subscription;

mod memory;
pub use memory::MemoryStore;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod web_storage;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use web_storage::BrowserStorage;

pub use cache::{CacheEntry, QueryCache};
pub use config::AppConfig;
pub use local::LocalStore;
pub use models::{Collection, Member, MemberDetail, MemberStatus, NewPayment, Payment, PaymentStatus, RecordId, Table};
pub use mutation::{MutationContext, MutationCoordinator, MutationState, MutationStatus, OptimisticMutation};
pub use query::{QueryData, QueryKey};
pub use subscription::{Listeners, Subscription};
