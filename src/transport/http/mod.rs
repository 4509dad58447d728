pub mod router;
pub mod types;
pub mod handlers {
    pub mod allowlist;
    pub mod commitment;
    pub mod common;
    pub mod contract;
    pub mod health;
    pub mod mint;
    pub mod requests;
    pub mod snapshot;
    pub mod sync;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;
