pub mod publisher;
pub mod root_manager;

pub use publisher::{AllowlistContract, FilePublisher, MemoryPublisher, RootPublisher};
pub use root_manager::{RootManager, RootStatus, SyncError, SyncOutcome};
