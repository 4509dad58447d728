pub mod mint;
pub mod operation_lock;
pub mod registry_service;
