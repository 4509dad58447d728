//! Key/value persistence behind the allowlist registry.
//!
//! The registry only needs string keys mapped to serialized JSON strings, the
//! same shape browser `localStorage` offers. Implementations must persist a
//! `set`/`delete` before returning so the caller sees its own writes.

pub mod file;
pub mod memory;
pub mod postgres;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()>;

    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// All keys currently present. Used to discover backup entries.
    async fn keys(&self) -> anyhow::Result<Vec<String>>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> anyhow::Result<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        (**self).delete(key).await
    }

    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        (**self).keys().await
    }
}
