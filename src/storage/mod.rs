pub mod kv;

pub use kv::{JsonFileStore, KeyValueStore, MemoryStore, PostgresStore};
