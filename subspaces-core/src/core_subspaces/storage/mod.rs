//! Storage layer for subspaces
//!
//! The state machine only needs a byte-keyed ordered key-value store. The host
//! provides one through [`KvStore`]; [`MemoryStore`] and [`SqliteStore`] are
//! the bundled implementations.

pub mod codec;
pub mod keys;
pub mod kv;
pub mod migrations;
pub mod sql_store;

pub use kv::{KvStore, MemoryStore};
pub use migrations::{migrate, CURRENT_KV_SCHEMA_VERSION};
pub use sql_store::SqliteStore;
