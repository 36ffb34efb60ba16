#![forbid(unsafe_code)]

pub mod sqlite;
pub mod store;

pub use sqlite::{SqliteInitError, SqliteSnapshotStore};
pub use store::{InMemorySnapshotStore, SnapshotRepository, SnapshotStore, StorageError};
