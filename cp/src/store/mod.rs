//! Durable session persistence
//!
//! [`SnapshotStorage`] is a blob store with atomic whole-snapshot writes;
//! [`SessionStore`] layers JSON encoding and validation on top of it.

mod error;
mod session_store;
mod storage;

pub use error::StoreError;
pub use session_store::SessionStore;
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage};
