//! In-memory session state and the single persistence path
//!
//! [`SharedSession`] is the foreground's session handle: mutations take the
//! write lock for a whole round commit, snapshots clone under the read lock.
//! [`SessionWriter`] is an actor that owns the [`SessionStore`](crate::store::SessionStore)
//! and serializes every save, explicit or automatic, through one channel.

mod messages;
mod shared;
mod writer;

pub use messages::{SaveOutcome, WriterCommand};
pub use shared::{SharedSession, Snapshot};
pub use writer::SessionWriter;
