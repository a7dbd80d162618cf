//! Domain types for planning sessions
//!
//! A [`Session`] is the durable, resumable unit of work for one subject. It
//! accumulates answered questions ([`QaEntry`]) and accepted content ideas
//! ([`Idea`]) round by round.

mod error;
mod session;

pub use error::ValidationError;
pub use session::{Idea, QaEntry, Session, SessionSummary};
