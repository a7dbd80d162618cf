//! Content Planner - iterative Q&A sessions that produce content ideas
//!
//! A session asks rounds of customer-style questions about a subject, collects
//! answers (from the user or an LLM salesperson), and turns the accumulated
//! answers into content ideas. Ideas are filtered against everything already
//! accepted with approximate title matching. The session is kept on disk and
//! can be resumed.
//!
//! # Modules
//!
//! - [`domain`] - Session, Q&A entries and ideas
//! - [`similarity`] - Approximate title matching
//! - [`curator`] - Idea validation and de-duplication
//! - [`store`] - Durable snapshot storage
//! - [`state`] - Shared session handle and the single writer
//! - [`autosave`] - Periodic background saves
//! - [`llm`] - LLM client trait and providers
//! - [`prompts`] - Prompt templates
//! - [`generate`] - Question and idea generation
//! - [`strategy`] - Which questions to ask next
//! - [`collect`] - Answer collection
//! - [`context`] - Context file reader
//! - [`orchestrator`] - Resume-or-create and the round loop
//! - [`console`] - Terminal front end
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod autosave;
pub mod cli;
pub mod collect;
pub mod config;
pub mod console;
pub mod context;
pub mod curator;
pub mod domain;
pub mod generate;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod similarity;
pub mod state;
pub mod store;
pub mod strategy;

pub use config::Config;
pub use domain::{Idea, QaEntry, Session, SessionSummary, ValidationError};
pub use orchestrator::{Orchestrator, OrchestratorConfig, resume_or_create};
