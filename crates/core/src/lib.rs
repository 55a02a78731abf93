//! Session-log indexing and sync orchestration for sessionview.
//!
//! [`SessionEngine`] walks the configured source directories and records each
//! `*.jsonl` session in the [`Store`]. [`Orchestrator`] owns the engine and
//! makes sure startup, periodic, filesystem and manual triggers never run it
//! concurrently.

pub mod discover;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod store;

pub use discover::{SessionFile, SourceDir, discover};
pub use engine::{ProgressFn, SessionEngine, SyncEngine};
pub use error::{Error, Result, StoreError};
pub use orchestrator::Orchestrator;
pub use store::{Fingerprint, SessionRecord, Store};
