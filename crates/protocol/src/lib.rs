//! Wire types for sessionview.
//!
//! This crate contains the serde-serializable types passed between the sync
//! core, the HTTP API and the console. They represent the "protocol layer":
//! the shapes of data as they appear on the wire or in a progress callback.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization and small derived values
//! * Shared: The same `Progress` drives the console bar and the API
//! * Stable: Changes only when the HTTP payloads change
//!
//! The orchestration that produces these values lives in `sessionview`.

pub mod api;
pub mod progress;
pub mod status;
pub mod trigger;

pub use api::*;
pub use progress::*;
pub use status::*;
pub use trigger::*;
