//! HTTP API payloads.

use serde::{Deserialize, Serialize};

/// One indexed session as listed by `GET /api/v1/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
	pub id: String,
	/// Label of the source directory the session was found under.
	pub source: String,
	pub project: String,
	pub path: String,
	pub message_count: usize,
	/// File modification time, Unix epoch milliseconds.
	pub modified_at: u64,
}

/// Store-wide totals for `GET /api/v1/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
	pub sessions: usize,
	pub messages: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueued {
	pub queued: bool,
}
