//! Orchestrator status as exposed by `GET /api/v1/sync/status`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Stats, TriggerSource};

/// Result of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SyncOutcome {
	Ok { stats: Stats },
	Failed { error: String },
}

/// One finished sync, with the triggers that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
	pub sources: BTreeSet<TriggerSource>,
	/// Unix epoch milliseconds.
	pub started_at: u64,
	pub finished_at: u64,
	#[serde(flatten)]
	pub outcome: SyncOutcome,
}

impl SyncReport {
	pub fn is_ok(&self) -> bool {
		matches!(self.outcome, SyncOutcome::Ok { .. })
	}

	pub fn duration_ms(&self) -> u64 {
		self.finished_at.saturating_sub(self.started_at)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
	/// Whether a sync currently holds the engine.
	pub running: bool,
	/// Completed runs since startup, failed ones included.
	pub runs: u64,
	pub failures: u64,
	#[serde(default)]
	pub last: Option<SyncReport>,
}
