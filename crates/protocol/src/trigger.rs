//! Trigger events feeding the sync orchestrator.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What asked for a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
	/// The one-time sync run before the server starts.
	Initial,
	/// A tick of the periodic scheduler.
	Periodic,
	/// A debounced batch of filesystem changes.
	Filesystem,
	/// An explicit request through the HTTP API.
	Manual,
}

impl TriggerSource {
	pub fn as_str(&self) -> &'static str {
		match self {
			TriggerSource::Initial => "initial",
			TriggerSource::Periodic => "periodic",
			TriggerSource::Filesystem => "filesystem",
			TriggerSource::Manual => "manual",
		}
	}
}

impl fmt::Display for TriggerSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A sync request. Consumed immediately by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
	pub source: TriggerSource,
	#[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
	pub paths: BTreeSet<PathBuf>,
}

impl TriggerEvent {
	pub fn new(source: TriggerSource) -> Self {
		Self {
			source,
			paths: BTreeSet::new(),
		}
	}

	pub fn periodic() -> Self {
		Self::new(TriggerSource::Periodic)
	}

	pub fn manual() -> Self {
		Self::new(TriggerSource::Manual)
	}

	pub fn filesystem(paths: impl IntoIterator<Item = PathBuf>) -> Self {
		Self {
			source: TriggerSource::Filesystem,
			paths: paths.into_iter().collect(),
		}
	}
}

/// Pending work accumulated while a sync is running.
///
/// Any number of triggers merge into one request: sources are kept as a set
/// and changed paths are unioned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSync {
	pub sources: BTreeSet<TriggerSource>,
	pub paths: BTreeSet<PathBuf>,
	/// Number of triggers folded into this request.
	pub triggers: usize,
}

impl PendingSync {
	pub fn merge(&mut self, event: TriggerEvent) {
		self.sources.insert(event.source);
		self.paths.extend(event.paths);
		self.triggers += 1;
	}

	pub fn is_empty(&self) -> bool {
		self.triggers == 0
	}

	/// Comma-separated source names, for log lines.
	pub fn source_label(&self) -> String {
		self.sources.iter().map(TriggerSource::as_str).collect::<Vec<_>>().join(",")
	}
}
