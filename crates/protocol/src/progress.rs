//! Incremental progress and final statistics of one sync run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Snapshot of an in-flight sync.
///
/// Within one run `sessions_done` and `messages_indexed` never decrease, and
/// the last snapshot delivered has `sessions_done == sessions_total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
	pub sessions_done: usize,
	pub sessions_total: usize,
	pub messages_indexed: usize,
}

impl Progress {
	pub fn new(sessions_done: usize, sessions_total: usize, messages_indexed: usize) -> Self {
		Self {
			sessions_done,
			sessions_total,
			messages_indexed,
		}
	}

	/// Completion in `[0, 100]`; zero when there is nothing to sync.
	pub fn percent(&self) -> f64 {
		if self.sessions_total == 0 {
			return 0.0;
		}
		let pct = 100.0 * self.sessions_done as f64 / self.sessions_total as f64;
		pct.clamp(0.0, 100.0)
	}

	pub fn is_complete(&self) -> bool {
		self.sessions_done >= self.sessions_total
	}
}

/// Summary of one completed sync. Returned to the caller, never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
	pub total_sessions: usize,
	pub synced: usize,
	pub skipped: usize,
	#[serde(default)]
	pub failed: usize,
	#[serde(default)]
	pub messages: usize,
}

impl fmt::Display for Stats {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} sessions ({} synced, {} unchanged, {} failed), {} messages indexed",
			self.total_sessions, self.synced, self.skipped, self.failed, self.messages
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn percent_is_zero_without_sessions() {
		assert_eq!(Progress::new(0, 0, 0).percent(), 0.0);
		assert_eq!(Progress::new(3, 0, 12).percent(), 0.0);
	}

	#[test]
	fn percent_reaches_hundred_when_done() {
		assert_eq!(Progress::new(7, 7, 40).percent(), 100.0);
		assert!(Progress::new(7, 7, 40).is_complete());
	}

	#[test]
	fn percent_is_proportional_and_clamped() {
		assert_eq!(Progress::new(1, 4, 0).percent(), 25.0);
		assert_eq!(Progress::new(9, 4, 0).percent(), 100.0);
	}

	#[test]
	fn percent_is_monotonic_along_a_run() {
		let total = 13;
		let mut previous = 0.0;
		for done in 0..=total {
			let pct = Progress::new(done, total, done * 3).percent();
			assert!(pct >= previous, "{pct} < {previous} at {done}");
			previous = pct;
		}
		assert_eq!(previous, 100.0);
	}

	#[test]
	fn stats_deserialize_without_optional_counters() {
		let stats: Stats = serde_json::from_str(r#"{"total_sessions":3,"synced":1,"skipped":2}"#).unwrap();
		assert_eq!(stats.failed, 0);
		assert_eq!(stats.messages, 0);
		assert_eq!(stats.to_string(), "3 sessions (1 synced, 2 unchanged, 0 failed), 0 messages indexed");
	}
}
