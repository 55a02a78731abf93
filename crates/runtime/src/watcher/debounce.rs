//! Quiet-period accumulator behind the watcher.

use std::collections::BTreeSet;
use std::mem;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Collapses a burst of change notifications into one batch.
///
/// There is a single deadline: every [`record`](Self::record) pushes it to
/// `now + window`, and [`poll`](Self::poll) only yields once that deadline
/// has passed, so nothing is released while events keep arriving.
#[derive(Debug)]
pub struct Debounce {
	window: Duration,
	pending: BTreeSet<PathBuf>,
	deadline: Option<Instant>,
}

impl Debounce {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			pending: BTreeSet::new(),
			deadline: None,
		}
	}

	pub fn is_pending(&self) -> bool {
		self.deadline.is_some()
	}

	pub fn record<I>(&mut self, paths: I, now: Instant)
	where
		I: IntoIterator<Item = PathBuf>,
	{
		self.pending.extend(paths);
		self.deadline = Some(now + self.window);
	}

	/// Takes the accumulated batch if the quiet period is over.
	pub fn poll(&mut self, now: Instant) -> Option<BTreeSet<PathBuf>> {
		match self.deadline {
			Some(deadline) if now >= deadline => {
				self.deadline = None;
				let batch = mem::take(&mut self.pending);
				(!batch.is_empty()).then_some(batch)
			}
			_ => None,
		}
	}

	/// How long the caller may block before the next [`poll`](Self::poll)
	/// could yield, capped at `max`.
	pub fn wait_hint(&self, now: Instant, max: Duration) -> Duration {
		self.deadline.map_or(max, |deadline| deadline.saturating_duration_since(now).min(max))
	}
}
