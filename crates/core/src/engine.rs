//! The synchronization contract and the session-log engine behind it.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use sv_protocol::{Progress, Stats};
use tracing::{debug, warn};

use crate::discover::{SessionFile, SourceDir, discover};
use crate::error::Result;
use crate::store::{Fingerprint, SessionRecord, Store};

/// Sink for progress updates from a running sync.
pub type ProgressFn = Box<dyn FnMut(Progress) + Send + 'static>;

/// A blocking, full synchronization of external sources into the index.
///
/// Implementations do not need to be reentrant: the orchestrator never
/// calls `sync_all` twice at once.
pub trait SyncEngine: Send + Sync + 'static {
	fn sync_all(&self, progress: Option<&mut dyn FnMut(Progress)>) -> Result<Stats>;

	fn close(&self) -> Result<()> {
		Ok(())
	}
}

/// Indexes `*.jsonl` session logs from the configured source directories.
#[derive(Debug)]
pub struct SessionEngine {
	sources: Vec<SourceDir>,
	store: Arc<Store>,
}

impl SessionEngine {
	pub fn new(sources: Vec<SourceDir>, store: Arc<Store>) -> Self {
		Self { sources, store }
	}

	pub fn store(&self) -> &Arc<Store> {
		&self.store
	}

	pub fn sources(&self) -> &[SourceDir] {
		&self.sources
	}

	fn sync_one(&self, file: &SessionFile) -> Result<Option<usize>> {
		let fingerprint = fingerprint(&file.path)?;
		if self.store.fingerprint(&file.id)? == Some(fingerprint) {
			return Ok(None);
		}

		let message_count = count_messages(&file.path)?;
		self.store.upsert(&SessionRecord {
			id: file.id.clone(),
			source: file.source.clone(),
			project: file.project.clone(),
			path: file.path.clone(),
			fingerprint,
			message_count,
			synced_at: now_ms(),
		})?;
		Ok(Some(message_count))
	}
}

impl SyncEngine for SessionEngine {
	fn sync_all(&self, mut progress: Option<&mut dyn FnMut(Progress)>) -> Result<Stats> {
		// Fail fast instead of logging every file as failed.
		if self.store.is_closed() {
			return Err(crate::StoreError::Closed.into());
		}

		let files = discover(&self.sources);
		let total = files.len();
		let mut stats = Stats {
			total_sessions: total,
			..Stats::default()
		};

		for (i, file) in files.iter().enumerate() {
			match self.sync_one(file) {
				Ok(Some(messages)) => {
					stats.synced += 1;
					stats.messages += messages;
				}
				Ok(None) => stats.skipped += 1,
				Err(crate::Error::Io(err)) => {
					warn!(target = "sv.sync", session = %file.id, error = %err, "failed to read session");
					stats.failed += 1;
				}
				Err(err) => return Err(err),
			}

			if let Some(sink) = progress.as_deref_mut() {
				sink(Progress::new(i + 1, total, stats.messages));
			}
		}

		debug!(target = "sv.sync", %stats, "engine pass complete");
		Ok(stats)
	}

	fn close(&self) -> Result<()> {
		Ok(self.store.close()?)
	}
}

fn fingerprint(path: &Path) -> io::Result<Fingerprint> {
	let meta = fs::metadata(path)?;
	let modified_at = meta
		.modified()?
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or_default();
	Ok(Fingerprint {
		size: meta.len(),
		modified_at,
	})
}

/// Counts lines that hold a JSON object; blank or malformed lines are ignored.
fn count_messages(path: &Path) -> io::Result<usize> {
	let reader = BufReader::new(File::open(path)?);
	let mut count = 0;
	for line in reader.lines() {
		let line = line?;
		let trimmed = line.trim();
		if trimmed.starts_with('{') && serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(trimmed).is_ok() {
			count += 1;
		}
	}
	Ok(count)
}

pub(crate) fn now_ms() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or_default()
}
