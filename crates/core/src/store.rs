//! SQLite-backed session index.
//!
//! The store keeps one row per session file: where it lives, the fingerprint
//! used to skip unchanged files, and how many messages it holds. The
//! connection sits behind a mutex and is taken out on [`Store::close`]; any
//! call after that fails with [`StoreError::Closed`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use sv_protocol::{SessionSummary, Totals};
use tracing::debug;

use crate::error::StoreError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
	id            TEXT PRIMARY KEY,
	source        TEXT NOT NULL,
	project       TEXT NOT NULL,
	path          TEXT NOT NULL,
	size          INTEGER NOT NULL,
	modified_at   INTEGER NOT NULL,
	message_count INTEGER NOT NULL,
	synced_at     INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS sessions_modified_at ON sessions (modified_at DESC);
";

type Result<T> = std::result::Result<T, StoreError>;

/// Cheap change detector for a session file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
	pub size: u64,
	/// Unix epoch milliseconds.
	pub modified_at: u64,
}

/// One session row as written by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
	pub id: String,
	pub source: String,
	pub project: String,
	pub path: PathBuf,
	pub fingerprint: Fingerprint,
	pub message_count: usize,
	pub synced_at: u64,
}

#[derive(Debug)]
pub struct Store {
	path: PathBuf,
	conn: Mutex<Option<Connection>>,
}

impl Store {
	/// Opens (creating if needed) the database at `path`.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref().to_path_buf();
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		let conn = Connection::open(&path)?;
		conn.busy_timeout(BUSY_TIMEOUT)?;
		conn.execute_batch(SCHEMA)?;
		debug!(target = "sv.store", path = %path.display(), "store opened");
		Ok(Self {
			path,
			conn: Mutex::new(Some(conn)),
		})
	}

	/// In-memory store for tests and dry runs.
	pub fn open_in_memory() -> Result<Self> {
		let conn = Connection::open_in_memory()?;
		conn.execute_batch(SCHEMA)?;
		Ok(Self {
			path: PathBuf::from(":memory:"),
			conn: Mutex::new(Some(conn)),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn is_closed(&self) -> bool {
		self.conn.lock().is_none()
	}

	fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
		let guard = self.conn.lock();
		let conn = guard.as_ref().ok_or(StoreError::Closed)?;
		Ok(f(conn)?)
	}

	pub fn fingerprint(&self, id: &str) -> Result<Option<Fingerprint>> {
		self.with_conn(|conn| {
			conn.query_row("SELECT size, modified_at FROM sessions WHERE id = ?1", params![id], |row| {
				Ok(Fingerprint {
					size: row.get::<_, i64>(0)? as u64,
					modified_at: row.get::<_, i64>(1)? as u64,
				})
			})
			.optional()
		})
	}

	pub fn upsert(&self, record: &SessionRecord) -> Result<()> {
		self.with_conn(|conn| {
			conn.execute(
				"INSERT INTO sessions (id, source, project, path, size, modified_at, message_count, synced_at)
				 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
				 ON CONFLICT(id) DO UPDATE SET
					source = excluded.source,
					project = excluded.project,
					path = excluded.path,
					size = excluded.size,
					modified_at = excluded.modified_at,
					message_count = excluded.message_count,
					synced_at = excluded.synced_at",
				params![
					record.id,
					record.source,
					record.project,
					record.path.to_string_lossy(),
					record.fingerprint.size as i64,
					record.fingerprint.modified_at as i64,
					record.message_count as i64,
					record.synced_at as i64,
				],
			)
			.map(|_| ())
		})
	}

	/// Most recently modified sessions first.
	pub fn sessions(&self, limit: usize) -> Result<Vec<SessionSummary>> {
		self.with_conn(|conn| {
			let mut stmt = conn.prepare(
				"SELECT id, source, project, path, message_count, modified_at
				 FROM sessions ORDER BY modified_at DESC, id LIMIT ?1",
			)?;
			let rows = stmt.query_map(params![limit as i64], |row| {
				Ok(SessionSummary {
					id: row.get(0)?,
					source: row.get(1)?,
					project: row.get(2)?,
					path: row.get(3)?,
					message_count: row.get::<_, i64>(4)? as usize,
					modified_at: row.get::<_, i64>(5)? as u64,
				})
			})?;
			rows.collect()
		})
	}

	pub fn totals(&self) -> Result<Totals> {
		self.with_conn(|conn| {
			conn.query_row("SELECT COUNT(*), COALESCE(SUM(message_count), 0) FROM sessions", [], |row| {
				Ok(Totals {
					sessions: row.get::<_, i64>(0)? as usize,
					messages: row.get::<_, i64>(1)? as usize,
				})
			})
		})
	}

	/// Closes the connection. Later calls fail with [`StoreError::Closed`];
	/// closing twice is a no-op.
	pub fn close(&self) -> Result<()> {
		let Some(conn) = self.conn.lock().take() else {
			return Ok(());
		};
		conn.close().map_err(|(_, err)| StoreError::Sqlite(err))?;
		debug!(target = "sv.store", path = %self.path.display(), "store closed");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	fn record(id: &str, modified_at: u64, messages: usize) -> SessionRecord {
		SessionRecord {
			id: id.to_string(),
			source: "claude".to_string(),
			project: "demo".to_string(),
			path: PathBuf::from(format!("/logs/{id}.jsonl")),
			fingerprint: Fingerprint { size: 10, modified_at },
			message_count: messages,
			synced_at: 1,
		}
	}

	#[test]
	fn upsert_replaces_existing_row() {
		let store = Store::open_in_memory().unwrap();
		store.upsert(&record("a", 100, 2)).unwrap();
		store.upsert(&record("a", 200, 5)).unwrap();

		assert_eq!(store.fingerprint("a").unwrap(), Some(Fingerprint { size: 10, modified_at: 200 }));
		assert_eq!(store.totals().unwrap(), Totals { sessions: 1, messages: 5 });
		assert_eq!(store.fingerprint("missing").unwrap(), None);
	}

	#[test]
	fn sessions_are_listed_newest_first() {
		let store = Store::open_in_memory().unwrap();
		store.upsert(&record("old", 100, 1)).unwrap();
		store.upsert(&record("new", 300, 1)).unwrap();
		store.upsert(&record("mid", 200, 1)).unwrap();

		let ids: Vec<_> = store.sessions(2).unwrap().into_iter().map(|s| s.id).collect();
		assert_eq!(ids, vec!["new", "mid"]);
	}

	#[test]
	fn closed_store_rejects_calls() {
		let store = Store::open_in_memory().unwrap();
		store.close().unwrap();
		store.close().unwrap();
		assert!(store.is_closed());
		assert!(matches!(store.totals(), Err(StoreError::Closed)));
		assert!(matches!(store.upsert(&record("a", 1, 1)), Err(StoreError::Closed)));
	}

	#[test]
	fn reopening_keeps_rows() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("nested").join("sessions.db");

		let store = Store::open(&path).unwrap();
		store.upsert(&record("a", 1, 3)).unwrap();
		store.close().unwrap();

		let store = Store::open(&path).unwrap();
		assert_eq!(store.totals().unwrap().messages, 3);
	}
}
