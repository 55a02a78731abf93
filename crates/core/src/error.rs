use thiserror::Error;

/// Storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("SQLite error: {0}")]
	Sqlite(#[from] rusqlite::Error),

	#[error("store is closed")]
	Closed,

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("sync task failed: {0}")]
	Join(String),

	#[error("orchestrator is shut down")]
	ShutDown,

	#[error("sync failed: {0}")]
	Sync(String),
}

pub type Result<T> = std::result::Result<T, Error>;
