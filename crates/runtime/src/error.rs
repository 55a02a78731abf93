use std::path::PathBuf;

use thiserror::Error;

/// Errors from the debounced watcher.
#[derive(Debug, Error)]
pub enum WatchError {
	#[error("filesystem watch backend failed: {0}")]
	Backend(#[from] notify::Error),

	#[error("watch root not found: {}", .0.display())]
	NotFound(PathBuf),

	#[error("watch root is not a directory: {}", .0.display())]
	NotADirectory(PathBuf),

	#[error("failed to walk watch root: {0}")]
	Walk(#[from] walkdir::Error),

	#[error("watcher has been stopped")]
	Stopped,

	#[error("failed to spawn watcher thread: {0}")]
	Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WatchError>;
