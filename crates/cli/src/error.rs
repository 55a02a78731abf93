use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SvError {
	#[error("invalid config {}: {message}", path.display())]
	Config { path: PathBuf, message: String },

	#[error("data directory unavailable: {0}")]
	DataDir(String),

	#[error("store error: {0}")]
	Store(#[from] sv::StoreError),

	#[error("failed to bind {addr}: {source}")]
	Bind { addr: String, source: io::Error },

	#[error("IO error: {0}")]
	Io(#[from] io::Error),

	#[error(transparent)]
	Sync(#[from] sv::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SvError>;
