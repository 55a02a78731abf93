mod serve;
mod sync;

use std::fs;
use std::sync::Arc;

use sv::{SessionEngine, Store};
use tracing::debug;

use crate::cli::Commands;
use crate::config::Config;
use crate::error::Result;

pub async fn dispatch(command: Option<Commands>, config: Config) -> Result<()> {
	match command.unwrap_or(Commands::Serve) {
		Commands::Serve => serve::execute(config).await,
		Commands::Sync => sync::execute(config).await,
	}
}

/// Creates the data directory, opens the index and builds the engine over it.
pub(crate) fn open_engine(config: &Config) -> Result<Arc<SessionEngine>> {
	fs::create_dir_all(&config.data_dir)?;
	let store = Arc::new(Store::open(config.store_path())?);
	debug!(
		target = "sv.serve",
		store = %store.path().display(),
		sources = config.sources.len(),
		"engine ready"
	);
	Ok(Arc::new(SessionEngine::new(config.sources.clone(), store)))
}
