use sv::{Orchestrator, SyncEngine};
use sv_protocol::TriggerSource;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::progress::console_sink;

pub async fn execute(config: Config) -> Result<()> {
	let engine = super::open_engine(&config)?;
	let orchestrator = Orchestrator::new(engine.clone());

	info!(target = "sv.sync", sources = engine.sources().len(), "one-shot sync");
	let result = orchestrator.sync_now(TriggerSource::Initial, Some(console_sink())).await;
	orchestrator.shutdown().await;
	engine.close()?;

	let stats = result?;
	println!("{stats}");
	Ok(())
}
