//! `sessionview serve`: initial sync, then watch, tick and serve until a signal.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use sv::{Orchestrator, SessionEngine, SourceDir, SyncEngine};
use sv_protocol::{TriggerEvent, TriggerSource};
use sv_runtime::{ChangeCallback, Launcher, Scheduler, SystemOpener, Watcher, resolve_port};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::progress::console_sink;
use crate::server::{AppState, Server, router};

pub async fn execute(config: Config) -> Result<()> {
	let engine = super::open_engine(&config)?;
	let orchestrator = Orchestrator::new(Arc::clone(&engine));

	match orchestrator.sync_now(TriggerSource::Initial, Some(console_sink())).await {
		Ok(stats) => eprintln!("{} {stats}", "Indexed".green().bold()),
		Err(err) => warn!(target = "sv.sync", error = %err, "initial sync failed; continuing with the existing index"),
	}

	let watcher = start_watcher(engine.sources(), config.debounce, &orchestrator, Watcher::new);
	orchestrator.start();
	let scheduler = {
		let orchestrator = orchestrator.clone();
		Scheduler::start(config.sync_interval, move || orchestrator.trigger(TriggerEvent::periodic()))
	};
	match &scheduler {
		Some(scheduler) => info!(target = "sv.schedule", period_secs = scheduler.period().as_secs(), "periodic sync enabled"),
		None => info!(target = "sv.schedule", "periodic sync disabled"),
	}

	let choice = resolve_port(&config.host, config.port)?;
	if choice.changed() {
		eprintln!("{} port {} is in use, using {} instead", "note:".yellow().bold(), choice.requested, choice.port);
	}

	let state = AppState {
		store: Arc::clone(engine.store()),
		orchestrator: orchestrator.clone(),
	};
	let mut server = Server::bind(&config.host, choice.port, router(state)).await?;
	let url = format!("http://{}:{}", display_host(&config.host), server.addr().port());
	eprintln!("{} {}", "sessionview running at".bold(), url.as_str().cyan().underline());

	let launcher = config.open_browser.then(|| Launcher::new(url.clone(), SystemOpener).spawn());

	wait_for_shutdown().await?;
	eprintln!("{}", "Shutting down".dimmed());

	shutdown(watcher, scheduler, &orchestrator, launcher, &mut server, &engine).await
}

/// Builds the watcher through `make` and points it at every existing source.
/// Any failure leaves serve running without file watching.
fn start_watcher<M>(sources: &[SourceDir], debounce: Duration, orchestrator: &Orchestrator<SessionEngine>, make: M) -> Option<Watcher>
where
	M: FnOnce(Duration, ChangeCallback) -> sv_runtime::Result<Watcher>,
{
	let forward = orchestrator.clone();
	let on_change: ChangeCallback = Box::new(move |paths: BTreeSet<PathBuf>| forward.trigger(TriggerEvent::filesystem(paths)));
	let watcher = match make(debounce, on_change) {
		Ok(watcher) => watcher,
		Err(err) => {
			warn!(target = "sv.watch", error = %err, "file watching disabled");
			return None;
		}
	};

	for source in sources {
		if !source.root.is_dir() {
			info!(target = "sv.watch", root = %source.root.display(), "source directory missing; not watching");
			continue;
		}
		if let Err(err) = watcher.watch_recursive(&source.root) {
			warn!(target = "sv.watch", root = %source.root.display(), error = %err, "failed to watch source");
		}
	}

	if let Err(err) = watcher.start() {
		warn!(target = "sv.watch", error = %err, "file watching disabled");
		return None;
	}
	Some(watcher)
}

/// Stops producers before the consumer, and the consumer before the store.
async fn shutdown(
	watcher: Option<Watcher>,
	scheduler: Option<Scheduler>,
	orchestrator: &Orchestrator<SessionEngine>,
	launcher: Option<tokio::task::JoinHandle<bool>>,
	server: &mut Server,
	engine: &SessionEngine,
) -> Result<()> {
	if let Some(watcher) = watcher {
		// Joins the watcher thread.
		if let Err(err) = tokio::task::spawn_blocking(move || watcher.stop()).await {
			warn!(target = "sv.watch", error = %err, "watcher shutdown failed");
		}
	}
	if let Some(mut scheduler) = scheduler {
		scheduler.stop().await;
	}
	orchestrator.shutdown().await;
	if let Some(launcher) = launcher {
		launcher.abort();
	}
	server.shutdown().await?;
	engine.close()?;
	info!(target = "sv.serve", "shutdown complete");
	Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown() -> anyhow::Result<()> {
	use tokio::signal::unix::{SignalKind, signal};

	let mut term = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
	tokio::select! {
		res = tokio::signal::ctrl_c() => res.context("failed to listen for Ctrl-C")?,
		_ = term.recv() => {}
	}
	Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> anyhow::Result<()> {
	tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")
}

/// Wildcard listen addresses are not browsable; show loopback instead.
fn display_host(host: &str) -> &str {
	match host {
		"0.0.0.0" | "::" | "[::]" => "127.0.0.1",
		other => other,
	}
}
