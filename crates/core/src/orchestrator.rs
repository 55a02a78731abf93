//! Serializes sync requests from every trigger source into one engine.
//!
//! There are two ways in: [`Orchestrator::sync_now`] runs a sync and waits for
//! it, [`Orchestrator::trigger`] queues one and returns immediately. Both pass
//! through the same gate, so the engine never sees two calls at once.
//!
//! Queued triggers are folded into a single [`PendingSync`]. The worker only
//! takes that request after it holds the gate, so any number of triggers
//! arriving during a running sync turn into exactly one follow-up run.
//!
//! The gated section of a `sync_now` call runs on its own task, so dropping
//! the caller's future does not release the gate while the engine is busy.
//! Shutdown waits for the sync in flight and discards any queued request
//! that has not started.

use std::collections::BTreeSet;
use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use sv_protocol::{PendingSync, Stats, SyncOutcome, SyncReport, SyncStatus, TriggerEvent, TriggerSource};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::{ProgressFn, SyncEngine, now_ms};
use crate::error::{Error, Result};

pub struct Orchestrator<E: SyncEngine> {
	inner: Arc<Inner<E>>,
}

struct Inner<E: SyncEngine> {
	engine: Arc<E>,
	gate: tokio::sync::Mutex<()>,
	pending: Mutex<PendingSync>,
	wake: Notify,
	status: Mutex<SyncStatus>,
	cancel: CancellationToken,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl<E: SyncEngine> Clone for Orchestrator<E> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<E: SyncEngine> Orchestrator<E> {
	pub fn new(engine: Arc<E>) -> Self {
		Self {
			inner: Arc::new(Inner {
				engine,
				gate: tokio::sync::Mutex::new(()),
				pending: Mutex::new(PendingSync::default()),
				wake: Notify::new(),
				status: Mutex::new(SyncStatus::default()),
				cancel: CancellationToken::new(),
				worker: Mutex::new(None),
			}),
		}
	}

	pub fn engine(&self) -> &Arc<E> {
		&self.inner.engine
	}

	pub fn status(&self) -> SyncStatus {
		self.inner.status.lock().clone()
	}

	pub fn is_shut_down(&self) -> bool {
		self.inner.cancel.is_cancelled()
	}

	/// Spawns the worker that drains queued triggers. Must be called from
	/// within a tokio runtime; a second call, or a call after shutdown, does
	/// nothing.
	pub fn start(&self) {
		if self.is_shut_down() {
			return;
		}
		let mut worker = self.inner.worker.lock();
		if worker.is_some() {
			return;
		}
		*worker = Some(tokio::spawn(Arc::clone(&self.inner).run_worker()));
		debug!(target = "sv.sync", "orchestrator worker started");
	}

	/// Queues a sync. Never blocks; callable from any thread.
	pub fn trigger(&self, event: TriggerEvent) {
		if self.is_shut_down() {
			debug!(target = "sv.sync", source = %event.source, "ignoring trigger after shutdown");
			return;
		}
		let triggers = {
			let mut pending = self.inner.pending.lock();
			pending.merge(event);
			pending.triggers
		};
		debug!(target = "sv.sync", triggers, "sync queued");
		self.inner.wake.notify_one();
	}

	/// Runs a sync and waits for it, queuing behind any sync in flight.
	///
	/// Cancelling the returned future detaches from the sync but does not
	/// stop it; the gate stays held and status is recorded when it ends.
	pub async fn sync_now(&self, source: TriggerSource, progress: Option<ProgressFn>) -> Result<Stats> {
		if self.is_shut_down() {
			return Err(Error::ShutDown);
		}
		let inner = Arc::clone(&self.inner);
		let locked = tokio::spawn(async move {
			let _gate = inner.gate.lock().await;
			if inner.cancel.is_cancelled() {
				return Err(Error::ShutDown);
			}
			inner.run_locked(BTreeSet::from([source]), progress).await
		});
		locked.await.map_err(|err| Error::Join(err.to_string()))?
	}

	/// Stops the worker and waits for any sync in flight. Queued triggers
	/// that have not started are dropped. The engine is not called again
	/// through this orchestrator once this returns.
	pub async fn shutdown(&self) {
		self.inner.cancel.cancel();
		let worker = self.inner.worker.lock().take();
		if let Some(worker) = worker {
			if let Err(err) = worker.await {
				warn!(target = "sv.sync", error = %err, "orchestrator worker ended abnormally");
			}
		}
		// Waits out a sync_now task that holds the gate, even a detached one.
		drop(self.inner.gate.lock().await);
		debug!(target = "sv.sync", "orchestrator shut down");
	}
}

impl<E: SyncEngine> Inner<E> {
	async fn run_worker(self: Arc<Self>) {
		loop {
			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => break,
				_ = self.wake.notified() => {}
			}

			let _gate = tokio::select! {
				biased;
				_ = self.cancel.cancelled() => break,
				gate = self.gate.lock() => gate,
			};

			let pending = mem::take(&mut *self.pending.lock());
			if pending.is_empty() {
				continue;
			}
			debug!(
				target = "sv.sync",
				sources = %pending.source_label(),
				triggers = pending.triggers,
				paths = pending.paths.len(),
				"running queued sync"
			);
			// Failures are recorded in the status; the worker keeps going.
			let _ = self.run_locked(pending.sources, None).await;
		}
		debug!(target = "sv.sync", "orchestrator worker stopped");
	}

	/// Caller must hold the gate.
	async fn run_locked(&self, sources: BTreeSet<TriggerSource>, progress: Option<ProgressFn>) -> Result<Stats> {
		self.status.lock().running = true;
		let started_at = now_ms();

		let engine = Arc::clone(&self.engine);
		let result = tokio::task::spawn_blocking(move || {
			let mut sink = progress;
			match sink.as_mut() {
				Some(f) => engine.sync_all(Some(f.as_mut())),
				None => engine.sync_all(None),
			}
		})
		.await
		.map_err(|err| Error::Join(err.to_string()))
		.and_then(|result| result);

		let finished_at = now_ms();
		let outcome = match &result {
			Ok(stats) => SyncOutcome::Ok { stats: *stats },
			Err(err) => SyncOutcome::Failed { error: err.to_string() },
		};
		let label = sources.iter().map(TriggerSource::as_str).collect::<Vec<_>>().join(",");
		{
			let mut status = self.status.lock();
			status.running = false;
			status.runs += 1;
			if result.is_err() {
				status.failures += 1;
			}
			status.last = Some(SyncReport {
				sources,
				started_at,
				finished_at,
				outcome,
			});
		}

		match &result {
			Ok(stats) => info!(target = "sv.sync", sources = %label, elapsed_ms = finished_at.saturating_sub(started_at), "sync finished: {stats}"),
			Err(err) => warn!(target = "sv.sync", sources = %label, error = %err, "sync failed"),
		}
		result
	}
}
