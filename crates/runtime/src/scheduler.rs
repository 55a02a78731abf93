//! Fixed-interval background ticker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Runs a callback every `period`, starting one full period after
/// [`start`](Scheduler::start).
///
/// Slow callbacks delay the following tick instead of causing a burst.
pub struct Scheduler {
	period: Duration,
	cancel: CancellationToken,
	ticks: Arc<AtomicU64>,
	task: Option<JoinHandle<()>>,
}

impl Scheduler {
	/// Spawns the ticker on the current tokio runtime.
	///
	/// Returns `None` for a zero period, which callers use to mean
	/// "periodic sync disabled".
	pub fn start<F>(period: Duration, tick: F) -> Option<Self>
	where
		F: Fn() + Send + Sync + 'static,
	{
		if period.is_zero() {
			return None;
		}

		let cancel = CancellationToken::new();
		let ticks = Arc::new(AtomicU64::new(0));
		let task = tokio::spawn(run(period, cancel.clone(), Arc::clone(&ticks), tick));
		debug!(target = "sv.schedule", period_secs = period.as_secs_f64(), "scheduler started");

		Some(Self {
			period,
			cancel,
			ticks,
			task: Some(task),
		})
	}

	pub fn period(&self) -> Duration {
		self.period
	}

	/// Ticks fired so far.
	pub fn ticks(&self) -> u64 {
		self.ticks.load(Ordering::Acquire)
	}

	/// Cancels the ticker and waits for it to finish.
	///
	/// A tick that is already executing completes first.
	pub async fn stop(&mut self) {
		self.cancel.cancel();
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}

impl Drop for Scheduler {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

async fn run<F>(period: Duration, cancel: CancellationToken, ticks: Arc<AtomicU64>, tick: F)
where
	F: Fn() + Send + Sync + 'static,
{
	let mut interval = tokio::time::interval_at(Instant::now() + period, period);
	interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			_ = cancel.cancelled() => break,
			_ = interval.tick() => {
				let n = ticks.fetch_add(1, Ordering::AcqRel) + 1;
				trace!(target = "sv.schedule", tick = n, "periodic tick");
				tick();
			}
		}
	}
}
