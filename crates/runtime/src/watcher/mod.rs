//! Debounced recursive directory watcher.
//!
//! Every directory under a watched root gets its own non-recursive OS watch.
//! The notify callback only forwards raw events over a channel; a dedicated
//! worker thread owns the [`Debounce`] state, registers directories created
//! after watching began, forgets directories that were removed or renamed
//! away, and invokes the change callback once per quiet period.

mod debounce;

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub use debounce::Debounce;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as _};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{Result, WatchError};

/// Upper bound on how long the worker blocks before re-checking the stop flag.
const STOP_POLL: Duration = Duration::from_millis(50);

/// Receives the set of changed paths of one quiet period.
pub type ChangeCallback = Box<dyn Fn(BTreeSet<PathBuf>) + Send + 'static>;

type RawEvents = Receiver<notify::Result<Event>>;

struct Shared {
	backend: Mutex<Option<RecommendedWatcher>>,
	roots: Mutex<Vec<PathBuf>>,
	watched: Mutex<HashSet<PathBuf>>,
	stop: AtomicBool,
}

#[derive(Default)]
struct Control {
	worker: Option<JoinHandle<()>>,
	pending_start: Option<(RawEvents, ChangeCallback)>,
	stopped: bool,
}

/// Watches directory trees and reports coalesced changes.
pub struct Watcher {
	window: Duration,
	shared: Arc<Shared>,
	control: Mutex<Control>,
}

impl Watcher {
	/// Creates the OS watch backend.
	///
	/// # Errors
	///
	/// Returns [`WatchError::Backend`] when the platform watcher cannot be
	/// initialised; callers are expected to carry on without file watching.
	pub fn new<F>(window: Duration, on_change: F) -> Result<Self>
	where
		F: Fn(BTreeSet<PathBuf>) + Send + 'static,
	{
		let (tx, rx) = mpsc::channel();
		let backend = notify::recommended_watcher(move |event: notify::Result<Event>| {
			let _ = tx.send(event);
		})?;
		let callback: ChangeCallback = Box::new(on_change);

		Ok(Self {
			window,
			shared: Arc::new(Shared {
				backend: Mutex::new(Some(backend)),
				roots: Mutex::new(Vec::new()),
				watched: Mutex::new(HashSet::new()),
				stop: AtomicBool::new(false),
			}),
			control: Mutex::new(Control {
				pending_start: Some((rx, callback)),
				..Control::default()
			}),
		})
	}

	pub fn roots(&self) -> Vec<PathBuf> {
		self.shared.roots.lock().clone()
	}

	/// Number of directories currently holding an OS watch.
	pub fn watched_dirs(&self) -> usize {
		self.shared.watched.lock().len()
	}

	/// Watches `root` and every directory beneath it.
	///
	/// Directories created later inside `root` are picked up by the worker
	/// as their create events arrive.
	pub fn watch_recursive(&self, root: impl AsRef<Path>) -> Result<()> {
		let root = root.as_ref();
		if self.shared.stop.load(Ordering::Acquire) {
			return Err(WatchError::Stopped);
		}

		let meta = match std::fs::metadata(root) {
			Ok(meta) => meta,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(WatchError::NotFound(root.to_path_buf())),
			Err(err) => return Err(WatchError::Backend(notify::Error::io(err).add_path(root.to_path_buf()))),
		};
		if !meta.is_dir() {
			return Err(WatchError::NotADirectory(root.to_path_buf()));
		}

		let added = register_tree(&self.shared, root)?;
		self.shared.roots.lock().push(root.to_path_buf());
		debug!(target = "sv.watch", root = %root.display(), dirs = added, "watching");
		Ok(())
	}

	/// Begins delivering callbacks on the `sv-watcher` thread.
	///
	/// A second call, or a call after [`stop`](Self::stop), does nothing.
	pub fn start(&self) -> Result<()> {
		let mut control = self.control.lock();
		if control.stopped || control.worker.is_some() {
			return Ok(());
		}
		let Some((events, callback)) = control.pending_start.take() else {
			return Ok(());
		};

		let shared = Arc::clone(&self.shared);
		let debounce = Debounce::new(self.window);
		let worker = thread::Builder::new()
			.name("sv-watcher".to_owned())
			.spawn(move || run_worker(&shared, &events, debounce, &callback))
			.map_err(WatchError::Spawn)?;
		control.worker = Some(worker);
		Ok(())
	}

	/// Stops delivery and releases every OS watch.
	///
	/// Idempotent. When this returns no callback is running and none will
	/// run again. Called from inside a callback it does not wait for itself;
	/// the worker exits as soon as that callback returns.
	pub fn stop(&self) {
		self.shared.stop.store(true, Ordering::Release);
		drop(self.shared.backend.lock().take());
		self.shared.watched.lock().clear();

		let worker = {
			let mut control = self.control.lock();
			control.stopped = true;
			control.pending_start = None;
			control.worker.take()
		};

		if let Some(worker) = worker {
			if worker.thread().id() == thread::current().id() {
				return;
			}
			if worker.join().is_err() {
				warn!(target = "sv.watch", "watcher worker panicked");
			}
		}
	}
}

impl Drop for Watcher {
	fn drop(&mut self) {
		self.stop();
	}
}

/// Adds a non-recursive watch to `root` and each directory below it.
fn register_tree(shared: &Shared, root: &Path) -> Result<usize> {
	let mut added = 0;
	for entry in WalkDir::new(root).follow_links(false) {
		let entry = match entry {
			Ok(entry) => entry,
			Err(err) if err.depth() > 0 => {
				warn!(target = "sv.watch", error = %err, "skipping unreadable directory");
				continue;
			}
			Err(err) => return Err(err.into()),
		};
		if entry.file_type().is_dir() && add_watch(shared, entry.path())? {
			added += 1;
		}
	}
	Ok(added)
}

fn add_watch(shared: &Shared, dir: &Path) -> Result<bool> {
	let mut backend = shared.backend.lock();
	let Some(backend) = backend.as_mut() else {
		return Err(WatchError::Stopped);
	};
	let mut watched = shared.watched.lock();
	if watched.contains(dir) {
		return Ok(false);
	}
	backend.watch(dir, RecursiveMode::NonRecursive)?;
	watched.insert(dir.to_path_buf());
	Ok(true)
}

/// Drops the watches on `dir` and every directory below it, so a directory
/// created again at the same path gets a fresh watch.
fn forget_tree(shared: &Shared, dir: &Path) -> usize {
	let mut backend = shared.backend.lock();
	let mut watched = shared.watched.lock();
	let gone: Vec<PathBuf> = watched.iter().filter(|path| path.starts_with(dir)).cloned().collect();
	for path in &gone {
		watched.remove(path);
		if let Some(backend) = backend.as_mut() {
			// The OS usually released the watch along with the directory.
			let _ = backend.unwatch(path);
		}
	}
	gone.len()
}

fn run_worker(shared: &Shared, events: &RawEvents, mut debounce: Debounce, callback: &ChangeCallback) {
	while !shared.stop.load(Ordering::Acquire) {
		let wait = debounce.wait_hint(Instant::now(), STOP_POLL);
		match events.recv_timeout(wait) {
			Ok(event) => handle_raw(shared, &mut debounce, event),
			Err(RecvTimeoutError::Timeout) => {}
			Err(RecvTimeoutError::Disconnected) => break,
		}
		while let Ok(event) = events.try_recv() {
			handle_raw(shared, &mut debounce, event);
		}

		if shared.stop.load(Ordering::Acquire) {
			break;
		}
		if let Some(batch) = debounce.poll(Instant::now()) {
			debug!(target = "sv.watch", paths = batch.len(), "change batch ready");
			callback(batch);
		}
	}
	trace!(target = "sv.watch", "watcher worker exiting");
}

fn handle_raw(shared: &Shared, debounce: &mut Debounce, event: notify::Result<Event>) {
	let event = match event {
		Ok(event) => event,
		Err(err) => {
			warn!(target = "sv.watch", error = %err, "filesystem watch error");
			return;
		}
	};
	if matches!(event.kind, EventKind::Access(_)) {
		return;
	}

	if matches!(event.kind, EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_))) {
		for path in event.paths.iter().filter(|path| !path.exists()) {
			let dropped = forget_tree(shared, path);
			if dropped > 0 {
				debug!(target = "sv.watch", dir = %path.display(), dropped, "directory gone; watch released");
			}
		}
	}

	if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(_))) {
		for path in event.paths.iter().filter(|path| path.is_dir()) {
			// A stale entry means the directory was replaced before its removal was seen.
			forget_tree(shared, path);
			match register_tree(shared, path) {
				Ok(added) if added > 0 => debug!(target = "sv.watch", dir = %path.display(), added, "watching new directory"),
				Ok(_) => {}
				Err(WatchError::Stopped) => return,
				Err(err) => warn!(target = "sv.watch", dir = %path.display(), error = %err, "failed to watch new directory"),
			}
		}
	}

	if event.paths.is_empty() {
		// Backend overflow or rescan request: report the roots themselves.
		let roots = shared.roots.lock().clone();
		debounce.record(roots, Instant::now());
	} else {
		debounce.record(event.paths, Instant::now());
	}
}
