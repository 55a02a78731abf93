//! Opens the UI in a browser once the local server answers.

use std::io;
use std::process::{Command, Stdio};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

const DEFAULT_ATTEMPTS: u32 = 50;
const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);
const PROBE_TIMEOUT: Duration = Duration::from_millis(400);
pub const HEALTH_PATH: &str = "/api/v1/health";

/// Platform hook that shows a URL to the user.
pub trait UrlOpener: Send + Sync + 'static {
	fn open(&self, url: &str) -> io::Result<()>;
}

/// Opens URLs with the desktop's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
	fn open(&self, url: &str) -> io::Result<()> {
		let mut cmd = open_command(url)?;
		cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

		#[cfg(unix)]
		std::os::unix::process::CommandExt::process_group(&mut cmd, 0);

		let mut child = cmd.spawn()?;
		std::thread::spawn(move || {
			let _ = child.wait();
		});
		Ok(())
	}
}

fn open_command(url: &str) -> io::Result<Command> {
	if cfg!(target_os = "macos") {
		let mut cmd = Command::new("open");
		cmd.arg(url);
		return Ok(cmd);
	}

	if cfg!(target_os = "windows") {
		let mut cmd = Command::new("cmd");
		cmd.args(["/C", "start", ""]).arg(url);
		return Ok(cmd);
	}

	for candidate in ["xdg-open", "wslview"] {
		if let Ok(path) = which::which(candidate) {
			let mut cmd = Command::new(path);
			cmd.arg(url);
			return Ok(cmd);
		}
	}
	Err(io::Error::new(io::ErrorKind::NotFound, "no URL opener found (tried xdg-open, wslview)"))
}

/// Readiness-gated browser launch.
///
/// Polls `{url}{HEALTH_PATH}` every `interval` for at most `attempts` tries.
/// Any HTTP response counts as ready. Running out of attempts is not an
/// error: the launcher just gives up.
pub struct Launcher<O = SystemOpener> {
	url: String,
	attempts: u32,
	interval: Duration,
	opener: O,
}

impl<O: UrlOpener> Launcher<O> {
	pub fn new(url: impl Into<String>, opener: O) -> Self {
		Self {
			url: url.into(),
			attempts: DEFAULT_ATTEMPTS,
			interval: DEFAULT_INTERVAL,
			opener,
		}
	}

	pub fn with_attempts(mut self, attempts: u32) -> Self {
		self.attempts = attempts;
		self
	}

	pub fn with_interval(mut self, interval: Duration) -> Self {
		self.interval = interval;
		self
	}

	/// Runs [`run`](Self::run) on a background task.
	pub fn spawn(self) -> JoinHandle<bool> {
		tokio::spawn(self.run())
	}

	/// Returns `true` if the URL was handed to the opener.
	pub async fn run(self) -> bool {
		let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
			Ok(client) => client,
			Err(err) => {
				debug!(target = "sv.launch", error = %err, "failed to create HTTP client");
				return false;
			}
		};
		let probe = format!("{}{}", self.url.trim_end_matches('/'), HEALTH_PATH);

		for attempt in 1..=self.attempts {
			tokio::time::sleep(self.interval).await;
			match client.get(&probe).send().await {
				Ok(response) => {
					debug!(target = "sv.launch", attempt, status = %response.status(), "server ready");
					if let Err(err) = self.opener.open(&self.url) {
						debug!(target = "sv.launch", url = %self.url, error = %err, "failed to open browser");
					}
					return true;
				}
				Err(err) => {
					debug!(target = "sv.launch", attempt, error = %err, "server not ready");
				}
			}
		}

		debug!(target = "sv.launch", attempts = self.attempts, "server never answered; not opening browser");
		false
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use axum::Router;
	use axum::http::StatusCode;
	use axum::routing::get;
	use parking_lot::Mutex;
	use tokio::net::TcpListener;

	use super::*;

	#[derive(Clone, Default)]
	struct RecordingOpener(Arc<Mutex<Vec<String>>>);

	impl UrlOpener for RecordingOpener {
		fn open(&self, url: &str) -> io::Result<()> {
			self.0.lock().push(url.to_string());
			Ok(())
		}
	}

	async fn serve(router: Router) -> String {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			let _ = axum::serve(listener, router).await;
		});
		format!("http://{addr}")
	}

	fn unused_url() -> String {
		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);
		format!("http://{addr}")
	}

	#[tokio::test]
	async fn gives_up_silently_when_server_never_answers() {
		let opener = RecordingOpener::default();
		let opened = Launcher::new(unused_url(), opener.clone())
			.with_attempts(4)
			.with_interval(Duration::from_millis(10))
			.spawn()
			.await
			.unwrap();

		assert!(!opened);
		assert!(opener.0.lock().is_empty());
	}

	#[tokio::test]
	async fn opens_once_when_health_answers() {
		let url = serve(Router::new().route(HEALTH_PATH, get(|| async { "ok" }))).await;
		let opener = RecordingOpener::default();

		let opened = Launcher::new(url.clone(), opener.clone())
			.with_interval(Duration::from_millis(10))
			.run()
			.await;

		assert!(opened);
		assert_eq!(*opener.0.lock(), vec![url]);
	}

	#[tokio::test]
	async fn any_status_counts_as_ready() {
		let url = serve(Router::new().route(HEALTH_PATH, get(|| async { StatusCode::SERVICE_UNAVAILABLE }))).await;
		let opener = RecordingOpener::default();

		let opened = Launcher::new(url, opener.clone()).with_interval(Duration::from_millis(10)).run().await;
		assert!(opened);
		assert_eq!(opener.0.lock().len(), 1);
	}

	#[tokio::test]
	async fn opener_failure_is_not_fatal() {
		struct Broken;
		impl UrlOpener for Broken {
			fn open(&self, _url: &str) -> io::Result<()> {
				Err(io::Error::other("no display"))
			}
		}

		let url = serve(Router::new().route(HEALTH_PATH, get(|| async { "ok" }))).await;
		assert!(Launcher::new(url, Broken).with_interval(Duration::from_millis(10)).run().await);
	}
}
