//! HTTP API for the local UI.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use sv::{Orchestrator, SessionEngine, Store, StoreError};
use sv_protocol::{SessionSummary, SyncQueued, SyncStatus, Totals, TriggerEvent};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Result, SvError};

pub const DEFAULT_SESSION_LIMIT: usize = 50;
pub const MAX_SESSION_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
	pub store: Arc<Store>,
	pub orchestrator: Orchestrator<SessionEngine>,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/api/v1/health", get(health))
		.route("/api/v1/stats", get(stats))
		.route("/api/v1/sessions", get(sessions))
		.route("/api/v1/sync/status", get(sync_status))
		.route("/api/v1/sync", post(queue_sync))
		.with_state(state)
}

async fn health() -> &'static str {
	"ok"
}

async fn stats(State(state): State<AppState>) -> std::result::Result<Json<Totals>, ApiError> {
	Ok(Json(state.store.totals()?))
}

#[derive(Debug, Default, Deserialize)]
struct SessionsQuery {
	limit: Option<usize>,
}

async fn sessions(State(state): State<AppState>, Query(query): Query<SessionsQuery>) -> std::result::Result<Json<Vec<SessionSummary>>, ApiError> {
	let limit = query.limit.unwrap_or(DEFAULT_SESSION_LIMIT).min(MAX_SESSION_LIMIT);
	Ok(Json(state.store.sessions(limit)?))
}

async fn sync_status(State(state): State<AppState>) -> Json<SyncStatus> {
	Json(state.orchestrator.status())
}

async fn queue_sync(State(state): State<AppState>) -> (StatusCode, Json<SyncQueued>) {
	state.orchestrator.trigger(TriggerEvent::manual());
	(StatusCode::ACCEPTED, Json(SyncQueued { queued: true }))
}

/// Store failure surfaced as `500 {"error": ...}`.
#[derive(Debug)]
pub struct ApiError(StoreError);

impl From<StoreError> for ApiError {
	fn from(err: StoreError) -> Self {
		Self(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		warn!(target = "sv.serve", error = %self.0, "request failed");
		let body = serde_json::json!({ "error": self.0.to_string() });
		(StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
	}
}

/// A running HTTP listener with a graceful stop.
pub struct Server {
	addr: SocketAddr,
	shutdown: Option<oneshot::Sender<()>>,
	task: Option<JoinHandle<io::Result<()>>>,
}

impl Server {
	pub async fn bind(host: &str, port: u16, app: Router) -> Result<Self> {
		let listener = TcpListener::bind((host, port)).await.map_err(|source| SvError::Bind {
			addr: format!("{host}:{port}"),
			source,
		})?;
		let addr = listener.local_addr()?;
		let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

		let task = tokio::spawn(async move {
			axum::serve(listener, app)
				.with_graceful_shutdown(async move {
					let _ = shutdown_rx.await;
				})
				.await
		});
		debug!(target = "sv.serve", %addr, "listening");

		Ok(Self {
			addr,
			shutdown: Some(shutdown_tx),
			task: Some(task),
		})
	}

	pub fn addr(&self) -> SocketAddr {
		self.addr
	}

	/// Stops accepting connections and waits for in-flight requests.
	pub async fn shutdown(&mut self) -> Result<()> {
		if let Some(sender) = self.shutdown.take() {
			let _ = sender.send(());
		}
		if let Some(task) = self.task.take() {
			match task.await {
				Ok(result) => result?,
				Err(err) => warn!(target = "sv.serve", error = %err, "server task ended abnormally"),
			}
		}
		Ok(())
	}
}

impl Drop for Server {
	fn drop(&mut self) {
		if let Some(sender) = self.shutdown.take() {
			let _ = sender.send(());
		}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use axum::body::{Body, to_bytes};
	use axum::http::Request;
	use sv::{SourceDir, SyncEngine};
	use sv_protocol::TriggerSource;
	use tempfile::TempDir;
	use tower::ServiceExt;

	use super::*;

	struct Fixture {
		_tmp: TempDir,
		state: AppState,
	}

	fn fixture() -> Fixture {
		let tmp = TempDir::new().unwrap();
		let root = tmp.path().join("projects");
		std::fs::create_dir_all(root.join("demo")).unwrap();
		std::fs::write(root.join("demo/one.jsonl"), "{\"a\":1}\n{\"a\":2}\n").unwrap();
		std::fs::write(root.join("demo/two.jsonl"), "{\"a\":1}\n").unwrap();

		let store = Arc::new(Store::open(tmp.path().join("sessions.db")).unwrap());
		let engine = Arc::new(SessionEngine::new(vec![SourceDir::new("claude", root)], Arc::clone(&store)));
		Fixture {
			_tmp: tmp,
			state: AppState {
				store,
				orchestrator: Orchestrator::new(engine),
			},
		}
	}

	async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
		let response = app.oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		(status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
	}

	#[tokio::test]
	async fn health_answers_ok() {
		let fx = fixture();
		let response = router(fx.state)
			.oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(&to_bytes(response.into_body(), usize::MAX).await.unwrap()[..], b"ok");
	}

	#[tokio::test]
	async fn stats_and_sessions_reflect_the_store() {
		let fx = fixture();
		fx.state.orchestrator.sync_now(TriggerSource::Initial, None).await.unwrap();

		let (status, body) = get_json(router(fx.state.clone()), "/api/v1/stats").await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body, serde_json::json!({ "sessions": 2, "messages": 3 }));

		let (_, body) = get_json(router(fx.state.clone()), "/api/v1/sessions?limit=1").await;
		assert_eq!(body.as_array().map(Vec::len), Some(1));

		let (_, body) = get_json(router(fx.state), "/api/v1/sync/status").await;
		assert_eq!(body["runs"], 1);
		assert_eq!(body["last"]["status"], "ok");
	}

	#[tokio::test]
	async fn post_sync_queues_a_manual_trigger() {
		let fx = fixture();
		fx.state.orchestrator.start();

		let response = router(fx.state.clone())
			.oneshot(Request::post("/api/v1/sync").body(Body::empty()).unwrap())
			.await
			.unwrap();
		assert_eq!(response.status(), StatusCode::ACCEPTED);

		for _ in 0..100 {
			if fx.state.orchestrator.status().runs == 1 {
				break;
			}
			tokio::time::sleep(std::time::Duration::from_millis(10)).await;
		}
		let last = fx.state.orchestrator.status().last.unwrap();
		assert_eq!(last.sources, BTreeSet::from([TriggerSource::Manual]));
		fx.state.orchestrator.shutdown().await;
	}

	#[tokio::test]
	async fn closed_store_maps_to_500() {
		let fx = fixture();
		fx.state.orchestrator.engine().close().unwrap();

		let (status, body) = get_json(router(fx.state), "/api/v1/stats").await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(body["error"], "store is closed");
	}

	#[tokio::test]
	async fn bind_serves_until_shutdown() {
		let fx = fixture();
		let mut server = Server::bind("127.0.0.1", 0, router(fx.state)).await.unwrap();
		let addr = server.addr();
		assert_ne!(addr.port(), 0);

		let stream = tokio::net::TcpStream::connect(addr).await;
		assert!(stream.is_ok());
		drop(stream);

		server.shutdown().await.unwrap();
		server.shutdown().await.unwrap();
	}
}
