use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sessionview")]
#[command(about = "Index local AI agent session logs and browse them from a local web UI")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug); RUST_LOG takes precedence
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Address the HTTP server listens on
	#[arg(long, global = true, env = "SESSIONVIEW_HOST", value_name = "HOST")]
	pub host: Option<String>,

	/// Preferred HTTP port; a free one is picked if it is taken
	#[arg(short, long, global = true, env = "SESSIONVIEW_PORT", value_name = "PORT")]
	pub port: Option<u16>,

	/// Where the index and config.json live [default: ~/.sessionview]
	#[arg(long, global = true, env = "SESSIONVIEW_DATA_DIR", value_name = "DIR")]
	pub data_dir: Option<PathBuf>,

	/// Session log directory to index (repeatable); SESSIONVIEW_SOURCES takes a path list
	#[arg(long = "source", global = true, value_name = "DIR")]
	pub sources: Vec<PathBuf>,

	/// Seconds between periodic syncs; 0 disables them
	#[arg(long, global = true, value_name = "SECS")]
	pub sync_interval: Option<u64>,

	/// Quiet period before filesystem changes trigger a sync
	#[arg(long, global = true, value_name = "MS")]
	pub debounce_ms: Option<u64>,

	/// Do not open the UI in a browser once the server is up
	#[arg(long, global = true)]
	pub no_browser: bool,

	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
	/// Sync, then watch the sources and serve the UI (default)
	Serve,

	/// Run one sync with progress output and exit
	Sync,
}
