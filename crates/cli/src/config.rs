//! Runtime configuration.
//!
//! Values come from, in order of precedence: command-line flags (and their
//! environment variables), `<data-dir>/config.json`, built-in defaults.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use sv::SourceDir;
use tracing::debug;

use crate::cli::Cli;
use crate::error::{Result, SvError};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 900;
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const CONFIG_FILE: &str = "config.json";
pub const STORE_FILE: &str = "sessions.db";
pub const SOURCES_ENV: &str = "SESSIONVIEW_SOURCES";

/// Optional settings read from `config.json`. Unknown keys are ignored.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub sources: Option<Vec<PathBuf>>,
	pub sync_interval_secs: Option<u64>,
	pub debounce_ms: Option<u64>,
	pub open_browser: Option<bool>,
}

impl FileConfig {
	/// Reads `path`; a missing file yields the empty config.
	pub fn read(path: &Path) -> Result<Self> {
		let text = match fs::read_to_string(path) {
			Ok(text) => text,
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
			Err(err) => return Err(err.into()),
		};
		debug!(target = "sv.config", path = %path.display(), "loading config file");
		serde_json::from_str(&text).map_err(|err| SvError::Config {
			path: path.to_path_buf(),
			message: err.to_string(),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub host: String,
	pub port: u16,
	pub data_dir: PathBuf,
	pub sources: Vec<SourceDir>,
	pub sync_interval: Duration,
	pub debounce: Duration,
	pub open_browser: bool,
}

impl Config {
	/// Resolves the data directory, reads its config file and applies the flags.
	pub fn load(cli: &Cli) -> Result<Self> {
		let data_dir = match &cli.data_dir {
			Some(dir) => dir.clone(),
			None => default_data_dir()?,
		};
		let file = FileConfig::read(&data_dir.join(CONFIG_FILE))?;
		Ok(Self::resolve(cli, file, data_dir, std::env::var_os(SOURCES_ENV)))
	}

	/// Merges flags over the file config over defaults. `env_sources` is the
	/// raw `SESSIONVIEW_SOURCES` value, consulted only without `--source`.
	pub fn resolve(cli: &Cli, file: FileConfig, data_dir: PathBuf, env_sources: Option<OsString>) -> Self {
		let source_paths = if !cli.sources.is_empty() {
			cli.sources.clone()
		} else if let Some(list) = env_sources.filter(|v| !v.is_empty()) {
			std::env::split_paths(&list).collect()
		} else if let Some(paths) = file.sources {
			paths
		} else {
			default_sources()
		};

		Self {
			host: cli.host.clone().or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
			port: cli.port.or(file.port).unwrap_or(DEFAULT_PORT),
			data_dir,
			sources: source_paths.into_iter().map(SourceDir::from_path).collect(),
			sync_interval: Duration::from_secs(cli.sync_interval.or(file.sync_interval_secs).unwrap_or(DEFAULT_SYNC_INTERVAL_SECS)),
			debounce: Duration::from_millis(cli.debounce_ms.or(file.debounce_ms).unwrap_or(DEFAULT_DEBOUNCE_MS)),
			open_browser: !cli.no_browser && file.open_browser.unwrap_or(true),
		}
	}

	pub fn store_path(&self) -> PathBuf {
		self.data_dir.join(STORE_FILE)
	}
}

fn default_data_dir() -> Result<PathBuf> {
	dirs::home_dir()
		.map(|home| home.join(".sessionview"))
		.ok_or_else(|| SvError::DataDir("cannot determine home directory; pass --data-dir".into()))
}

fn default_sources() -> Vec<PathBuf> {
	let Some(home) = dirs::home_dir() else {
		return Vec::new();
	};
	vec![home.join(".claude").join("projects"), home.join(".codex").join("sessions")]
}

#[cfg(test)]
mod tests {
	use clap::Parser;
	use tempfile::TempDir;

	use super::*;

	fn cli(args: &[&str]) -> Cli {
		Cli::try_parse_from(std::iter::once("sessionview").chain(args.iter().copied())).unwrap()
	}

	#[test]
	fn defaults_apply_without_flags_or_file() {
		let config = Config::resolve(&cli(&[]), FileConfig::default(), PathBuf::from("/data"), None);
		assert_eq!(config.host, DEFAULT_HOST);
		assert_eq!(config.port, DEFAULT_PORT);
		assert_eq!(config.sync_interval, Duration::from_secs(900));
		assert_eq!(config.debounce, Duration::from_millis(500));
		assert!(config.open_browser);
		assert_eq!(config.store_path(), PathBuf::from("/data/sessions.db"));
	}

	#[test]
	fn flags_override_file() {
		let file = FileConfig {
			port: Some(9000),
			host: Some("0.0.0.0".into()),
			sources: Some(vec![PathBuf::from("/from/file")]),
			open_browser: Some(true),
			..FileConfig::default()
		};
		let config = Config::resolve(&cli(&["--port", "7000", "--source", "/from/flag", "--no-browser"]), file, PathBuf::from("/d"), None);

		assert_eq!(config.port, 7000);
		assert_eq!(config.host, "0.0.0.0");
		assert_eq!(config.sources, vec![SourceDir::from_path("/from/flag")]);
		assert!(!config.open_browser);
	}

	#[test]
	fn sources_env_beats_file_but_not_flag() {
		let file = FileConfig {
			sources: Some(vec![PathBuf::from("/from/file")]),
			..FileConfig::default()
		};
		let env = std::env::join_paths(["/env/a", "/env/b"]).ok();

		let config = Config::resolve(&cli(&[]), file.clone(), PathBuf::from("/d"), env.clone());
		let roots: Vec<_> = config.sources.iter().map(|s| s.root.clone()).collect();
		assert_eq!(roots, vec![PathBuf::from("/env/a"), PathBuf::from("/env/b")]);

		let config = Config::resolve(&cli(&["--source", "/flag"]), file, PathBuf::from("/d"), env);
		assert_eq!(config.sources[0].root, PathBuf::from("/flag"));
	}

	#[test]
	fn file_can_disable_browser_and_interval() {
		let file: FileConfig = serde_json::from_str(r#"{"open_browser": false, "sync_interval_secs": 0, "extra": 1}"#).unwrap();
		let config = Config::resolve(&cli(&[]), file, PathBuf::from("/d"), None);
		assert!(!config.open_browser);
		assert!(config.sync_interval.is_zero());
	}

	#[test]
	fn missing_file_is_empty_and_malformed_file_is_an_error() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join(CONFIG_FILE);
		assert_eq!(FileConfig::read(&path).unwrap(), FileConfig::default());

		fs::write(&path, "{ not json").unwrap();
		let err = FileConfig::read(&path).unwrap_err();
		assert!(matches!(err, SvError::Config { .. }));
		assert!(err.to_string().contains("config.json"));
	}

	#[test]
	fn load_reads_config_from_data_dir() {
		let tmp = TempDir::new().unwrap();
		fs::write(tmp.path().join(CONFIG_FILE), r#"{"debounce_ms": 125}"#).unwrap();

		let data_dir = tmp.path().to_str().unwrap();
		let config = Config::load(&cli(&["--data-dir", data_dir])).unwrap();
		assert_eq!(config.debounce, Duration::from_millis(125));
		assert_eq!(config.data_dir, tmp.path());
	}
}
