//! Session file discovery under configured source directories.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

const SESSION_EXTENSION: &str = "jsonl";

/// A directory tree holding session logs for one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDir {
	/// Short name used in session ids and the API, e.g. `claude`.
	pub label: String,
	pub root: PathBuf,
}

impl SourceDir {
	pub fn new(label: impl Into<String>, root: impl Into<PathBuf>) -> Self {
		Self {
			label: label.into(),
			root: root.into(),
		}
	}

	/// Derives a label from the directory layout: `~/.claude/projects`
	/// becomes `claude`, anything else uses its own file name.
	pub fn from_path(root: impl Into<PathBuf>) -> Self {
		let root = root.into();
		let label = root
			.components()
			.rev()
			.filter_map(|c| c.as_os_str().to_str())
			.find_map(|name| name.strip_prefix('.'))
			.or_else(|| root.file_name().and_then(|n| n.to_str()))
			.unwrap_or("sessions")
			.to_string();
		Self { label, root }
	}
}

/// A session log found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
	/// `<label>:<path relative to root, without extension>`.
	pub id: String,
	pub source: String,
	pub project: String,
	pub path: PathBuf,
}

/// Lists every session file under the existing sources, in a stable order.
///
/// Missing roots are skipped; unreadable entries are logged and skipped.
pub fn discover(sources: &[SourceDir]) -> Vec<SessionFile> {
	let mut found = Vec::new();
	for source in sources {
		if !source.root.is_dir() {
			debug!(target = "sv.sync", root = %source.root.display(), "source directory missing; skipping");
			continue;
		}

		for entry in WalkDir::new(&source.root).follow_links(false).sort_by_file_name() {
			let entry = match entry {
				Ok(entry) => entry,
				Err(err) => {
					warn!(target = "sv.sync", error = %err, "skipping unreadable entry");
					continue;
				}
			};
			if !entry.file_type().is_file() || entry.path().extension().and_then(|e| e.to_str()) != Some(SESSION_EXTENSION) {
				continue;
			}
			if let Some(file) = session_file(source, entry.path()) {
				found.push(file);
			}
		}
	}
	found
}

fn session_file(source: &SourceDir, path: &Path) -> Option<SessionFile> {
	let relative = path.strip_prefix(&source.root).ok()?.with_extension("");
	let rel_id = relative
		.components()
		.map(|c| c.as_os_str().to_string_lossy())
		.collect::<Vec<_>>()
		.join("/");
	let project = relative
		.parent()
		.and_then(|p| p.file_name())
		.map_or_else(|| source.label.clone(), |n| n.to_string_lossy().into_owned());

	Some(SessionFile {
		id: format!("{}:{}", source.label, rel_id),
		source: source.label.clone(),
		project,
		path: path.to_path_buf(),
	})
}
