use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn sessionview(data_dir: &Path, args: &[&str]) -> Output {
	Command::new(env!("CARGO_BIN_EXE_sessionview"))
		.arg("--data-dir")
		.arg(data_dir)
		.args(args)
		.env_remove("SESSIONVIEW_SOURCES")
		.env_remove("SESSIONVIEW_HOST")
		.env_remove("SESSIONVIEW_PORT")
		.env("RUST_LOG", "off")
		.output()
		.expect("failed to run sessionview")
}

fn seed(root: &Path) {
	std::fs::create_dir_all(root.join("alpha")).unwrap();
	std::fs::write(root.join("alpha/one.jsonl"), "{\"role\":\"user\"}\n{\"role\":\"assistant\"}\n").unwrap();
	std::fs::write(root.join("alpha/two.jsonl"), "{\"role\":\"user\"}\ngarbage\n").unwrap();
}

#[test]
fn sync_indexes_then_skips_unchanged_sessions() {
	let tmp = TempDir::new().unwrap();
	let root = tmp.path().join("projects");
	seed(&root);
	let data = tmp.path().join("data");
	let source = root.to_str().unwrap();

	let first = sessionview(&data, &["sync", "--source", source]);
	assert!(first.status.success(), "stderr: {}", String::from_utf8_lossy(&first.stderr));
	let stdout = String::from_utf8_lossy(&first.stdout);
	assert!(stdout.contains("2 sessions (2 synced, 0 unchanged, 0 failed), 3 messages indexed"), "stdout: {stdout}");
	assert!(data.join("sessions.db").exists());

	let second = sessionview(&data, &["sync", "--source", source]);
	assert!(second.status.success());
	let stdout = String::from_utf8_lossy(&second.stdout);
	assert!(stdout.contains("0 synced, 2 unchanged"), "stdout: {stdout}");
}

#[test]
fn sources_can_come_from_config_file() {
	let tmp = TempDir::new().unwrap();
	let root = tmp.path().join("projects");
	seed(&root);
	let data = tmp.path().join("data");
	std::fs::create_dir_all(&data).unwrap();
	let config = serde_json::json!({ "sources": [root] });
	std::fs::write(data.join("config.json"), config.to_string()).unwrap();

	let out = sessionview(&data, &["sync"]);
	assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
	assert!(String::from_utf8_lossy(&out.stdout).contains("2 sessions"));
}

#[test]
fn malformed_config_exits_with_one() {
	let tmp = TempDir::new().unwrap();
	std::fs::write(tmp.path().join("config.json"), "{ nope").unwrap();

	let out = sessionview(tmp.path(), &["sync"]);
	assert_eq!(out.status.code(), Some(1));
	assert!(String::from_utf8_lossy(&out.stderr).contains("config.json"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
	let tmp = TempDir::new().unwrap();
	let out = sessionview(tmp.path(), &["sync", "--bogus"]);
	assert_eq!(out.status.code(), Some(2));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
	let tmp = TempDir::new().unwrap();
	let out = sessionview(tmp.path(), &["foo"]);
	assert_eq!(out.status.code(), Some(2));
	assert!(!tmp.path().join("sessions.db").exists());
}
