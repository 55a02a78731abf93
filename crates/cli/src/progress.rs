//! Single-line sync progress on stderr.

use std::io::{self, Write};

use sv::ProgressFn;
use sv_protocol::Progress;

pub fn render(progress: &Progress) -> String {
	format!(
		"Syncing sessions {}/{} ({:.0}%), {} messages indexed",
		progress.sessions_done,
		progress.sessions_total,
		progress.percent(),
		progress.messages_indexed
	)
}

/// Redraws the current line on every update and ends it once the sync completes.
pub fn console_sink() -> ProgressFn {
	Box::new(|progress: Progress| {
		let mut err = io::stderr().lock();
		let _ = write!(err, "\r{}", render(&progress));
		if progress.is_complete() {
			let _ = writeln!(err);
		}
		let _ = err.flush();
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn render_shows_counts_and_percent() {
		assert_eq!(render(&Progress::new(1, 4, 10)), "Syncing sessions 1/4 (25%), 10 messages indexed");
		assert_eq!(render(&Progress::new(0, 0, 0)), "Syncing sessions 0/0 (0%), 0 messages indexed");
	}
}
