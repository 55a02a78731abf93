//! Tracing subscriber setup. `RUST_LOG` wins over `-v` flags.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub fn init_logging(verbose: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
	let ansi = std::io::stderr().is_terminal();

	let layer = fmt::layer().with_writer(std::io::stderr).with_ansi(ansi).with_target(true);
	// try_init: integration tests may install a subscriber first.
	let _ = tracing_subscriber::registry().with(filter).with(layer.without_time().compact()).try_init();
}

fn default_directive(verbose: u8) -> &'static str {
	match verbose {
		0 => "warn",
		1 => "warn,sv=info",
		_ => "info,sv=debug",
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verbosity_raises_sessionview_targets() {
		assert_eq!(default_directive(0), "warn");
		assert_eq!(default_directive(1), "warn,sv=info");
		assert_eq!(default_directive(5), "info,sv=debug");
	}

	#[test]
	fn directives_parse() {
		for v in 0..3 {
			assert!(EnvFilter::try_new(default_directive(v)).is_ok());
		}
	}
}
