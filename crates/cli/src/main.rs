use clap::Parser;
use sessionview_cli::cli::Cli;
use sessionview_cli::config::Config;
use sessionview_cli::{commands, logging};
use tracing::error;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let result = match Config::load(&cli) {
		Ok(config) => commands::dispatch(cli.command, config).await,
		Err(err) => Err(err),
	};

	if let Err(err) = result {
		error!(target = "sv", error = %err, "command failed");
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}
