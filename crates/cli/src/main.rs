use clap::Parser;
use vaultlink_cli::cli::Cli;
use vaultlink_cli::output::{self, CommandError, OutputFormat, ResultBuilder};
use vaultlink_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	match commands::dispatch(&cli).await {
		Ok(result) => output::print_result(&result, cli.format),
		Err(err) => {
			handle_error(&err, cli.format, cli.verbose > 0);
			std::process::exit(1);
		}
	}
}

fn handle_error(err: &anyhow::Error, format: OutputFormat, verbose: bool) {
	let cmd_error = CommandError::from_error(err, verbose);

	// Humans read stderr
	output::print_error_stderr(&cmd_error);

	// Scripts asking for JSON also get an envelope with ok=false
	if format == OutputFormat::Json {
		let result = ResultBuilder::new("unknown").error(cmd_error).build();
		output::print_result(&result, format);
	}
}
