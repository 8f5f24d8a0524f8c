use clap::Parser;
use wallet_cli::cli::Cli;
use wallet_cli::error::CliError;
use wallet_cli::output::{self, OutputFormat, ResultBuilder};
use wallet_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	if let Err(err) = commands::dispatch(cli).await {
		handle_error(err, format);
		std::process::exit(1);
	}
}

fn handle_error(err: CliError, format: OutputFormat) {
	let cmd_error = err.to_command_error();

	output::print_error_stderr(&cmd_error);

	// machine formats also get a failed envelope on stdout
	if format != OutputFormat::Text {
		let result: output::CommandResult<()> = ResultBuilder::new("wallet")
			.error_with_details(cmd_error.code, cmd_error.message, cmd_error.details)
			.build();
		output::print_result(&result, format);
	}
}
