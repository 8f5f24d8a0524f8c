pub mod listen;
pub mod session;

use std::sync::Arc;

use tracing::debug;
use wallet::{FileStorage, SessionManager};

use crate::cli::{Cli, Commands, SessionAction};
use crate::config::{CliConfig, StatePaths};
use crate::error::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let paths = StatePaths::resolve(cli.config.as_deref(), cli.state_dir.as_deref())?;
	let config = CliConfig::load(&paths.config_file, cli.config.is_some())?;
	debug!(
		target = "wallet.config",
		config = %paths.config_file.display(),
		state = %paths.state_dir.display(),
		"resolved paths"
	);

	let storage = Arc::new(FileStorage::new(paths.state_dir.clone()));
	let manager = Arc::new(SessionManager::new(config.session.clone(), storage));

	match cli.command {
		Commands::Listen(args) => listen::run(args, config, manager, cli.format).await,
		Commands::Session(args) => match args.action {
			SessionAction::Show => session::show(&manager, cli.format),
			SessionAction::Clear => session::clear(&manager, cli.format),
		},
	}
}
