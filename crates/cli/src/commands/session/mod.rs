use colored::Colorize;
use tracing::info;
use wallet::SessionManager;

use crate::error::Result;
use crate::output::{ClearData, OutputFormat, ResultBuilder, SessionData, print_result};

/// Prints the stored session. Expired records are removed on the way.
pub fn show(manager: &SessionManager, format: OutputFormat) -> Result<()> {
	let session = manager.session()?;

	if format == OutputFormat::Text {
		match &session {
			Some(s) => {
				println!("{} {}", "address".bold(), s.address);
				println!("{} {}", "wallet ".bold(), s.wallet_kind);
				println!("{} {}", "chain  ".bold(), s.chain_id);
				println!("{} {}", "expires".bold(), s.expires_at_ms);
			}
			None => println!("{}", "no active session".dimmed()),
		}
		return Ok(());
	}

	let result = ResultBuilder::new("session show")
		.data(SessionData {
			storage_key: manager.store().key().to_string(),
			session,
		})
		.build();
	print_result(&result, format);
	Ok(())
}

/// Removes the stored session without contacting any wallet.
pub fn clear(manager: &SessionManager, format: OutputFormat) -> Result<()> {
	let cleared = manager.session()?.is_some();
	manager.store().clear()?;
	info!(target = "wallet.session", cleared, "session record cleared");

	let result = ResultBuilder::new("session clear").data(ClearData { cleared }).build();
	print_result(&result, format);
	Ok(())
}
