#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Wallet session host.
#[derive(Parser, Debug)]
#[command(name = "wallet")]
#[command(about = "Keep a wallet session alive for a page's injected wallets")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default), json, or ndjson
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Config file (default: $XDG_CONFIG_HOME/wallet-session/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Directory holding the session record (default: $XDG_STATE_HOME/wallet-session)
	#[arg(long, global = true, value_name = "DIR")]
	pub state_dir: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Accept the page bridge, restore or connect, and stream wallet events.
	Listen(ListenArgs),
	/// Inspect or clear the stored session.
	Session(SessionArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListenArgs {
	/// Address to bind (default from config, else 127.0.0.1)
	#[arg(long)]
	pub host: Option<String>,

	/// Port to bind (default from config, else 9271)
	#[arg(short, long)]
	pub port: Option<u16>,

	/// Wallet to connect through: a name (MetaMask) or an injection path (phantom.solana)
	#[arg(short, long, value_name = "WALLET")]
	pub wallet: Option<String>,

	/// Only restore; never prompt for a new connection
	#[arg(long)]
	pub no_connect: bool,

	/// Use this token instead of a generated one
	#[arg(long, value_name = "TOKEN")]
	pub token: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
	#[command(subcommand)]
	pub action: SessionAction,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
	/// Print the stored session, if still valid.
	Show,
	/// Remove the stored session.
	Clear,
}

/// Cargo-like help colours.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}
