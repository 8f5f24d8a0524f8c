use std::path::PathBuf;

use clap::Parser;

use super::*;

#[test]
fn parse_listen_defaults() {
	let cli = Cli::try_parse_from(["wallet", "listen"]).unwrap();

	match cli.command {
		Commands::Listen(args) => {
			assert_eq!(args.host, None);
			assert_eq!(args.port, None);
			assert_eq!(args.wallet, None);
			assert!(!args.no_connect);
		}
		_ => panic!("Expected Listen command"),
	}
	assert_eq!(cli.format, OutputFormat::Text);
}

#[test]
fn parse_listen_options() {
	let args = ["wallet", "listen", "--host", "0.0.0.0", "-p", "9000", "-w", "phantom.solana", "--no-connect"];
	let cli = Cli::try_parse_from(args).unwrap();

	match cli.command {
		Commands::Listen(args) => {
			assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
			assert_eq!(args.port, Some(9000));
			assert_eq!(args.wallet.as_deref(), Some("phantom.solana"));
			assert!(args.no_connect);
		}
		_ => panic!("Expected Listen command"),
	}
}

#[test]
fn parse_session_actions() {
	let cli = Cli::try_parse_from(["wallet", "session", "show"]).unwrap();
	assert!(matches!(cli.command, Commands::Session(SessionArgs { action: SessionAction::Show })));

	let cli = Cli::try_parse_from(["wallet", "session", "clear"]).unwrap();
	assert!(matches!(cli.command, Commands::Session(SessionArgs { action: SessionAction::Clear })));
}

#[test]
fn global_flags_after_subcommand() {
	let cli = Cli::try_parse_from(["wallet", "session", "show", "-f", "json", "--state-dir", "/tmp/w"]).unwrap();
	assert_eq!(cli.format, OutputFormat::Json);
	assert_eq!(cli.state_dir, Some(PathBuf::from("/tmp/w")));
}

#[test]
fn verbose_flag_counts() {
	let cli = Cli::try_parse_from(["wallet", "-vv", "listen"]).unwrap();
	assert_eq!(cli.verbose, 2);

	let cli = Cli::try_parse_from(["wallet", "--verbose", "listen"]).unwrap();
	assert_eq!(cli.verbose, 1);
}

#[test]
fn invalid_port_is_rejected() {
	assert!(Cli::try_parse_from(["wallet", "listen", "--port", "99999"]).is_err());
}

#[test]
fn unknown_format_is_rejected() {
	assert!(Cli::try_parse_from(["wallet", "-f", "toon", "listen"]).is_err());
}
