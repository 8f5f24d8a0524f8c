//! Structured output for the `wallet` binary.
//!
//! One-shot commands print a result envelope on stdout:
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "ok": true,
//!   "command": "session show",
//!   "data": { ... }
//! }
//! ```
//!
//! `listen` streams one [`EventLine`] per wallet event instead: pretty JSON in
//! `json`, one object per line in `ndjson`, a coloured line in `text`.


use std::io::{self, Write};

use colored::Colorize;
use serde::{Deserialize, Serialize};
use wallet::{ConnectionResult, RestoreOutcome, WalletEvent, WalletSession};

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON output
	Json,
	/// Newline-delimited JSON (streaming)
	Ndjson,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
		}
	}
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Config file missing or malformed
	ConfigError,
	/// Session record could not be read or written
	StorageError,
	/// Listener could not bind or the server failed
	ServerError,
	/// The wallet refused or failed a request
	ProviderError,
	Timeout,
	InvalidInput,
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let code = match self {
			ErrorCode::ConfigError => "CONFIG_ERROR",
			ErrorCode::StorageError => "STORAGE_ERROR",
			ErrorCode::ServerError => "SERVER_ERROR",
			ErrorCode::ProviderError => "PROVIDER_ERROR",
			ErrorCode::Timeout => "TIMEOUT",
			ErrorCode::InvalidInput => "INVALID_INPUT",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		};
		f.write_str(code)
	}
}

pub struct ResultBuilder<T: Serialize> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error_with_details(code, message, None)
	}

	pub fn error_with_details(mut self, code: ErrorCode, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
		self.error = Some(CommandError {
			code,
			message: message.into(),
			details,
		});
		self
	}

	pub fn build(self) -> CommandResult<T> {
		CommandResult {
			schema_version: Some(SCHEMA_VERSION),
			ok: self.error.is_none(),
			command: self.command,
			data: self.data,
			error: self.error,
		}
	}
}

pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result),
	}
}

fn print_result_text<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();
	if result.ok {
		if let Some(ref data) = result.data {
			if let Ok(json) = serde_json::to_string_pretty(data) {
				let _ = writeln!(stdout, "{json}");
			}
		}
	} else if let Some(ref error) = result.error {
		let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
	}
}

pub fn print_error_stderr(error: &CommandError) {
	eprintln!("{} [{}]: {}", "Error".red().bold(), error.code, error.message);
}

/// Payload of `session show`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
	pub storage_key: String,
	pub session: Option<WalletSession>,
}

/// Payload of `session clear`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearData {
	pub cleared: bool,
}

/// One line of `listen` output.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventLine {
	/// A page bridge completed the handshake.
	Bridge { providers: Vec<String> },
	Restore {
		#[serde(flatten)]
		outcome: RestoreLine,
	},
	Connect { result: ConnectionResult },
	Wallet { event: WalletEvent },
	/// The page bridge went away.
	BridgeClosed,
}

/// Serializable view of [`RestoreOutcome`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RestoreLine {
	Restored { session: WalletSession },
	NoSession,
	Failed {
		#[serde(rename = "errorKind")]
		error_kind: wallet::ErrorKind,
	},
}

impl From<&RestoreOutcome> for RestoreLine {
	fn from(outcome: &RestoreOutcome) -> Self {
		match outcome {
			RestoreOutcome::Restored(session) => RestoreLine::Restored { session: session.clone() },
			RestoreOutcome::NoSession => RestoreLine::NoSession,
			RestoreOutcome::Failed(kind) => RestoreLine::Failed { error_kind: *kind },
		}
	}
}

pub fn print_event(line: &EventLine, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(line) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(line) {
				println!("{json}");
			}
		}
		OutputFormat::Text => println!("{}", event_text(line)),
	}
}

/// Human-readable rendering of an [`EventLine`].
pub fn event_text(line: &EventLine) -> String {
	match line {
		EventLine::Bridge { providers } if providers.is_empty() => {
			format!("{} no wallet providers injected", "bridge".cyan())
		}
		EventLine::Bridge { providers } => format!("{} providers: {}", "bridge".cyan(), providers.join(", ")),
		EventLine::Restore { outcome } => match outcome {
			RestoreLine::Restored { session } => format!("{} {}", "restored".green(), describe(session)),
			RestoreLine::NoSession => format!("{} no stored session", "restore".dimmed()),
			RestoreLine::Failed { error_kind } => format!("{} {error_kind}", "restore failed".yellow()),
		},
		EventLine::Connect { result } => match result {
			ConnectionResult::Connected { session } => format!("{} {}", "connected".green(), describe(session)),
			ConnectionResult::AlreadyConnecting => format!("{} already connecting", "connect".yellow()),
			ConnectionResult::Failed { kind, message } => {
				let label = if kind.is_user_visible() { "connect failed".red() } else { "connect failed".yellow() };
				match message {
					Some(message) => format!("{label} {kind}: {message}"),
					None => format!("{label} {kind}"),
				}
			}
		},
		EventLine::Wallet { event } => match event.session() {
			Some(session) => format!("{} {}", event.name().bold(), describe(session)),
			None => event.name().bold().to_string(),
		},
		EventLine::BridgeClosed => format!("{} closed", "bridge".cyan()),
	}
}

fn describe(session: &WalletSession) -> String {
	format!("{} ({} on {})", session.address, session.wallet_kind, session.chain_id)
}
