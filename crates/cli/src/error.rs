use std::path::PathBuf;

use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("failed to read config {path}")]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config {path}")]
	ConfigParse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("could not determine a state directory; pass --state-dir")]
	NoStateDir,

	#[error("failed to bind to {addr}")]
	Bind {
		addr: String,
		#[source]
		source: std::io::Error,
	},

	#[error("server error")]
	Server(#[source] anyhow::Error),

	#[error(transparent)]
	Session(#[from] wallet::Error),
}

impl CliError {
	/// Converts this error to a [`CommandError`] for structured output.
	pub fn to_command_error(&self) -> CommandError {
		let (code, message, details) = match self {
			CliError::ConfigRead { path, source } => (
				ErrorCode::ConfigError,
				format!("Failed to read config {}: {source}", path.display()),
				Some(serde_json::json!({ "path": path })),
			),
			CliError::ConfigParse { path, source } => (
				ErrorCode::ConfigError,
				format!("Invalid config {}: {source}", path.display()),
				Some(serde_json::json!({ "path": path })),
			),
			CliError::NoStateDir => (ErrorCode::InvalidInput, self.to_string(), None),
			CliError::Bind { addr, source } => (
				ErrorCode::ServerError,
				format!("Failed to bind to {addr}: {source}"),
				Some(serde_json::json!({ "addr": addr })),
			),
			CliError::Server(err) => (ErrorCode::ServerError, format!("{err:#}"), None),
			CliError::Session(err) => session_error(err),
		};

		CommandError { code, message, details }
	}
}

fn session_error(err: &wallet::Error) -> (ErrorCode, String, Option<serde_json::Value>) {
	match err {
		wallet::Error::Storage { key, source } => (
			ErrorCode::StorageError,
			format!("Session storage failed for {key}: {source}"),
			Some(serde_json::json!({ "key": key })),
		),
		wallet::Error::Timeout { ms, operation } => (
			ErrorCode::Timeout,
			format!("Timeout after {ms}ms waiting for: {operation}"),
			Some(serde_json::json!({ "timeout_ms": ms, "operation": operation })),
		),
		wallet::Error::Provider(inner) => {
			let details = inner.rpc_code().map(|code| serde_json::json!({ "rpcCode": code }));
			(ErrorCode::ProviderError, inner.to_string(), details)
		}
		other => (ErrorCode::InternalError, other.to_string(), None),
	}
}
