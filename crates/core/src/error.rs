//! Error types for the session library.
//!
//! Provider failures during connect and restore are not errors here: they
//! come back as [`ConnectionResult`](wallet_protocol::ConnectionResult) values.
//! This type covers storage faults and the post-connect operations.

use thiserror::Error;
use wallet_protocol::WalletKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("session storage failed for key {key}")]
	Storage {
		key: String,
		#[source]
		source: std::io::Error,
	},

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error("no active wallet session")]
	NoSession,

	#[error("timeout after {ms}ms waiting for: {operation}")]
	Timeout { ms: u64, operation: String },

	#[error("{operation} is not supported by {kind} wallets")]
	Unsupported { kind: WalletKind, operation: &'static str },

	#[error("event stream closed")]
	EventsClosed,

	#[error(transparent)]
	Provider(#[from] wallet_runtime::Error),
}

impl Error {
	/// Returns true if the user declined the request in the wallet UI.
	pub fn is_user_rejected(&self) -> bool {
		matches!(self, Error::Provider(err) if err.is_user_rejected())
	}

	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout { .. })
	}
}
