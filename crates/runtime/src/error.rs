//! Error types for the provider runtime.

use thiserror::Error;
use wallet_protocol::{RpcError, USER_REJECTED_CODE};

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to an injected provider.
#[derive(Debug, Error)]
pub enum Error {
	/// The provider threw, with its numeric code.
	#[error("provider error {code}: {message}")]
	Rpc { code: i64, message: String },

	/// The provider at `path` is no longer reachable (page closed, bridge dropped).
	#[error("provider gone: {0}")]
	ProviderGone(String),

	/// Bridge channel closed before a response arrived.
	#[error("bridge channel closed unexpectedly")]
	ChannelClosed,

	/// Malformed or unexpected bridge traffic.
	#[error("protocol error: {0}")]
	Protocol(String),

	/// The provider answered, but not with the shape the call expects.
	#[error("unexpected provider response to {method}: {detail}")]
	UnexpectedResponse { method: String, detail: String },

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Provider error code, when the provider reported one.
	pub fn rpc_code(&self) -> Option<i64> {
		match self {
			Error::Rpc { code, .. } => Some(*code),
			_ => None,
		}
	}

	/// Returns true if the user declined the request in the wallet UI.
	pub fn is_user_rejected(&self) -> bool {
		self.rpc_code() == Some(USER_REJECTED_CODE)
	}

	/// Returns true if the provider can no longer be reached at all.
	pub fn is_disconnected(&self) -> bool {
		matches!(self, Error::ProviderGone(_) | Error::ChannelClosed)
	}
}

impl From<RpcError> for Error {
	fn from(err: RpcError) -> Self {
		Error::Rpc {
			code: err.code,
			message: err.message,
		}
	}
}
