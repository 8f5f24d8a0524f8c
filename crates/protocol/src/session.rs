//! Session record and connect result types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Wallet family, selecting which injection points and call conventions apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
	Ethereum,
	Solana,
}

impl fmt::Display for WalletKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			WalletKind::Ethereum => write!(f, "ethereum"),
			WalletKind::Solana => write!(f, "solana"),
		}
	}
}

/// Chain identifier as reported by the provider.
///
/// Ethereum providers report hex strings (`"0x1"`), some report plain
/// integers, Solana wallets use cluster names (`"mainnet-beta"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainId {
	Number(u64),
	Name(String),
}

impl ChainId {
	/// Parses a chain id from a provider JSON value.
	pub fn from_value(value: &serde_json::Value) -> Option<Self> {
		match value {
			serde_json::Value::Number(n) => n.as_u64().map(ChainId::Number),
			serde_json::Value::String(s) if !s.is_empty() => Some(ChainId::Name(s.clone())),
			_ => None,
		}
	}

	/// Numeric value of a numeric, hex (`"0x89"`) or decimal-string id.
	pub fn as_number(&self) -> Option<u64> {
		match self {
			ChainId::Number(n) => Some(*n),
			ChainId::Name(s) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
				Some(hex) => u64::from_str_radix(hex, 16).ok(),
				None => s.parse().ok(),
			},
		}
	}

	/// Returns `true` when both ids name the same chain, whatever their encoding.
	pub fn same_chain(&self, other: &ChainId) -> bool {
		match (self.as_number(), other.as_number()) {
			(Some(a), Some(b)) => a == b,
			_ => self == other,
		}
	}
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChainId::Number(n) => write!(f, "{n}"),
			ChainId::Name(s) => f.write_str(s),
		}
	}
}

impl From<&str> for ChainId {
	fn from(s: &str) -> Self {
		ChainId::Name(s.to_string())
	}
}

impl From<u64> for ChainId {
	fn from(n: u64) -> Self {
		ChainId::Number(n)
	}
}

/// Locally persisted record of an active wallet connection.
///
/// Valid only while `now < expires_at_ms`; `expires_at_ms` is always
/// strictly greater than `connected_at_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
	pub address: String,
	pub chain_id: ChainId,
	pub wallet_kind: WalletKind,
	/// Unix epoch milliseconds.
	pub connected_at_ms: u64,
	/// Unix epoch milliseconds.
	pub expires_at_ms: u64,
}

impl WalletSession {
	/// Creates a session starting at `now_ms` and lasting `lifetime_ms`.
	///
	/// A zero lifetime is bumped to one millisecond so the expiry invariant holds.
	pub fn new(address: impl Into<String>, chain_id: ChainId, wallet_kind: WalletKind, now_ms: u64, lifetime_ms: u64) -> Self {
		Self {
			address: address.into(),
			chain_id,
			wallet_kind,
			connected_at_ms: now_ms,
			expires_at_ms: now_ms.saturating_add(lifetime_ms.max(1)),
		}
	}

	/// Returns `true` while `now_ms` is before the expiry.
	pub fn is_valid_at(&self, now_ms: u64) -> bool {
		now_ms < self.expires_at_ms
	}

	/// Returns `true` when the stored address refers to `other`.
	///
	/// Ethereum addresses compare case-insensitively (EIP-55 checksums only
	/// change letter case); Solana base58 keys compare exactly.
	pub fn same_address(&self, other: &str) -> bool {
		match self.wallet_kind {
			WalletKind::Ethereum => self.address.eq_ignore_ascii_case(other),
			WalletKind::Solana => self.address == other,
		}
	}
}

/// Failure taxonomy for connect and restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
	/// The user declined the request in the wallet UI.
	UserRejected,
	/// No matching provider, or (silent mode) no prior trust grant.
	ProviderAbsent,
	/// The provider did not answer within the bounded wait.
	Timeout,
	/// The provider's current account differs from the stored session.
	StaleSession,
	/// Another connect attempt is still in flight.
	AlreadyConnecting,
	/// Any other provider error.
	Unknown,
}

impl ErrorKind {
	/// Returns `true` when the UI should surface this failure to the user.
	///
	/// Rejections are the user's own choice; absent providers and stale
	/// sessions are normal during auto-restore.
	pub fn is_user_visible(self) -> bool {
		matches!(self, ErrorKind::Timeout | ErrorKind::Unknown)
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ErrorKind::UserRejected => "UserRejected",
			ErrorKind::ProviderAbsent => "ProviderAbsent",
			ErrorKind::Timeout => "Timeout",
			ErrorKind::StaleSession => "StaleSession",
			ErrorKind::AlreadyConnecting => "AlreadyConnecting",
			ErrorKind::Unknown => "Unknown",
		};
		f.write_str(s)
	}
}

/// Outcome of a connect attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectionResult {
	Connected {
		session: WalletSession,
	},
	Failed {
		#[serde(rename = "errorKind")]
		kind: ErrorKind,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		message: Option<String>,
	},
	AlreadyConnecting,
}

impl ConnectionResult {
	pub fn failed(kind: ErrorKind) -> Self {
		ConnectionResult::Failed { kind, message: None }
	}

	pub fn failed_with(kind: ErrorKind, message: impl Into<String>) -> Self {
		ConnectionResult::Failed {
			kind,
			message: Some(message.into()),
		}
	}

	pub fn is_success(&self) -> bool {
		matches!(self, ConnectionResult::Connected { .. })
	}

	/// Connected address, if any.
	pub fn address(&self) -> Option<&str> {
		match self {
			ConnectionResult::Connected { session } => Some(&session.address),
			_ => None,
		}
	}

	pub fn session(&self) -> Option<&WalletSession> {
		match self {
			ConnectionResult::Connected { session } => Some(session),
			_ => None,
		}
	}

	/// Error kind, with [`ErrorKind::AlreadyConnecting`] for the re-entrancy result.
	pub fn error_kind(&self) -> Option<ErrorKind> {
		match self {
			ConnectionResult::Connected { .. } => None,
			ConnectionResult::Failed { kind, .. } => Some(*kind),
			ConnectionResult::AlreadyConnecting => Some(ErrorKind::AlreadyConnecting),
		}
	}
}
