//! Session lifecycle settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use wallet_protocol::ChainId;

use crate::store::SESSION_KEY;

/// Default session lifetime: 24 hours.
pub const DEFAULT_SESSION_LIFETIME_SECS: u64 = 24 * 60 * 60;
/// Default bounded wait for a connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3_000;
/// Default bounded wait for signing and chain switching, which prompt the user.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;
/// Cluster recorded for Solana sessions; injected Solana wallets do not report one.
pub const DEFAULT_SOLANA_CLUSTER: &str = "mainnet-beta";

/// Settings for [`SessionManager`](crate::SessionManager).
///
/// Every field has a default, so partial JSON config files are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
	pub session_lifetime_secs: u64,
	pub connect_timeout_ms: u64,
	pub request_timeout_ms: u64,
	pub solana_cluster: String,
	/// Storage key the session record lives under.
	pub storage_key: String,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			session_lifetime_secs: DEFAULT_SESSION_LIFETIME_SECS,
			connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
			request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
			solana_cluster: DEFAULT_SOLANA_CLUSTER.to_string(),
			storage_key: SESSION_KEY.to_string(),
		}
	}
}

impl SessionConfig {
	pub fn session_lifetime(&self) -> Duration {
		Duration::from_secs(self.session_lifetime_secs)
	}

	pub fn connect_timeout(&self) -> Duration {
		Duration::from_millis(self.connect_timeout_ms)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	pub fn solana_chain(&self) -> ChainId {
		ChainId::Name(self.solana_cluster.clone())
	}
}
