//! Persistent session record with expiry enforced on read.
//!
//! The store holds at most one [`WalletSession`] under a single well-known key.
//! There is no background expiry timer: [`SessionStore::load`] checks the
//! clock and removes a record that has run out.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wallet_protocol::{ChainId, WalletKind, WalletSession};

use crate::clock::Clock;
use crate::error::Result;

pub mod storage;

#[cfg(test)]
mod tests;

pub use storage::{FileStorage, MemoryStorage, SessionStorage};

/// Well-known storage key for the session record.
pub const SESSION_KEY: &str = "wallet.session";
/// Current on-disk schema version for session records.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
	schema_version: u32,
	#[serde(flatten)]
	session: WalletSession,
}

/// Owner of the persisted [`WalletSession`].
pub struct SessionStore {
	storage: Arc<dyn SessionStorage>,
	clock: Arc<dyn Clock>,
	key: String,
	lifetime: Duration,
}

impl SessionStore {
	pub fn new(storage: Arc<dyn SessionStorage>, clock: Arc<dyn Clock>, key: impl Into<String>, lifetime: Duration) -> Self {
		Self {
			storage,
			clock,
			key: key.into(),
			lifetime,
		}
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn lifetime(&self) -> Duration {
		self.lifetime
	}

	pub fn now_ms(&self) -> u64 {
		self.clock.now_ms()
	}

	/// Builds a fresh session starting now and lasting the configured lifetime.
	pub fn new_session(&self, address: impl Into<String>, chain_id: ChainId, wallet_kind: WalletKind) -> WalletSession {
		let lifetime_ms = u64::try_from(self.lifetime.as_millis()).unwrap_or(u64::MAX);
		WalletSession::new(address, chain_id, wallet_kind, self.now_ms(), lifetime_ms)
	}

	/// Persists `session`, replacing any prior record.
	pub fn save(&self, session: &WalletSession) -> Result<()> {
		let record = StoredSession {
			schema_version: SESSION_SCHEMA_VERSION,
			session: session.clone(),
		};
		self.storage.set(&self.key, &serde_json::to_string(&record)?)?;
		debug!(target = "wallet.store", address = %session.address, expires_at_ms = session.expires_at_ms, "session saved");
		Ok(())
	}

	/// Returns the stored session if present and unexpired.
	///
	/// Expired, unreadable, and wrong-schema records are removed.
	pub fn load(&self) -> Result<Option<WalletSession>> {
		let Some(content) = self.storage.get(&self.key)? else {
			return Ok(None);
		};

		let value: serde_json::Value = match serde_json::from_str(&content) {
			Ok(v) => v,
			Err(err) => {
				warn!(target = "wallet.store", error = %err, "discarding unreadable session record");
				self.storage.remove(&self.key)?;
				return Ok(None);
			}
		};

		let schema_version = value.get("schemaVersion").and_then(|v| v.as_u64()).unwrap_or(0);
		if schema_version != SESSION_SCHEMA_VERSION as u64 {
			debug!(target = "wallet.store", schema_version, "discarding session record with unsupported schema");
			self.storage.remove(&self.key)?;
			return Ok(None);
		}

		let session = match serde_json::from_value::<StoredSession>(value) {
			Ok(record) if record.session.expires_at_ms > record.session.connected_at_ms => record.session,
			Ok(_) => {
				warn!(target = "wallet.store", "discarding session record with expiry before connect time");
				self.storage.remove(&self.key)?;
				return Ok(None);
			}
			Err(err) => {
				warn!(target = "wallet.store", error = %err, "discarding malformed session record");
				self.storage.remove(&self.key)?;
				return Ok(None);
			}
		};

		if !session.is_valid_at(self.now_ms()) {
			debug!(target = "wallet.store", address = %session.address, "session expired");
			self.storage.remove(&self.key)?;
			return Ok(None);
		}

		Ok(Some(session))
	}

	/// Removes the stored session, if any.
	pub fn clear(&self) -> Result<()> {
		self.storage.remove(&self.key)
	}

	/// Rewrites the address of the current session.
	///
	/// Returns the updated session, or [`None`] when there is no valid session.
	pub fn update_address(&self, address: &str) -> Result<Option<WalletSession>> {
		self.update(|session| session.address = address.to_string())
	}

	/// Rewrites the chain id of the current session.
	pub fn update_chain(&self, chain_id: ChainId) -> Result<Option<WalletSession>> {
		self.update(|session| session.chain_id = chain_id)
	}

	fn update(&self, apply: impl FnOnce(&mut WalletSession)) -> Result<Option<WalletSession>> {
		let Some(mut session) = self.load()? else {
			return Ok(None);
		};
		apply(&mut session);
		self.save(&session)?;
		Ok(Some(session))
	}
}

impl std::fmt::Debug for SessionStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionStore")
			.field("key", &self.key)
			.field("lifetime", &self.lifetime)
			.finish()
	}
}
