//! Silent reconnect of a stored session at startup.

use tracing::{debug, info};
use wallet_protocol::{ConnectionResult, ErrorKind, WalletSession};

use crate::connector::{ConnectOptions, Connector};
use crate::detector::ProviderDescriptor;
use crate::error::Result;
use crate::state::SessionState;

/// What a restore attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
	/// The stored session was confirmed by its provider and is active again.
	Restored(WalletSession),
	/// Nothing stored, or the stored record had expired.
	NoSession,
	/// The stored session could not be confirmed. On [`ErrorKind::StaleSession`]
	/// the record has been removed; otherwise it is kept for a later attempt.
	Failed(ErrorKind),
}

impl RestoreOutcome {
	pub fn session(&self) -> Option<&WalletSession> {
		match self {
			RestoreOutcome::Restored(session) => Some(session),
			_ => None,
		}
	}
}

pub struct Restorer<'a> {
	connector: &'a Connector,
	state: &'a SessionState,
}

impl<'a> Restorer<'a> {
	pub(crate) fn new(connector: &'a Connector, state: &'a SessionState) -> Self {
		Self { connector, state }
	}

	/// Loads the stored session and reconnects silently through the first
	/// descriptor of the recorded wallet kind.
	///
	/// Returns the outcome together with the descriptor used, so the caller
	/// can attach the event relay to it.
	pub async fn run<'d>(&self, descriptors: &'d [ProviderDescriptor]) -> Result<(RestoreOutcome, Option<&'d ProviderDescriptor>)> {
		let Some(stored) = self.state.store.load()? else {
			debug!(target = "wallet.restore", "no stored session");
			return Ok((RestoreOutcome::NoSession, None));
		};

		let descriptor = descriptors.iter().find(|d| d.kind == stored.wallet_kind);
		if descriptor.is_none() {
			debug!(target = "wallet.restore", kind = %stored.wallet_kind, "no provider of the recorded kind");
		}

		let result = self.connector.connect(descriptor, ConnectOptions::restoring(stored)).await;
		let outcome = match result {
			ConnectionResult::Connected { session } => {
				info!(target = "wallet.restore", address = %session.address, "session restored");
				RestoreOutcome::Restored(session)
			}
			ConnectionResult::AlreadyConnecting => RestoreOutcome::Failed(ErrorKind::AlreadyConnecting),
			ConnectionResult::Failed { kind, .. } => {
				if kind == ErrorKind::StaleSession {
					info!(target = "wallet.restore", "stored session belongs to another account; clearing");
					self.state.store.clear()?;
				} else {
					debug!(target = "wallet.restore", %kind, "restore failed; keeping stored session");
				}
				RestoreOutcome::Failed(kind)
			}
		};
		Ok((outcome, descriptor))
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use wallet_protocol::{ChainId, WalletKind};

	use super::*;
	use crate::testing::{MockProvider, Reply, descriptor, manager_at};

	fn seed(manager: &crate::SessionManager, address: &str) -> WalletSession {
		let session = manager.store().new_session(address.to_string(), ChainId::from("0x1"), WalletKind::Ethereum);
		manager.store().save(&session).unwrap();
		session
	}

	#[tokio::test]
	async fn test_nothing_stored_is_a_no_op() {
		let (manager, _) = manager_at(1_000);
		let provider = MockProvider::ethereum("0xABC", "0x1");
		let descriptors = vec![descriptor(&provider, WalletKind::Ethereum)];

		let (outcome, used) = manager.restorer().run(&descriptors).await.unwrap();

		assert_eq!(outcome, RestoreOutcome::NoSession);
		assert!(used.is_none());
		assert!(provider.calls().is_empty());
	}

	#[tokio::test]
	async fn test_matching_account_restores_without_sliding_window() {
		let (manager, clock) = manager_at(1_000);
		let stored = seed(&manager, "0xABC");
		clock.advance(std::time::Duration::from_secs(60));
		let provider = MockProvider::ethereum("0xABC", "0x89");
		let descriptors = vec![descriptor(&provider, WalletKind::Ethereum)];
		let mut events = manager.subscribe();

		let (outcome, used) = manager.restorer().run(&descriptors).await.unwrap();

		let restored = outcome.session().cloned().expect("restored");
		assert_eq!(restored.connected_at_ms, stored.connected_at_ms);
		assert_eq!(restored.expires_at_ms, stored.expires_at_ms);
		assert_eq!(restored.chain_id, ChainId::from("0x89"));
		assert!(used.is_some());
		assert_eq!(provider.call_count("eth_requestAccounts"), 0);
		assert_eq!(events.try_recv(), Some(wallet_protocol::WalletEvent::Connected(restored)));
	}

	#[tokio::test]
	async fn test_switched_account_clears_and_stays_quiet() {
		let (manager, _) = manager_at(1_000);
		seed(&manager, "0xABC");
		let provider = MockProvider::ethereum("0xDEF", "0x1");
		let descriptors = vec![descriptor(&provider, WalletKind::Ethereum)];
		let mut events = manager.subscribe();

		let (outcome, _) = manager.restorer().run(&descriptors).await.unwrap();

		assert_eq!(outcome, RestoreOutcome::Failed(ErrorKind::StaleSession));
		assert_eq!(manager.session().unwrap(), None);
		assert_eq!(events.try_recv(), None);
	}

	#[tokio::test]
	async fn test_locked_wallet_keeps_stored_session() {
		let (manager, _) = manager_at(1_000);
		let stored = seed(&manager, "0xABC");
		let provider = MockProvider::new("ethereum");
		provider.reply("eth_accounts", Reply::Ok(json!([])));
		let descriptors = vec![descriptor(&provider, WalletKind::Ethereum)];

		let (outcome, _) = manager.restorer().run(&descriptors).await.unwrap();

		assert_eq!(outcome, RestoreOutcome::Failed(ErrorKind::ProviderAbsent));
		assert_eq!(manager.session().unwrap(), Some(stored));
	}

	#[tokio::test]
	async fn test_only_providers_of_recorded_kind_are_used() {
		let (manager, _) = manager_at(1_000);
		seed(&manager, "0xABC");
		let phantom = MockProvider::solana("7xKX");
		let descriptors = vec![descriptor(&phantom, WalletKind::Solana)];

		let (outcome, used) = manager.restorer().run(&descriptors).await.unwrap();

		assert_eq!(outcome, RestoreOutcome::Failed(ErrorKind::ProviderAbsent));
		assert!(used.is_none());
		assert!(phantom.calls().is_empty());
	}

	#[tokio::test]
	async fn test_expired_session_is_not_restored() {
		let (manager, clock) = manager_at(1_000);
		let stored = seed(&manager, "0xABC");
		clock.set(stored.expires_at_ms);
		let provider = MockProvider::ethereum("0xABC", "0x1");
		let descriptors = vec![descriptor(&provider, WalletKind::Ethereum)];

		let (outcome, _) = manager.restorer().run(&descriptors).await.unwrap();

		assert_eq!(outcome, RestoreOutcome::NoSession);
		assert!(provider.calls().is_empty());
	}
}
