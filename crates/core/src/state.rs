//! Store and event bus behind one lock.
//!
//! Every mutation that is announced on the bus happens under `lock`, and the
//! store write completes before the emit, so a subscriber reacting to an event
//! always reads the store the event describes.

use parking_lot::Mutex;
use tracing::debug;
use wallet_protocol::{WalletEvent, WalletKind, WalletSession};

use crate::error::Result;
use crate::events::EventBus;
use crate::quirks::ProviderEvent;
use crate::store::SessionStore;

pub(crate) struct SessionState {
	pub(crate) store: SessionStore,
	pub(crate) bus: EventBus<WalletEvent>,
	lock: Mutex<()>,
}

impl SessionState {
	pub(crate) fn new(store: SessionStore, bus: EventBus<WalletEvent>) -> Self {
		Self {
			store,
			bus,
			lock: Mutex::new(()),
		}
	}

	/// Saves a newly connected (or restored) session and announces it.
	pub(crate) fn commit_connected(&self, session: &WalletSession) -> Result<()> {
		let _guard = self.lock.lock();
		self.store.save(session)?;
		self.bus.emit(WalletEvent::Connected(session.clone()));
		Ok(())
	}

	/// Clears the stored session; announces the disconnect if one existed.
	pub(crate) fn end_session(&self) -> Result<bool> {
		let _guard = self.lock.lock();
		let existed = self.store.load()?.is_some();
		self.store.clear()?;
		if existed {
			self.bus.emit(WalletEvent::Disconnected);
		}
		Ok(existed)
	}

	/// Applies a provider change to the stored session of family `kind`.
	///
	/// Returns the event emitted, if any. Events for another wallet family,
	/// events with no stored session, and no-op changes emit nothing.
	pub(crate) fn apply(&self, kind: WalletKind, event: ProviderEvent) -> Result<Option<WalletEvent>> {
		let _guard = self.lock.lock();
		let Some(current) = self.store.load()? else {
			debug!(target = "wallet.relay", ?event, "no stored session; ignoring provider event");
			return Ok(None);
		};
		if current.wallet_kind != kind {
			return Ok(None);
		}

		let emitted = match event {
			ProviderEvent::AccountChanged(address) => {
				if current.same_address(&address) {
					return Ok(None);
				}
				let Some(session) = self.store.update_address(&address)? else {
					return Ok(None);
				};
				WalletEvent::AccountChanged(session)
			}
			ProviderEvent::ChainChanged(chain_id) => {
				// 137 and "0x89" are the same chain
				if current.chain_id.same_chain(&chain_id) {
					return Ok(None);
				}
				let Some(session) = self.store.update_chain(chain_id)? else {
					return Ok(None);
				};
				WalletEvent::ChainChanged(session)
			}
			ProviderEvent::Disconnected => {
				self.store.clear()?;
				WalletEvent::Disconnected
			}
		};

		self.bus.emit(emitted.clone());
		Ok(Some(emitted))
	}
}
