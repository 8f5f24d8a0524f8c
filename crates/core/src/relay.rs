//! Provider change notifications republished as [`WalletEvent`]s.

use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, trace, warn};
use wallet_protocol::{WalletEvent, WalletKind};
use wallet_runtime::NativeEvent;

use crate::events::RelayHandle;
use crate::quirks;
use crate::state::SessionState;

/// Translates one provider's native events and applies them to the session.
pub struct EventRelay {
	state: Arc<SessionState>,
	kind: WalletKind,
}

impl EventRelay {
	pub(crate) fn new(state: Arc<SessionState>, kind: WalletKind) -> Self {
		Self { state, kind }
	}

	/// Handles one native event, returning the application event it produced.
	///
	/// Store failures are logged and swallowed; a broken store must not stop
	/// the relay from handling later events.
	pub fn handle(&self, event: &NativeEvent) -> Option<WalletEvent> {
		let Some(change) = quirks::translate(self.kind, event) else {
			trace!(target = "wallet.relay", name = %event.name, "ignoring provider event");
			return None;
		};
		match self.state.apply(self.kind, change) {
			Ok(emitted) => {
				if let Some(emitted) = &emitted {
					debug!(target = "wallet.relay", event = emitted.name(), "relayed provider event");
				}
				emitted
			}
			Err(err) => {
				warn!(target = "wallet.relay", name = %event.name, error = %err, "failed to apply provider event");
				None
			}
		}
	}

	/// Runs the relay over `events` until the returned handle is dropped or
	/// the provider's event stream ends.
	pub fn spawn(self, mut events: broadcast::Receiver<NativeEvent>) -> RelayHandle {
		let (cancel_tx, mut cancel_rx) = oneshot::channel();

		tokio::spawn(async move {
			loop {
				tokio::select! {
					biased;
					_ = &mut cancel_rx => break,
					received = events.recv() => match received {
						Ok(event) => {
							self.handle(&event);
						}
						Err(broadcast::error::RecvError::Lagged(n)) => {
							warn!(target = "wallet.relay", dropped = n, "provider events lagged");
						}
						Err(broadcast::error::RecvError::Closed) => {
							debug!(target = "wallet.relay", "provider event stream closed");
							break;
						}
					},
				}
			}
		});

		RelayHandle::new(cancel_tx)
	}
}
