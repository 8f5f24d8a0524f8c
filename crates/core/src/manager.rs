//! Session manager: the entry point application code holds.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};
use wallet_protocol::{ChainId, ConnectionResult, WalletEvent, WalletKind, WalletSession};
use wallet_runtime::InjectionHost;

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::connector::{ConnectOptions, Connector};
use crate::detector::{self, ProviderDescriptor};
use crate::error::{Error, Result};
use crate::events::{EventBus, EventStream, RelayHandle};
use crate::quirks::{self, ProviderEvent};
use crate::relay::EventRelay;
use crate::restorer::{RestoreOutcome, Restorer};
use crate::state::SessionState;
use crate::store::{SessionStorage, SessionStore};

/// Provider the current session was established through.
struct Active {
	descriptor: ProviderDescriptor,
	_relay: RelayHandle,
}

/// Owns the wallet session for one page.
///
/// Construct one per page and pass it by reference. Connect and restore
/// report provider failures as values; only storage faults are errors.
pub struct SessionManager {
	config: SessionConfig,
	state: Arc<SessionState>,
	connector: Connector,
	active: Mutex<Option<Active>>,
}

impl SessionManager {
	pub fn new(config: SessionConfig, storage: Arc<dyn SessionStorage>) -> Self {
		Self::with_clock(config, storage, Arc::new(SystemClock))
	}

	pub fn with_clock(config: SessionConfig, storage: Arc<dyn SessionStorage>, clock: Arc<dyn Clock>) -> Self {
		let store = SessionStore::new(storage, clock, config.storage_key.clone(), config.session_lifetime());
		let state = Arc::new(SessionState::new(store, EventBus::default()));
		let connector = Connector::new(Arc::clone(&state), config.connect_timeout(), config.solana_chain());
		Self {
			config,
			state,
			connector,
			active: Mutex::new(None),
		}
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	pub fn store(&self) -> &SessionStore {
		&self.state.store
	}

	pub fn connector(&self) -> &Connector {
		&self.connector
	}

	pub fn restorer(&self) -> Restorer<'_> {
		Restorer::new(&self.connector, &self.state)
	}

	/// Relay applying `kind` provider events to this manager's session.
	pub fn relay_for(&self, kind: WalletKind) -> EventRelay {
		EventRelay::new(Arc::clone(&self.state), kind)
	}

	pub fn detect(&self, host: &dyn InjectionHost) -> Vec<ProviderDescriptor> {
		detector::detect(host)
	}

	/// Interactive connect. The wallet may prompt the user.
	pub async fn connect(&self, descriptor: Option<&ProviderDescriptor>) -> ConnectionResult {
		self.connect_with(descriptor, ConnectOptions::interactive()).await
	}

	/// Connect that never prompts; fails with `ProviderAbsent` without a prior grant.
	pub async fn connect_silent(&self, descriptor: Option<&ProviderDescriptor>) -> ConnectionResult {
		self.connect_with(descriptor, ConnectOptions::silent()).await
	}

	async fn connect_with(&self, descriptor: Option<&ProviderDescriptor>, options: ConnectOptions) -> ConnectionResult {
		let result = self.connector.connect(descriptor, options).await;
		if let (true, Some(descriptor)) = (result.is_success(), descriptor) {
			self.attach(descriptor.clone());
		}
		result
	}

	/// Detects providers on `host` and silently restores the stored session.
	pub async fn restore(&self, host: &dyn InjectionHost) -> Result<RestoreOutcome> {
		let descriptors = self.detect(host);
		let (outcome, used) = self.restorer().run(&descriptors).await?;
		if let (RestoreOutcome::Restored(_), Some(descriptor)) = (&outcome, used) {
			self.attach(descriptor.clone());
		}
		Ok(outcome)
	}

	/// Starts relaying `descriptor`'s events, replacing any previous relay.
	fn attach(&self, descriptor: ProviderDescriptor) {
		let relay = self.relay_for(descriptor.kind).spawn(descriptor.handle.events());
		debug!(target = "wallet.session", provider = %descriptor.name, "event relay attached");
		*self.active.lock() = Some(Active {
			descriptor,
			_relay: relay,
		});
	}

	/// Ends the session: stops the relay, asks the wallet to drop its grant
	/// where it supports that, clears the store and emits `walletDisconnected`.
	///
	/// Returns whether a session existed.
	pub async fn disconnect(&self) -> Result<bool> {
		let active = self.active.lock().take();
		if let Some(Active { descriptor, _relay: relay }) = active {
			relay.stop();
			if let Some(method) = quirks::disconnect_call(descriptor.kind) {
				let call = descriptor.handle.request(method, Value::Null);
				match tokio::time::timeout(self.config.connect_timeout(), call).await {
					Ok(Ok(_)) => {}
					Ok(Err(err)) => warn!(target = "wallet.session", error = %err, "provider disconnect failed"),
					Err(_) => warn!(target = "wallet.session", "provider disconnect timed out"),
				}
			}
		}

		let existed = self.state.end_session()?;
		if existed {
			info!(target = "wallet.session", "wallet disconnected");
		}
		Ok(existed)
	}

	/// Current valid session, if any.
	pub fn session(&self) -> Result<Option<WalletSession>> {
		self.state.store.load()
	}

	/// Descriptor of the provider the current session runs through.
	pub fn active_provider(&self) -> Option<ProviderDescriptor> {
		self.active.lock().as_ref().map(|active| active.descriptor.clone())
	}

	pub fn subscribe(&self) -> EventStream<WalletEvent> {
		self.state.bus.subscribe()
	}

	/// Waits up to `timeout` for the first event matching `predicate`.
	pub async fn wait_for_event<F>(&self, predicate: F, timeout: Duration) -> Result<WalletEvent>
	where
		F: Fn(&WalletEvent) -> bool + Send + Sync + 'static,
	{
		self.state.bus.wait_for(predicate, timeout).await
	}

	/// Asks the wallet to sign `message` with the session account.
	pub async fn sign_message(&self, message: &str) -> Result<String> {
		let (session, descriptor) = self.require_session()?;
		let (method, params) = quirks::sign_call(session.wallet_kind, &session.address, message);
		let result = self.request(&descriptor, method, params).await?;
		Ok(quirks::parse_signature(session.wallet_kind, method, &result)?)
	}

	/// Asks the wallet to switch to `chain_id` and records it on success.
	pub async fn switch_chain(&self, chain_id: ChainId) -> Result<WalletSession> {
		let (session, descriptor) = self.require_session()?;
		let Some((method, params, reported)) = quirks::switch_chain_call(session.wallet_kind, &chain_id) else {
			return Err(Error::Unsupported {
				kind: session.wallet_kind,
				operation: "chain switching",
			});
		};
		self.request(&descriptor, method, params).await?;

		// recorded in the wallet's own encoding so its chainChanged is a no-op
		self.state.apply(session.wallet_kind, ProviderEvent::ChainChanged(reported))?;
		self.state.store.load()?.ok_or(Error::NoSession)
	}

	fn require_session(&self) -> Result<(WalletSession, ProviderDescriptor)> {
		let session = self.state.store.load()?.ok_or(Error::NoSession)?;
		let descriptor = self
			.active_provider()
			.filter(|d| d.kind == session.wallet_kind)
			.ok_or(Error::NoSession)?;
		Ok((session, descriptor))
	}

	async fn request(&self, descriptor: &ProviderDescriptor, method: &str, params: Value) -> Result<Value> {
		let timeout = self.config.request_timeout();
		match tokio::time::timeout(timeout, descriptor.handle.request(method, params)).await {
			Ok(result) => Ok(result?),
			Err(_) => Err(Error::Timeout {
				ms: timeout.as_millis() as u64,
				operation: method.to_string(),
			}),
		}
	}
}

impl std::fmt::Debug for SessionManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionManager")
			.field("config", &self.config)
			.field("store", &self.state.store)
			.field("active", &self.active.lock().as_ref().map(|a| a.descriptor.name.clone()))
			.finish()
	}
}
