//! Account access requests with a bounded wait and a re-entrancy guard.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};
use wallet_protocol::{ChainId, ConnectionResult, ErrorKind, WalletKind, WalletSession};

use crate::detector::ProviderDescriptor;
use crate::quirks;
use crate::state::SessionState;

/// How a connect attempt may interact with the user.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
	/// Must not prompt; fails with [`ErrorKind::ProviderAbsent`] without a prior grant.
	pub silent: bool,
	/// Stored session being restored. The provider must still report its address.
	pub restore: Option<WalletSession>,
}

impl ConnectOptions {
	pub fn interactive() -> Self {
		Self::default()
	}

	pub fn silent() -> Self {
		Self {
			silent: true,
			restore: None,
		}
	}

	pub fn restoring(session: WalletSession) -> Self {
		Self {
			silent: true,
			restore: Some(session),
		}
	}
}

/// Clears the in-flight flag when the attempt ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
	fn acquire(flag: &'a AtomicBool) -> Option<Self> {
		flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.ok()
			.map(|_| Self(flag))
	}
}

impl Drop for InFlightGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

type Failure = (ErrorKind, String);

/// Requests account access and records the resulting session.
pub struct Connector {
	state: Arc<SessionState>,
	in_flight: AtomicBool,
	timeout: Duration,
	solana_chain: ChainId,
}

impl Connector {
	pub(crate) fn new(state: Arc<SessionState>, timeout: Duration, solana_chain: ChainId) -> Self {
		Self {
			state,
			in_flight: AtomicBool::new(false),
			timeout,
			solana_chain,
		}
	}

	/// Returns true while an attempt is outstanding.
	pub fn is_connecting(&self) -> bool {
		self.in_flight.load(Ordering::Acquire)
	}

	/// Connects through `descriptor`.
	///
	/// Never fails with an error: every outcome, including a missing
	/// descriptor, a concurrent attempt, and a timeout, is a [`ConnectionResult`].
	/// On success the session is saved and `walletConnected` is emitted.
	pub async fn connect(&self, descriptor: Option<&ProviderDescriptor>, options: ConnectOptions) -> ConnectionResult {
		let Some(descriptor) = descriptor else {
			debug!(target = "wallet.connect", "no provider descriptor");
			return ConnectionResult::failed(ErrorKind::ProviderAbsent);
		};

		let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
			debug!(target = "wallet.connect", provider = %descriptor.name, "connect already in flight");
			return ConnectionResult::AlreadyConnecting;
		};

		debug!(
			target = "wallet.connect",
			provider = %descriptor.name,
			path = %descriptor.path,
			silent = options.silent,
			"requesting account access"
		);

		let attempt = self.request_access(descriptor, options.silent);
		let (address, chain_id) = match tokio::time::timeout(self.timeout, attempt).await {
			Ok(Ok(granted)) => granted,
			Ok(Err((kind, message))) => {
				debug!(target = "wallet.connect", provider = %descriptor.name, %kind, %message, "connect failed");
				return ConnectionResult::failed_with(kind, message);
			}
			Err(_) => {
				warn!(target = "wallet.connect", provider = %descriptor.name, timeout_ms = self.timeout.as_millis() as u64, "connect timed out");
				return ConnectionResult::failed_with(
					ErrorKind::Timeout,
					format!("{} did not respond within {}ms", descriptor.name, self.timeout.as_millis()),
				);
			}
		};

		let session = match options.restore {
			Some(stored) => {
				if !stored.same_address(&address) {
					info!(
						target = "wallet.connect",
						stored = %stored.address,
						current = %address,
						"provider account differs from stored session"
					);
					return ConnectionResult::failed_with(ErrorKind::StaleSession, format!("provider now reports {address}"));
				}
				WalletSession { chain_id, ..stored }
			}
			None => self.state.store.new_session(address, chain_id, descriptor.kind),
		};

		if let Err(err) = self.state.commit_connected(&session) {
			warn!(target = "wallet.connect", error = %err, "failed to persist session");
			return ConnectionResult::failed_with(ErrorKind::Unknown, err.to_string());
		}

		info!(target = "wallet.connect", provider = %descriptor.name, address = %session.address, "wallet connected");
		ConnectionResult::Connected { session }
	}

	async fn request_access(&self, descriptor: &ProviderDescriptor, silent: bool) -> Result<(String, ChainId), Failure> {
		let kind = descriptor.kind;
		let (method, params) = quirks::access_call(kind, silent);
		let result = descriptor
			.handle
			.request(method, params)
			.await
			.map_err(|err| classify(&err, silent))?;

		let address = quirks::parse_access(kind, method, &result).map_err(|err| classify(&err, silent))?;
		let Some(address) = address else {
			return Err((ErrorKind::ProviderAbsent, "no account has been granted to this page".to_string()));
		};

		let chain_id = match kind {
			WalletKind::Solana => self.solana_chain.clone(),
			WalletKind::Ethereum => {
				let Some(method) = quirks::chain_call(kind) else {
					return Err((ErrorKind::Unknown, format!("no chain query for {kind}")));
				};
				let result = descriptor
					.handle
					.request(method, serde_json::Value::Null)
					.await
					.map_err(|err| classify(&err, silent))?;
				quirks::parse_chain(method, &result).map_err(|err| classify(&err, silent))?
			}
		};

		Ok((address, chain_id))
	}
}

/// Maps a provider error onto the connect taxonomy.
///
/// In silent mode a rejection means the page was never trusted, which is
/// reported the same way as a missing provider.
fn classify(err: &wallet_runtime::Error, silent: bool) -> Failure {
	let kind = if err.is_disconnected() {
		ErrorKind::ProviderAbsent
	} else if err.is_user_rejected() {
		if silent { ErrorKind::ProviderAbsent } else { ErrorKind::UserRejected }
	} else {
		ErrorKind::Unknown
	};
	(kind, err.to_string())
}
