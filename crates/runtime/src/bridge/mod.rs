//! Page-bridge connection.
//!
//! Implements request/response correlation on top of whatever socket carries
//! [`HostMessage`]s out and [`BridgeMessage`]s in:
//!
//! 1. Caller invokes [`BridgeConnection::send_request`] with path, method and params
//! 2. Connection assigns the next id and parks a oneshot sender under it
//! 3. The request is queued on the outbound channel for the socket writer
//! 4. The socket reader feeds incoming messages to [`BridgeConnection::dispatch`]
//! 5. Responses complete the parked sender; events fan out per injection path

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};
use wallet_protocol::{BridgeMessage, HostMessage, InjectedProvider};

use crate::error::{Error, Result};
use crate::host::{InjectionHost, Injected};
use crate::provider::{NativeEvent, Provider};

#[cfg(test)]
mod tests;

const EVENT_CAPACITY: usize = 64;

/// Pending request callbacks keyed by request id.
type CallbackMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;

/// RAII guard removing the parked callback when a request future is dropped early.
struct CancelGuard {
	id: u64,
	callbacks: CallbackMap,
	completed: bool,
}

impl Drop for CancelGuard {
	fn drop(&mut self) {
		if !self.completed && self.callbacks.lock().remove(&self.id).is_some() {
			debug!(target = "wallet.bridge", id = self.id, "removed orphaned callback");
		}
	}
}

/// Future returned by [`BridgeConnection::send_request`].
struct ResponseFuture {
	rx: oneshot::Receiver<Result<Value>>,
	guard: CancelGuard,
}

impl Future for ResponseFuture {
	type Output = Result<Value>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match Pin::new(&mut self.rx).poll(cx) {
			Poll::Ready(result) => {
				self.guard.completed = true;
				Poll::Ready(result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
			}
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Connection to one page bridge.
pub struct BridgeConnection {
	last_id: AtomicU64,
	callbacks: CallbackMap,
	outbound_tx: mpsc::UnboundedSender<HostMessage>,
	events: Mutex<HashMap<String, broadcast::Sender<NativeEvent>>>,
	closed: AtomicBool,
}

impl BridgeConnection {
	/// Creates a connection whose requests are queued on `outbound_tx`.
	pub fn new(outbound_tx: mpsc::UnboundedSender<HostMessage>) -> Self {
		Self {
			last_id: AtomicU64::new(1),
			callbacks: Arc::new(Mutex::new(HashMap::new())),
			outbound_tx,
			events: Mutex::new(HashMap::new()),
			closed: AtomicBool::new(false),
		}
	}

	/// Sends a request to the provider at `path` and awaits its response.
	pub async fn send_request(&self, path: &str, method: &str, params: Value) -> Result<Value> {
		if self.is_closed() {
			return Err(Error::ProviderGone(path.to_string()));
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		debug!(target = "wallet.bridge", id, path, method, "sending request");

		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);
		let guard = CancelGuard {
			id,
			callbacks: Arc::clone(&self.callbacks),
			completed: false,
		};

		let request = HostMessage::Request {
			id,
			path: path.to_string(),
			method: method.to_string(),
			params,
		};
		if self.outbound_tx.send(request).is_err() {
			warn!(target = "wallet.bridge", id, "outbound channel closed");
			return Err(Error::ChannelClosed);
		}

		ResponseFuture { rx, guard }.await
	}

	/// Routes one incoming message from the bridge.
	pub fn dispatch(&self, message: BridgeMessage) -> Result<()> {
		match message {
			BridgeMessage::Response { id, result, error } => {
				let callback = self
					.callbacks
					.lock()
					.remove(&id)
					.ok_or_else(|| Error::Protocol(format!("no pending request for response id={id}")))?;
				let outcome = match error {
					Some(err) => Err(Error::from(err)),
					None => Ok(result.unwrap_or(Value::Null)),
				};
				let _ = callback.send(outcome);
				Ok(())
			}
			BridgeMessage::Event { path, name, payload } => {
				debug!(target = "wallet.bridge", %path, %name, "provider event");
				if let Some(tx) = self.events.lock().get(&path) {
					let _ = tx.send(NativeEvent { name, payload });
				}
				Ok(())
			}
			BridgeMessage::Hello { .. } => Err(Error::Protocol("duplicate hello after handshake".into())),
		}
	}

	/// Subscribes to native events from the provider at `path`.
	pub fn subscribe(&self, path: &str) -> broadcast::Receiver<NativeEvent> {
		self.events
			.lock()
			.entry(path.to_string())
			.or_insert_with(|| broadcast::channel(EVENT_CAPACITY).0)
			.subscribe()
	}

	/// Marks the bridge gone and fails every pending request.
	///
	/// Dropping the per-path event senders closes all subscriber streams.
	pub fn close(&self) {
		if self.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		let pending: Vec<_> = self.callbacks.lock().drain().collect();
		debug!(target = "wallet.bridge", pending = pending.len(), "bridge closed");
		for (_, callback) in pending {
			let _ = callback.send(Err(Error::ChannelClosed));
		}
		self.events.lock().clear();
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Number of requests awaiting a response.
	pub fn pending_requests(&self) -> usize {
		self.callbacks.lock().len()
	}
}

/// [`Provider`] reached through a [`BridgeConnection`].
pub struct BridgeProvider {
	conn: Arc<BridgeConnection>,
	path: String,
}

impl BridgeProvider {
	pub fn new(conn: Arc<BridgeConnection>, path: impl Into<String>) -> Self {
		Self { conn, path: path.into() }
	}
}

#[async_trait]
impl Provider for BridgeProvider {
	fn path(&self) -> &str {
		&self.path
	}

	async fn request(&self, method: &str, params: Value) -> Result<Value> {
		self.conn.send_request(&self.path, method, params).await
	}

	fn events(&self) -> broadcast::Receiver<NativeEvent> {
		self.conn.subscribe(&self.path)
	}
}

/// [`InjectionHost`] built from the snapshot a bridge announced in its hello.
///
/// Objects exposed at several paths share one [`BridgeProvider`], so their
/// handles compare equal by pointer.
pub struct BridgeHost {
	entries: HashMap<String, Injected>,
}

impl BridgeHost {
	pub fn new(conn: Arc<BridgeConnection>, providers: Vec<InjectedProvider>) -> Self {
		let mut handles: HashMap<u32, Arc<dyn Provider>> = HashMap::new();
		let mut entries = HashMap::new();
		for injected in providers {
			let handle = handles
				.entry(injected.object_id)
				.or_insert_with(|| Arc::new(BridgeProvider::new(Arc::clone(&conn), injected.path.clone())))
				.clone();
			entries.insert(
				injected.path,
				Injected {
					object_id: injected.object_id,
					flags: injected.flags,
					handle,
				},
			);
		}
		Self { entries }
	}

	/// Announced injection paths, sorted.
	pub fn paths(&self) -> Vec<&str> {
		let mut paths: Vec<&str> = self.entries.keys().map(String::as_str).collect();
		paths.sort_unstable();
		paths
	}
}

impl InjectionHost for BridgeHost {
	fn probe(&self, path: &str) -> Option<Injected> {
		self.entries.get(path).cloned()
	}
}
