//! Application event bus.
//!
//! - [`EventBus`] - broadcast channel plus predicate waiters
//! - [`EventStream`] - receiver wrapper that logs and skips lag
//! - [`RelayHandle`] - RAII handle that stops a background relay task
//!
//! Waiters are completed before the broadcast so `wait_for` callers never miss
//! an event because a slow stream subscriber lagged.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};

use crate::error::{Error, Result};

/// Default broadcast capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

struct WaiterEntry<E> {
	predicate: Box<dyn Fn(&E) -> bool + Send + Sync>,
	complete_tx: oneshot::Sender<E>,
}

/// Typed publish/subscribe channel.
pub struct EventBus<E: Clone + Send + 'static> {
	tx: broadcast::Sender<E>,
	waiters: Mutex<Vec<WaiterEntry<E>>>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity);
		Self {
			tx,
			waiters: Mutex::new(Vec::new()),
		}
	}

	/// Delivers `event` to matching waiters, then to every stream subscriber.
	pub fn emit(&self, event: E) {
		{
			let mut waiters = self.waiters.lock();
			waiters.retain(|w| !w.complete_tx.is_closed());
			let mut i = 0;
			while i < waiters.len() {
				if (waiters[i].predicate)(&event) {
					let entry = waiters.swap_remove(i);
					let _ = entry.complete_tx.send(event.clone());
				} else {
					i += 1;
				}
			}
		}
		let _ = self.tx.send(event);
	}

	/// Subscribes to events emitted after this call.
	pub fn subscribe(&self) -> EventStream<E> {
		EventStream::new(self.tx.subscribe())
	}

	/// Registers a one-shot waiter for the first event matching `predicate`.
	pub fn register_waiter<F>(&self, predicate: F) -> oneshot::Receiver<E>
	where
		F: Fn(&E) -> bool + Send + Sync + 'static,
	{
		let (complete_tx, complete_rx) = oneshot::channel();
		let mut waiters = self.waiters.lock();
		// drop waiters whose caller gave up
		waiters.retain(|w| !w.complete_tx.is_closed());
		waiters.push(WaiterEntry {
			predicate: Box::new(predicate),
			complete_tx,
		});
		complete_rx
	}

	/// Waits up to `timeout` for the first event matching `predicate`.
	pub async fn wait_for<F>(&self, predicate: F, timeout: Duration) -> Result<E>
	where
		F: Fn(&E) -> bool + Send + Sync + 'static,
	{
		let rx = self.register_waiter(predicate);
		let outcome = tokio::time::timeout(timeout, rx).await;
		match outcome {
			Ok(Ok(event)) => Ok(event),
			Ok(Err(_)) => Err(Error::EventsClosed),
			Err(_) => {
				// the receiver is gone, so the entry is closed
				self.waiters.lock().retain(|w| !w.complete_tx.is_closed());
				Err(Error::Timeout {
					ms: timeout.as_millis() as u64,
					operation: "wallet event".to_string(),
				})
			}
		}
	}

	/// Number of registered waiters still pending.
	pub fn waiter_count(&self) -> usize {
		self.waiters.lock().len()
	}
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
	fn default() -> Self {
		Self::new(DEFAULT_EVENT_CAPACITY)
	}
}

/// [`broadcast::Receiver`] wrapper that logs [`RecvError::Lagged`] and keeps going.
///
/// [`RecvError::Lagged`]: broadcast::error::RecvError::Lagged
pub struct EventStream<E: Clone> {
	rx: broadcast::Receiver<E>,
}

impl<E: Clone> EventStream<E> {
	pub fn new(rx: broadcast::Receiver<E>) -> Self {
		Self { rx }
	}

	/// Next event, or [`None`] once the bus is gone.
	pub async fn recv(&mut self) -> Option<E> {
		loop {
			match self.rx.recv().await {
				Ok(event) => return Some(event),
				Err(broadcast::error::RecvError::Lagged(n)) => {
					tracing::warn!(target = "wallet.events", dropped = n, "event stream lagged");
				}
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}

	/// Next already-queued event without waiting.
	pub fn try_recv(&mut self) -> Option<E> {
		loop {
			match self.rx.try_recv() {
				Ok(event) => return Some(event),
				Err(broadcast::error::TryRecvError::Lagged(n)) => {
					tracing::warn!(target = "wallet.events", dropped = n, "event stream lagged");
				}
				Err(_) => return None,
			}
		}
	}
}

/// RAII handle that stops a relay task when dropped.
pub struct RelayHandle {
	cancel_tx: Option<oneshot::Sender<()>>,
}

impl RelayHandle {
	pub(crate) fn new(cancel_tx: oneshot::Sender<()>) -> Self {
		Self {
			cancel_tx: Some(cancel_tx),
		}
	}

	/// Stops the relay, equivalent to dropping the handle.
	pub fn stop(mut self) {
		if let Some(tx) = self.cancel_tx.take() {
			let _ = tx.send(());
		}
	}
}

impl Drop for RelayHandle {
	fn drop(&mut self) {
		if let Some(tx) = self.cancel_tx.take() {
			let _ = tx.send(());
		}
	}
}

impl std::fmt::Debug for RelayHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RelayHandle").field("active", &self.cancel_tx.is_some()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_subscribers_receive_in_emit_order() {
		let bus: EventBus<u32> = EventBus::new(8);
		let mut stream = bus.subscribe();
		bus.emit(1);
		bus.emit(2);
		assert_eq!(stream.recv().await, Some(1));
		assert_eq!(stream.recv().await, Some(2));
		assert_eq!(stream.try_recv(), None);
	}

	#[tokio::test]
	async fn test_waiter_receives_first_match_only() {
		let bus: EventBus<u32> = EventBus::new(8);
		let rx = bus.register_waiter(|n| *n > 5);
		bus.emit(3);
		bus.emit(7);
		bus.emit(9);
		assert_eq!(rx.await.unwrap(), 7);
	}

	#[tokio::test(start_paused = true)]
	async fn test_wait_for_times_out() {
		let bus: EventBus<u32> = EventBus::new(8);
		let err = bus.wait_for(|_| true, Duration::from_millis(50)).await.unwrap_err();
		assert!(err.is_timeout());
	}

	#[tokio::test(start_paused = true)]
	async fn test_timed_out_waiters_are_released() {
		let bus: EventBus<u32> = EventBus::new(8);
		for _ in 0..100 {
			assert!(bus.wait_for(|n| *n == 42, Duration::from_millis(1)).await.is_err());
		}
		assert_eq!(bus.waiter_count(), 0);

		let rx = bus.register_waiter(|n| *n == 1);
		drop(rx);
		bus.emit(2);
		assert_eq!(bus.waiter_count(), 0);
	}

	#[tokio::test]
	async fn test_lagged_stream_skips_ahead() {
		let bus: EventBus<u32> = EventBus::new(2);
		let mut stream = bus.subscribe();
		for n in 0..5 {
			bus.emit(n);
		}
		assert_eq!(stream.recv().await, Some(3));
		assert_eq!(stream.recv().await, Some(4));
	}
}
