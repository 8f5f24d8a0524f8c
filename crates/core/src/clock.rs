//! Wall-clock source for session timestamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Millisecond wall clock.
pub trait Clock: Send + Sync {
	/// Current Unix time in milliseconds.
	fn now_ms(&self) -> u64;
}

/// [`Clock`] backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now_ms(&self) -> u64 {
		SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
	}
}

/// Manually driven [`Clock`] for embedding tests and replay.
#[derive(Debug, Default)]
pub struct ManualClock {
	now_ms: AtomicU64,
}

impl ManualClock {
	pub fn new(now_ms: u64) -> Self {
		Self {
			now_ms: AtomicU64::new(now_ms),
		}
	}

	pub fn set(&self, now_ms: u64) {
		self.now_ms.store(now_ms, Ordering::SeqCst);
	}

	pub fn advance(&self, by: Duration) {
		self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
	}
}

impl Clock for ManualClock {
	fn now_ms(&self) -> u64 {
		self.now_ms.load(Ordering::SeqCst)
	}
}
