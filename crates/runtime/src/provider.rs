//! The [`Provider`] seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::Result;

/// Native event as emitted by the injected object, before any translation.
///
/// Payload shapes differ per wallet (`accountsChanged` carries an array,
/// Phantom's `accountChanged` a public key or `null`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeEvent {
	pub name: String,
	#[serde(default)]
	pub payload: Value,
}

impl NativeEvent {
	pub fn new(name: impl Into<String>, payload: Value) -> Self {
		Self {
			name: name.into(),
			payload,
		}
	}
}

/// One injected wallet object.
///
/// Method names are the provider's own (`eth_requestAccounts`, `connect`);
/// mapping session operations onto them is the caller's concern.
#[async_trait]
pub trait Provider: Send + Sync {
	/// Injection path the object was reached through.
	fn path(&self) -> &str;

	/// Calls `method` on the provider and returns its raw result.
	async fn request(&self, method: &str, params: Value) -> Result<Value>;

	/// Subscribes to native events emitted after this call.
	fn events(&self) -> broadcast::Receiver<NativeEvent>;
}
