//! Scripted provider and injection host for unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{Notify, broadcast};
use wallet_protocol::ProviderFlags;
use wallet_runtime::{Error, InjectionHost, Injected, NativeEvent, Provider, Result};

use crate::clock::ManualClock;
use crate::config::SessionConfig;
use crate::detector::ProviderDescriptor;
use crate::store::MemoryStorage;
use crate::{SessionManager, WalletKind};

/// Scripted reply for one method.
#[derive(Clone)]
pub(crate) enum Reply {
	Ok(Value),
	Err(i64, &'static str),
	/// Never answers.
	Hang,
	/// Answers once the gate is notified.
	Gated(Arc<Notify>, Value),
}

pub(crate) struct MockProvider {
	path: String,
	replies: Mutex<HashMap<String, Reply>>,
	calls: Mutex<Vec<(String, Value)>>,
	events: broadcast::Sender<NativeEvent>,
}

impl MockProvider {
	pub fn new(path: &str) -> Arc<Self> {
		Arc::new(Self {
			path: path.to_string(),
			replies: Mutex::new(HashMap::new()),
			calls: Mutex::new(Vec::new()),
			events: broadcast::channel(16).0,
		})
	}

	/// Ethereum wallet that has already granted `account` on `chain`.
	pub fn ethereum(account: &str, chain: &str) -> Arc<Self> {
		let provider = Self::new("ethereum");
		provider.reply("eth_requestAccounts", Reply::Ok(json!([account])));
		provider.reply("eth_accounts", Reply::Ok(json!([account])));
		provider.reply("eth_chainId", Reply::Ok(json!(chain)));
		provider
	}

	/// Solana wallet that has already trusted `key`.
	pub fn solana(key: &str) -> Arc<Self> {
		let provider = Self::new("solana");
		provider.reply("connect", Reply::Ok(json!({ "publicKey": key })));
		provider.reply("disconnect", Reply::Ok(Value::Null));
		provider
	}

	pub fn reply(&self, method: &str, reply: Reply) {
		self.replies.lock().insert(method.to_string(), reply);
	}

	pub fn calls(&self) -> Vec<(String, Value)> {
		self.calls.lock().clone()
	}

	pub fn call_count(&self, method: &str) -> usize {
		self.calls.lock().iter().filter(|(m, _)| m == method).count()
	}

	pub fn emit(&self, name: &str, payload: Value) {
		let _ = self.events.send(NativeEvent::new(name, payload));
	}
}

#[async_trait]
impl Provider for MockProvider {
	fn path(&self) -> &str {
		&self.path
	}

	async fn request(&self, method: &str, params: Value) -> Result<Value> {
		self.calls.lock().push((method.to_string(), params));
		let reply = self.replies.lock().get(method).cloned();
		match reply {
			Some(Reply::Ok(value)) => Ok(value),
			Some(Reply::Err(code, message)) => Err(Error::Rpc {
				code,
				message: message.to_string(),
			}),
			Some(Reply::Hang) => std::future::pending().await,
			Some(Reply::Gated(gate, value)) => {
				gate.notified().await;
				Ok(value)
			}
			None => Err(Error::Rpc {
				code: -32601,
				message: format!("method {method} not found"),
			}),
		}
	}

	fn events(&self) -> broadcast::Receiver<NativeEvent> {
		self.events.subscribe()
	}
}

#[derive(Default)]
pub(crate) struct MockHost {
	entries: HashMap<String, Injected>,
}

impl MockHost {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, path: &str, object_id: u32, flags: ProviderFlags, handle: Arc<MockProvider>) -> Self {
		self.entries.insert(
			path.to_string(),
			Injected {
				object_id,
				flags,
				handle,
			},
		);
		self
	}
}

impl InjectionHost for MockHost {
	fn probe(&self, path: &str) -> Option<Injected> {
		self.entries.get(path).cloned()
	}
}

pub(crate) fn descriptor(provider: &Arc<MockProvider>, kind: WalletKind) -> ProviderDescriptor {
	ProviderDescriptor {
		name: "Mock".to_string(),
		kind,
		path: provider.path().to_string(),
		handle: provider.clone(),
	}
}

/// Manager over in-memory storage with a manual clock at `now_ms`.
pub(crate) fn manager_at(now_ms: u64) -> (SessionManager, Arc<ManualClock>) {
	let clock = Arc::new(ManualClock::new(now_ms));
	let manager = SessionManager::with_clock(SessionConfig::default(), Arc::new(MemoryStorage::new()), clock.clone());
	(manager, clock)
}
