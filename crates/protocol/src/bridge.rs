//! Protocol types for the in-page wallet bridge.
//!
//! The bridge runs inside the page that has the wallet extensions injected and
//! talks to the `wallet listen` host over a WebSocket:
//!
//! 1. Bridge connects and sends [`BridgeMessage::Hello`] with the token and
//!    the providers found at the known injection points
//! 2. Host responds with [`HostMessage::Welcome`] or [`HostMessage::Rejected`]
//! 3. Host sends [`HostMessage::Request`]s; bridge answers each with a
//!    [`BridgeMessage::Response`] carrying the same `id`
//! 4. Bridge forwards native provider events as [`BridgeMessage::Event`]

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent from the page bridge to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeMessage {
	/// Handshake with the one-time token and the injection snapshot.
	Hello {
		token: String,
		#[serde(default)]
		providers: Vec<InjectedProvider>,
	},
	/// Answer to a [`HostMessage::Request`].
	Response {
		id: u64,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		result: Option<Value>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<RpcError>,
	},
	/// Native event emitted by the provider at `path`.
	Event {
		path: String,
		name: String,
		#[serde(default)]
		payload: Value,
	},
}

/// Message sent from the host to the page bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
	Welcome { version: String },
	Rejected { reason: String },
	/// Call `method` on the provider at `path`.
	Request {
		id: u64,
		path: String,
		method: String,
		#[serde(default)]
		params: Value,
	},
}

/// Provider-reported error, as thrown by the injected object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
	#[serde(default)]
	pub code: i64,
	#[serde(default)]
	pub message: String,
}

/// One object found at a known injection point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectedProvider {
	/// Global property path, e.g. `ethereum`, `ethereum.providers.1`, `phantom.solana`.
	pub path: String,
	/// Identity of the underlying JS object; the same object seen at two
	/// paths carries the same id.
	pub object_id: u32,
	#[serde(default)]
	pub flags: ProviderFlags,
}

/// Capability flags the wallet extensions set on their injected objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFlags {
	#[serde(default, rename = "isMetaMask")]
	pub is_meta_mask: bool,
	#[serde(default)]
	pub is_coinbase_wallet: bool,
	#[serde(default)]
	pub is_phantom: bool,
	#[serde(default)]
	pub is_brave_wallet: bool,
}
