//! Application-level wallet notifications.

use serde::{Deserialize, Serialize};

use crate::session::WalletSession;

/// Event republished to application code, independent of provider payload shapes.
///
/// Serialized names match the page-level custom events (`walletConnected`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "session")]
pub enum WalletEvent {
	#[serde(rename = "walletConnected")]
	Connected(WalletSession),
	#[serde(rename = "walletDisconnected")]
	Disconnected,
	#[serde(rename = "walletAccountChanged")]
	AccountChanged(WalletSession),
	#[serde(rename = "walletChainChanged")]
	ChainChanged(WalletSession),
}

impl WalletEvent {
	/// Event name as exposed to page scripts.
	pub fn name(&self) -> &'static str {
		match self {
			WalletEvent::Connected(_) => "walletConnected",
			WalletEvent::Disconnected => "walletDisconnected",
			WalletEvent::AccountChanged(_) => "walletAccountChanged",
			WalletEvent::ChainChanged(_) => "walletChainChanged",
		}
	}

	pub fn session(&self) -> Option<&WalletSession> {
		match self {
			WalletEvent::Connected(s) | WalletEvent::AccountChanged(s) | WalletEvent::ChainChanged(s) => Some(s),
			WalletEvent::Disconnected => None,
		}
	}
}
