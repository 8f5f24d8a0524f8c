//! Per-wallet call conventions and event shapes.
//!
//! This is the one place that knows how each wallet family names its methods,
//! shapes its results, and emits change events. Everything else works with
//! [`WalletKind`] and [`ProviderEvent`].

use serde_json::{Value, json};
use wallet_protocol::{ChainId, ProviderFlags, WalletKind};
use wallet_runtime::{Error, NativeEvent, Result};

/// Provider change notification in a stable, wallet-independent shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
	AccountChanged(String),
	ChainChanged(ChainId),
	Disconnected,
}

/// Display name for an injected object, from its capability flags.
///
/// Brave and Coinbase also set `isMetaMask` for compatibility, so they are
/// checked first.
pub fn wallet_name(kind: WalletKind, flags: &ProviderFlags) -> &'static str {
	match kind {
		WalletKind::Ethereum if flags.is_brave_wallet => "Brave Wallet",
		WalletKind::Ethereum if flags.is_coinbase_wallet => "Coinbase Wallet",
		WalletKind::Ethereum if flags.is_phantom => "Phantom (Ethereum)",
		WalletKind::Ethereum if flags.is_meta_mask => "MetaMask",
		WalletKind::Ethereum => "Injected Ethereum",
		WalletKind::Solana if flags.is_phantom => "Phantom",
		WalletKind::Solana => "Injected Solana",
	}
}

/// Method and params requesting account access.
///
/// Silent Ethereum access reads `eth_accounts`, which never prompts and is
/// empty without a prior grant. Solana wallets take `onlyIfTrusted` instead.
pub(crate) fn access_call(kind: WalletKind, silent: bool) -> (&'static str, Value) {
	match (kind, silent) {
		(WalletKind::Ethereum, false) => ("eth_requestAccounts", Value::Null),
		(WalletKind::Ethereum, true) => ("eth_accounts", Value::Null),
		(WalletKind::Solana, silent) => ("connect", json!({ "onlyIfTrusted": silent })),
	}
}

/// Extracts the connected address from an access result; [`None`] when no
/// account was granted.
pub(crate) fn parse_access(kind: WalletKind, method: &str, result: &Value) -> Result<Option<String>> {
	let address = match kind {
		WalletKind::Ethereum => match result {
			Value::Array(accounts) => accounts.first().and_then(Value::as_str),
			_ => return Err(unexpected(method, result)),
		},
		WalletKind::Solana => match result.get("publicKey") {
			Some(Value::Null) | None => None,
			Some(Value::String(key)) => Some(key.as_str()),
			Some(_) => return Err(unexpected(method, result)),
		},
	};
	Ok(address.filter(|a| !a.is_empty()).map(String::from))
}

/// Method reporting the current chain, if the wallet family has one.
pub(crate) fn chain_call(kind: WalletKind) -> Option<&'static str> {
	match kind {
		WalletKind::Ethereum => Some("eth_chainId"),
		WalletKind::Solana => None,
	}
}

pub(crate) fn parse_chain(method: &str, result: &Value) -> Result<ChainId> {
	ChainId::from_value(result).ok_or_else(|| unexpected(method, result))
}

/// Method and params asking the wallet to sign `message` with `address`.
pub(crate) fn sign_call(kind: WalletKind, address: &str, message: &str) -> (&'static str, Value) {
	match kind {
		WalletKind::Ethereum => ("personal_sign", json!([hex_utf8(message), address])),
		WalletKind::Solana => ("signMessage", json!({ "message": message, "display": "utf8" })),
	}
}

pub(crate) fn parse_signature(kind: WalletKind, method: &str, result: &Value) -> Result<String> {
	let signature = match kind {
		WalletKind::Ethereum => result.as_str(),
		WalletKind::Solana => result.get("signature").and_then(Value::as_str),
	};
	signature.map(String::from).ok_or_else(|| unexpected(method, result))
}

/// Method and params switching the active chain, plus the id as the wallet
/// will report it back in `chainChanged`; [`None`] where unsupported.
pub(crate) fn switch_chain_call(kind: WalletKind, chain_id: &ChainId) -> Option<(&'static str, Value, ChainId)> {
	match kind {
		WalletKind::Ethereum => {
			let hex = match chain_id {
				ChainId::Number(n) => format!("0x{n:x}"),
				ChainId::Name(s) => s.clone(),
			};
			let params = json!([{ "chainId": hex }]);
			Some(("wallet_switchEthereumChain", params, ChainId::Name(hex)))
		}
		WalletKind::Solana => None,
	}
}

/// Method asking the wallet to drop its grant for this page, where one exists.
pub(crate) fn disconnect_call(kind: WalletKind) -> Option<&'static str> {
	match kind {
		WalletKind::Ethereum => None,
		WalletKind::Solana => Some("disconnect"),
	}
}

/// Translates a native event into a [`ProviderEvent`].
///
/// Ethereum `accountsChanged` with an empty list and Solana `accountChanged`
/// with `null` both mean the page lost access. Unknown events yield [`None`].
pub fn translate(kind: WalletKind, event: &NativeEvent) -> Option<ProviderEvent> {
	match (kind, event.name.as_str()) {
		(WalletKind::Ethereum, "accountsChanged") => match event.payload.as_array() {
			Some(accounts) => Some(match accounts.first().and_then(Value::as_str) {
				Some(address) if !address.is_empty() => ProviderEvent::AccountChanged(address.to_string()),
				_ => ProviderEvent::Disconnected,
			}),
			None => None,
		},
		(WalletKind::Ethereum, "chainChanged") => ChainId::from_value(&event.payload).map(ProviderEvent::ChainChanged),
		(WalletKind::Solana, "accountChanged") => match &event.payload {
			Value::String(key) if !key.is_empty() => Some(ProviderEvent::AccountChanged(key.clone())),
			Value::Null => Some(ProviderEvent::Disconnected),
			_ => None,
		},
		(_, "disconnect") => Some(ProviderEvent::Disconnected),
		_ => None,
	}
}

fn hex_utf8(message: &str) -> String {
	let mut out = String::with_capacity(2 + message.len() * 2);
	out.push_str("0x");
	for byte in message.bytes() {
		out.push_str(&format!("{byte:02x}"));
	}
	out
}

fn unexpected(method: &str, result: &Value) -> Error {
	Error::UnexpectedResponse {
		method: method.to_string(),
		detail: result.to_string(),
	}
}
