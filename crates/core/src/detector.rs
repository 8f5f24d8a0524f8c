//! Provider detection over the known injection points.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use wallet_protocol::WalletKind;
use wallet_runtime::{InjectionHost, Provider};

use crate::quirks::wallet_name;

/// Multi-wallet array some extensions populate when several are installed.
const ETHEREUM_PROVIDERS_ARRAY: &str = "ethereum.providers";
/// Upper bound on entries probed in [`ETHEREUM_PROVIDERS_ARRAY`].
const MAX_MULTI_PROVIDERS: usize = 16;

/// Single-object injection points, ethereum-style before solana-style.
const FIXED_POINTS: &[(&str, WalletKind)] = &[
	("ethereum", WalletKind::Ethereum),
	("coinbaseWalletExtension", WalletKind::Ethereum),
	("phantom.solana", WalletKind::Solana),
	("solana", WalletKind::Solana),
];

/// A detected provider: who it is, which family it belongs to, and the handle to call.
#[derive(Clone)]
pub struct ProviderDescriptor {
	pub name: String,
	pub kind: WalletKind,
	/// Injection path the provider was found at.
	pub path: String,
	pub handle: Arc<dyn Provider>,
}

impl std::fmt::Debug for ProviderDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProviderDescriptor")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.field("path", &self.path)
			.finish()
	}
}

/// Scans the known injection points of `host`.
///
/// Order is deterministic: entries of the multi-wallet array, then the fixed
/// points in [`FIXED_POINTS`] order. An object exposed at several paths is
/// listed once, at the first path it was seen. Absent globals are skipped.
pub fn detect(host: &dyn InjectionHost) -> Vec<ProviderDescriptor> {
	let mut seen = HashSet::new();
	let mut found = Vec::new();

	let multi = (0..MAX_MULTI_PROVIDERS)
		.map(|i| format!("{ETHEREUM_PROVIDERS_ARRAY}.{i}"))
		.map_while(|path| host.probe(&path).map(|injected| (path, WalletKind::Ethereum, injected)));
	let fixed = FIXED_POINTS
		.iter()
		.filter_map(|&(path, kind)| host.probe(path).map(|injected| (path.to_string(), kind, injected)));

	for (path, kind, injected) in multi.chain(fixed) {
		if !seen.insert(injected.object_id) {
			debug!(target = "wallet.detect", %path, object_id = injected.object_id, "skipping duplicate injection");
			continue;
		}
		let name = wallet_name(kind, &injected.flags).to_string();
		debug!(target = "wallet.detect", %path, %name, %kind, "provider detected");
		found.push(ProviderDescriptor {
			name,
			kind,
			path,
			handle: injected.handle,
		});
	}

	found
}

#[cfg(test)]
mod tests {
	use wallet_protocol::ProviderFlags;

	use super::*;
	use crate::testing::{MockHost, MockProvider};

	fn flags(f: impl FnOnce(&mut ProviderFlags)) -> ProviderFlags {
		let mut flags = ProviderFlags::default();
		f(&mut flags);
		flags
	}

	#[test]
	fn empty_host_yields_no_providers() {
		assert!(detect(&MockHost::new()).is_empty());
	}

	#[test]
	fn ethereum_listed_before_solana() {
		let host = MockHost::new()
			.with("solana", 2, flags(|f| f.is_phantom = true), MockProvider::new("solana"))
			.with("ethereum", 1, flags(|f| f.is_meta_mask = true), MockProvider::new("ethereum"));

		let found = detect(&host);
		let names: Vec<_> = found.iter().map(|d| (d.name.as_str(), d.kind)).collect();
		assert_eq!(names, vec![("MetaMask", WalletKind::Ethereum), ("Phantom", WalletKind::Solana)]);
	}

	#[test]
	fn multi_provider_array_is_expanded_and_deduplicated() {
		let host = MockHost::new()
			.with("ethereum.providers.0", 10, flags(|f| f.is_coinbase_wallet = true), MockProvider::new("cb"))
			.with("ethereum.providers.1", 11, flags(|f| f.is_meta_mask = true), MockProvider::new("mm"))
			// window.ethereum is the MetaMask entry again
			.with("ethereum", 11, flags(|f| f.is_meta_mask = true), MockProvider::new("mm"));

		let found = detect(&host);
		let paths: Vec<_> = found.iter().map(|d| d.path.as_str()).collect();
		assert_eq!(paths, vec!["ethereum.providers.0", "ethereum.providers.1"]);
		assert_eq!(found[0].name, "Coinbase Wallet");
		assert_eq!(found[1].name, "MetaMask");
	}

	#[test]
	fn phantom_at_two_paths_reported_once() {
		let phantom = flags(|f| f.is_phantom = true);
		let host = MockHost::new()
			.with("phantom.solana", 5, phantom.clone(), MockProvider::new("phantom.solana"))
			.with("solana", 5, phantom, MockProvider::new("phantom.solana"));

		let found = detect(&host);
		assert_eq!(found.len(), 1);
		assert_eq!(found[0].path, "phantom.solana");
	}
}
