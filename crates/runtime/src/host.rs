//! Read-only access to global injection points.

use std::sync::Arc;

use wallet_protocol::ProviderFlags;

use crate::provider::Provider;

/// Object found at an injection path.
#[derive(Clone)]
pub struct Injected {
	/// Identity of the underlying object, shared by every path that exposes it.
	pub object_id: u32,
	pub flags: ProviderFlags,
	pub handle: Arc<dyn Provider>,
}

impl std::fmt::Debug for Injected {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Injected")
			.field("object_id", &self.object_id)
			.field("flags", &self.flags)
			.field("path", &self.handle.path())
			.finish()
	}
}

/// Probe of the globals a page exposes.
///
/// Absence is the normal case, so `probe` returns [`None`] rather than an error.
pub trait InjectionHost: Send + Sync {
	fn probe(&self, path: &str) -> Option<Injected>;
}
