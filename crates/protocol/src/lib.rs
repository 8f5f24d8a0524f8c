//! Shared data model and wire types for wallet-session.
//!
//! This crate has no runtime dependencies beyond serde. It is used by the
//! host-side session library, the CLI, and the in-page bridge.
//!
//! # Main Types
//!
//! - [`WalletSession`] - Persisted record of an active wallet connection
//! - [`ConnectionResult`] / [`ErrorKind`] - Typed connect outcomes
//! - [`WalletEvent`] - Application-level notifications
//! - [`BridgeMessage`] / [`HostMessage`] - Page bridge protocol

pub mod bridge;
pub mod event;
pub mod session;

pub use bridge::{BridgeMessage, HostMessage, InjectedProvider, ProviderFlags, RpcError};
pub use event::WalletEvent;
pub use session::{ChainId, ConnectionResult, ErrorKind, WalletKind, WalletSession};

/// Provider error code for a user-rejected request (EIP-1193, also used by Phantom).
pub const USER_REJECTED_CODE: i64 = 4001;
