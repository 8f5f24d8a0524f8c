//! Provider runtime for wallet-session.
//!
//! Defines the seam between the session library and whatever actually holds
//! the injected wallet objects:
//!
//! - [`Provider`] - request/response plus native event stream for one injected object
//! - [`InjectionHost`] - read-only probe of global injection paths
//! - [`BridgeConnection`] / [`BridgeHost`] - the page-bridge implementation,
//!   correlating request ids with responses over a message channel

pub mod bridge;
pub mod error;
pub mod host;
pub mod provider;

pub use bridge::{BridgeConnection, BridgeHost, BridgeProvider};
pub use error::{Error, Result};
pub use host::{InjectionHost, Injected};
pub use provider::{NativeEvent, Provider};
