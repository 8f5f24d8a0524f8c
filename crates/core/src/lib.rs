//! Wallet connection and session lifecycle.
//!
//! Components, leaf first:
//!
//! - [`detect`] - enumerates providers at the known injection points
//! - [`Connector`] - requests account access, guarding against concurrent attempts
//! - [`SessionStore`] - persists the active session with expiry enforced on read
//! - [`Restorer`] - silently reconnects a stored session on start-up
//! - [`EventRelay`] - republishes provider change events as [`WalletEvent`]s
//!
//! [`SessionManager`] owns one instance of each and is the entry point for
//! application code. It is constructed explicitly and passed by reference;
//! there is no process-wide wallet state.
//!
//! # Example
//!
//! ```ignore
//! let storage = Arc::new(FileStorage::new(state_dir));
//! let manager = SessionManager::new(SessionConfig::default(), storage);
//! let providers = manager.detect(&host);
//! match manager.restore(&host).await? {
//!     RestoreOutcome::Restored(session) => println!("welcome back {}", session.address),
//!     _ => {
//!         let result = manager.connect(providers.first()).await;
//!         println!("{result:?}");
//!     }
//! }
//! ```

pub mod clock;
pub mod config;
pub mod connector;
pub mod detector;
pub mod error;
pub mod events;
pub mod manager;
pub mod quirks;
pub mod relay;
pub mod restorer;
mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use connector::{ConnectOptions, Connector};
pub use detector::{ProviderDescriptor, detect};
pub use error::{Error, Result};
pub use events::{EventBus, EventStream, RelayHandle};
pub use manager::SessionManager;
pub use quirks::ProviderEvent;
pub use relay::EventRelay;
pub use restorer::{RestoreOutcome, Restorer};
pub use store::{FileStorage, MemoryStorage, SESSION_KEY, SessionStorage, SessionStore};
pub use wallet_protocol::{ChainId, ConnectionResult, ErrorKind, WalletEvent, WalletKind, WalletSession};
