//! Background runtime of the vault browser extension.
//!
//! UI contexts talk to the background context through a [`MessageClient`];
//! the background context answers through a [`MessageRouter`], which relays
//! desktop operations to the companion app via a [`DesktopSession`].
//!
//! ```text
//! UI context -> MessageClient -> RouterHandle ~~boundary~~> MessageRouter
//!     -> DesktopSession -> DesktopTransport -> desktop companion
//! ```
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(FileStore::new(path));
//! let transport = Arc::new(HttpTransport::from_config(&config)?);
//! let handle = MessageRouter::new(transport, store).spawn();
//!
//! let client = MessageClient::new(Arc::new(handle), SenderContext::extension_page());
//! client.initiate_desktop_connection().await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod router;
pub mod services;
pub mod session;
pub mod storage;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use client::{MessageChannel, MessageClient};
pub use config::BridgeConfig;
pub use error::{BridgeError, ConfigError, Result, StorageError, TransportError};
pub use router::{Envelope, MessageRouter, RouterHandle};
pub use session::DesktopSession;
pub use storage::{FileStore, LocalStore, MemoryStore};
pub use transport::{DesktopTransport, HttpTransport};
pub use vaultlink_protocol as protocol;
