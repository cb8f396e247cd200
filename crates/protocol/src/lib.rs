//! Wire types shared by the extension's UI contexts, its background context,
//! and the desktop companion API.
//!
//! Nothing in this crate performs I/O. The background runtime lives in the
//! `vaultlink` crate; this crate only fixes the shapes that cross a boundary.

pub mod desktop;
pub mod message;
pub mod records;

pub use desktop::{
	AuthCodeExchange, AuthRequest, AuthToken, CLIENT_NAME, CLIENT_PURPOSE, DESKTOP_API_PORT, EntrySearch, EntrySearchResults,
	OtpList, PROTOCOL_REVISION, SourceLockState, VaultSourceList,
};
pub use message::{BackgroundMessage, BackgroundResponse, MessageType, SenderContext};
pub use records::{Configuration, Otp, SearchResult, Theme, UsedCredentials, VaultSourceDescription};

/// Well-known keys in the extension's local key-value store.
pub mod storage_keys {
	/// Session token issued by the desktop companion.
	pub const DESKTOP_TOKEN: &str = "desktopToken";
	/// Serialized [`Configuration`](crate::Configuration).
	pub const CONFIGURATION: &str = "configuration";
	/// JSON array of domains autofill is disabled on.
	pub const DISABLED_DOMAINS: &str = "disabledDomains";
}
