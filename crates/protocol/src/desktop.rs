//! Request and response bodies for the desktop companion HTTP API.
//!
//! The companion pairs with the extension in two steps:
//!
//! 1. The extension posts an [`AuthRequest`] to [`paths::AUTH_REQUEST`]; the
//!    companion asks the user to approve and shows a short-lived code.
//! 2. The user enters the code in the extension, which posts an
//!    [`AuthCodeExchange`] to [`paths::AUTH_RESPONSE`] and receives an
//!    [`AuthToken`].
//!
//! Every later call carries the token as a bearer credential.

use serde::{Deserialize, Serialize};

use crate::records::{Otp, SearchResult, VaultSourceDescription};

/// Default local port the desktop companion listens on.
pub const DESKTOP_API_PORT: u16 = 12822;

/// Client identity announced during pairing.
pub const CLIENT_NAME: &str = "browser";

/// Access purpose announced during pairing.
pub const CLIENT_PURPOSE: &str = "vaults-access";

/// Pairing protocol revision.
pub const PROTOCOL_REVISION: u32 = 1;

/// Route table of the companion API.
pub mod paths {
	pub const AUTH_REQUEST: &str = "/v1/auth/request";
	pub const AUTH_RESPONSE: &str = "/v1/auth/response";
	pub const AUTH_TEST: &str = "/v1/auth/test";
	pub const OTPS: &str = "/v1/otps";
	pub const VAULTS: &str = "/v1/vaults";
	pub const ENTRIES: &str = "/v1/entries";
}

/// Pairing handshake body, also reused by the authenticated liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
	pub client: String,
	pub purpose: String,
	pub rev: u32,
}

impl Default for AuthRequest {
	fn default() -> Self {
		Self {
			client: CLIENT_NAME.to_string(),
			purpose: CLIENT_PURPOSE.to_string(),
			rev: PROTOCOL_REVISION,
		}
	}
}

/// One-time code obtained out-of-band from the companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCodeExchange {
	pub code: String,
}

/// Reply to an [`AuthCodeExchange`].
///
/// The token is optional on the wire: a reply without one is a failed
/// exchange, not a decode error.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token: Option<String>,
}

impl std::fmt::Debug for AuthToken {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AuthToken")
			.field("token", &self.token.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Entry search query, encoded as query parameters on `GET /v1/entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntrySearch {
	Url { url: String },
	Term { term: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtpList {
	#[serde(default)]
	pub otps: Vec<Otp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultSourceList {
	#[serde(default)]
	pub sources: Vec<VaultSourceDescription>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntrySearchResults {
	#[serde(default)]
	pub results: Vec<SearchResult>,
}

/// Reply to a lock prompt. A reply without `locked` means the user declined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLockState {
	#[serde(default)]
	pub locked: bool,
}
