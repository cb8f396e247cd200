//! Desktop session lifecycle.
//!
//! A session exists once a token is persisted under
//! [`storage_keys::DESKTOP_TOKEN`]. Presence is all that is tracked locally;
//! whether the companion still accepts the token is only known after an
//! authenticated call. Every authenticated operation re-reads the token, since
//! a disconnect may remove it between two calls.

use std::sync::Arc;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};
use vaultlink_protocol::desktop::paths;
use vaultlink_protocol::{
	AuthCodeExchange, AuthRequest, AuthToken, EntrySearch, EntrySearchResults, Otp, OtpList, SearchResult, SourceLockState,
	VaultSourceDescription, VaultSourceList, storage_keys,
};

use crate::error::{BridgeError, Result, TransportError};
use crate::storage::LocalStore;
use crate::transport::DesktopTransport;

/// Pairing and authenticated calls against the desktop companion.
#[derive(Clone)]
pub struct DesktopSession {
	transport: Arc<dyn DesktopTransport>,
	store: Arc<dyn LocalStore>,
}

impl DesktopSession {
	pub fn new(transport: Arc<dyn DesktopTransport>, store: Arc<dyn LocalStore>) -> Self {
		Self { transport, store }
	}

	/// Asks the companion to start pairing. The user approves on the desktop
	/// side, which then displays a one-time code.
	pub async fn initiate_connection(&self) -> Result<()> {
		self.transport
			.send(Method::POST, paths::AUTH_REQUEST, Some(to_body(&AuthRequest::default())?), None)
			.await?;
		info!(target: "vaultlink.session", "desktop pairing requested");
		Ok(())
	}

	/// Exchanges a one-time code for a session token.
	///
	/// The token is returned, not stored; persisting it is up to the caller.
	pub async fn authenticate_browser_access(&self, code: &str) -> Result<String> {
		let body = to_body(&AuthCodeExchange { code: code.to_string() })?;
		let reply = self.transport.send(Method::POST, paths::AUTH_RESPONSE, Some(body), None).await?;
		let AuthToken { token } = decode(reply)?;
		match token {
			Some(token) if !token.is_empty() => {
				info!(target: "vaultlink.session", "desktop token issued");
				Ok(token)
			}
			_ => Err(BridgeError::AuthExchange),
		}
	}

	/// Whether a token is persisted. Says nothing about whether it still works.
	pub async fn has_connection(&self) -> Result<bool> {
		Ok(self.token().await?.is_some())
	}

	/// Round-trips the persisted token through the companion.
	pub async fn test_auth(&self) -> Result<()> {
		let token = self.require_token().await?;
		let body = to_body(&AuthRequest::default())?;
		if let Err(source) = self.transport.send(Method::POST, paths::AUTH_TEST, Some(body), Some(&token)).await {
			warn!(target: "vaultlink.session", error = %source, "desktop auth test failed");
			return Err(BridgeError::ConnectionTest { source });
		}
		Ok(())
	}

	pub async fn get_otps(&self) -> Result<Vec<Otp>> {
		let OtpList { otps } = self.authorized(Method::GET, paths::OTPS, None).await?;
		Ok(otps)
	}

	pub async fn get_vault_sources(&self) -> Result<Vec<VaultSourceDescription>> {
		let VaultSourceList { sources } = self.authorized(Method::GET, paths::VAULTS, None).await?;
		Ok(sources)
	}

	pub async fn search_entries_by_url(&self, url: &str) -> Result<Vec<SearchResult>> {
		self.search(EntrySearch::Url { url: url.to_string() }).await
	}

	pub async fn search_entries_by_term(&self, term: &str) -> Result<Vec<SearchResult>> {
		self.search(EntrySearch::Term { term: term.to_string() }).await
	}

	/// Asks the companion to prompt the user to lock a vault source.
	/// Returns whether the source ended up locked.
	pub async fn prompt_source_lock(&self, source_id: &str) -> Result<bool> {
		let path = source_action_path(source_id, "lock");
		let SourceLockState { locked } = self.authorized(Method::POST, &path, None).await?;
		Ok(locked)
	}

	/// Asks the companion to prompt the user to unlock a vault source.
	pub async fn prompt_source_unlock(&self, source_id: &str) -> Result<()> {
		let path = source_action_path(source_id, "unlock");
		let _: Value = self.authorized(Method::POST, &path, None).await?;
		Ok(())
	}

	async fn search(&self, query: EntrySearch) -> Result<Vec<SearchResult>> {
		let EntrySearchResults { results } = self.authorized(Method::GET, paths::ENTRIES, Some(to_body(&query)?)).await?;
		Ok(results)
	}

	/// Reads the token and fails before any network call when it is absent.
	async fn authorized<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T> {
		let token = self.require_token().await?;
		let reply = self.transport.send(method, path, body, Some(&token)).await?;
		decode(reply)
	}

	async fn require_token(&self) -> Result<String> {
		match self.token().await? {
			Some(token) => Ok(token),
			None => {
				debug!(target: "vaultlink.session", "no desktop token persisted");
				Err(BridgeError::NotAuthorized)
			}
		}
	}

	async fn token(&self) -> Result<Option<String>> {
		let token = self.store.get(storage_keys::DESKTOP_TOKEN).await?;
		Ok(token.filter(|token| !token.is_empty()))
	}
}

fn to_body<T: Serialize>(value: &T) -> Result<Value> {
	serde_json::to_value(value).map_err(|err| BridgeError::Transport(TransportError::Encode(err)))
}

fn decode<T: DeserializeOwned>(reply: Value) -> Result<T> {
	serde_json::from_value(reply).map_err(|err| BridgeError::Transport(TransportError::Decode(err)))
}

/// Bytes escaped inside a single path segment. `+` is escaped too so no
/// server reads it as a space.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'#')
	.add(b'%')
	.add(b'+')
	.add(b'/')
	.add(b'<')
	.add(b'>')
	.add(b'?')
	.add(b'`')
	.add(b'{')
	.add(b'}');

fn source_action_path(source_id: &str, action: &str) -> String {
	let encoded = utf8_percent_encode(source_id, PATH_SEGMENT);
	format!("{}/{encoded}/{action}", paths::VAULTS)
}
