//! Background message router.
//!
//! This module is the background side of the context boundary. It handles:
//! - Decoding the operation tag of an inbound JSON message
//! - Dispatching each tag to exactly one handler
//! - Wrapping the handler result into the tag's response shape
//! - Turning every failure, panics included, into an `{error}` response
//!
//! # Message Flow
//!
//! 1. A UI context sends an [`Envelope`] through a [`RouterHandle`]
//! 2. [`MessageRouter::listen`] receives it and spawns its dispatch at once,
//!    so a slow handler never blocks the next message
//! 3. The handler runs against the session, store or a sibling service
//! 4. The response is serialized and sent back on the envelope's oneshot
//!
//! No lock is held across a dispatch. Two messages touching the session token
//! concurrently (say an authenticate racing a clear) are not ordered against
//! each other; whichever write lands last wins.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};
use vaultlink_protocol::{BackgroundMessage, BackgroundResponse, MessageType, SenderContext, storage_keys};

use crate::client::MessageChannel;
use crate::error::{BridgeError, Result, error_chain};
use crate::services::{ConfigService, DisabledDomains, LoginMemory};
use crate::session::DesktopSession;
use crate::storage::LocalStore;
use crate::transport::DesktopTransport;

/// Pending messages the listener buffers before senders wait.
const INBOX_CAPACITY: usize = 64;

/// Prefix of every error that crosses the boundary.
pub const DISPATCH_FAILURE_PREFIX: &str = "Background task failed";

/// A message in flight across the context boundary.
#[derive(Debug)]
pub struct Envelope {
	pub payload: Value,
	pub sender: SenderContext,
	pub reply: oneshot::Sender<Value>,
}

/// Dispatches [`BackgroundMessage`]s to their handlers.
pub struct MessageRouter {
	session: DesktopSession,
	store: Arc<dyn LocalStore>,
	config: ConfigService,
	disabled_domains: DisabledDomains,
	login_memory: LoginMemory,
}

impl MessageRouter {
	pub fn new(transport: Arc<dyn DesktopTransport>, store: Arc<dyn LocalStore>) -> Self {
		Self {
			session: DesktopSession::new(transport, Arc::clone(&store)),
			config: ConfigService::new(Arc::clone(&store)),
			disabled_domains: DisabledDomains::new(Arc::clone(&store)),
			login_memory: LoginMemory::new(),
			store,
		}
	}

	pub fn session(&self) -> &DesktopSession {
		&self.session
	}

	pub fn disabled_domains(&self) -> &DisabledDomains {
		&self.disabled_domains
	}

	pub fn login_memory(&self) -> &LoginMemory {
		&self.login_memory
	}

	/// Starts the listener on the current tokio runtime.
	pub fn spawn(self) -> RouterHandle {
		let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
		tokio::spawn(Arc::new(self).listen(rx));
		RouterHandle { tx }
	}

	/// The single inbound listener. Returns when every handle is dropped.
	pub async fn listen(self: Arc<Self>, mut inbox: mpsc::Receiver<Envelope>) {
		while let Some(envelope) = inbox.recv().await {
			let router = Arc::clone(&self);
			tokio::spawn(async move { router.respond(envelope).await });
		}
		debug!(target: "vaultlink.router", "inbox closed, listener exiting");
	}

	async fn respond(&self, envelope: Envelope) {
		let Envelope { payload, sender, reply } = envelope;
		let response = match AssertUnwindSafe(self.dispatch(payload, &sender)).catch_unwind().await {
			Ok(response) => response,
			Err(_) => {
				error!(target: "vaultlink.router", "message handler panicked");
				BackgroundResponse::error(format!("{DISPATCH_FAILURE_PREFIX}: handler panicked"))
			}
		};
		let response = serde_json::to_value(&response)
			.unwrap_or_else(|err| json!({ "error": format!("{DISPATCH_FAILURE_PREFIX}: {err}") }));
		if reply.send(response).is_err() {
			debug!(target: "vaultlink.router", "sender went away before the response");
		}
	}

	/// Decodes and handles one message. Never fails: errors become an
	/// `{error}` response.
	pub async fn dispatch(&self, payload: Value, sender: &SenderContext) -> BackgroundResponse {
		let result = match decode(payload) {
			Ok(message) => {
				debug!(target: "vaultlink.router", message_type = %message.message_type(), tab_id = ?sender.tab_id, "dispatching");
				self.handle(message, sender).await
			}
			Err(err) => Err(err),
		};
		result.unwrap_or_else(|err| {
			warn!(target: "vaultlink.router", error = %error_chain(&err), "background task failed");
			BackgroundResponse::error(format!("{DISPATCH_FAILURE_PREFIX}: {}", error_chain(&err)))
				.with_error_code(err.i18n_key())
		})
	}

	async fn handle(&self, message: BackgroundMessage, sender: &SenderContext) -> Result<BackgroundResponse> {
		let response = match message {
			BackgroundMessage::AuthenticateDesktopConnection { code } => {
				let token = self.session.authenticate_browser_access(&code).await?;
				self.store.set(storage_keys::DESKTOP_TOKEN, &token).await?;
				BackgroundResponse::empty()
			}
			BackgroundMessage::CheckDesktopConnection => {
				let available = self.session.has_connection().await?;
				if available {
					self.session.test_auth().await?;
				}
				BackgroundResponse {
					available: Some(available),
					..Default::default()
				}
			}
			BackgroundMessage::ClearDesktopAuthentication => {
				self.store.remove(storage_keys::DESKTOP_TOKEN).await?;
				BackgroundResponse::empty()
			}
			BackgroundMessage::GetConfiguration => BackgroundResponse {
				config: Some(self.config.get().await?),
				..Default::default()
			},
			BackgroundMessage::GetDesktopVaultSources => BackgroundResponse {
				vault_sources: Some(self.session.get_vault_sources().await?),
				..Default::default()
			},
			BackgroundMessage::GetDisabledDomains => BackgroundResponse {
				domains: Some(self.disabled_domains.list().await?),
				..Default::default()
			},
			BackgroundMessage::GetOtps => BackgroundResponse {
				otps: Some(self.session.get_otps().await?),
				..Default::default()
			},
			BackgroundMessage::InitiateDesktopConnection => {
				self.session.initiate_connection().await?;
				BackgroundResponse::empty()
			}
			BackgroundMessage::PromptLockSource { source_id } => BackgroundResponse {
				locked: Some(self.session.prompt_source_lock(&source_id).await?),
				..Default::default()
			},
			BackgroundMessage::PromptUnlockSource { source_id } => {
				self.session.prompt_source_unlock(&source_id).await?;
				BackgroundResponse::empty()
			}
			BackgroundMessage::SaveUsedCredentials { credentials } => {
				let tab_id = sender
					.tab_id
					.ok_or_else(|| BridgeError::Dispatch("sender has no tab".to_string()))?;
				self.login_memory.record(credentials, tab_id);
				BackgroundResponse::empty()
			}
			BackgroundMessage::SearchEntriesByTerm { search_term } => BackgroundResponse {
				search_results: Some(self.session.search_entries_by_term(&search_term).await?),
				..Default::default()
			},
			BackgroundMessage::SearchEntriesByUrl { url } => BackgroundResponse {
				search_results: Some(self.session.search_entries_by_url(&url).await?),
				..Default::default()
			},
			BackgroundMessage::SetConfigurationValue { config_key, config_value } => {
				self.config.set_value(&config_key, config_value).await?;
				BackgroundResponse::empty()
			}
		};
		Ok(response)
	}
}

/// Unknown or missing tags are rejected before the payload is looked at.
fn decode(payload: Value) -> Result<BackgroundMessage> {
	let tag = match payload.get("type") {
		Some(Value::String(tag)) => tag.clone(),
		Some(other) => other.to_string(),
		None => "<missing>".to_string(),
	};
	if MessageType::from_tag(&tag).is_none() {
		return Err(BridgeError::UnrecognisedMessage { tag });
	}
	serde_json::from_value(payload).map_err(|source| BridgeError::InvalidMessage { tag, source })
}

/// Sending half of the boundary, held by UI contexts.
#[derive(Debug, Clone)]
pub struct RouterHandle {
	tx: mpsc::Sender<Envelope>,
}

#[async_trait]
impl MessageChannel for RouterHandle {
	async fn deliver(&self, payload: Value, sender: SenderContext) -> Result<Value> {
		let (reply, response) = oneshot::channel();
		self.tx
			.send(Envelope { payload, sender, reply })
			.await
			.map_err(|_| BridgeError::ChannelClosed)?;
		response.await.map_err(|_| BridgeError::ChannelClosed)
	}
}
