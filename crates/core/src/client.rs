//! Message client used by UI contexts.
//!
//! The client is the one place where an `{error}` response turns back into
//! a Rust error; code above it never inspects `error` fields itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use vaultlink_protocol::{
	BackgroundMessage, BackgroundResponse, Configuration, Otp, SearchResult, SenderContext, UsedCredentials,
	VaultSourceDescription,
};

use crate::error::{BridgeError, Result};

/// Carries a serialized message across the context boundary and returns the
/// serialized response.
#[async_trait]
pub trait MessageChannel: Send + Sync {
	async fn deliver(&self, payload: Value, sender: SenderContext) -> Result<Value>;
}

/// Typed request/response access to the background context.
#[derive(Clone)]
pub struct MessageClient {
	channel: Arc<dyn MessageChannel>,
	sender: SenderContext,
}

impl MessageClient {
	/// A client that identifies itself as `sender` on every message.
	pub fn new(channel: Arc<dyn MessageChannel>, sender: SenderContext) -> Self {
		Self { channel, sender }
	}

	pub fn sender(&self) -> &SenderContext {
		&self.sender
	}

	/// Sends a message and waits for its response.
	///
	/// A response carrying `error` becomes [`BridgeError::Remote`].
	pub async fn send(&self, message: &BackgroundMessage) -> Result<BackgroundResponse> {
		let payload = serde_json::to_value(message).map_err(|source| BridgeError::InvalidMessage {
			tag: message.message_type().to_string(),
			source,
		})?;
		self.send_raw(payload).await
	}

	/// Sends an arbitrary JSON payload. Used for messages built outside the
	/// typed API.
	pub async fn send_raw(&self, payload: Value) -> Result<BackgroundResponse> {
		let reply = self.channel.deliver(payload, self.sender.clone()).await?;
		let mut response: BackgroundResponse = serde_json::from_value(reply).map_err(|err| BridgeError::Remote {
			message: format!("malformed background response: {err}"),
			code: None,
		})?;
		match response.error.take() {
			Some(message) => Err(BridgeError::Remote {
				message,
				code: response.error_code,
			}),
			None => Ok(response),
		}
	}

	pub async fn authenticate_desktop_connection(&self, code: &str) -> Result<()> {
		self.send(&BackgroundMessage::AuthenticateDesktopConnection { code: code.to_string() })
			.await
			.map(drop)
	}

	/// Whether a desktop session exists and the companion still accepts it.
	pub async fn check_desktop_connection(&self) -> Result<bool> {
		let response = self.send(&BackgroundMessage::CheckDesktopConnection).await?;
		Ok(response.available.unwrap_or(false))
	}

	pub async fn clear_desktop_authentication(&self) -> Result<()> {
		self.send(&BackgroundMessage::ClearDesktopAuthentication).await.map(drop)
	}

	pub async fn get_configuration(&self) -> Result<Configuration> {
		let response = self.send(&BackgroundMessage::GetConfiguration).await?;
		Ok(response.config.unwrap_or_default())
	}

	pub async fn get_desktop_vault_sources(&self) -> Result<Vec<VaultSourceDescription>> {
		let response = self.send(&BackgroundMessage::GetDesktopVaultSources).await?;
		Ok(response.vault_sources.unwrap_or_default())
	}

	pub async fn get_disabled_domains(&self) -> Result<Vec<String>> {
		let response = self.send(&BackgroundMessage::GetDisabledDomains).await?;
		Ok(response.domains.unwrap_or_default())
	}

	pub async fn get_otps(&self) -> Result<Vec<Otp>> {
		let response = self.send(&BackgroundMessage::GetOtps).await?;
		Ok(response.otps.unwrap_or_default())
	}

	pub async fn initiate_desktop_connection(&self) -> Result<()> {
		self.send(&BackgroundMessage::InitiateDesktopConnection).await.map(drop)
	}

	pub async fn prompt_lock_source(&self, source_id: &str) -> Result<bool> {
		let response = self
			.send(&BackgroundMessage::PromptLockSource {
				source_id: source_id.to_string(),
			})
			.await?;
		Ok(response.locked.unwrap_or(false))
	}

	pub async fn prompt_unlock_source(&self, source_id: &str) -> Result<()> {
		self.send(&BackgroundMessage::PromptUnlockSource {
			source_id: source_id.to_string(),
		})
		.await
		.map(drop)
	}

	pub async fn save_used_credentials(&self, credentials: Vec<UsedCredentials>) -> Result<()> {
		self.send(&BackgroundMessage::SaveUsedCredentials { credentials }).await.map(drop)
	}

	pub async fn search_entries_by_term(&self, term: &str) -> Result<Vec<SearchResult>> {
		let response = self
			.send(&BackgroundMessage::SearchEntriesByTerm {
				search_term: term.to_string(),
			})
			.await?;
		Ok(response.search_results.unwrap_or_default())
	}

	pub async fn search_entries_by_url(&self, url: &str) -> Result<Vec<SearchResult>> {
		let response = self
			.send(&BackgroundMessage::SearchEntriesByUrl { url: url.to_string() })
			.await?;
		Ok(response.search_results.unwrap_or_default())
	}

	pub async fn set_configuration_value(&self, key: &str, value: Value) -> Result<()> {
		self.send(&BackgroundMessage::SetConfigurationValue {
			config_key: key.to_string(),
			config_value: value,
		})
		.await
		.map(drop)
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;
	use serde_json::json;

	use super::*;

	/// Channel that answers every message with a fixed reply.
	struct CannedChannel {
		reply: Value,
		seen: Mutex<Vec<(Value, SenderContext)>>,
	}

	impl CannedChannel {
		fn new(reply: Value) -> Arc<Self> {
			Arc::new(Self {
				reply,
				seen: Mutex::new(Vec::new()),
			})
		}
	}

	#[async_trait]
	impl MessageChannel for CannedChannel {
		async fn deliver(&self, payload: Value, sender: SenderContext) -> Result<Value> {
			self.seen.lock().push((payload, sender));
			Ok(self.reply.clone())
		}
	}

	struct ClosedChannel;

	#[async_trait]
	impl MessageChannel for ClosedChannel {
		async fn deliver(&self, _payload: Value, _sender: SenderContext) -> Result<Value> {
			Err(BridgeError::ChannelClosed)
		}
	}

	#[tokio::test]
	async fn error_field_becomes_remote_error() {
		let channel = CannedChannel::new(json!({"error": "Background task failed: boom"}));
		let client = MessageClient::new(channel, SenderContext::default());

		match client.get_otps().await {
			Err(BridgeError::Remote { message, code }) => {
				assert_eq!(message, "Background task failed: boom");
				assert_eq!(code, None);
			}
			other => panic!("expected remote error, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn error_code_travels_with_remote_error() {
		let channel = CannedChannel::new(json!({
			"error": "Background task failed: Desktop connection failed: desktop responded with status 401",
			"errorCode": crate::error::I18N_CONNECTION_FAILED,
		}));
		let client = MessageClient::new(channel, SenderContext::default());

		let err = client.check_desktop_connection().await.unwrap_err();
		assert_eq!(err.i18n_key(), Some(crate::error::I18N_CONNECTION_FAILED));
		assert_eq!(err.user_message(), "Desktop connection failed");
	}

	#[tokio::test]
	async fn message_is_serialized_with_sender() {
		let channel = CannedChannel::new(json!({"searchResults": [{"id": "1"}]}));
		let client = MessageClient::new(channel.clone(), SenderContext::tab(3));

		let results = client.search_entries_by_term("x").await.unwrap();
		assert_eq!(results, vec![SearchResult(json!({"id": "1"}))]);

		let seen = channel.seen.lock();
		assert_eq!(seen[0].0, json!({"type": "searchEntriesByTerm", "searchTerm": "x"}));
		assert_eq!(seen[0].1.tab_id, Some(3));
	}

	#[tokio::test]
	async fn missing_result_key_uses_empty_default() {
		let client = MessageClient::new(CannedChannel::new(json!({})), SenderContext::default());
		assert!(client.get_desktop_vault_sources().await.unwrap().is_empty());
		assert!(!client.check_desktop_connection().await.unwrap());
	}

	#[tokio::test]
	async fn malformed_response_is_an_error() {
		let client = MessageClient::new(CannedChannel::new(json!({"otps": 5})), SenderContext::default());
		assert!(matches!(client.get_otps().await, Err(BridgeError::Remote { .. })));
	}

	#[tokio::test]
	async fn closed_channel_surfaces() {
		let client = MessageClient::new(Arc::new(ClosedChannel), SenderContext::default());
		assert!(matches!(client.get_configuration().await, Err(BridgeError::ChannelClosed)));
	}
}
