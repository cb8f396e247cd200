//! Messages exchanged between UI contexts and the background context.
//!
//! A UI context (tab content script, popup, settings page) sends a
//! [`BackgroundMessage`] and receives exactly one [`BackgroundResponse`].
//! Both travel as JSON, so their serde shape is the protocol:
//!
//! ```json
//! {"type": "searchEntriesByTerm", "searchTerm": "github"}
//! {"searchResults": [{"id": "1"}]}
//! {"error": "Background task failed: Desktop connection not authorised"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::{Configuration, Otp, SearchResult, UsedCredentials, VaultSourceDescription};

/// The closed set of operation tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
	AuthenticateDesktopConnection,
	CheckDesktopConnection,
	ClearDesktopAuthentication,
	GetConfiguration,
	GetDesktopVaultSources,
	GetDisabledDomains,
	#[serde(rename = "getOTPs")]
	GetOtps,
	InitiateDesktopConnection,
	PromptLockSource,
	PromptUnlockSource,
	SaveUsedCredentials,
	SearchEntriesByTerm,
	#[serde(rename = "searchEntriesByURL")]
	SearchEntriesByUrl,
	SetConfigurationValue,
}

impl MessageType {
	pub const ALL: [MessageType; 14] = [
		MessageType::AuthenticateDesktopConnection,
		MessageType::CheckDesktopConnection,
		MessageType::ClearDesktopAuthentication,
		MessageType::GetConfiguration,
		MessageType::GetDesktopVaultSources,
		MessageType::GetDisabledDomains,
		MessageType::GetOtps,
		MessageType::InitiateDesktopConnection,
		MessageType::PromptLockSource,
		MessageType::PromptUnlockSource,
		MessageType::SaveUsedCredentials,
		MessageType::SearchEntriesByTerm,
		MessageType::SearchEntriesByUrl,
		MessageType::SetConfigurationValue,
	];

	/// Wire tag, as found in the `type` field.
	pub fn as_str(self) -> &'static str {
		match self {
			MessageType::AuthenticateDesktopConnection => "authenticateDesktopConnection",
			MessageType::CheckDesktopConnection => "checkDesktopConnection",
			MessageType::ClearDesktopAuthentication => "clearDesktopAuthentication",
			MessageType::GetConfiguration => "getConfiguration",
			MessageType::GetDesktopVaultSources => "getDesktopVaultSources",
			MessageType::GetDisabledDomains => "getDisabledDomains",
			MessageType::GetOtps => "getOTPs",
			MessageType::InitiateDesktopConnection => "initiateDesktopConnection",
			MessageType::PromptLockSource => "promptLockSource",
			MessageType::PromptUnlockSource => "promptUnlockSource",
			MessageType::SaveUsedCredentials => "saveUsedCredentials",
			MessageType::SearchEntriesByTerm => "searchEntriesByTerm",
			MessageType::SearchEntriesByUrl => "searchEntriesByURL",
			MessageType::SetConfigurationValue => "setConfigurationValue",
		}
	}

	/// Parses a wire tag. Returns `None` for tags outside the enumeration.
	pub fn from_tag(tag: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|ty| ty.as_str() == tag)
	}
}

impl std::fmt::Display for MessageType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A request from a UI context to the background context.
///
/// Each variant carries only the fields its operation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BackgroundMessage {
	/// Exchange a pairing code for a session token and persist it.
	AuthenticateDesktopConnection { code: String },
	/// Report whether a session exists, probing the companion if so.
	CheckDesktopConnection,
	/// Forget the persisted session token.
	ClearDesktopAuthentication,
	GetConfiguration,
	GetDesktopVaultSources,
	GetDisabledDomains,
	#[serde(rename = "getOTPs")]
	GetOtps,
	/// Ask the companion to start pairing.
	InitiateDesktopConnection,
	PromptLockSource {
		#[serde(rename = "sourceID")]
		source_id: String,
	},
	PromptUnlockSource {
		#[serde(rename = "sourceID")]
		source_id: String,
	},
	SaveUsedCredentials { credentials: Vec<UsedCredentials> },
	SearchEntriesByTerm {
		#[serde(rename = "searchTerm")]
		search_term: String,
	},
	#[serde(rename = "searchEntriesByURL")]
	SearchEntriesByUrl { url: String },
	SetConfigurationValue {
		#[serde(rename = "configKey")]
		config_key: String,
		#[serde(rename = "configValue")]
		config_value: Value,
	},
}

impl BackgroundMessage {
	pub fn message_type(&self) -> MessageType {
		match self {
			BackgroundMessage::AuthenticateDesktopConnection { .. } => MessageType::AuthenticateDesktopConnection,
			BackgroundMessage::CheckDesktopConnection => MessageType::CheckDesktopConnection,
			BackgroundMessage::ClearDesktopAuthentication => MessageType::ClearDesktopAuthentication,
			BackgroundMessage::GetConfiguration => MessageType::GetConfiguration,
			BackgroundMessage::GetDesktopVaultSources => MessageType::GetDesktopVaultSources,
			BackgroundMessage::GetDisabledDomains => MessageType::GetDisabledDomains,
			BackgroundMessage::GetOtps => MessageType::GetOtps,
			BackgroundMessage::InitiateDesktopConnection => MessageType::InitiateDesktopConnection,
			BackgroundMessage::PromptLockSource { .. } => MessageType::PromptLockSource,
			BackgroundMessage::PromptUnlockSource { .. } => MessageType::PromptUnlockSource,
			BackgroundMessage::SaveUsedCredentials { .. } => MessageType::SaveUsedCredentials,
			BackgroundMessage::SearchEntriesByTerm { .. } => MessageType::SearchEntriesByTerm,
			BackgroundMessage::SearchEntriesByUrl { .. } => MessageType::SearchEntriesByUrl,
			BackgroundMessage::SetConfigurationValue { .. } => MessageType::SetConfigurationValue,
		}
	}
}

/// Reply to a [`BackgroundMessage`].
///
/// Which success field is set depends on the originating tag; operations
/// with no result reply with an empty object. On failure only `error` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundResponse {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub available: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub config: Option<Configuration>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub domains: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub locked: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub otps: Option<Vec<Otp>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub search_results: Option<Vec<SearchResult>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vault_sources: Option<Vec<VaultSourceDescription>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Localization key for `error`, when the UI should show a translated
	/// message instead of the text.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_code: Option<String>,
}

impl BackgroundResponse {
	/// Acknowledgement for operations without a result.
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			error: Some(message.into()),
			..Self::default()
		}
	}

	/// Attaches a localization key to an error response.
	pub fn with_error_code(mut self, code: Option<&str>) -> Self {
		self.error_code = code.map(str::to_string);
		self
	}

	pub fn is_error(&self) -> bool {
		self.error.is_some()
	}
}

/// The UI surface a message came from.
///
/// Only used to scope side effects such as credential memory; never for
/// authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderContext {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tab_id: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub frame_id: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

impl SenderContext {
	/// A sender that is not a tab, e.g. the popup or a settings page.
	pub fn extension_page() -> Self {
		Self::default()
	}

	pub fn tab(tab_id: i64) -> Self {
		Self {
			tab_id: Some(tab_id),
			..Self::default()
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn message_serializes_with_type_tag() {
		let msg = BackgroundMessage::SearchEntriesByTerm {
			search_term: "github".into(),
		};
		let json = serde_json::to_value(&msg).unwrap();
		assert_eq!(json, json!({"type": "searchEntriesByTerm", "searchTerm": "github"}));
	}

	#[test]
	fn acronym_tags_keep_their_casing() {
		let json = serde_json::to_value(BackgroundMessage::GetOtps).unwrap();
		assert_eq!(json, json!({"type": "getOTPs"}));

		let msg: BackgroundMessage =
			serde_json::from_value(json!({"type": "searchEntriesByURL", "url": "https://example.com"})).unwrap();
		assert_eq!(msg.message_type(), MessageType::SearchEntriesByUrl);
	}

	#[test]
	fn source_id_uses_wire_spelling() {
		let msg: BackgroundMessage = serde_json::from_value(json!({"type": "promptLockSource", "sourceID": "abc"})).unwrap();
		assert_eq!(msg, BackgroundMessage::PromptLockSource { source_id: "abc".into() });
	}

	#[test]
	fn tag_table_matches_serde_names() {
		for ty in MessageType::ALL {
			let via_serde = serde_json::to_value(ty).unwrap();
			assert_eq!(via_serde, json!(ty.as_str()), "tag mismatch for {ty:?}");
			assert_eq!(MessageType::from_tag(ty.as_str()), Some(ty));
		}
		assert_eq!(MessageType::from_tag("getOtps"), None);
	}

	#[test]
	fn empty_response_serializes_to_empty_object() {
		let json = serde_json::to_value(BackgroundResponse::empty()).unwrap();
		assert_eq!(json, json!({}));
	}

	#[test]
	fn error_response_carries_only_error() {
		let json = serde_json::to_value(BackgroundResponse::error("boom")).unwrap();
		assert_eq!(json, json!({"error": "boom"}));
	}
}
