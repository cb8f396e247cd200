//! Records carried inside messages.
//!
//! [`Otp`], [`VaultSourceDescription`] and [`SearchResult`] belong to the
//! desktop companion. They are passed through to the UI untouched, so they
//! wrap the raw JSON instead of modelling fields this side never reads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

macro_rules! opaque_record {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(pub Value);

		impl $name {
			/// Looks up a top-level field of the record.
			pub fn get(&self, key: &str) -> Option<&Value> {
				self.0.get(key)
			}

			pub fn into_inner(self) -> Value {
				self.0
			}
		}

		impl From<Value> for $name {
			fn from(value: Value) -> Self {
				Self(value)
			}
		}
	};
}

opaque_record!(
	/// One-time password descriptor as reported by the companion.
	Otp
);
opaque_record!(
	/// A vault source (file, cloud or WebDAV vault) known to the companion.
	VaultSourceDescription
);
opaque_record!(
	/// An entry matched by a URL or term search.
	SearchResult
);

/// Credentials a content script saw being submitted on a page.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedCredentials {
	pub url: String,
	#[serde(default)]
	pub title: String,
	pub username: String,
	pub password: String,
	/// Entry the credentials were filled from, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub entry_id: Option<String>,
	/// Milliseconds since the unix epoch.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<u64>,
}

impl std::fmt::Debug for UsedCredentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("UsedCredentials")
			.field("url", &self.url)
			.field("title", &self.title)
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("entry_id", &self.entry_id)
			.field("timestamp", &self.timestamp)
			.finish()
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
	#[default]
	Light,
	Dark,
}

/// User-facing extension settings.
///
/// Field names are the keys accepted by `setConfigurationValue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
	/// Offer to save credentials seen on login forms.
	pub save_new_logins: bool,
	/// Show the autofill button inside login inputs.
	pub show_autofill_button: bool,
	pub theme: Theme,
	/// Follow the OS light/dark preference instead of `theme`.
	pub use_system_theme: bool,
}

impl Default for Configuration {
	fn default() -> Self {
		Self {
			save_new_logins: true,
			show_autofill_button: true,
			theme: Theme::Light,
			use_system_theme: true,
		}
	}
}
