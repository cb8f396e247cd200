//! Error types for the background runtime.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for background operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Localization key for a missing desktop session.
pub const I18N_NOT_AUTHORISED: &str = "error.code.desktop-connection-not-authorised";

/// Localization key for a failed desktop round-trip.
pub const I18N_CONNECTION_FAILED: &str = "error.code.desktop-connection-failed";

/// Errors raised by the key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("failed to read store {}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to write store {}", path.display())]
	Write {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("store {} is corrupt", path.display())]
	Corrupt {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("stored value for {key} is not valid JSON")]
	Value {
		key: String,
		#[source]
		source: serde_json::Error,
	},

	/// Failure reported by a store implementation outside this crate.
	#[error("storage backend error: {0}")]
	Backend(String),
}

/// Errors raised while talking to the desktop companion.
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("invalid desktop endpoint {path}")]
	InvalidPath {
		path: String,
		#[source]
		source: url::ParseError,
	},

	/// Endpoint paths are absolute, so a base URL must be a bare origin.
	#[error("desktop base URL {url} must not carry a path")]
	BaseUrlHasPath { url: String },

	#[error("desktop query parameters must be a flat JSON object")]
	InvalidQuery,

	#[error("failed to encode desktop request body")]
	Encode(#[source] serde_json::Error),

	#[error("desktop request failed")]
	Request(#[source] reqwest::Error),

	#[error("desktop responded with status {status}")]
	Status { status: u16, body: String },

	#[error("desktop response was not valid JSON")]
	Decode(#[source] serde_json::Error),
}

/// Errors raised by settings: the user [`Configuration`](vaultlink_protocol::Configuration)
/// and the runtime [`BridgeConfig`](crate::BridgeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("unknown configuration key: {0}")]
	UnknownKey(String),

	#[error("invalid value for configuration key {key}")]
	InvalidValue {
		key: String,
		#[source]
		source: serde_json::Error,
	},

	#[error("failed to read config file {}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("config file {} is not valid", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

/// Top-level error taxonomy of the background runtime and message client.
#[derive(Debug, Error)]
pub enum BridgeError {
	/// No session token is persisted.
	#[error("Desktop connection not authorised")]
	NotAuthorized,

	/// The companion answered a code exchange without a token.
	#[error("No token received from browser authentication")]
	AuthExchange,

	/// The authenticated liveness probe failed.
	#[error("Desktop connection failed")]
	ConnectionTest {
		#[source]
		source: TransportError,
	},

	#[error(transparent)]
	Transport(#[from] TransportError),

	#[error("Unrecognised message type: {tag}")]
	UnrecognisedMessage { tag: String },

	#[error("Invalid {tag} message")]
	InvalidMessage {
		tag: String,
		#[source]
		source: serde_json::Error,
	},

	/// A handler rejected a well-formed message.
	#[error("{0}")]
	Dispatch(String),

	#[error(transparent)]
	Storage(#[from] StorageError),

	#[error(transparent)]
	Config(#[from] ConfigError),

	/// An error reported by the background context, flattened to text.
	#[error("{message}")]
	Remote {
		message: String,
		/// Localization key sent alongside the text, if any.
		code: Option<String>,
	},

	#[error("Background context is unavailable")]
	ChannelClosed,
}

impl BridgeError {
	/// Localization key for errors the UI should translate.
	pub fn i18n_key(&self) -> Option<&'static str> {
		match self {
			BridgeError::NotAuthorized => Some(I18N_NOT_AUTHORISED),
			BridgeError::ConnectionTest { .. } | BridgeError::Transport(_) => Some(I18N_CONNECTION_FAILED),
			BridgeError::Remote { code: Some(code), .. } => match code.as_str() {
				I18N_NOT_AUTHORISED => Some(I18N_NOT_AUTHORISED),
				I18N_CONNECTION_FAILED => Some(I18N_CONNECTION_FAILED),
				_ => None,
			},
			_ => None,
		}
	}

	/// Text suitable for an end user. Causes are kept out of it.
	pub fn user_message(&self) -> String {
		match self.i18n_key() {
			Some(I18N_NOT_AUTHORISED) => "Desktop connection not authorised".to_string(),
			Some(_) => "Desktop connection failed".to_string(),
			None => self.to_string(),
		}
	}
}

/// Flattens an error and its sources into `"outer: inner: root"`.
///
/// This is the only form in which errors cross the context boundary; the
/// typed source chain does not survive it.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
	let mut out = err.to_string();
	let mut source = err.source();
	while let Some(cause) = source {
		let text = cause.to_string();
		if !text.is_empty() && !out.ends_with(&text) {
			out.push_str(": ");
			out.push_str(&text);
		}
		source = cause.source();
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn chain_includes_transport_cause() {
		let err = BridgeError::ConnectionTest {
			source: TransportError::Status {
				status: 401,
				body: String::new(),
			},
		};
		assert_eq!(error_chain(&err), "Desktop connection failed: desktop responded with status 401");
	}

	#[test]
	fn transparent_variants_do_not_repeat_messages() {
		let err = BridgeError::from(StorageError::Backend("disk full".into()));
		assert_eq!(error_chain(&err), "storage backend error: disk full");
	}

	#[test]
	fn not_authorized_maps_to_i18n_key() {
		assert_eq!(BridgeError::NotAuthorized.i18n_key(), Some(I18N_NOT_AUTHORISED));
		assert_eq!(BridgeError::NotAuthorized.user_message(), "Desktop connection not authorised");
	}

	#[test]
	fn transport_failures_hide_cause_from_user() {
		let err = BridgeError::ConnectionTest {
			source: TransportError::Status {
				status: 500,
				body: "stack trace".into(),
			},
		};
		assert_eq!(err.user_message(), "Desktop connection failed");
		assert!(error_chain(&err).contains("500"));
	}

	#[test]
	fn remote_errors_localize_by_code_not_text() {
		let err = BridgeError::Remote {
			message: "Background task failed: Desktop connection failed: desktop responded with status 401".into(),
			code: Some(I18N_CONNECTION_FAILED.into()),
		};
		assert_eq!(err.i18n_key(), Some(I18N_CONNECTION_FAILED));
		assert_eq!(err.user_message(), "Desktop connection failed");

		let uncoded = BridgeError::Remote {
			message: "Background task failed: Desktop connection not authorised".into(),
			code: None,
		};
		assert_eq!(uncoded.i18n_key(), None);

		let unknown = BridgeError::Remote {
			message: "Background task failed: boom".into(),
			code: Some("error.code.something-else".into()),
		};
		assert_eq!(unknown.user_message(), "Background task failed: boom");
	}
}
