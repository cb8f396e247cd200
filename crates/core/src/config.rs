//! Runtime configuration for the background context.
//!
//! Resolution order: built-in defaults, then `~/.config/vaultlink/config.json`
//! if it exists, then the `VAULTLINK_DESKTOP_URL` environment variable. Front
//! ends apply their own flags on top.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vaultlink_protocol::DESKTOP_API_PORT;

use crate::error::ConfigError;

/// Environment variable overriding [`BridgeConfig::desktop_url`].
pub const DESKTOP_URL_ENV: &str = "VAULTLINK_DESKTOP_URL";

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
	/// Origin of the desktop companion API, without a path.
	pub desktop_url: String,
	pub request_timeout_ms: u64,
	/// Key-value store file. `None` uses [`BridgeConfig::default_store_path`].
	#[serde(skip_serializing_if = "Option::is_none")]
	pub store_path: Option<PathBuf>,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			desktop_url: format!("http://localhost:{DESKTOP_API_PORT}"),
			request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
			store_path: None,
		}
	}
}

impl BridgeConfig {
	/// `~/.config/vaultlink/config.json` (platform equivalent elsewhere).
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("vaultlink").join("config.json"))
	}

	pub fn default_store_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("vaultlink").join("store.json"))
	}

	/// Loads the default config file and applies environment overrides.
	pub fn load() -> Result<Self, ConfigError> {
		let config = match Self::default_path() {
			Some(path) => Self::load_from(&path)?,
			None => Self::default(),
		};
		Ok(config.with_env_overrides(|name| std::env::var(name).ok()))
	}

	/// Loads `path`, falling back to defaults when it does not exist.
	pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
		let content = match fs::read_to_string(path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
			Err(source) => {
				return Err(ConfigError::Read {
					path: path.to_path_buf(),
					source,
				});
			}
		};
		serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}

	pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
		if let Some(url) = lookup(DESKTOP_URL_ENV).filter(|url| !url.trim().is_empty()) {
			self.desktop_url = url;
		}
		self
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}

	pub fn resolved_store_path(&self) -> Option<PathBuf> {
		self.store_path.clone().or_else(Self::default_store_path)
	}
}
