use std::sync::Arc;

use serde_json::Value;
use tracing::info;
use vaultlink_protocol::{Configuration, storage_keys};

use crate::error::{ConfigError, Result};
use crate::storage::{LocalStore, get_json, set_json};

/// User configuration, persisted as one JSON document.
///
/// The store is the source of truth; nothing is cached, so every context
/// sees the latest write.
#[derive(Clone)]
pub struct ConfigService {
	store: Arc<dyn LocalStore>,
}

impl ConfigService {
	pub fn new(store: Arc<dyn LocalStore>) -> Self {
		Self { store }
	}

	/// Current configuration; defaults when nothing was saved yet.
	pub async fn get(&self) -> Result<Configuration> {
		Ok(get_json(self.store.as_ref(), storage_keys::CONFIGURATION)
			.await?
			.unwrap_or_default())
	}

	/// Sets a single field by its wire name and persists the result.
	pub async fn set_value(&self, key: &str, value: Value) -> Result<Configuration> {
		let updated = apply_value(self.get().await?, key, value)?;
		set_json(self.store.as_ref(), storage_keys::CONFIGURATION, &updated).await?;
		info!(target: "vaultlink.config", key, "configuration updated");
		Ok(updated)
	}
}

fn apply_value(config: Configuration, key: &str, value: Value) -> std::result::Result<Configuration, ConfigError> {
	let invalid = |source| ConfigError::InvalidValue {
		key: key.to_string(),
		source,
	};
	let Value::Object(mut fields) = serde_json::to_value(&config).map_err(invalid)? else {
		return Err(ConfigError::UnknownKey(key.to_string()));
	};
	if !fields.contains_key(key) {
		return Err(ConfigError::UnknownKey(key.to_string()));
	}
	fields.insert(key.to_string(), value);
	serde_json::from_value(Value::Object(fields)).map_err(invalid)
}
