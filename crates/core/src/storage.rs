//! Local key-value store seam.
//!
//! The background context persists a handful of named string values: the
//! desktop session token, the user configuration and the disabled-domain
//! list. [`LocalStore`] is the only interface the runtime sees; the browser's
//! own storage area, [`FileStore`] and [`MemoryStore`] all sit behind it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::error::StorageError;

/// Asynchronous named-value storage. Every operation may fail.
#[async_trait]
pub trait LocalStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

	async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

	/// Removing a missing key is not an error.
	async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Reads a JSON-encoded value.
pub async fn get_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Result<Option<T>, StorageError> {
	match store.get(key).await? {
		Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|source| StorageError::Value {
			key: key.to_string(),
			source,
		}),
		None => Ok(None),
	}
}

/// Writes a value as JSON.
pub async fn set_json<T: Serialize + ?Sized>(store: &dyn LocalStore, key: &str, value: &T) -> Result<(), StorageError> {
	let raw = serde_json::to_string(value).map_err(|source| StorageError::Value {
		key: key.to_string(),
		source,
	})?;
	store.set(key, &raw).await
}

/// In-process store. Contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
	values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl LocalStore for MemoryStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.values.lock().await.get(key).cloned())
	}

	async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		self.values.lock().await.insert(key.to_string(), value.to_string());
		Ok(())
	}

	async fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.values.lock().await.remove(key);
		Ok(())
	}
}

/// Store backed by a single JSON object file.
///
/// The file holds the session token, so it is written owner-only on unix.
/// A missing file reads as empty; writes create parent directories.
#[derive(Debug)]
pub struct FileStore {
	path: PathBuf,
	lock: Mutex<()>,
}

impl FileStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			lock: Mutex::new(()),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
		let content = match fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
			Err(source) => {
				return Err(StorageError::Read {
					path: self.path.clone(),
					source,
				});
			}
		};
		if content.trim().is_empty() {
			return Ok(BTreeMap::new());
		}
		serde_json::from_str(&content).map_err(|source| StorageError::Corrupt {
			path: self.path.clone(),
			source,
		})
	}

	fn save(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
		let write_err = |source| StorageError::Write {
			path: self.path.clone(),
			source,
		};
		if let Some(parent) = self.path.parent() {
			if !parent.as_os_str().is_empty() {
				fs::create_dir_all(parent).map_err(write_err)?;
			}
		}
		let content = serde_json::to_string_pretty(values).map_err(|source| StorageError::Corrupt {
			path: self.path.clone(),
			source,
		})?;
		fs::write(&self.path, content).map_err(write_err)?;
		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600)).map_err(write_err)?;
		}
		Ok(())
	}
}

#[async_trait]
impl LocalStore for FileStore {
	async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		let _guard = self.lock.lock().await;
		Ok(self.load()?.remove(key))
	}

	async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		let _guard = self.lock.lock().await;
		let mut values = self.load()?;
		values.insert(key.to_string(), value.to_string());
		self.save(&values)
	}

	async fn remove(&self, key: &str) -> Result<(), StorageError> {
		let _guard = self.lock.lock().await;
		let mut values = self.load()?;
		if values.remove(key).is_some() {
			self.save(&values)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	#[tokio::test]
	async fn memory_store_set_get_remove() {
		let store = MemoryStore::new();
		assert_eq!(store.get("k").await.unwrap(), None);
		store.set("k", "v").await.unwrap();
		assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
		store.remove("k").await.unwrap();
		store.remove("k").await.unwrap();
		assert_eq!(store.get("k").await.unwrap(), None);
	}

	#[tokio::test]
	async fn file_store_missing_file_reads_empty() {
		let tmp = TempDir::new().unwrap();
		let store = FileStore::new(tmp.path().join("nested/store.json"));
		assert_eq!(store.get("desktopToken").await.unwrap(), None);
		store.remove("desktopToken").await.unwrap();
		assert!(!store.path().exists());
	}

	#[tokio::test]
	async fn file_store_persists_across_instances() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("nested/store.json");

		FileStore::new(&path).set("desktopToken", "abc").await.unwrap();

		let reopened = FileStore::new(&path);
		assert_eq!(reopened.get("desktopToken").await.unwrap().as_deref(), Some("abc"));

		#[cfg(unix)]
		{
			use std::os::unix::fs::PermissionsExt;
			let mode = fs::metadata(&path).unwrap().permissions().mode();
			assert_eq!(mode & 0o777, 0o600);
		}
	}

	#[tokio::test]
	async fn file_store_reports_corrupt_file() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("store.json");
		fs::write(&path, "not json").unwrap();

		let err = FileStore::new(&path).get("desktopToken").await.unwrap_err();
		assert!(matches!(err, StorageError::Corrupt { .. }));
	}

	#[tokio::test]
	async fn json_helpers_round_trip_lists() {
		let store = MemoryStore::new();
		set_json(&store, "disabledDomains", &vec!["example.com"]).await.unwrap();
		let domains: Option<Vec<String>> = get_json(&store, "disabledDomains").await.unwrap();
		assert_eq!(domains, Some(vec!["example.com".to_string()]));
	}
}
