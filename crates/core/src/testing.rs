//! Test doubles for the background runtime.
//!
//! - [`StubTransport`]: scripted [`DesktopTransport`] that records every call
//! - [`FailingStore`]: [`LocalStore`] whose operations all fail
//!
//! # Example
//!
//! ```ignore
//! use vaultlink::testing::StubTransport;
//!
//! let transport = Arc::new(StubTransport::new());
//! transport.reply("GET", "/v1/otps", json!({"otps": []}));
//! let session = DesktopSession::new(transport.clone(), store);
//! session.get_otps().await?;
//! assert_eq!(transport.calls().len(), 1);
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;

use crate::error::{StorageError, TransportError};
use crate::storage::LocalStore;
use crate::transport::DesktopTransport;

/// A request observed by [`StubTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
	pub method: String,
	pub path: String,
	pub body: Option<Value>,
	pub auth_token: Option<String>,
}

#[derive(Debug, Clone)]
enum Scripted {
	Reply(Value),
	Status(u16),
}

/// Scripted desktop companion.
///
/// Routes are keyed by method and path. An unscripted route answers with a
/// 404 status error, so a test that forgets to script a call fails loudly.
#[derive(Debug, Default)]
pub struct StubTransport {
	routes: Mutex<HashMap<(String, String), Scripted>>,
	calls: Mutex<Vec<RecordedCall>>,
}

impl StubTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Answers `method path` with `body`.
	pub fn reply(&self, method: &str, path: &str, body: Value) {
		self.routes
			.lock()
			.insert((method.to_string(), path.to_string()), Scripted::Reply(body));
	}

	/// Answers `method path` with a non-success status.
	pub fn fail(&self, method: &str, path: &str, status: u16) {
		self.routes
			.lock()
			.insert((method.to_string(), path.to_string()), Scripted::Status(status));
	}

	/// Every call received so far, oldest first.
	pub fn calls(&self) -> Vec<RecordedCall> {
		self.calls.lock().clone()
	}
}

#[async_trait]
impl DesktopTransport for StubTransport {
	async fn send(
		&self,
		method: Method,
		path: &str,
		body: Option<Value>,
		auth_token: Option<&str>,
	) -> Result<Value, TransportError> {
		self.calls.lock().push(RecordedCall {
			method: method.to_string(),
			path: path.to_string(),
			body,
			auth_token: auth_token.map(str::to_string),
		});

		let scripted = self.routes.lock().get(&(method.to_string(), path.to_string())).cloned();
		match scripted {
			Some(Scripted::Reply(body)) => Ok(body),
			Some(Scripted::Status(status)) => Err(TransportError::Status {
				status,
				body: String::new(),
			}),
			None => Err(TransportError::Status {
				status: 404,
				body: format!("no stub for {method} {path}"),
			}),
		}
	}
}

/// Store whose every operation fails with `message`.
#[derive(Debug, Clone)]
pub struct FailingStore {
	message: String,
}

impl FailingStore {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}

	fn error(&self) -> StorageError {
		StorageError::Backend(self.message.clone())
	}
}

#[async_trait]
impl LocalStore for FailingStore {
	async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
		Err(self.error())
	}

	async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
		Err(self.error())
	}

	async fn remove(&self, _key: &str) -> Result<(), StorageError> {
		Err(self.error())
	}
}
