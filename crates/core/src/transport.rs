//! HTTP transport to the desktop companion.
//!
//! One request, one parsed JSON reply. No retries happen here; callers decide
//! whether a failure is worth repeating.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, trace};
use url::Url;

use crate::config::BridgeConfig;
use crate::error::TransportError;

/// Issues requests to the desktop companion.
#[async_trait]
pub trait DesktopTransport: Send + Sync {
	/// Sends `method path` with an optional JSON body and bearer token.
	///
	/// For `GET`, `body` must be a flat object and is sent as query parameters.
	async fn send(
		&self,
		method: Method,
		path: &str,
		body: Option<Value>,
		auth_token: Option<&str>,
	) -> Result<Value, TransportError>;
}

/// [`DesktopTransport`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
	base_url: Url,
}

impl HttpTransport {
	/// `base_url` must be an origin such as `http://localhost:12822`; one
	/// with a path is rejected.
	pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, TransportError> {
		let base_url = Url::parse(base_url).map_err(|source| TransportError::InvalidPath {
			path: base_url.to_string(),
			source,
		})?;
		if base_url.path() != "/" {
			return Err(TransportError::BaseUrlHasPath {
				url: base_url.to_string(),
			});
		}
		let client = reqwest::Client::builder()
			.timeout(request_timeout)
			.build()
			.map_err(TransportError::Request)?;
		Ok(Self { client, base_url })
	}

	pub fn from_config(config: &BridgeConfig) -> Result<Self, TransportError> {
		Self::new(&config.desktop_url, config.request_timeout())
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
		self.base_url.join(path).map_err(|source| TransportError::InvalidPath {
			path: path.to_string(),
			source,
		})
	}
}

#[async_trait]
impl DesktopTransport for HttpTransport {
	async fn send(
		&self,
		method: Method,
		path: &str,
		body: Option<Value>,
		auth_token: Option<&str>,
	) -> Result<Value, TransportError> {
		let url = self.endpoint(path)?;
		debug!(target: "vaultlink.transport", %method, path, authenticated = auth_token.is_some(), "desktop request");

		let mut request = self.client.request(method.clone(), url);
		if let Some(body) = body {
			request = if method == Method::GET {
				request.query(&query_pairs(body)?)
			} else {
				request.json(&body)
			};
		}
		if let Some(token) = auth_token {
			request = request.bearer_auth(token);
		}

		let response = request.send().await.map_err(TransportError::Request)?;
		let status = response.status();
		let text = response.text().await.map_err(TransportError::Request)?;
		trace!(target: "vaultlink.transport", status = status.as_u16(), bytes = text.len(), "desktop response");

		if !status.is_success() {
			return Err(TransportError::Status {
				status: status.as_u16(),
				body: text,
			});
		}
		parse_body(&text)
	}
}

/// Flattens a JSON object into query pairs. Strings are sent verbatim, other
/// scalars in their JSON form.
fn query_pairs(body: Value) -> Result<Vec<(String, String)>, TransportError> {
	let Value::Object(map) = body else {
		return Err(TransportError::InvalidQuery);
	};
	map.into_iter()
		.map(|(key, value)| match value {
			Value::String(s) => Ok((key, s)),
			Value::Bool(_) | Value::Number(_) => Ok((key, value.to_string())),
			Value::Null | Value::Array(_) | Value::Object(_) => Err(TransportError::InvalidQuery),
		})
		.collect()
}

/// An empty success body stands for `{}`.
fn parse_body(text: &str) -> Result<Value, TransportError> {
	if text.trim().is_empty() {
		return Ok(Value::Object(Map::new()));
	}
	serde_json::from_str(text).map_err(TransportError::Decode)
}
