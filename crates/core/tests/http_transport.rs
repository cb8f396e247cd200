//! HttpTransport against a local stand-in for the desktop companion.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Method;
use serde_json::{Value, json};
use vaultlink::protocol::{SenderContext, storage_keys};
use vaultlink::{
	BridgeError, DesktopSession, DesktopTransport, HttpTransport, LocalStore, MemoryStore, MessageClient,
	MessageRouter, TransportError,
};

const TOKEN: &str = "companion-token";

fn authorised(headers: &HeaderMap) -> bool {
	headers
		.get("authorization")
		.and_then(|value| value.to_str().ok())
		.is_some_and(|value| value == format!("Bearer {TOKEN}"))
}

async fn auth_request(Json(body): Json<Value>) -> StatusCode {
	if body["client"] == "browser" && body["purpose"] == "vaults-access" {
		StatusCode::OK
	} else {
		StatusCode::BAD_REQUEST
	}
}

async fn auth_response(Json(body): Json<Value>) -> Json<Value> {
	match body["code"].as_str() {
		Some("4821") => Json(json!({"token": TOKEN})),
		_ => Json(json!({"token": null})),
	}
}

async fn auth_test(headers: HeaderMap) -> StatusCode {
	if authorised(&headers) { StatusCode::OK } else { StatusCode::UNAUTHORIZED }
}

async fn otps(headers: HeaderMap) -> (StatusCode, Json<Value>) {
	if !authorised(&headers) {
		return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorised"})));
	}
	(StatusCode::OK, Json(json!({"otps": [{"secret": "JBSWY3DPEHPK3PXP"}]})))
}

async fn entries(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
	if !authorised(&headers) {
		return (StatusCode::UNAUTHORIZED, Json(json!({})));
	}
	(StatusCode::OK, Json(json!({"results": [{"echo": query}]})))
}

async fn lock(headers: HeaderMap, Path(source_id): Path<String>) -> (StatusCode, Json<Value>) {
	if !authorised(&headers) {
		return (StatusCode::UNAUTHORIZED, Json(json!({})));
	}
	(StatusCode::OK, Json(json!({"locked": source_id == "s1" || source_id == "my vault"})))
}

async fn broken() -> &'static str {
	"<html>not json</html>"
}

async fn spawn_companion() -> String {
	let app = Router::new()
		.route("/v1/auth/request", post(auth_request))
		.route("/v1/auth/response", post(auth_response))
		.route("/v1/auth/test", post(auth_test))
		.route("/v1/otps", get(otps))
		.route("/v1/entries", get(entries))
		.route("/v1/vaults/{id}/lock", post(lock))
		.route("/v1/broken", get(broken));

	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	format!("http://{addr}")
}

async fn transport() -> Arc<HttpTransport> {
	let base = spawn_companion().await;
	Arc::new(HttpTransport::new(&base, Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn empty_success_body_reads_as_empty_object() {
	let transport = transport().await;
	let body = json!({"client": "browser", "purpose": "vaults-access", "rev": 1});

	let reply = transport.send(Method::POST, "/v1/auth/request", Some(body), None).await.unwrap();
	assert_eq!(reply, json!({}));
}

#[tokio::test]
async fn get_body_travels_as_query_string() {
	let transport = transport().await;
	let reply = transport
		.send(Method::GET, "/v1/entries", Some(json!({"type": "term", "term": "git hub"})), Some(TOKEN))
		.await
		.unwrap();
	assert_eq!(reply, json!({"results": [{"echo": {"type": "term", "term": "git hub"}}]}));
}

#[tokio::test]
async fn missing_bearer_is_a_status_error() {
	let transport = transport().await;
	match transport.send(Method::GET, "/v1/otps", None, None).await {
		Err(TransportError::Status { status, body }) => {
			assert_eq!(status, 401);
			assert!(body.contains("unauthorised"));
		}
		other => panic!("expected status error, got {other:?}"),
	}
}

#[tokio::test]
async fn non_json_success_is_a_decode_error() {
	let transport = transport().await;
	let result = transport.send(Method::GET, "/v1/broken", None, None).await;
	assert!(matches!(result, Err(TransportError::Decode(_))));
}

#[tokio::test]
async fn unreachable_companion_is_a_request_error() {
	// Bind then drop, so the port is very likely closed.
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);

	let transport = HttpTransport::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
	let result = transport.send(Method::POST, "/v1/auth/test", None, Some(TOKEN)).await;
	assert!(matches!(result, Err(TransportError::Request(_))));
}

#[tokio::test]
async fn session_pairs_and_reads_through_http() {
	let transport = transport().await;
	let store = Arc::new(MemoryStore::new());
	let session = DesktopSession::new(transport, store.clone());

	session.initiate_connection().await.unwrap();
	assert!(matches!(
		session.authenticate_browser_access("0000").await,
		Err(BridgeError::AuthExchange)
	));

	let token = session.authenticate_browser_access("4821").await.unwrap();
	assert_eq!(token, TOKEN);
	// The session itself never persists the token.
	assert!(!session.has_connection().await.unwrap());

	store.set(storage_keys::DESKTOP_TOKEN, &token).await.unwrap();
	session.test_auth().await.unwrap();
	assert_eq!(session.get_otps().await.unwrap().len(), 1);
	assert!(session.prompt_source_lock("s1").await.unwrap());
}

#[tokio::test]
async fn source_id_with_space_reaches_companion_intact() {
	let transport = transport().await;
	let store = Arc::new(MemoryStore::new());
	store.set(storage_keys::DESKTOP_TOKEN, TOKEN).await.unwrap();
	let session = DesktopSession::new(transport, store);

	assert!(session.prompt_source_lock("my vault").await.unwrap());
	assert!(!session.prompt_source_lock("my+vault").await.unwrap());
}

#[tokio::test]
async fn revoked_token_fails_connection_test() {
	let transport = transport().await;
	let store = Arc::new(MemoryStore::new());
	store.set(storage_keys::DESKTOP_TOKEN, "stale").await.unwrap();
	let session = DesktopSession::new(transport, store);

	let err = session.test_auth().await.unwrap_err();
	assert!(matches!(
		err,
		BridgeError::ConnectionTest {
			source: TransportError::Status { status: 401, .. }
		}
	));
	assert_eq!(err.user_message(), "Desktop connection failed");
}

#[tokio::test]
async fn client_reaches_companion_through_router() {
	let transport = transport().await;
	let store = Arc::new(MemoryStore::new());
	let handle = MessageRouter::new(transport, store).spawn();
	let client = MessageClient::new(Arc::new(handle), SenderContext::extension_page());

	client.initiate_desktop_connection().await.unwrap();
	client.authenticate_desktop_connection("4821").await.unwrap();
	assert!(client.check_desktop_connection().await.unwrap());

	let otps = client.get_otps().await.unwrap();
	assert_eq!(otps[0].get("secret"), Some(&json!("JBSWY3DPEHPK3PXP")));

	let results = client.search_entries_by_url("https://github.com").await.unwrap();
	assert_eq!(results[0].get("echo"), Some(&json!({"type": "url", "url": "https://github.com"})));
}
