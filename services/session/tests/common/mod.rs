//! Common Test Utilities for Integration Tests
//!
//! An in-process fake of the storefront authentication API. Tests configure
//! which tokens it accepts, then inspect the requests it recorded.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use ::common::{CredentialStore, MemoryStore, StoreError, StoreResult};
use serde_json::{Value, json};
use session::client::paths;

/// A request the fake API received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

/// Fake storefront API state
#[derive(Default)]
pub struct FakeApi {
    valid_access: Mutex<HashSet<String>>,
    refresh_grants: Mutex<HashMap<String, Value>>,
    login_response: Mutex<Option<Value>>,
    profiles: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<RecordedRequest>>,
    reject_account_requests: AtomicBool,
    stall_verify: AtomicBool,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Accept `access` at the verify endpoint
    pub fn accept_access(&self, access: &str) {
        self.valid_access.lock().unwrap().insert(access.to_string());
    }

    /// Answer a refresh with `refresh` by returning `response`
    pub fn grant_refresh(&self, refresh: &str, response: Value) {
        self.refresh_grants
            .lock()
            .unwrap()
            .insert(refresh.to_string(), response);
    }

    /// Answer every login with `response`
    pub fn accept_login(&self, response: Value) {
        *self.login_response.lock().unwrap() = Some(response);
    }

    /// Serve `profile` to requests authorized with `access`
    pub fn serve_profile(&self, access: &str, profile: Value) {
        self.profiles
            .lock()
            .unwrap()
            .insert(access.to_string(), profile);
    }

    pub fn reject_account_requests(&self) {
        self.reject_account_requests.store(true, Ordering::SeqCst);
    }

    /// Make the verify endpoint hang well past any client timeout
    pub fn stall_verify(&self) {
        self.stall_verify.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.path).collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    fn record(&self, uri: &Uri, headers: &HeaderMap, body: Value) {
        self.requests.lock().unwrap().push(RecordedRequest {
            path: uri.path().to_string(),
            authorization: headers
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string),
            body,
        });
    }
}

type Reply = (StatusCode, Json<Value>);

fn token_not_valid() -> Reply {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "detail": "Token is invalid or expired",
            "code": "token_not_valid"
        })),
    )
}

async fn verify(
    State(api): State<Arc<FakeApi>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    api.record(&uri, &headers, body.clone());

    if api.stall_verify.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }

    let token = body["token"].as_str().unwrap_or_default();
    if api.valid_access.lock().unwrap().contains(token) {
        (StatusCode::OK, Json(json!({})))
    } else {
        token_not_valid()
    }
}

async fn refresh(
    State(api): State<Arc<FakeApi>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    api.record(&uri, &headers, body.clone());

    let token = body["refresh"].as_str().unwrap_or_default();
    match api.refresh_grants.lock().unwrap().get(token) {
        Some(response) => (StatusCode::OK, Json(response.clone())),
        None => token_not_valid(),
    }
}

async fn create(
    State(api): State<Arc<FakeApi>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    api.record(&uri, &headers, body);

    match api.login_response.lock().unwrap().clone() {
        Some(response) => (StatusCode::OK, Json(response)),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "detail": "No active account found with the given credentials"
            })),
        ),
    }
}

async fn me(State(api): State<Arc<FakeApi>>, uri: Uri, headers: HeaderMap) -> Reply {
    api.record(&uri, &headers, Value::Null);

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split_once(' '))
        .map(|(_, token)| token.to_string())
        .unwrap_or_default();

    match api.profiles.lock().unwrap().get(&token) {
        Some(profile) => (StatusCode::OK, Json(profile.clone())),
        None => token_not_valid(),
    }
}

async fn account(
    State(api): State<Arc<FakeApi>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    api.record(&uri, &headers, body);

    if api.reject_account_requests.load(Ordering::SeqCst) {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "non_field_errors": ["Invalid request"] })),
        )
            .into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

/// Create the fake API router
pub fn create_test_app(api: Arc<FakeApi>) -> Router {
    Router::new()
        .route(paths::VERIFY, post(verify))
        .route(paths::REFRESH, post(refresh))
        .route(paths::CREATE, post(create))
        .route(paths::ME, get(me))
        .route(paths::USERS, post(account))
        .route(paths::ACTIVATION, post(account))
        .route(paths::RESET_PASSWORD, post(account))
        .route(paths::RESET_PASSWORD_CONFIRM, post(account))
        .route(paths::RESET_EMAIL, post(account))
        .route(paths::RESET_EMAIL_CONFIRM, post(account))
        .with_state(api)
}

/// Serve the fake API on an ephemeral port and return its base URL
pub async fn spawn_fake_api(api: Arc<FakeApi>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake api");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, create_test_app(api))
            .await
            .expect("fake api server");
    });

    format!("http://{}", addr)
}

/// Base URL of a port nothing is listening on
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

/// Credential store that serves reads but fails every write, like a full disk
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    entries: MemoryStore,
}

impl ReadOnlyStore {
    pub fn with_entries(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: MemoryStore::with_entries(entries.iter().copied()),
        }
    }
}

impl CredentialStore for ReadOnlyStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.entries.get(key)
    }

    fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }

    fn remove(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }
}
