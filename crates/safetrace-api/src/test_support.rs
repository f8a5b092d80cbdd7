//! Fixtures shared by the crate's tests.

use std::sync::{Arc, Mutex, OnceLock};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand_core::OsRng;
use safetrace_core::{
  contact::Contact,
  notify::{DeliveryResult, OutboundMessage, Transport},
  profile::Role,
};
use safetrace_store_sqlite::SqliteStore;
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{
  ApiSettings, AppState,
  auth::{AccountConfig, AuthConfig},
  router,
};

pub const ADMIN_ID: Uuid = Uuid::from_u128(0xad);
pub const USER_ID:  Uuid = Uuid::from_u128(0xa1);
pub const OTHER_ID: Uuid = Uuid::from_u128(0xb2);

/// Every account's password is `secret`.
pub fn auth_config() -> AuthConfig {
  static HASH: OnceLock<String> = OnceLock::new();
  let hash = HASH.get_or_init(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(b"secret", &salt)
      .unwrap()
      .to_string()
  });

  let account = |username: &str, user_id, role| AccountConfig {
    username: username.to_string(),
    password_hash: hash.clone(),
    user_id,
    role,
  };
  AuthConfig::new(vec![
    account("admin", ADMIN_ID, Role::Admin),
    account("ann", USER_ID, Role::User),
    account("bo", OTHER_ID, Role::User),
  ])
}

pub fn basic(user: &str, pass: &str) -> String {
  format!("Basic {}", B64.encode(format!("{user}:{pass}")))
}

/// Records the phone number of every message it is asked to deliver.
#[derive(Default)]
pub struct RecordingTransport {
  sent: Mutex<Vec<String>>,
}

impl RecordingTransport {
  pub fn sent(&self) -> Vec<String> { self.sent.lock().unwrap().clone() }
}

#[async_trait]
impl Transport for RecordingTransport {
  async fn send(&self, contact: &Contact, _message: &OutboundMessage) -> DeliveryResult {
    self.sent.lock().unwrap().push(contact.phone_number.clone());
    DeliveryResult::Sent
  }
}

pub async fn make_state(settings: ApiSettings) -> (AppState<SqliteStore>, Arc<RecordingTransport>) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let transport = Arc::new(RecordingTransport::default());
  let state = AppState::new(Arc::new(store), transport.clone(), auth_config(), settings);
  (state, transport)
}

/// Send one request through a fresh router. `user` of `None` sends no
/// credentials.
pub async fn call(
  state:  &AppState<SqliteStore>,
  method: &str,
  uri:    &str,
  user:   Option<&str>,
  body:   Option<serde_json::Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(user) = user {
    builder = builder.header("authorization", basic(user, "secret"));
  }
  let body = match body {
    Some(json) => {
      builder = builder.header("content-type", "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
}

pub async fn json_body(resp: Response) -> serde_json::Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}
