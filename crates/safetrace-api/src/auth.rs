//! HTTP Basic-auth extractor and standalone verifier.
//!
//! Accounts are configured with an argon2 password hash, the user id their
//! data is stored under, and an explicit [`Role`].

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use safetrace_core::{alert::Alert, profile::Role, store::SafetyStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// One login accepted by this server instance.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub user_id:       Uuid,
  #[serde(default)]
  pub role:          Role,
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
  pub accounts: Vec<AccountConfig>,
}

impl AuthConfig {
  pub fn new(accounts: Vec<AccountConfig>) -> Self { Self { accounts } }

  fn find(&self, username: &str) -> Option<&AccountConfig> {
    self.accounts.iter().find(|a| a.username == username)
  }
}

/// The authenticated principal of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
  pub user_id: Uuid,
  pub role:    Role,
}

impl Caller {
  pub fn is_admin(&self) -> bool { self.role.is_admin() }

  pub fn require_admin(&self) -> Result<(), ApiError> {
    if self.is_admin() {
      Ok(())
    } else {
      Err(ApiError::Forbidden("administrator role required".into()))
    }
  }

  /// Admins see every alert; users only their own.
  pub fn can_see(&self, alert: &Alert) -> bool {
    self.is_admin() || alert.is_owned_by(self.user_id)
  }

  /// The owner filter to apply to listings made by this caller.
  pub fn scope(&self) -> Option<Uuid> {
    (!self.is_admin()).then_some(self.user_id)
  }
}

/// Verify credentials directly from headers.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<Caller, ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(ApiError::unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or_else(ApiError::unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::unauthorized())?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| ApiError::unauthorized())?;

  let (username, password) = creds.split_once(':').ok_or_else(ApiError::unauthorized)?;

  let account = config.find(username).ok_or_else(ApiError::unauthorized)?;

  let parsed_hash = PasswordHash::new(&account.password_hash)
    .map_err(|_| ApiError::unauthorized())?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::unauthorized())?;

  Ok(Caller { user_id: account.user_id, role: account.role })
}

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: SafetyStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let caller = verify_auth(&parts.headers, &state.auth)?;
    tracing::debug!(user_id = %caller.user_id, role = ?caller.role, "authenticated");
    Ok(caller)
  }
}
