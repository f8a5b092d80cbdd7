//! Error types for `safetrace-core`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// The four kinds every error is reported as, whatever layer raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  /// Missing or malformed required fields; the caller can fix the request.
  InvalidInput,
  NotFound,
  /// The backing store could not be reached. Never retried.
  StorageUnavailable,
  Unauthorized,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("alert not found: {0}")]
  AlertNotFound(Uuid),

  #[error("contact not found: {0}")]
  ContactNotFound(Uuid),

  #[error("profile not found: {0}")]
  ProfileNotFound(Uuid),

  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("unauthorized: {0}")]
  Unauthorized(String),
}

impl Error {
  pub fn invalid(message: impl Into<String>) -> Self {
    Self::InvalidInput(message.into())
  }

  pub fn storage(message: impl Into<String>) -> Self {
    Self::StorageUnavailable(message.into().into())
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidInput(_) => ErrorKind::InvalidInput,
      Self::AlertNotFound(_)
      | Self::ContactNotFound(_)
      | Self::ProfileNotFound(_) => ErrorKind::NotFound,
      Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
      Self::Unauthorized(_) => ErrorKind::Unauthorized,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
