//! Error type for `safetrace-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] safetrace_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column could not be decoded into its domain type.
  #[error("decode error: {0}")]
  Decode(String),

  #[error("alert not found: {0}")]
  AlertNotFound(uuid::Uuid),

  #[error("contact not found: {0}")]
  ContactNotFound(uuid::Uuid),

  #[error("priority {0} is already in use")]
  PriorityTaken(u32),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for safetrace_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(e) => e,
      Error::AlertNotFound(id) => Self::AlertNotFound(id),
      Error::ContactNotFound(id) => Self::ContactNotFound(id),
      Error::PriorityTaken(_) => Self::InvalidInput(e.to_string()),
      Error::Database(ref db) if is_constraint_violation(db) => {
        Self::InvalidInput(e.to_string())
      }
      other => Self::StorageUnavailable(Box::new(other)),
    }
  }
}

fn is_constraint_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}
