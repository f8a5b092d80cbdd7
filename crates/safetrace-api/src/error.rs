//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape `{"kind": "...", "error": "..."}` where
//! `kind` is one of the four [`ErrorKind`] names.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use safetrace_core::{Error, ErrorKind};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] Error),

  /// The caller is authenticated but may not perform the operation.
  #[error("forbidden: {0}")]
  Forbidden(String),
}

impl ApiError {
  /// Wrap a backend error via its conversion into the core error.
  pub fn store<E: Into<Error>>(e: E) -> Self { Self::Core(e.into()) }

  pub fn invalid(message: impl Into<String>) -> Self {
    Self::Core(Error::invalid(message))
  }

  pub fn unauthorized() -> Self {
    Self::Core(Error::Unauthorized("valid credentials required".into()))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Forbidden(_) => ErrorKind::Unauthorized,
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      Self::Forbidden(_) => StatusCode::FORBIDDEN,
      Self::Core(e) => match e.kind() {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status == StatusCode::SERVICE_UNAVAILABLE {
      tracing::error!(error = %self, "storage failure");
    }

    let body = Json(json!({ "kind": self.kind(), "error": self.to_string() }));
    let mut res = (status, body).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"safetrace\""),
      );
    }
    res
  }
}

// Extractor rejections are client mistakes; report them as invalid input
// rather than with axum's plain-text bodies.

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { Self::invalid(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { Self::invalid(r.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self { Self::invalid(r.body_text()) }
}
