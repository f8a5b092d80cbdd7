//! Handlers for anonymous submissions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/sos` | Body: [`SosBody`]; returns 201 + stored alert |
//! | `POST` | `/track` | Body: [`TrackBody`]; returns 201 + stored alert |
//!
//! Any client-supplied timestamp is ignored; the store assigns `created_at`.

use axum::{Json, extract::State, http::StatusCode};
use safetrace_core::{
  alert::{Alert, AlertKind, AlertSubmission},
  store::SafetyStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError, extract::ApiJson};

#[derive(Debug, Deserialize)]
pub struct SosBody {
  pub name:      Option<String>,
  pub phone:     Option<String>,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
  pub message:   Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackBody {
  pub session_id: Option<String>,
  pub name:       Option<String>,
  pub phone:      Option<String>,
  pub latitude:   Option<f64>,
  pub longitude:  Option<f64>,
  pub message:    Option<String>,
}

fn ensure_enabled<S>(state: &AppState<S>) -> Result<(), ApiError> {
  if state.settings.allow_anonymous {
    Ok(())
  } else {
    Err(ApiError::Forbidden("anonymous submissions are disabled".into()))
  }
}

/// `POST /sos`
pub async fn sos<S>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<SosBody>,
) -> Result<(StatusCode, Json<Alert>), ApiError>
where
  S: SafetyStore + 'static,
{
  ensure_enabled(&state)?;
  let alert = state
    .service
    .submit(AlertSubmission {
      user_id:        None,
      reporter_name:  body.name,
      reporter_phone: body.phone,
      latitude:       body.latitude,
      longitude:      body.longitude,
      message:        body.message,
      kind:           AlertKind::Sos,
      session_id:     None,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(alert)))
}

/// `POST /track`
pub async fn track<S>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<TrackBody>,
) -> Result<(StatusCode, Json<Alert>), ApiError>
where
  S: SafetyStore + 'static,
{
  ensure_enabled(&state)?;
  let alert = state
    .service
    .submit(AlertSubmission {
      user_id:        None,
      reporter_name:  body.name,
      reporter_phone: body.phone,
      latitude:       body.latitude,
      longitude:      body.longitude,
      message:        body.message,
      kind:           AlertKind::Tracking,
      session_id:     body.session_id,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(alert)))
}
