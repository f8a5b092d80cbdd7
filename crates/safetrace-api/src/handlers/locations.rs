//! Handlers for `/api/locations`.

use axum::{Json, extract::State, http::StatusCode};
use safetrace_core::{
  location::{LocationUpdate, NewLocation},
  store::SafetyStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Caller,
  error::ApiError,
  extract::{ApiJson, ApiQuery},
};

#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
  pub limit: Option<usize>,
}

/// `GET /api/locations[?limit=...]` — the caller's trail, newest first,
/// capped at `locations_page_size`.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiQuery(params): ApiQuery<HistoryParams>,
) -> Result<Json<Vec<LocationUpdate>>, ApiError>
where
  S: SafetyStore + 'static,
{
  let page = state.settings.locations_page_size;
  let limit = params.limit.unwrap_or(page).min(page);
  let updates = state
    .store()
    .list_locations(caller.user_id, limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(updates))
}

#[derive(Debug, Deserialize)]
pub struct LocationBody {
  pub latitude:  f64,
  pub longitude: f64,
  pub accuracy:  Option<f64>,
  pub alert_id:  Option<Uuid>,
}

/// `POST /api/locations` — returns 201 + the stored update.
pub async fn record<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiJson(body): ApiJson<LocationBody>,
) -> Result<(StatusCode, Json<LocationUpdate>), ApiError>
where
  S: SafetyStore + 'static,
{
  let update = state
    .store()
    .record_location(NewLocation {
      user_id:   caller.user_id,
      latitude:  body.latitude,
      longitude: body.longitude,
      accuracy:  body.accuracy,
      alert_id:  body.alert_id,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(update)))
}
