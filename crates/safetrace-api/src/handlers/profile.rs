//! Handlers for `/api/profile`.

use axum::{Json, extract::State};
use safetrace_core::{
  Error,
  profile::{Profile, ProfileUpdate},
  store::SafetyStore,
};
use serde::Deserialize;

use crate::{AppState, auth::Caller, error::ApiError, extract::ApiJson};

/// `GET /api/profile` — 404 until the caller has saved one.
pub async fn get_own<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
) -> Result<Json<Profile>, ApiError>
where
  S: SafetyStore + 'static,
{
  let profile = state
    .store()
    .get_profile(caller.user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(Error::ProfileNotFound(caller.user_id))?;
  Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
pub struct ProfileBody {
  pub display_name: String,
  pub phone_number: Option<String>,
}

/// `PUT /api/profile` — create or replace the caller's profile.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiJson(body): ApiJson<ProfileBody>,
) -> Result<Json<Profile>, ApiError>
where
  S: SafetyStore + 'static,
{
  let profile = state
    .store()
    .upsert_profile(ProfileUpdate {
      user_id:      caller.user_id,
      display_name: body.display_name,
      phone_number: body.phone_number,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(profile))
}
