//! Admin console endpoints.

use axum::{Json, extract::State};
use chrono::{Duration, Utc};
use safetrace_core::{alert::AlertStats, profile::Profile, store::SafetyStore};
use serde::Deserialize;

use crate::{AppState, auth::Caller, error::ApiError, extract::ApiQuery};

/// Window counted as "recent" by [`stats`].
const RECENT_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /api/admin/users` — profiles, newest first.
pub async fn users<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Vec<Profile>>, ApiError>
where
  S: SafetyStore + 'static,
{
  caller.require_admin()?;
  let page = state.settings.users_page_size;
  let profiles = state
    .store()
    .list_profiles(params.limit.unwrap_or(page).min(page), params.offset.unwrap_or(0))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(profiles))
}

/// `GET /api/admin/stats`
pub async fn stats<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
) -> Result<Json<AlertStats>, ApiError>
where
  S: SafetyStore + 'static,
{
  caller.require_admin()?;
  let since = Utc::now() - Duration::hours(RECENT_WINDOW_HOURS);
  let stats = state.store().alert_stats(since).await.map_err(ApiError::store)?;
  Ok(Json(stats))
}
