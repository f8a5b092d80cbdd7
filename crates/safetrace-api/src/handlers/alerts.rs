//! Handlers for `/api/alerts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/alerts` | optional `status`, `limit`, `offset`; scoped to the caller unless admin |
//! | `POST` | `/api/alerts` | Body: [`CreateBody`]; returns 201 + stored alert |
//! | `GET`  | `/api/alerts/{id}` | owner or admin |
//! | `POST` | `/api/alerts/{id}/resolve` | admin; idempotent, returns [`ResolveResponse`] |
//! | `POST` | `/api/alerts/{id}/notify` | owner or admin; returns the notification report |

use axum::{Json, extract::State, http::StatusCode};
use safetrace_core::{
  alert::{Alert, AlertFilter, AlertKind, AlertStatus, AlertSubmission},
  notify::NotificationReport,
  store::SafetyStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::Caller,
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery},
};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub status: Option<AlertStatus>,
  /// Capped at the configured page size.
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /api/alerts[?status=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<Alert>>, ApiError>
where
  S: SafetyStore + 'static,
{
  let page = state.settings.alerts_page_size;
  let filter = AlertFilter {
    user_id: caller.scope(),
    status:  params.status,
    limit:   Some(params.limit.unwrap_or(page).min(page)),
    offset:  params.offset,
  };
  Ok(Json(state.service.list(&filter).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
  pub message:   Option<String>,
  /// Overrides the profile's display name for this alert.
  pub name:      Option<String>,
  /// Overrides the profile's phone number for this alert.
  pub phone:     Option<String>,
}

/// `POST /api/alerts` — an SOS on behalf of the caller.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<(StatusCode, Json<Alert>), ApiError>
where
  S: SafetyStore + 'static,
{
  let alert = state
    .service
    .submit(AlertSubmission {
      user_id:        Some(caller.user_id),
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

// ─── Get one ─────────────────────────────────────────────────────────────────

async fn visible_alert<S>(
  state: &AppState<S>,
  caller: &Caller,
  id: Uuid,
) -> Result<Alert, ApiError>
where
  S: SafetyStore + 'static,
{
  let alert = state.service.get(id).await?;
  if !caller.can_see(&alert) {
    return Err(ApiError::Forbidden(format!("alert {id} belongs to another user")));
  }
  Ok(alert)
}

/// `GET /api/alerts/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Alert>, ApiError>
where
  S: SafetyStore + 'static,
{
  Ok(Json(visible_alert(&state, &caller, id).await?))
}

// ─── Resolve ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveResponse {
  pub alert:   Alert,
  /// `false` when the alert was already terminal before this call.
  pub changed: bool,
}

/// `POST /api/alerts/{id}/resolve`
pub async fn resolve<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ResolveResponse>, ApiError>
where
  S: SafetyStore + 'static,
{
  caller.require_admin()?;
  let change = state.service.resolve(id).await?;
  let changed = change.changed();
  Ok(Json(ResolveResponse { alert: change.into_alert(), changed }))
}

// ─── Notify ──────────────────────────────────────────────────────────────────

/// `POST /api/alerts/{id}/notify` — fan the alert out to the owner's
/// contacts now and report per-contact outcomes.
pub async fn notify<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<NotificationReport>, ApiError>
where
  S: SafetyStore + 'static,
{
  let alert = visible_alert(&state, &caller, id).await?;
  Ok(Json(state.notifier.fan_out(&alert).await?))
}
