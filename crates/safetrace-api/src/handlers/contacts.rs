//! Handlers for `/api/contacts` endpoints. Callers only ever see and change
//! their own contacts.

use axum::{Json, extract::State, http::StatusCode};
use safetrace_core::{
  contact::{Contact, NewContact},
  store::SafetyStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Caller,
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

/// `GET /api/contacts` — priority ascending.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
) -> Result<Json<Vec<Contact>>, ApiError>
where
  S: SafetyStore + 'static,
{
  let contacts = state
    .store()
    .list_contacts(caller.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(contacts))
}

#[derive(Debug, Deserialize)]
pub struct NewContactBody {
  pub name:         String,
  #[serde(default)]
  pub phone_number: String,
  pub relationship: Option<String>,
  /// Next free rank when omitted.
  pub priority:     Option<u32>,
}

/// `POST /api/contacts` — returns 201 + the stored contact.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiJson(body): ApiJson<NewContactBody>,
) -> Result<(StatusCode, Json<Contact>), ApiError>
where
  S: SafetyStore + 'static,
{
  let contact = state
    .store()
    .add_contact(NewContact {
      user_id:      caller.user_id,
      name:         body.name,
      phone_number: body.phone_number,
      relationship: body.relationship,
      priority:     body.priority,
    })
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(contact)))
}

/// `DELETE /api/contacts/{id}` — 204 on success.
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiPath(contact_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: SafetyStore + 'static,
{
  state
    .store()
    .delete_contact(caller.user_id, contact_id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
