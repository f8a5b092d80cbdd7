//! JSON API and realtime stream for SafeTrace.
//!
//! Exposes an axum [`Router`] backed by any [`SafetyStore`]. Callers
//! authenticate with HTTP Basic credentials from [`auth::AuthConfig`];
//! TLS is the deployment's responsibility.
//!
//! # Routes
//!
//! | Method | Path | Who |
//! |--------|------|-----|
//! | `POST` | `/sos`, `/track` | anyone, unless anonymous submissions are disabled |
//! | `GET`, `POST` | `/api/alerts` | users (own alerts), admins (all) |
//! | `GET` | `/api/alerts/{id}` | owner, admin |
//! | `POST` | `/api/alerts/{id}/resolve` | admin |
//! | `POST` | `/api/alerts/{id}/notify` | owner, admin |
//! | `GET` | `/api/events` | users, admins (SSE) |
//! | `GET`, `POST` | `/api/contacts` | users |
//! | `DELETE` | `/api/contacts/{id}` | users |
//! | `GET`, `PUT` | `/api/profile` | users |
//! | `GET`, `POST` | `/api/locations` | users |
//! | `GET` | `/api/admin/users`, `/api/admin/stats` | admin |

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod realtime;
pub mod worker;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use safetrace_core::{
  notify::{Notifier, Transport},
  service::AlertService,
  store::SafetyStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use auth::AuthConfig;
use handlers::{admin, alerts, contacts, events, locations, profile, public};
use realtime::Hub;

// ─── Settings ────────────────────────────────────────────────────────────────

/// Tunables for the HTTP surface, deserialised from the `[api]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
  /// Accept `/sos` and `/track` without credentials.
  pub allow_anonymous:     bool,
  /// Upper bound on alerts returned by one listing.
  pub alerts_page_size:    usize,
  /// Upper bound on profiles returned by the admin user listing.
  pub users_page_size:     usize,
  /// Upper bound on location updates returned by one history request.
  pub locations_page_size: usize,
  /// Events buffered per realtime subscriber.
  pub event_capacity:      usize,
}

impl Default for ApiSettings {
  fn default() -> Self {
    Self {
      allow_anonymous:     true,
      alerts_page_size:    20,
      users_page_size:     15,
      locations_page_size: safetrace_core::location::DEFAULT_HISTORY_LIMIT,
      event_capacity:      realtime::DEFAULT_CAPACITY,
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub service:  AlertService<S>,
  pub notifier: Notifier<S>,
  pub hub:      Hub,
  pub auth:     Arc<AuthConfig>,
  pub settings: Arc<ApiSettings>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      service:  self.service.clone(),
      notifier: self.notifier.clone(),
      hub:      self.hub.clone(),
      auth:     self.auth.clone(),
      settings: self.settings.clone(),
    }
  }
}

impl<S: SafetyStore + 'static> AppState<S> {
  /// Wire the alert service to a fresh realtime hub.
  pub fn new(
    store: Arc<S>,
    transport: Arc<dyn Transport>,
    auth: AuthConfig,
    settings: ApiSettings,
  ) -> Self {
    let hub = Hub::new(settings.event_capacity);
    Self {
      service:  AlertService::new(store.clone(), Arc::new(hub.clone())),
      notifier: Notifier::new(store, transport),
      hub,
      auth:     Arc::new(auth),
      settings: Arc::new(settings),
    }
  }

  pub fn store(&self) -> &Arc<S> { self.service.store() }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the complete SafeTrace router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SafetyStore + 'static,
{
  Router::new()
    // Anonymous submissions
    .route("/sos", post(public::sos::<S>))
    .route("/track", post(public::track::<S>))
    // Alerts
    .route("/api/alerts", get(alerts::list::<S>).post(alerts::create::<S>))
    .route("/api/alerts/{id}", get(alerts::get_one::<S>))
    .route("/api/alerts/{id}/resolve", post(alerts::resolve::<S>))
    .route("/api/alerts/{id}/notify", post(alerts::notify::<S>))
    // Realtime
    .route("/api/events", get(events::stream::<S>))
    // Contacts, profile, locations
    .route("/api/contacts", get(contacts::list::<S>).post(contacts::create::<S>))
    .route("/api/contacts/{id}", delete(contacts::remove::<S>))
    .route("/api/profile", get(profile::get_own::<S>).put(profile::update::<S>))
    .route("/api/locations", get(locations::list::<S>).post(locations::record::<S>))
    // Admin
    .route("/api/admin/users", get(admin::users::<S>))
    .route("/api/admin/stats", get(admin::stats::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
