//! The `SafetyStore` trait.
//!
//! The trait is implemented by storage backends (`safetrace-store-sqlite`,
//! [`crate::memory::MemoryStore`]). Higher layers depend on this abstraction,
//! not on any concrete backend; the server picks one from configuration.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  alert::{Alert, AlertFilter, AlertStats, AlertStatus, NewAlert, StatusChange},
  contact::{Contact, NewContact},
  location::{LocationUpdate, NewLocation},
  profile::{Profile, ProfileUpdate},
};

/// Abstraction over a SafeTrace storage backend.
///
/// Alerts are addressed by id only. Status changes are conditional on the
/// alert still being `active`, so concurrent writers cannot both win.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SafetyStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Alerts ────────────────────────────────────────────────────────────

  /// Persist a new alert. The store assigns the id and `created_at` and
  /// forces the status to `active`.
  fn create_alert(
    &self,
    input: NewAlert,
  ) -> impl Future<Output = Result<Alert, Self::Error>> + Send + '_;

  /// Retrieve an alert by id. Returns `None` if not found.
  fn get_alert(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Alert>, Self::Error>> + Send + '_;

  /// List alerts newest first. Alerts with equal timestamps are ordered by
  /// insertion, latest first.
  fn list_alerts<'a>(
    &'a self,
    filter: &'a AlertFilter,
  ) -> impl Future<Output = Result<Vec<Alert>, Self::Error>> + Send + 'a;

  /// Move an `active` alert to the terminal status `target`.
  ///
  /// Returns [`StatusChange::AlreadyTerminal`] without writing anything if
  /// the alert has already left `active`, and a not-found error if the id is
  /// unknown. `target` must be terminal.
  fn update_status(
    &self,
    id: Uuid,
    target: AlertStatus,
  ) -> impl Future<Output = Result<StatusChange, Self::Error>> + Send + '_;

  /// Counters for the admin console; `recent` counts alerts created at or
  /// after `since`.
  fn alert_stats(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<AlertStats, Self::Error>> + Send + '_;

  // ── Contacts ──────────────────────────────────────────────────────────

  /// Add a contact. Fails with invalid input if the priority is taken.
  fn add_contact(
    &self,
    input: NewContact,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  /// All contacts of `user_id`, priority ascending.
  fn list_contacts(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  /// Delete one of `user_id`'s contacts. A contact owned by someone else is
  /// reported as not found.
  fn delete_contact(
    &self,
    user_id: Uuid,
    contact_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Profiles ──────────────────────────────────────────────────────────

  fn upsert_profile(
    &self,
    input: ProfileUpdate,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Profiles newest first.
  fn list_profiles(
    &self,
    limit: usize,
    offset: usize,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + '_;

  // ── Locations ─────────────────────────────────────────────────────────

  fn record_location(
    &self,
    input: NewLocation,
  ) -> impl Future<Output = Result<LocationUpdate, Self::Error>> + Send + '_;

  /// The latest `limit` updates of `user_id`, newest first.
  fn list_locations(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<LocationUpdate>, Self::Error>> + Send + '_;
}
