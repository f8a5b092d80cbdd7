//! Alerts — the record at the centre of the SOS lifecycle.
//!
//! An alert is created `active` and may move exactly once to a terminal
//! status. Terminal alerts are never modified again, and no alert is ever
//! deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Message stored when the submitter does not supply one.
pub const DEFAULT_MESSAGE: &str = "Emergency SOS Alert Triggered";

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertStatus {
  Active,
  Resolved,
  /// Reserved. The store supports the transition but no endpoint triggers it.
  Cancelled,
}

impl AlertStatus {
  pub fn is_terminal(self) -> bool { !matches!(self, Self::Active) }
}

/// What produced the alert.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertKind {
  /// An explicit SOS trigger.
  #[default]
  Sos,
  /// A periodic location ping from a tracking session.
  Tracking,
}

// ─── Alert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
  pub alert_id:       Uuid,
  /// `None` only for anonymous submissions through the public endpoints.
  pub user_id:        Option<Uuid>,
  pub reporter_name:  Option<String>,
  pub reporter_phone: Option<String>,
  pub latitude:       f64,
  pub longitude:      f64,
  pub message:        String,
  pub kind:           AlertKind,
  pub session_id:     Option<String>,
  pub status:         AlertStatus,
  /// Store-assigned; never taken from the client.
  pub created_at:     DateTime<Utc>,
  pub resolved_at:    Option<DateTime<Utc>>,
}

impl Alert {
  /// A link that opens the alert position in a map viewer.
  pub fn maps_url(&self) -> String { maps_url(self.latitude, self.longitude) }

  pub fn is_owned_by(&self, user_id: Uuid) -> bool {
    self.user_id == Some(user_id)
  }
}

pub fn maps_url(latitude: f64, longitude: f64) -> String {
  format!("https://maps.google.com/maps?q={latitude},{longitude}")
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// Raw alert input as received from a client; every field may be missing.
///
/// [`AlertSubmission::validate`] turns it into a [`NewAlert`] the store
/// accepts.
#[derive(Debug, Clone, Default)]
pub struct AlertSubmission {
  pub user_id:        Option<Uuid>,
  pub reporter_name:  Option<String>,
  pub reporter_phone: Option<String>,
  pub latitude:       Option<f64>,
  pub longitude:      Option<f64>,
  pub message:        Option<String>,
  pub kind:           AlertKind,
  pub session_id:     Option<String>,
}

impl AlertSubmission {
  pub fn validate(self) -> Result<NewAlert> {
    let latitude = self
      .latitude
      .ok_or_else(|| Error::invalid("latitude is required"))?;
    let longitude = self
      .longitude
      .ok_or_else(|| Error::invalid("longitude is required"))?;
    check_coordinates(latitude, longitude)?;

    let reporter_name = non_blank(self.reporter_name);
    if self.user_id.is_none() && reporter_name.is_none() {
      return Err(Error::invalid("either a user or a reporter name is required"));
    }

    let session_id = non_blank(self.session_id);
    if self.kind == AlertKind::Tracking && session_id.is_none() {
      return Err(Error::invalid("session_id is required for tracking pings"));
    }

    Ok(NewAlert {
      user_id: self.user_id,
      reporter_name,
      reporter_phone: non_blank(self.reporter_phone),
      latitude,
      longitude,
      message: non_blank(self.message)
        .unwrap_or_else(|| DEFAULT_MESSAGE.to_owned()),
      kind: self.kind,
      session_id,
    })
  }
}

/// Validated input to [`crate::store::SafetyStore::create_alert`].
/// The id, status and timestamps are always set by the store.
#[derive(Debug, Clone)]
pub struct NewAlert {
  pub user_id:        Option<Uuid>,
  pub reporter_name:  Option<String>,
  pub reporter_phone: Option<String>,
  pub latitude:       f64,
  pub longitude:      f64,
  pub message:        String,
  pub kind:           AlertKind,
  pub session_id:     Option<String>,
}

pub(crate) fn check_coordinates(latitude: f64, longitude: f64) -> Result<()> {
  if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
    return Err(Error::invalid("latitude must be between -90 and 90"));
  }
  if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
    return Err(Error::invalid("longitude must be between -180 and 180"));
  }
  Ok(())
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

// ─── Queries and results ─────────────────────────────────────────────────────

/// Parameters for [`crate::store::SafetyStore::list_alerts`].
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
  /// Restrict to alerts owned by this user.
  pub user_id: Option<Uuid>,
  pub status:  Option<AlertStatus>,
  pub limit:   Option<usize>,
  pub offset:  Option<usize>,
}

/// Result of a guarded status transition.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
  /// This call moved the alert out of `active`.
  Applied(Alert),
  /// The alert had already reached a terminal status; nothing was written.
  AlreadyTerminal(Alert),
}

impl StatusChange {
  pub fn changed(&self) -> bool { matches!(self, Self::Applied(_)) }

  pub fn alert(&self) -> &Alert {
    match self {
      Self::Applied(a) | Self::AlreadyTerminal(a) => a,
    }
  }

  pub fn into_alert(self) -> Alert {
    match self {
      Self::Applied(a) | Self::AlreadyTerminal(a) => a,
    }
  }
}

/// Aggregate counters for the admin console.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStats {
  pub active:    u64,
  pub resolved:  u64,
  pub cancelled: u64,
  pub total:     u64,
  /// Alerts created at or after the `since` bound passed to the store.
  pub recent:    u64,
  pub users:     u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn submission() -> AlertSubmission {
    AlertSubmission {
      reporter_name: Some("Ann".into()),
      latitude: Some(37.0),
      longitude: Some(-122.0),
      ..Default::default()
    }
  }

  #[test]
  fn valid_submission_gets_default_message() {
    let new = submission().validate().unwrap();
    assert_eq!(new.message, DEFAULT_MESSAGE);
    assert_eq!(new.reporter_name.as_deref(), Some("Ann"));
    assert_eq!(new.kind, AlertKind::Sos);
  }

  #[test]
  fn missing_coordinates_are_rejected() {
    let mut s = submission();
    s.latitude = None;
    let err = s.validate().unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::InvalidInput);

    let mut s = submission();
    s.longitude = None;
    assert!(matches!(s.validate(), Err(Error::InvalidInput(_))));
  }

  #[test]
  fn zero_coordinates_are_valid() {
    let mut s = submission();
    s.latitude = Some(0.0);
    s.longitude = Some(0.0);
    assert!(s.validate().is_ok());
  }

  #[test]
  fn out_of_range_coordinates_are_rejected() {
    let mut s = submission();
    s.latitude = Some(91.0);
    assert!(matches!(s.validate(), Err(Error::InvalidInput(_))));

    let mut s = submission();
    s.longitude = Some(f64::NAN);
    assert!(matches!(s.validate(), Err(Error::InvalidInput(_))));
  }

  #[test]
  fn anonymous_submission_needs_a_name() {
    let mut s = submission();
    s.reporter_name = Some("   ".into());
    assert!(matches!(s.clone().validate(), Err(Error::InvalidInput(_))));

    s.user_id = Some(Uuid::new_v4());
    let new = s.validate().unwrap();
    assert_eq!(new.reporter_name, None);
  }

  #[test]
  fn tracking_ping_needs_session() {
    let mut s = submission();
    s.kind = AlertKind::Tracking;
    assert!(matches!(s.clone().validate(), Err(Error::InvalidInput(_))));

    s.session_id = Some("walk-home-42".into());
    let new = s.validate().unwrap();
    assert_eq!(new.session_id.as_deref(), Some("walk-home-42"));
  }

  #[test]
  fn status_strings() {
    assert_eq!(AlertStatus::Resolved.as_ref(), "resolved");
    assert_eq!("cancelled".parse::<AlertStatus>().unwrap(), AlertStatus::Cancelled);
    assert!(!AlertStatus::Active.is_terminal());
    assert!(AlertStatus::Resolved.is_terminal());
  }

  #[test]
  fn maps_url_format() {
    assert_eq!(
      maps_url(37.5, -122.25),
      "https://maps.google.com/maps?q=37.5,-122.25"
    );
  }
}
