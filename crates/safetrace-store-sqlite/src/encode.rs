//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (UTC, microseconds)
//! so that lexical order is chronological order. Enums are stored as their
//! lowercase names. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use safetrace_core::{
  alert::{Alert, AlertKind, AlertStatus},
  contact::Contact,
  location::LocationUpdate,
  profile::Profile,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<AlertStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown alert status: {s:?}")))
}

pub fn decode_kind(s: &str) -> Result<AlertKind> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown alert kind: {s:?}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const ALERT_COLUMNS: &str = "alert_id, user_id, reporter_name, reporter_phone, \
   latitude, longitude, message, kind, session_id, status, created_at, resolved_at";

/// Raw values read directly from an `alerts` row.
pub struct RawAlert {
  pub alert_id:       String,
  pub user_id:        Option<String>,
  pub reporter_name:  Option<String>,
  pub reporter_phone: Option<String>,
  pub latitude:       f64,
  pub longitude:      f64,
  pub message:        String,
  pub kind:           String,
  pub session_id:     Option<String>,
  pub status:         String,
  pub created_at:     String,
  pub resolved_at:    Option<String>,
}

impl RawAlert {
  /// Map a row selected with [`ALERT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      alert_id:       row.get(0)?,
      user_id:        row.get(1)?,
      reporter_name:  row.get(2)?,
      reporter_phone: row.get(3)?,
      latitude:       row.get(4)?,
      longitude:      row.get(5)?,
      message:        row.get(6)?,
      kind:           row.get(7)?,
      session_id:     row.get(8)?,
      status:         row.get(9)?,
      created_at:     row.get(10)?,
      resolved_at:    row.get(11)?,
    })
  }

  pub fn into_alert(self) -> Result<Alert> {
    Ok(Alert {
      alert_id:       decode_uuid(&self.alert_id)?,
      user_id:        self.user_id.as_deref().map(decode_uuid).transpose()?,
      reporter_name:  self.reporter_name,
      reporter_phone: self.reporter_phone,
      latitude:       self.latitude,
      longitude:      self.longitude,
      message:        self.message,
      kind:           decode_kind(&self.kind)?,
      session_id:     self.session_id,
      status:         decode_status(&self.status)?,
      created_at:     decode_dt(&self.created_at)?,
      resolved_at:    self.resolved_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub const CONTACT_COLUMNS: &str =
  "contact_id, user_id, name, phone_number, relationship, priority, created_at";

pub struct RawContact {
  pub contact_id:   String,
  pub user_id:      String,
  pub name:         String,
  pub phone_number: String,
  pub relationship: Option<String>,
  pub priority:     u32,
  pub created_at:   String,
}

impl RawContact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      contact_id:   row.get(0)?,
      user_id:      row.get(1)?,
      name:         row.get(2)?,
      phone_number: row.get(3)?,
      relationship: row.get(4)?,
      priority:     row.get(5)?,
      created_at:   row.get(6)?,
    })
  }

  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      contact_id:   decode_uuid(&self.contact_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      name:         self.name,
      phone_number: self.phone_number,
      relationship: self.relationship,
      priority:     self.priority,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const PROFILE_COLUMNS: &str =
  "user_id, display_name, phone_number, created_at, updated_at";

pub struct RawProfile {
  pub user_id:      String,
  pub display_name: String,
  pub phone_number: Option<String>,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:      row.get(0)?,
      display_name: row.get(1)?,
      phone_number: row.get(2)?,
      created_at:   row.get(3)?,
      updated_at:   row.get(4)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      user_id:      decode_uuid(&self.user_id)?,
      display_name: self.display_name,
      phone_number: self.phone_number,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub const LOCATION_COLUMNS: &str =
  "location_id, user_id, latitude, longitude, accuracy, recorded_at, alert_id";

pub struct RawLocation {
  pub location_id: String,
  pub user_id:     String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub accuracy:    Option<f64>,
  pub recorded_at: String,
  pub alert_id:    Option<String>,
}

impl RawLocation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      location_id: row.get(0)?,
      user_id:     row.get(1)?,
      latitude:    row.get(2)?,
      longitude:   row.get(3)?,
      accuracy:    row.get(4)?,
      recorded_at: row.get(5)?,
      alert_id:    row.get(6)?,
    })
  }

  pub fn into_location(self) -> Result<LocationUpdate> {
    Ok(LocationUpdate {
      location_id: decode_uuid(&self.location_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      latitude:    self.latitude,
      longitude:   self.longitude,
      accuracy:    self.accuracy,
      recorded_at: decode_dt(&self.recorded_at)?,
      alert_id:    self.alert_id.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = decode_dt("2026-01-01T00:00:00.5Z").unwrap();
    let b = decode_dt("2026-01-01T00:00:00.123456Z").unwrap();
    assert!(encode_dt(b) < encode_dt(a));
    assert_eq!(encode_dt(a), "2026-01-01T00:00:00.500000Z");
  }

  #[test]
  fn now_roundtrips_exactly() {
    let t = now();
    assert_eq!(decode_dt(&encode_dt(t)).unwrap(), t);
  }
}
