//! [`SqliteStore`] — the SQLite implementation of [`SafetyStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use safetrace_core::{
  alert::{Alert, AlertFilter, AlertStats, AlertStatus, NewAlert, StatusChange},
  contact::{Contact, NewContact, next_priority},
  location::{LocationUpdate, NewLocation},
  profile::{Profile, ProfileUpdate},
  store::SafetyStore,
};

use crate::{
  encode::{
    ALERT_COLUMNS, CONTACT_COLUMNS, LOCATION_COLUMNS, PROFILE_COLUMNS, RawAlert,
    RawContact, RawLocation, RawProfile, decode_dt, encode_dt, encode_uuid, now,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A SafeTrace store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SafetyStore impl ────────────────────────────────────────────────────────

impl SafetyStore for SqliteStore {
  type Error = Error;

  // ── Alerts ────────────────────────────────────────────────────────────────

  async fn create_alert(&self, input: NewAlert) -> Result<Alert> {
    let mut alert = Alert {
      alert_id:       Uuid::new_v4(),
      user_id:        input.user_id,
      reporter_name:  input.reporter_name,
      reporter_phone: input.reporter_phone,
      latitude:       input.latitude,
      longitude:      input.longitude,
      message:        input.message,
      kind:           input.kind,
      session_id:     input.session_id,
      status:         AlertStatus::Active,
      created_at:     now(),
      resolved_at:    None,
    };
    let row = alert.clone();

    let created_at: String = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Never let a new alert sort before an existing one, even if the
        // wall clock stepped backwards.
        let latest: Option<String> =
          tx.query_row("SELECT MAX(created_at) FROM alerts", [], |r| r.get(0))?;
        let mut created_at = encode_dt(row.created_at);
        if let Some(latest) = latest
          && latest > created_at
        {
          created_at = latest;
        }

        tx.execute(
          "INSERT INTO alerts (
             alert_id, user_id, reporter_name, reporter_phone,
             latitude, longitude, message, kind, session_id,
             status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active', ?10)",
          rusqlite::params![
            encode_uuid(row.alert_id),
            row.user_id.map(encode_uuid),
            row.reporter_name,
            row.reporter_phone,
            row.latitude,
            row.longitude,
            row.message,
            row.kind.as_ref(),
            row.session_id,
            created_at,
          ],
        )?;
        tx.commit()?;
        Ok(created_at)
      })
      .await?;

    alert.created_at = decode_dt(&created_at)?;
    Ok(alert)
  }

  async fn get_alert(&self, id: Uuid) -> Result<Option<Alert>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAlert> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE alert_id = ?1"),
              rusqlite::params![id_str],
              RawAlert::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAlert::into_alert).transpose()
  }

  async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>> {
    let user_str   = filter.user_id.map(encode_uuid);
    let status_str = filter.status.map(|s| s.as_ref().to_owned());
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val  = filter.limit.map_or(-1, |l| l as i64);
    let offset_val = filter.offset.unwrap_or(0) as i64;

    let raws: Vec<RawAlert> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ALERT_COLUMNS} FROM alerts
           WHERE (?1 IS NULL OR user_id = ?1)
             AND (?2 IS NULL OR status = ?2)
           ORDER BY created_at DESC, seq DESC
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_str, status_str, limit_val, offset_val],
            RawAlert::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAlert::into_alert).collect()
  }

  async fn update_status(&self, id: Uuid, target: AlertStatus) -> Result<StatusChange> {
    if !target.is_terminal() {
      return Err(
        safetrace_core::Error::invalid("an alert can only move to a terminal status")
          .into(),
      );
    }

    let id_str     = encode_uuid(id);
    let target_str = target.as_ref().to_owned();
    let at_str     = encode_dt(now());

    // The UPDATE and the read-back run in one transaction on the connection
    // thread, so exactly one concurrent caller observes `changed == 1`.
    let outcome: Option<(bool, RawAlert)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE alerts
           SET status = ?1, resolved_at = MAX(?2, created_at)
           WHERE alert_id = ?3 AND status = 'active'",
          rusqlite::params![target_str, at_str, id_str],
        )?;
        let raw = tx
          .query_row(
            &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE alert_id = ?1"),
            rusqlite::params![id_str],
            RawAlert::from_row,
          )
          .optional()?;
        tx.commit()?;
        Ok(raw.map(|r| (changed == 1, r)))
      })
      .await?;

    match outcome {
      None => Err(Error::AlertNotFound(id)),
      Some((true, raw)) => Ok(StatusChange::Applied(raw.into_alert()?)),
      Some((false, raw)) => Ok(StatusChange::AlreadyTerminal(raw.into_alert()?)),
    }
  }

  async fn alert_stats(&self, since: DateTime<Utc>) -> Result<AlertStats> {
    let since_str = encode_dt(since);

    let counts: [i64; 6] = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT
             COALESCE(SUM(status = 'active'), 0),
             COALESCE(SUM(status = 'resolved'), 0),
             COALESCE(SUM(status = 'cancelled'), 0),
             COUNT(*),
             COALESCE(SUM(created_at >= ?1), 0),
             (SELECT COUNT(*) FROM profiles)
           FROM alerts",
          rusqlite::params![since_str],
          |r| Ok([r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?]),
        )?)
      })
      .await?;

    let [active, resolved, cancelled, total, recent, users] = counts.map(|c| c as u64);
    Ok(AlertStats { active, resolved, cancelled, total, recent, users })
  }

  // ── Contacts ──────────────────────────────────────────────────────────────

  async fn add_contact(&self, input: NewContact) -> Result<Contact> {
    let input = input.normalize()?;
    let mut contact = Contact {
      contact_id:   Uuid::new_v4(),
      user_id:      input.user_id,
      name:         input.name,
      phone_number: input.phone_number,
      relationship: input.relationship,
      priority:     0,
      created_at:   now(),
    };
    let row = contact.clone();
    let requested = input.priority;

    // The inner `Err` is a rejected rank; the transaction is left uncommitted.
    let assigned: Result<u32> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let user_str = encode_uuid(row.user_id);

        let priority = match requested {
          Some(p) => {
            let taken = tx
              .query_row(
                "SELECT 1 FROM contacts WHERE user_id = ?1 AND priority = ?2",
                rusqlite::params![user_str, p],
                |_| Ok(()),
              )
              .optional()?
              .is_some();
            if taken {
              return Ok(Err(Error::PriorityTaken(p)));
            }
            p
          }
          None => {
            let highest: Option<u32> = tx.query_row(
              "SELECT MAX(priority) FROM contacts WHERE user_id = ?1",
              rusqlite::params![user_str],
              |r| r.get(0),
            )?;
            match next_priority(highest) {
              Ok(p) => p,
              Err(e) => return Ok(Err(e.into())),
            }
          }
        };

        tx.execute(
          "INSERT INTO contacts (
             contact_id, user_id, name, phone_number, relationship, priority, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_uuid(row.contact_id),
            user_str,
            row.name,
            row.phone_number,
            row.relationship,
            priority,
            encode_dt(row.created_at),
          ],
        )?;
        tx.commit()?;
        Ok(Ok(priority))
      })
      .await?;

    contact.priority = assigned?;
    Ok(contact)
  }

  async fn list_contacts(&self, user_id: Uuid) -> Result<Vec<Contact>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts WHERE user_id = ?1 ORDER BY priority ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], RawContact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  async fn delete_contact(&self, user_id: Uuid, contact_id: Uuid) -> Result<()> {
    let user_str    = encode_uuid(user_id);
    let contact_str = encode_uuid(contact_id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM contacts WHERE contact_id = ?1 AND user_id = ?2",
          rusqlite::params![contact_str, user_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::ContactNotFound(contact_id));
    }
    Ok(())
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn upsert_profile(&self, input: ProfileUpdate) -> Result<Profile> {
    let input   = input.normalize()?;
    let user_id = input.user_id;
    let at_str  = encode_dt(now());

    let raw: RawProfile = self
      .conn
      .call(move |conn| {
        let user_str = encode_uuid(input.user_id);
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO profiles (user_id, display_name, phone_number, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)
           ON CONFLICT (user_id) DO UPDATE SET
             display_name = excluded.display_name,
             phone_number = excluded.phone_number,
             updated_at   = excluded.updated_at",
          rusqlite::params![user_str, input.display_name, input.phone_number, at_str],
        )?;
        let raw = tx.query_row(
          &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
          rusqlite::params![user_str],
          RawProfile::from_row,
        )?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    tracing::debug!(%user_id, "profile saved");
    raw.into_profile()
  }

  async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
    let user_str = encode_uuid(user_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
              rusqlite::params![user_str],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_profiles(&self, limit: usize, offset: usize) -> Result<Vec<Profile>> {
    let limit_val  = limit as i64;
    let offset_val = offset as i64;

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles
           ORDER BY created_at DESC, seq DESC
           LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val, offset_val], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  // ── Locations ─────────────────────────────────────────────────────────────

  async fn record_location(&self, input: NewLocation) -> Result<LocationUpdate> {
    input.validate()?;
    let update = LocationUpdate {
      location_id: Uuid::new_v4(),
      user_id:     input.user_id,
      latitude:    input.latitude,
      longitude:   input.longitude,
      accuracy:    input.accuracy,
      recorded_at: now(),
      alert_id:    input.alert_id,
    };
    let row = update.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO location_updates (
             location_id, user_id, latitude, longitude, accuracy, recorded_at, alert_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_uuid(row.location_id),
            encode_uuid(row.user_id),
            row.latitude,
            row.longitude,
            row.accuracy,
            encode_dt(row.recorded_at),
            row.alert_id.map(encode_uuid),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(update)
  }

  async fn list_locations(&self, user_id: Uuid, limit: usize) -> Result<Vec<LocationUpdate>> {
    let user_str  = encode_uuid(user_id);
    let limit_val = limit as i64;

    let raws: Vec<RawLocation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LOCATION_COLUMNS} FROM location_updates
           WHERE user_id = ?1
           ORDER BY seq DESC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, limit_val], RawLocation::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLocation::into_location).collect()
  }
}
