//! [`MemoryStore`] — a process-local [`SafetyStore`].
//!
//! Records live in insertion-ordered vectors with a map from id to position;
//! every operation takes the lock once, so a status transition is a single
//! compare-and-swap. Nothing survives a restart.

use std::{
  collections::HashMap,
  sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  alert::{Alert, AlertFilter, AlertStats, AlertStatus, NewAlert, StatusChange},
  contact::{Contact, NewContact, next_priority},
  location::{LocationUpdate, NewLocation},
  profile::{Profile, ProfileUpdate},
  store::SafetyStore,
};

#[derive(Default)]
struct Inner {
  alerts:    Vec<Alert>,
  by_id:     HashMap<Uuid, usize>,
  contacts:  Vec<Contact>,
  profiles:  Vec<Profile>,
  locations: Vec<LocationUpdate>,
}

/// Cloning is cheap; clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
    self
      .inner
      .read()
      .map_err(|_| Error::storage("memory store lock poisoned"))
  }

  fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
    self
      .inner
      .write()
      .map_err(|_| Error::storage("memory store lock poisoned"))
  }
}

impl SafetyStore for MemoryStore {
  type Error = Error;

  // ── Alerts ────────────────────────────────────────────────────────────────

  async fn create_alert(&self, input: NewAlert) -> Result<Alert> {
    let mut inner = self.write()?;

    // Keep timestamps monotonic with insertion order.
    let mut created_at = Utc::now();
    if let Some(last) = inner.alerts.last()
      && last.created_at > created_at
    {
      created_at = last.created_at;
    }

    let alert = Alert {
      alert_id: Uuid::new_v4(),
      user_id: input.user_id,
      reporter_name: input.reporter_name,
      reporter_phone: input.reporter_phone,
      latitude: input.latitude,
      longitude: input.longitude,
      message: input.message,
      kind: input.kind,
      session_id: input.session_id,
      status: AlertStatus::Active,
      created_at,
      resolved_at: None,
    };

    let position = inner.alerts.len();
    inner.by_id.insert(alert.alert_id, position);
    inner.alerts.push(alert.clone());
    Ok(alert)
  }

  async fn get_alert(&self, id: Uuid) -> Result<Option<Alert>> {
    let inner = self.read()?;
    Ok(inner.by_id.get(&id).map(|&i| inner.alerts[i].clone()))
  }

  async fn list_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>> {
    let inner = self.read()?;
    Ok(
      inner
        .alerts
        .iter()
        .rev()
        .filter(|a| filter.user_id.is_none_or(|u| a.is_owned_by(u)))
        .filter(|a| filter.status.is_none_or(|s| a.status == s))
        .skip(filter.offset.unwrap_or(0))
        .take(filter.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect(),
    )
  }

  async fn update_status(
    &self,
    id: Uuid,
    target: AlertStatus,
  ) -> Result<StatusChange> {
    if !target.is_terminal() {
      return Err(Error::invalid("an alert can only move to a terminal status"));
    }

    let mut inner = self.write()?;
    let position = *inner.by_id.get(&id).ok_or(Error::AlertNotFound(id))?;
    let alert = &mut inner.alerts[position];

    if alert.status.is_terminal() {
      return Ok(StatusChange::AlreadyTerminal(alert.clone()));
    }

    alert.status = target;
    alert.resolved_at = Some(Utc::now().max(alert.created_at));
    Ok(StatusChange::Applied(alert.clone()))
  }

  async fn alert_stats(&self, since: DateTime<Utc>) -> Result<AlertStats> {
    let inner = self.read()?;
    let mut stats = AlertStats {
      total: inner.alerts.len() as u64,
      users: inner.profiles.len() as u64,
      ..Default::default()
    };
    for alert in &inner.alerts {
      match alert.status {
        AlertStatus::Active => stats.active += 1,
        AlertStatus::Resolved => stats.resolved += 1,
        AlertStatus::Cancelled => stats.cancelled += 1,
      }
      if alert.created_at >= since {
        stats.recent += 1;
      }
    }
    Ok(stats)
  }

  // ── Contacts ──────────────────────────────────────────────────────────────

  async fn add_contact(&self, input: NewContact) -> Result<Contact> {
    let input = input.normalize()?;
    let mut inner = self.write()?;

    let taken: Vec<u32> = inner
      .contacts
      .iter()
      .filter(|c| c.user_id == input.user_id)
      .map(|c| c.priority)
      .collect();

    let priority = match input.priority {
      Some(p) if taken.contains(&p) => {
        return Err(Error::invalid(format!("priority {p} is already in use")));
      }
      Some(p) => p,
      None => next_priority(taken.iter().copied().max())?,
    };

    let contact = Contact {
      contact_id: Uuid::new_v4(),
      user_id: input.user_id,
      name: input.name,
      phone_number: input.phone_number,
      relationship: input.relationship,
      priority,
      created_at: Utc::now(),
    };
    inner.contacts.push(contact.clone());
    Ok(contact)
  }

  async fn list_contacts(&self, user_id: Uuid) -> Result<Vec<Contact>> {
    let inner = self.read()?;
    let mut contacts: Vec<Contact> = inner
      .contacts
      .iter()
      .filter(|c| c.user_id == user_id)
      .cloned()
      .collect();
    contacts.sort_by_key(|c| c.priority);
    Ok(contacts)
  }

  async fn delete_contact(&self, user_id: Uuid, contact_id: Uuid) -> Result<()> {
    let mut inner = self.write()?;
    let position = inner
      .contacts
      .iter()
      .position(|c| c.contact_id == contact_id && c.user_id == user_id)
      .ok_or(Error::ContactNotFound(contact_id))?;
    inner.contacts.remove(position);
    Ok(())
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn upsert_profile(&self, input: ProfileUpdate) -> Result<Profile> {
    let input = input.normalize()?;
    let mut inner = self.write()?;
    let now = Utc::now();

    if let Some(existing) =
      inner.profiles.iter_mut().find(|p| p.user_id == input.user_id)
    {
      existing.display_name = input.display_name;
      existing.phone_number = input.phone_number;
      existing.updated_at = now;
      return Ok(existing.clone());
    }

    let profile = Profile {
      user_id:      input.user_id,
      display_name: input.display_name,
      phone_number: input.phone_number,
      created_at:   now,
      updated_at:   now,
    };
    inner.profiles.push(profile.clone());
    Ok(profile)
  }

  async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
    let inner = self.read()?;
    Ok(inner.profiles.iter().find(|p| p.user_id == user_id).cloned())
  }

  async fn list_profiles(&self, limit: usize, offset: usize) -> Result<Vec<Profile>> {
    let inner = self.read()?;
    Ok(
      inner
        .profiles
        .iter()
        .rev()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect(),
    )
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
      recorded_at: Utc::now(),
      alert_id:    input.alert_id,
    };
    self.write()?.locations.push(update.clone());
    Ok(update)
  }

  async fn list_locations(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> Result<Vec<LocationUpdate>> {
    let inner = self.read()?;
    Ok(
      inner
        .locations
        .iter()
        .rev()
        .filter(|l| l.user_id == user_id)
        .take(limit)
        .cloned()
        .collect(),
    )
  }
}
