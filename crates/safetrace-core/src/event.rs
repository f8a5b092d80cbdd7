//! Alert change events and the sink the alert service publishes them to.
//!
//! The sink is called after a mutation has been committed. Delivery to
//! subscribers is best-effort: a subscriber that falls behind or disconnects
//! misses events and is expected to re-fetch the alert list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::alert::Alert;

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
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EventKind {
  AlertCreated,
  AlertUpdated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
  pub kind:       EventKind,
  /// Snapshot of the alert as committed.
  pub alert:      Alert,
  pub emitted_at: DateTime<Utc>,
}

impl AlertEvent {
  pub fn created(alert: Alert) -> Self {
    Self { kind: EventKind::AlertCreated, alert, emitted_at: Utc::now() }
  }

  pub fn updated(alert: Alert) -> Self {
    Self { kind: EventKind::AlertUpdated, alert, emitted_at: Utc::now() }
  }
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// Which events a subscriber wants to see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscription {
  /// Only events for alerts owned by this user. `None` sees every alert.
  pub owner: Option<Uuid>,
  /// Only these event kinds. Empty means all kinds.
  pub kinds: Vec<EventKind>,
}

impl Subscription {
  pub fn all() -> Self { Self::default() }

  pub fn for_owner(user_id: Uuid) -> Self {
    Self { owner: Some(user_id), kinds: Vec::new() }
  }

  pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
    self.kinds = kinds.into_iter().collect();
    self
  }

  pub fn matches(&self, event: &AlertEvent) -> bool {
    if !self.kinds.is_empty() && !self.kinds.contains(&event.kind) {
      return false;
    }
    match self.owner {
      Some(owner) => event.alert.is_owned_by(owner),
      None => true,
    }
  }
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Receives committed alert changes.
///
/// `publish` must not block: it runs on the request path, after the store
/// write and before the response.
pub trait EventSink: Send + Sync {
  fn publish(&self, event: AlertEvent);
}

/// A sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
  fn publish(&self, _event: AlertEvent) {}
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alert::{AlertKind, AlertStatus};

  fn alert(owner: Option<Uuid>) -> Alert {
    Alert {
      alert_id:       Uuid::new_v4(),
      user_id:        owner,
      reporter_name:  None,
      reporter_phone: None,
      latitude:       1.0,
      longitude:      2.0,
      message:        "help".into(),
      kind:           AlertKind::Sos,
      session_id:     None,
      status:         AlertStatus::Active,
      created_at:     Utc::now(),
      resolved_at:    None,
    }
  }

  #[test]
  fn owner_predicate_filters_other_users() {
    let me = Uuid::new_v4();
    let sub = Subscription::for_owner(me);
    assert!(sub.matches(&AlertEvent::created(alert(Some(me)))));
    assert!(!sub.matches(&AlertEvent::created(alert(Some(Uuid::new_v4())))));
    assert!(!sub.matches(&AlertEvent::created(alert(None))));
  }

  #[test]
  fn unfiltered_subscription_sees_everything() {
    let sub = Subscription::all();
    assert!(sub.matches(&AlertEvent::created(alert(None))));
    assert!(sub.matches(&AlertEvent::updated(alert(Some(Uuid::new_v4())))));
  }

  #[test]
  fn kind_filter() {
    let sub = Subscription::all().with_kinds([EventKind::AlertUpdated]);
    assert!(!sub.matches(&AlertEvent::created(alert(None))));
    assert!(sub.matches(&AlertEvent::updated(alert(None))));
  }

  #[test]
  fn kind_wire_names() {
    let json = serde_json::to_value(EventKind::AlertCreated).unwrap();
    assert_eq!(json, serde_json::json!("alert-created"));
    assert_eq!(EventKind::AlertUpdated.as_ref(), "alert-updated");
    assert_eq!(
      "alert-updated".parse::<EventKind>().unwrap(),
      EventKind::AlertUpdated
    );
  }
}
