//! [`AlertService`] — the alert lifecycle on top of a [`SafetyStore`].
//!
//! Every committed change is handed to the [`EventSink`] before the call
//! returns, so for any single alert the creation event always precedes its
//! resolution event.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  alert::{Alert, AlertFilter, AlertStatus, AlertSubmission, StatusChange},
  event::{AlertEvent, EventSink},
  store::SafetyStore,
};

pub struct AlertService<S> {
  store:  Arc<S>,
  events: Arc<dyn EventSink>,
}

impl<S> Clone for AlertService<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), events: self.events.clone() }
  }
}

impl<S: SafetyStore> AlertService<S> {
  pub fn new(store: Arc<S>, events: Arc<dyn EventSink>) -> Self {
    Self { store, events }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Validate and persist a submission, then publish `alert-created`.
  ///
  /// Reporter details missing from an authenticated submission are filled
  /// in from the owner's profile.
  pub async fn submit(&self, submission: AlertSubmission) -> Result<Alert> {
    let mut input = submission.validate()?;

    if let Some(user_id) = input.user_id
      && (input.reporter_name.is_none() || input.reporter_phone.is_none())
      && let Some(profile) =
        self.store.get_profile(user_id).await.map_err(Into::<Error>::into)?
    {
      input.reporter_name.get_or_insert(profile.display_name);
      if let Some(phone) = profile.phone_number {
        input.reporter_phone.get_or_insert(phone);
      }
    }

    let alert = self
      .store
      .create_alert(input)
      .await
      .map_err(Into::<Error>::into)?;
    tracing::info!(
      alert_id = %alert.alert_id,
      kind = %alert.kind,
      user_id = ?alert.user_id,
      "alert created"
    );
    self.events.publish(AlertEvent::created(alert.clone()));
    Ok(alert)
  }

  pub async fn get(&self, id: Uuid) -> Result<Alert> {
    self
      .store
      .get_alert(id)
      .await
      .map_err(Into::<Error>::into)?
      .ok_or(Error::AlertNotFound(id))
  }

  pub async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>> {
    self.store.list_alerts(filter).await.map_err(Into::into)
  }

  /// Resolve an alert. Resolving an alert that is already terminal succeeds
  /// without writing or publishing anything.
  pub async fn resolve(&self, id: Uuid) -> Result<StatusChange> {
    let change = self
      .store
      .update_status(id, AlertStatus::Resolved)
      .await
      .map_err(Into::<Error>::into)?;

    if change.changed() {
      tracing::info!(alert_id = %id, "alert resolved");
      self.events.publish(AlertEvent::updated(change.alert().clone()));
    } else {
      tracing::debug!(
        alert_id = %id,
        status = %change.alert().status,
        "resolve on terminal alert ignored"
      );
    }
    Ok(change)
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;
  use crate::{
    event::EventKind,
    memory::MemoryStore,
    profile::ProfileUpdate,
  };

  #[derive(Default)]
  struct RecordingSink(Mutex<Vec<AlertEvent>>);

  impl EventSink for RecordingSink {
    fn publish(&self, event: AlertEvent) {
      self.0.lock().unwrap().push(event);
    }
  }

  impl RecordingSink {
    fn kinds(&self) -> Vec<EventKind> {
      self.0.lock().unwrap().iter().map(|e| e.kind).collect()
    }
  }

  fn service() -> (AlertService<MemoryStore>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let svc = AlertService::new(Arc::new(MemoryStore::new()), sink.clone());
    (svc, sink)
  }

  fn ann() -> AlertSubmission {
    AlertSubmission {
      reporter_name: Some("Ann".into()),
      latitude: Some(37.0),
      longitude: Some(-122.0),
      ..Default::default()
    }
  }

  #[tokio::test]
  async fn submit_list_resolve_end_to_end() {
    let (svc, sink) = service();

    let alert = svc.submit(ann()).await.unwrap();
    assert_eq!(alert.status, AlertStatus::Active);

    let listed = svc.list(&AlertFilter::default()).await.unwrap();
    assert_eq!(listed[0].alert_id, alert.alert_id);

    let change = svc.resolve(alert.alert_id).await.unwrap();
    assert!(change.changed());

    let listed = svc.list(&AlertFilter::default()).await.unwrap();
    assert_eq!(listed[0].status, AlertStatus::Resolved);
    let resolved_at = listed[0].resolved_at.unwrap();
    assert!(resolved_at >= listed[0].created_at);

    assert_eq!(sink.kinds(), [EventKind::AlertCreated, EventKind::AlertUpdated]);
  }

  #[tokio::test]
  async fn resolve_twice_is_idempotent() {
    let (svc, sink) = service();
    let alert = svc.submit(ann()).await.unwrap();

    let first = svc.resolve(alert.alert_id).await.unwrap();
    let second = svc.resolve(alert.alert_id).await.unwrap();
    assert!(first.changed());
    assert!(!second.changed());
    assert_eq!(first.alert(), second.alert());
    assert_eq!(sink.kinds().len(), 2);
  }

  #[tokio::test]
  async fn concurrent_resolves_transition_once() {
    let (svc, sink) = service();
    let alert = svc.submit(ann()).await.unwrap();

    let (a, b) = tokio::join!(svc.resolve(alert.alert_id), svc.resolve(alert.alert_id));
    let changes = [a.unwrap(), b.unwrap()];
    assert_eq!(changes.iter().filter(|c| c.changed()).count(), 1);
    assert!(changes.iter().all(|c| c.alert().status == AlertStatus::Resolved));
    assert_eq!(
      sink.kinds().iter().filter(|k| **k == EventKind::AlertUpdated).count(),
      1
    );
  }

  #[tokio::test]
  async fn resolve_unknown_is_not_found() {
    let (svc, sink) = service();
    let err = svc.resolve(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    assert!(sink.kinds().is_empty());
  }

  #[tokio::test]
  async fn invalid_submission_is_not_stored() {
    let (svc, sink) = service();
    let mut s = ann();
    s.latitude = None;
    assert!(matches!(svc.submit(s).await, Err(Error::InvalidInput(_))));
    assert!(svc.list(&AlertFilter::default()).await.unwrap().is_empty());
    assert!(sink.kinds().is_empty());
  }

  #[tokio::test]
  async fn submit_fills_reporter_from_profile() {
    let (svc, _) = service();
    let me = Uuid::new_v4();
    svc
      .store()
      .upsert_profile(ProfileUpdate {
        user_id:      me,
        display_name: "Ann Smith".into(),
        phone_number: Some("555-0101".into()),
      })
      .await
      .unwrap();

    let alert = svc
      .submit(AlertSubmission {
        user_id: Some(me),
        latitude: Some(1.0),
        longitude: Some(2.0),
        ..Default::default()
      })
      .await
      .unwrap();
    assert_eq!(alert.reporter_name.as_deref(), Some("Ann Smith"));
    assert_eq!(alert.reporter_phone.as_deref(), Some("555-0101"));
    assert_eq!(alert.user_id, Some(me));
  }
}
