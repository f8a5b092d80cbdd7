//! Background fan-out: notify contacts whenever an alert is created.

use safetrace_core::{
  event::{EventKind, Subscription},
  notify::Notifier,
  store::SafetyStore,
};
use tokio::task::JoinHandle;

use crate::realtime::Hub;

/// Take every `alert-created` event from a lossless queue on `hub` and fan
/// each alert out through `notifier` in its own task, so one slow delivery
/// never holds up the next alert. The task ends when the hub is dropped.
pub fn spawn_fan_out<S>(hub: &Hub, notifier: Notifier<S>) -> JoinHandle<()>
where
  S: SafetyStore + 'static,
{
  let mut queue =
    hub.subscribe_queue(Subscription::all().with_kinds([EventKind::AlertCreated]));

  tokio::spawn(async move {
    while let Some(event) = queue.next().await {
      let notifier = notifier.clone();
      tokio::spawn(async move {
        let alert_id = event.alert.alert_id;
        match notifier.fan_out(&event.alert).await {
          Ok(report) => tracing::info!(
            %alert_id,
            contacts = report.outcomes.len(),
            sent = report.sent(),
            failed = report.failed(),
            "contacts notified"
          ),
          Err(e) => tracing::error!(%alert_id, error = %e, "notification fan-out failed"),
        }
      });
    }
    tracing::debug!("fan-out worker stopped");
  })
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      Arc,
      atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
  };

  use async_trait::async_trait;
  use safetrace_core::{
    alert::AlertSubmission,
    contact::{Contact, NewContact},
    memory::MemoryStore,
    notify::{DeliveryResult, OutboundMessage, Transport},
  };
  use uuid::Uuid;

  use super::*;
  use crate::{ApiSettings, AppState, auth::AuthConfig, test_support::RecordingTransport};

  #[tokio::test]
  async fn created_alerts_reach_contacts() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(RecordingTransport::default());
    let state = AppState::new(
      store.clone(),
      transport.clone(),
      AuthConfig::default(),
      ApiSettings::default(),
    );
    let _worker = spawn_fan_out(&state.hub, state.notifier.clone());

    let me = Uuid::new_v4();
    store
      .add_contact(NewContact {
        user_id:      me,
        name:         "Bo".into(),
        phone_number: "555-0199".into(),
        relationship: None,
        priority:     None,
      })
      .await
      .unwrap();

    state
      .service
      .submit(AlertSubmission {
        user_id: Some(me),
        latitude: Some(37.0),
        longitude: Some(-122.0),
        ..Default::default()
      })
      .await
      .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
      while transport.sent().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
      }
    })
    .await
    .expect("worker delivered");
    assert_eq!(transport.sent(), ["555-0199"]);
  }

  /// Takes a while per message, like a webhook near its timeout.
  #[derive(Default)]
  struct SlowTransport {
    sent: AtomicUsize,
  }

  #[async_trait]
  impl Transport for SlowTransport {
    async fn send(&self, _contact: &Contact, _message: &OutboundMessage) -> DeliveryResult {
      tokio::time::sleep(Duration::from_millis(100)).await;
      self.sent.fetch_add(1, Ordering::SeqCst);
      DeliveryResult::Sent
    }
  }

  #[tokio::test]
  async fn burst_against_slow_transport_notifies_every_alert() {
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(SlowTransport::default());
    let settings = ApiSettings { event_capacity: 4, ..Default::default() };
    let state =
      AppState::new(store.clone(), transport.clone(), AuthConfig::default(), settings);
    let _worker = spawn_fan_out(&state.hub, state.notifier.clone());

    let me = Uuid::new_v4();
    store
      .add_contact(NewContact {
        user_id:      me,
        name:         "Bo".into(),
        phone_number: "555-0199".into(),
        relationship: None,
        priority:     None,
      })
      .await
      .unwrap();

    for _ in 0..12 {
      state
        .service
        .submit(AlertSubmission {
          user_id: Some(me),
          latitude: Some(37.0),
          longitude: Some(-122.0),
          ..Default::default()
        })
        .await
        .unwrap();
    }

    tokio::time::timeout(Duration::from_secs(5), async {
      while transport.sent.load(Ordering::SeqCst) < 12 {
        tokio::time::sleep(Duration::from_millis(10)).await;
      }
    })
    .await
    .expect("every alert notified");
    assert_eq!(transport.sent.load(Ordering::SeqCst), 12);
  }

  #[tokio::test]
  async fn worker_stops_with_hub() {
    let hub = Hub::default();
    let notifier = Notifier::new(
      Arc::new(MemoryStore::new()),
      Arc::new(RecordingTransport::default()),
    );
    let handle = spawn_fan_out(&hub, notifier);
    drop(hub);
    tokio::time::timeout(Duration::from_secs(5), handle)
      .await
      .expect("worker exits")
      .unwrap();
  }
}
