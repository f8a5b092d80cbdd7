//! In-process realtime channel.
//!
//! [`Hub`] is the [`EventSink`] the alert service publishes to. Each
//! subscriber gets a [`Feed`] that yields only the events its
//! [`Subscription`] matches. Feeds are bounded and skip ahead when they
//! lag; a [`Queue`] is unbounded and sees every matching event.

use std::sync::{Arc, Mutex, PoisonError};

use safetrace_core::event::{AlertEvent, EventSink, Subscription};
use tokio::sync::{
  broadcast::{self, error::RecvError},
  mpsc,
};

/// Default number of events buffered per subscriber before it lags.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct Hub {
  tx:     broadcast::Sender<AlertEvent>,
  queues: Arc<Mutex<Vec<(Subscription, mpsc::UnboundedSender<AlertEvent>)>>>,
}

impl Hub {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity.max(1));
    Self { tx, queues: Arc::default() }
  }

  /// Start receiving events published from now on.
  pub fn subscribe(&self, subscription: Subscription) -> Feed {
    Feed { rx: self.tx.subscribe(), subscription }
  }

  /// Like [`Hub::subscribe`], but nothing is ever dropped. For consumers
  /// that must act on every event, such as notification fan-out.
  pub fn subscribe_queue(&self, subscription: Subscription) -> Queue {
    let (tx, rx) = mpsc::unbounded_channel();
    self
      .queues
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .push((subscription, tx));
    Queue { rx }
  }

  pub fn subscriber_count(&self) -> usize { self.tx.receiver_count() }
}

impl Default for Hub {
  fn default() -> Self { Self::new(DEFAULT_CAPACITY) }
}

impl EventSink for Hub {
  fn publish(&self, event: AlertEvent) {
    let kind = event.kind;
    let alert_id = event.alert.alert_id;

    {
      let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
      // A failed send means the queue's receiver is gone.
      queues.retain(|(subscription, tx)| {
        !subscription.matches(&event) || tx.send(event.clone()).is_ok()
      });
    }

    // `send` only fails when nobody is listening.
    match self.tx.send(event) {
      Ok(n) => tracing::debug!(%kind, %alert_id, subscribers = n, "event published"),
      Err(_) => tracing::debug!(%kind, %alert_id, "event published with no subscribers"),
    }
  }
}

/// One subscriber's view of the hub.
pub struct Feed {
  rx:           broadcast::Receiver<AlertEvent>,
  subscription: Subscription,
}

impl Feed {
  /// The next matching event, or `None` once the hub is gone.
  ///
  /// A feed that falls behind skips what it missed.
  pub async fn next(&mut self) -> Option<AlertEvent> {
    loop {
      match self.rx.recv().await {
        Ok(event) if self.subscription.matches(&event) => return Some(event),
        Ok(_) => continue,
        Err(RecvError::Lagged(skipped)) => {
          tracing::warn!(skipped, "realtime subscriber lagged; events dropped");
        }
        Err(RecvError::Closed) => return None,
      }
    }
  }
}

/// A lossless subscriber; see [`Hub::subscribe_queue`].
pub struct Queue {
  rx: mpsc::UnboundedReceiver<AlertEvent>,
}

impl Queue {
  /// The next matching event, or `None` once every hub clone is gone.
  pub async fn next(&mut self) -> Option<AlertEvent> { self.rx.recv().await }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use safetrace_core::{
    alert::{Alert, AlertKind, AlertStatus},
    event::EventKind,
  };
  use uuid::Uuid;

  use super::*;

  fn alert(owner: Option<Uuid>) -> Alert {
    Alert {
      alert_id:       Uuid::new_v4(),
      user_id:        owner,
      reporter_name:  Some("Ann".into()),
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

  #[tokio::test]
  async fn owner_feed_sees_only_own_alerts() {
    let hub = Hub::default();
    let me = Uuid::new_v4();
    let mut mine = hub.subscribe(Subscription::for_owner(me));
    let mut all = hub.subscribe(Subscription::all());

    hub.publish(AlertEvent::created(alert(Some(Uuid::new_v4()))));
    hub.publish(AlertEvent::created(alert(None)));
    let own = alert(Some(me));
    hub.publish(AlertEvent::created(own.clone()));

    assert_eq!(mine.next().await.unwrap().alert, own);
    for _ in 0..3 {
      assert!(all.next().await.is_some());
    }
  }

  #[tokio::test]
  async fn kinds_filter() {
    let hub = Hub::default();
    let mut updates =
      hub.subscribe(Subscription::all().with_kinds([EventKind::AlertUpdated]));

    let a = alert(None);
    hub.publish(AlertEvent::created(a.clone()));
    hub.publish(AlertEvent::updated(a.clone()));

    let got = updates.next().await.unwrap();
    assert_eq!(got.kind, EventKind::AlertUpdated);
  }

  #[tokio::test]
  async fn lagging_feed_skips_ahead() {
    let hub = Hub::new(2);
    let mut feed = hub.subscribe(Subscription::all());
    let alerts: Vec<_> = (0..5).map(|_| alert(None)).collect();
    for a in &alerts {
      hub.publish(AlertEvent::created(a.clone()));
    }

    // Only the newest `capacity` events survive.
    assert_eq!(feed.next().await.unwrap().alert, alerts[3]);
    assert_eq!(feed.next().await.unwrap().alert, alerts[4]);
  }

  #[tokio::test]
  async fn queue_keeps_what_a_feed_would_drop() {
    let hub = Hub::new(2);
    let mut queue =
      hub.subscribe_queue(Subscription::all().with_kinds([EventKind::AlertCreated]));
    let alerts: Vec<_> = (0..5).map(|_| alert(None)).collect();
    for a in &alerts {
      hub.publish(AlertEvent::created(a.clone()));
      hub.publish(AlertEvent::updated(a.clone()));
    }

    for a in &alerts {
      let event = queue.next().await.unwrap();
      assert_eq!(event.kind, EventKind::AlertCreated);
      assert_eq!(&event.alert, a);
    }
    drop(hub);
    assert!(queue.next().await.is_none());
  }

  #[tokio::test]
  async fn dropped_queue_is_forgotten() {
    let hub = Hub::default();
    drop(hub.subscribe_queue(Subscription::all()));
    hub.publish(AlertEvent::created(alert(None)));
    assert!(hub.queues.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn feed_ends_when_hub_dropped() {
    let hub = Hub::default();
    let mut feed = hub.subscribe(Subscription::all());
    drop(hub);
    assert!(feed.next().await.is_none());
  }

  #[test]
  fn publish_without_subscribers_is_harmless() {
    let hub = Hub::default();
    hub.publish(AlertEvent::created(alert(None)));
    assert_eq!(hub.subscriber_count(), 0);
  }
}
