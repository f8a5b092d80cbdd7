//! Notification fan-out: one outbound message per emergency contact.
//!
//! Message construction happens here; delivery is delegated to a
//! [`Transport`]. A contact's delivery failure is recorded in the report and
//! never aborts delivery to the remaining contacts.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  alert::Alert,
  contact::Contact,
  store::SafetyStore,
};

/// Name used when neither a profile nor a reporter name is available.
pub const FALLBACK_NAME: &str = "SafeTrace User";

// ─── Messages and results ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
  pub alert_id:  Uuid,
  pub user_name: String,
  pub maps_url:  String,
  pub text:      String,
}

impl OutboundMessage {
  pub fn for_alert(alert: &Alert, user_name: &str) -> Self {
    let maps_url = alert.maps_url();
    let text = format!(
      "EMERGENCY ALERT: {user_name} has triggered an emergency alert. \
       Location: {maps_url}"
    );
    Self {
      alert_id: alert.alert_id,
      user_name: user_name.to_owned(),
      maps_url,
      text,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  NoAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DeliveryResult {
  Sent,
  Failed(String),
  Skipped(SkipReason),
}

impl DeliveryResult {
  pub fn is_sent(&self) -> bool { matches!(self, Self::Sent) }
}

/// The delivery attempt for one contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
  pub contact_id:   Uuid,
  pub contact_name: String,
  pub phone_number: String,
  pub message:      String,
  pub result:       DeliveryResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationReport {
  pub alert_id: Uuid,
  /// One entry per contact, in priority order.
  pub outcomes: Vec<DeliveryOutcome>,
}

impl NotificationReport {
  pub fn sent(&self) -> usize {
    self.outcomes.iter().filter(|o| o.result.is_sent()).count()
  }

  pub fn failed(&self) -> usize {
    self
      .outcomes
      .iter()
      .filter(|o| matches!(o.result, DeliveryResult::Failed(_)))
      .count()
  }
}

// ─── Transport ───────────────────────────────────────────────────────────────

/// Delivers one message to one contact and reports what happened.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, contact: &Contact, message: &OutboundMessage) -> DeliveryResult;
}

/// Writes each message to the log. The log is its only delivery medium.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
  async fn send(&self, contact: &Contact, message: &OutboundMessage) -> DeliveryResult {
    tracing::info!(
      alert_id = %message.alert_id,
      contact_id = %contact.contact_id,
      contact = %contact.name,
      phone = %contact.phone_number,
      "{}",
      message.text
    );
    DeliveryResult::Sent
  }
}

// ─── Notifier ────────────────────────────────────────────────────────────────

pub struct Notifier<S> {
  store:     Arc<S>,
  transport: Arc<dyn Transport>,
}

impl<S> Clone for Notifier<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), transport: self.transport.clone() }
  }
}

impl<S: SafetyStore> Notifier<S> {
  pub fn new(store: Arc<S>, transport: Arc<dyn Transport>) -> Self {
    Self { store, transport }
  }

  /// Look up `alert_id` and notify its owner's contacts.
  pub async fn dispatch(&self, alert_id: Uuid) -> Result<NotificationReport> {
    let alert = self
      .store
      .get_alert(alert_id)
      .await
      .map_err(Into::<Error>::into)?
      .ok_or(Error::AlertNotFound(alert_id))?;
    self.fan_out(&alert).await
  }

  /// Notify every contact of the alert's owner.
  ///
  /// Anonymous alerts have no contacts and yield an empty report. Store
  /// errors while loading contacts or the profile are returned; transport
  /// errors are not.
  pub async fn fan_out(&self, alert: &Alert) -> Result<NotificationReport> {
    let Some(user_id) = alert.user_id else {
      return Ok(NotificationReport { alert_id: alert.alert_id, outcomes: Vec::new() });
    };

    let contacts = self
      .store
      .list_contacts(user_id)
      .await
      .map_err(Into::<Error>::into)?;
    let profile = self
      .store
      .get_profile(user_id)
      .await
      .map_err(Into::<Error>::into)?;

    let user_name = profile
      .map(|p| p.display_name)
      .or_else(|| alert.reporter_name.clone())
      .unwrap_or_else(|| FALLBACK_NAME.to_owned());
    let message = OutboundMessage::for_alert(alert, &user_name);

    let attempts = contacts.iter().map(|contact| {
      let message = &message;
      async move {
        let result = if contact.has_address() {
          self.transport.send(contact, message).await
        } else {
          DeliveryResult::Skipped(SkipReason::NoAddress)
        };
        if let DeliveryResult::Failed(reason) = &result {
          tracing::warn!(
            alert_id = %alert.alert_id,
            contact_id = %contact.contact_id,
            %reason,
            "notification delivery failed"
          );
        }
        DeliveryOutcome {
          contact_id:   contact.contact_id,
          contact_name: contact.name.clone(),
          phone_number: contact.phone_number.clone(),
          message:      message.text.clone(),
          result,
        }
      }
    });

    let outcomes = join_all(attempts).await;
    Ok(NotificationReport { alert_id: alert.alert_id, outcomes })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;
  use crate::{
    alert::{AlertKind, NewAlert},
    contact::NewContact,
    memory::MemoryStore,
    profile::ProfileUpdate,
  };

  /// Fails for one phone number, records everything it was asked to send.
  #[derive(Default)]
  struct FlakyTransport {
    failing: String,
    seen:    Mutex<Vec<String>>,
  }

  #[async_trait]
  impl Transport for FlakyTransport {
    async fn send(&self, contact: &Contact, _message: &OutboundMessage) -> DeliveryResult {
      self.seen.lock().unwrap().push(contact.name.clone());
      if contact.phone_number == self.failing {
        DeliveryResult::Failed("carrier rejected".into())
      } else {
        DeliveryResult::Sent
      }
    }
  }

  async fn alert_with_contacts(
    store: &MemoryStore,
    phones: &[&str],
  ) -> Alert {
    let me = Uuid::new_v4();
    for (i, phone) in phones.iter().enumerate() {
      store
        .add_contact(NewContact {
          user_id:      me,
          name:         format!("contact-{i}"),
          phone_number: (*phone).into(),
          relationship: None,
          priority:     None,
        })
        .await
        .unwrap();
    }
    store
      .create_alert(NewAlert {
        user_id:        Some(me),
        reporter_name:  None,
        reporter_phone: None,
        latitude:       37.0,
        longitude:      -122.0,
        message:        "help".into(),
        kind:           AlertKind::Sos,
        session_id:     None,
      })
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn one_failure_does_not_block_the_rest() {
    let store = Arc::new(MemoryStore::new());
    let alert = alert_with_contacts(&store, &["111", "222", "333"]).await;
    let transport = Arc::new(FlakyTransport { failing: "222".into(), ..Default::default() });
    let notifier = Notifier::new(store, transport.clone());

    let report = notifier.dispatch(alert.alert_id).await.unwrap();
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.sent(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(
      report.outcomes[1].result,
      DeliveryResult::Failed("carrier rejected".into())
    );
    assert_eq!(transport.seen.lock().unwrap().len(), 3);
  }

  #[tokio::test]
  async fn contacts_without_phone_are_skipped() {
    let store = Arc::new(MemoryStore::new());
    let alert = alert_with_contacts(&store, &["111", ""]).await;
    let transport = Arc::new(FlakyTransport::default());
    let notifier = Notifier::new(store, transport.clone());

    let report = notifier.fan_out(&alert).await.unwrap();
    assert_eq!(report.outcomes[1].result, DeliveryResult::Skipped(SkipReason::NoAddress));
    assert_eq!(*transport.seen.lock().unwrap(), ["contact-0"]);
  }

  #[tokio::test]
  async fn message_uses_profile_name_and_map_link() {
    let store = Arc::new(MemoryStore::new());
    let alert = alert_with_contacts(&store, &["111"]).await;
    store
      .upsert_profile(ProfileUpdate {
        user_id:      alert.user_id.unwrap(),
        display_name: "Ann".into(),
        phone_number: None,
      })
      .await
      .unwrap();

    let notifier = Notifier::new(store, Arc::new(LogTransport));
    let report = notifier.fan_out(&alert).await.unwrap();
    assert_eq!(
      report.outcomes[0].message,
      "EMERGENCY ALERT: Ann has triggered an emergency alert. \
       Location: https://maps.google.com/maps?q=37,-122"
    );
  }

  #[tokio::test]
  async fn fallback_name_without_profile() {
    let store = Arc::new(MemoryStore::new());
    let alert = alert_with_contacts(&store, &["111"]).await;
    let notifier = Notifier::new(store, Arc::new(LogTransport));
    let report = notifier.fan_out(&alert).await.unwrap();
    assert!(report.outcomes[0].message.contains(FALLBACK_NAME));
  }

  #[tokio::test]
  async fn unknown_alert_is_not_found() {
    let notifier = Notifier::new(Arc::new(MemoryStore::new()), Arc::new(LogTransport));
    assert!(matches!(
      notifier.dispatch(Uuid::new_v4()).await,
      Err(Error::AlertNotFound(_))
    ));
  }
}
