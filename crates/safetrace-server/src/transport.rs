//! Notification transports that need network access.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use safetrace_core::{
  contact::Contact,
  notify::{DeliveryResult, LogTransport, OutboundMessage, Transport},
};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{NotifyConfig, TransportKind};

/// Build the transport selected by `config`.
pub fn from_config(config: &NotifyConfig) -> anyhow::Result<Arc<dyn Transport>> {
  match config.transport {
    TransportKind::Log => Ok(Arc::new(LogTransport)),
    TransportKind::Webhook => {
      let url = config
        .webhook_url
        .clone()
        .ok_or_else(|| anyhow::anyhow!("notify.webhook_url is required for the webhook transport"))?;
      Ok(Arc::new(WebhookTransport::new(url, Duration::from_secs(config.timeout_secs))?))
    }
  }
}

/// JSON body posted for every message.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
  alert_id:     Uuid,
  contact_id:   Uuid,
  contact_name: &'a str,
  phone_number: &'a str,
  text:         &'a str,
  maps_url:     &'a str,
}

/// POSTs each message as JSON to a fixed URL, e.g. an SMS gateway.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct WebhookTransport {
  client: Client,
  url:    String,
}

impl WebhookTransport {
  pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
    Ok(Self { client, url: url.into() })
  }
}

#[async_trait]
impl Transport for WebhookTransport {
  async fn send(&self, contact: &Contact, message: &OutboundMessage) -> DeliveryResult {
    let payload = WebhookPayload {
      alert_id:     message.alert_id,
      contact_id:   contact.contact_id,
      contact_name: &contact.name,
      phone_number: &contact.phone_number,
      text:         &message.text,
      maps_url:     &message.maps_url,
    };

    match self.client.post(&self.url).json(&payload).send().await {
      Ok(resp) if resp.status().is_success() => DeliveryResult::Sent,
      Ok(resp) => DeliveryResult::Failed(format!("webhook returned {}", resp.status())),
      Err(e) => DeliveryResult::Failed(format!("webhook request failed: {e}")),
    }
  }
}
