//! `GET /api/events` — server-sent alert events.
//!
//! Each frame carries `event: <kind>` and the JSON [`AlertEvent`] as data.
//! Admins receive every alert's events, users only their own. A client that
//! reconnects has missed whatever was published in between and should
//! re-fetch `/api/alerts`.

use std::convert::Infallible;

use axum::{
  extract::State,
  response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use safetrace_core::{
  event::{AlertEvent, EventKind, Subscription},
  store::SafetyStore,
};
use serde::Deserialize;

use crate::{AppState, auth::Caller, error::ApiError, extract::ApiQuery};

#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
  /// Comma-separated event kinds, e.g. `alert-created,alert-updated`.
  pub kinds: Option<String>,
}

fn parse_kinds(raw: Option<&str>) -> Result<Vec<EventKind>, ApiError> {
  raw
    .unwrap_or_default()
    .split(',')
    .map(str::trim)
    .filter(|k| !k.is_empty())
    .map(|k| {
      k.parse()
        .map_err(|_| ApiError::invalid(format!("unknown event kind: {k:?}")))
    })
    .collect()
}

fn to_frame(event: &AlertEvent) -> Event {
  Event::default()
    .event(event.kind.as_ref())
    .json_data(event)
    .unwrap_or_else(|e| {
      tracing::warn!(error = %e, "failed to encode alert event");
      Event::default().comment("encoding error")
    })
}

pub async fn stream<S>(
  State(state): State<AppState<S>>,
  caller: Caller,
  ApiQuery(params): ApiQuery<StreamParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
  S: SafetyStore + 'static,
{
  let kinds = parse_kinds(params.kinds.as_deref())?;
  let subscription = if caller.is_admin() {
    Subscription::all()
  } else {
    Subscription::for_owner(caller.user_id)
  }
  .with_kinds(kinds);

  // Subscribe before returning so nothing published after the response
  // starts is missed.
  let feed = state.hub.subscribe(subscription);
  tracing::debug!(user_id = %caller.user_id, "realtime subscriber attached");

  let frames = stream::unfold(feed, |mut feed| async move {
    let event = feed.next().await?;
    Some((Ok(to_frame(&event)), feed))
  });
  Ok(Sse::new(frames).keep_alive(KeepAlive::default()))
}
