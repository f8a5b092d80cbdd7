//! Location updates — an append-only trail of where a user has been.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, alert::check_coordinates};

/// Default number of updates returned by a location history listing.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
  pub location_id: Uuid,
  pub user_id:     Uuid,
  pub latitude:    f64,
  pub longitude:   f64,
  /// Accuracy radius in metres, as reported by the device.
  pub accuracy:    Option<f64>,
  pub recorded_at: DateTime<Utc>,
  /// The alert this update was captured for, if any.
  pub alert_id:    Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewLocation {
  pub user_id:   Uuid,
  pub latitude:  f64,
  pub longitude: f64,
  pub accuracy:  Option<f64>,
  pub alert_id:  Option<Uuid>,
}

impl NewLocation {
  pub fn validate(&self) -> Result<()> {
    check_coordinates(self.latitude, self.longitude)?;
    if let Some(a) = self.accuracy
      && (!a.is_finite() || a < 0.0)
    {
      return Err(Error::invalid("accuracy must be a non-negative number"));
    }
    Ok(())
  }
}
