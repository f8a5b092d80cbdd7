//! Emergency contacts, ranked by the order in which they are notified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, alert::non_blank};

/// Highest rank a contact may hold; fits a signed 32-bit SQLite integer.
pub const MAX_PRIORITY: u32 = i32::MAX as u32;

/// The rank after `highest`, or 1 for a user with no contacts yet.
pub fn next_priority(highest: Option<u32>) -> Result<u32> {
  highest
    .map_or(Some(1), |p| p.checked_add(1))
    .filter(|p| *p <= MAX_PRIORITY)
    .ok_or_else(|| Error::invalid("no free priority left; pass one explicitly"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub contact_id:   Uuid,
  pub user_id:      Uuid,
  pub name:         String,
  pub phone_number: String,
  /// Free-text label, e.g. "sister" or "neighbour".
  pub relationship: Option<String>,
  /// Unique per user; 1 is notified first.
  pub priority:     u32,
  pub created_at:   DateTime<Utc>,
}

impl Contact {
  pub fn has_address(&self) -> bool { !self.phone_number.trim().is_empty() }
}

/// Input to [`crate::store::SafetyStore::add_contact`].
#[derive(Debug, Clone)]
pub struct NewContact {
  pub user_id:      Uuid,
  pub name:         String,
  pub phone_number: String,
  pub relationship: Option<String>,
  /// When `None` the store assigns the next free rank.
  pub priority:     Option<u32>,
}

impl NewContact {
  /// Trim the free-text fields and reject unusable input.
  pub fn normalize(self) -> Result<Self> {
    let name = self.name.trim().to_owned();
    if name.is_empty() {
      return Err(Error::invalid("contact name is required"));
    }
    match self.priority {
      Some(0) => return Err(Error::invalid("priority starts at 1")),
      Some(p) if p > MAX_PRIORITY => {
        return Err(Error::invalid(format!("priority may not exceed {MAX_PRIORITY}")));
      }
      _ => {}
    }
    Ok(Self {
      user_id: self.user_id,
      name,
      phone_number: self.phone_number.trim().to_owned(),
      relationship: non_blank(self.relationship),
      priority: self.priority,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn contact(priority: Option<u32>) -> NewContact {
    NewContact {
      user_id: Uuid::new_v4(),
      name: " Bo ".into(),
      phone_number: "555-0100".into(),
      relationship: Some("  ".into()),
      priority,
    }
  }

  #[test]
  fn normalize_trims_and_bounds_priority() {
    let c = contact(Some(MAX_PRIORITY)).normalize().unwrap();
    assert_eq!(c.name, "Bo");
    assert_eq!(c.relationship, None);

    assert!(matches!(contact(Some(0)).normalize(), Err(Error::InvalidInput(_))));
    assert!(matches!(
      contact(Some(u32::MAX)).normalize(),
      Err(Error::InvalidInput(_))
    ));
  }

  #[test]
  fn next_priority_stops_at_the_bound() {
    assert_eq!(next_priority(None).unwrap(), 1);
    assert_eq!(next_priority(Some(4)).unwrap(), 5);
    assert!(matches!(next_priority(Some(MAX_PRIORITY)), Err(Error::InvalidInput(_))));
    assert!(matches!(next_priority(Some(u32::MAX)), Err(Error::InvalidInput(_))));
  }
}
