//! Profiles and roles.
//!
//! A profile is the display identity of an authenticated principal. The
//! principal's role is a claim of the account it authenticated with and is
//! never derived from profile text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  #[default]
  User,
}

impl Role {
  pub fn is_admin(self) -> bool { matches!(self, Self::Admin) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub user_id:      Uuid,
  pub display_name: String,
  pub phone_number: Option<String>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

/// Input to [`crate::store::SafetyStore::upsert_profile`].
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
  pub user_id:      Uuid,
  pub display_name: String,
  pub phone_number: Option<String>,
}

impl ProfileUpdate {
  pub fn normalize(self) -> Result<Self> {
    let display_name = self.display_name.trim().to_owned();
    if display_name.is_empty() {
      return Err(Error::invalid("display name is required"));
    }
    Ok(Self {
      user_id: self.user_id,
      display_name,
      phone_number: crate::alert::non_blank(self.phone_number),
    })
  }
}
