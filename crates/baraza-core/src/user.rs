//! User accounts and the authenticated principal.
//!
//! The identity store is a collaborator, not a feature: the operations here
//! are the minimum needed for credential verification at the boundary and
//! the joined participant views. Account provisioning beyond the bootstrap
//! admin happens elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Facilitator,
  Participant,
}

impl Role {
  pub fn is_admin(self) -> bool {
    matches!(self, Self::Admin)
  }

  /// Facilitators and admins may create sessions and inspect participants.
  pub fn can_manage_sessions(self) -> bool {
    matches!(self, Self::Admin | Self::Facilitator)
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserAccount {
  pub user_id:        Uuid,
  pub name:           String,
  pub email:          String,
  pub organization:   Option<String>,
  pub role:           Role,
  /// Argon2 PHC string. Never serialised outward.
  #[serde(skip_serializing)]
  pub password_hash:  String,
  pub created_at:     DateTime<Utc>,
  pub last_active_at: Option<DateTime<Utc>>,
}

/// Input to [`crate::store::WorkshopStore::create_user`]. The caller hashes
/// the password; the store never sees plaintext credentials.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:          String,
  pub email:         String,
  pub organization:  Option<String>,
  pub role:          Role,
  pub password_hash: String,
}

/// The pre-validated identity attached to a request by the auth boundary.
#[derive(Debug, Clone)]
pub struct Principal {
  pub id:   Uuid,
  pub role: Role,
  pub name: String,
}
