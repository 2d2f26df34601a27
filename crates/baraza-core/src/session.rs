//! Session — one scheduled workshop instance.
//!
//! A session owns its join PIN, candidate activities, question set, and
//! enrollments. The lifecycle is a small state machine; the only transition
//! rule enforced here is that nothing leaves a terminal state.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  activity::NewActivity,
  quiz::NewQuestion,
};

// ─── Kind and state ──────────────────────────────────────────────────────────

/// How the workshop is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
  InPerson,
  Virtual,
  Hybrid,
}

/// Lifecycle state. `Concluded` and `Cancelled` are terminal: a session in
/// either state accepts no further state changes and its PIN is released
/// for reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
  Scheduled,
  InProgress,
  Concluded,
  Cancelled,
}

impl SessionState {
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Concluded | Self::Cancelled)
  }

  /// Transitions are caller-directed except for exits from a terminal
  /// state, which are always rejected. Same-state writes are no-ops.
  pub fn can_transition_to(self, next: Self) -> bool {
    self == next || !self.is_terminal()
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Scheduled => "scheduled",
      Self::InProgress => "in_progress",
      Self::Concluded => "concluded",
      Self::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for SessionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub session_id:            Uuid,
  pub title:                 String,
  pub description:           String,
  pub scheduled_date:        NaiveDate,
  pub scheduled_time:        NaiveTime,
  pub duration_hours:        u32,
  /// Present for in-person and hybrid sessions.
  pub province:              Option<String>,
  pub district:              Option<String>,
  pub venue:                 Option<String>,
  /// Present for virtual (and optionally hybrid) sessions.
  pub virtual_link:          Option<String>,
  pub kind:                  SessionKind,
  pub state:                 SessionState,
  pub facilitator_id:        Uuid,
  pub expected_participants: u32,
  pub notes:                 Option<String>,
  /// 6-character join code; unique among non-terminal sessions.
  pub pin:                   String,
  pub created_at:            DateTime<Utc>,
}

// ─── NewSession ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::WorkshopStore::create_session`]. The PIN, state,
/// and creation timestamp are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewSession {
  pub title:                 String,
  pub description:           String,
  pub scheduled_date:        NaiveDate,
  pub scheduled_time:        NaiveTime,
  pub duration_hours:        u32,
  pub province:              Option<String>,
  pub district:              Option<String>,
  pub venue:                 Option<String>,
  pub virtual_link:          Option<String>,
  pub kind:                  SessionKind,
  pub facilitator_id:        Uuid,
  pub expected_participants: u32,
  pub notes:                 Option<String>,
  /// Candidate activities created with the session, in ballot order.
  pub activities:            Vec<NewActivity>,
  /// Inline quiz questions seeding the session's question set.
  pub questions:             Vec<NewQuestion>,
}

impl NewSession {
  /// Required-field validation: a title, and a location appropriate to the
  /// session kind. The scheduled date and facilitator are enforced by type.
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::Validation("title is required".into()));
    }

    match self.kind {
      SessionKind::Virtual => {
        if self.virtual_link.as_deref().is_none_or(|l| l.trim().is_empty()) {
          return Err(Error::Validation(
            "a virtual session requires a virtual link".into(),
          ));
        }
      }
      SessionKind::InPerson | SessionKind::Hybrid => {
        let missing = |f: &Option<String>| {
          f.as_deref().is_none_or(|v| v.trim().is_empty())
        };
        if missing(&self.province) || missing(&self.district) {
          return Err(Error::Validation(
            "province and district are required".into(),
          ));
        }
      }
    }

    for question in &self.questions {
      question.validate()?;
    }

    Ok(())
  }
}

// ─── Partial update ──────────────────────────────────────────────────────────

/// Partial update of a session's mutable fields. `None` means "leave as is".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionUpdate {
  pub title:          Option<String>,
  pub description:    Option<String>,
  pub state:          Option<SessionState>,
  pub scheduled_date: Option<NaiveDate>,
  pub scheduled_time: Option<NaiveTime>,
}

// ─── Listing parameters ──────────────────────────────────────────────────────

/// Filters for [`crate::store::WorkshopStore::list_sessions`].
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
  pub province: Option<String>,
  pub district: Option<String>,
  pub state:    Option<SessionState>,
  pub kind:     Option<SessionKind>,
}

/// Offset pagination. Pages are 1-based.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
  #[serde(default = "Pagination::first_page")]
  pub page:  u32,
  #[serde(default = "Pagination::default_limit")]
  pub limit: u32,
}

impl Pagination {
  pub const MAX_LIMIT: u32 = 100;

  fn first_page() -> u32 { 1 }

  fn default_limit() -> u32 { 20 }

  pub fn validate(&self) -> Result<()> {
    if self.page == 0 {
      return Err(Error::Validation("page numbers start at 1".into()));
    }
    if self.limit == 0 || self.limit > Self::MAX_LIMIT {
      return Err(Error::Validation(format!(
        "limit must be between 1 and {}",
        Self::MAX_LIMIT
      )));
    }
    Ok(())
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page - 1) * u64::from(self.limit)
  }
}

impl Default for Pagination {
  fn default() -> Self {
    Self { page: 1, limit: Self::default_limit() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base_session() -> NewSession {
    NewSession {
      title:                 "Flood resilience planning".into(),
      description:           String::new(),
      scheduled_date:        NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
      scheduled_time:        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
      duration_hours:        2,
      province:              Some("Sofala".into()),
      district:              Some("Buzi".into()),
      venue:                 None,
      virtual_link:          None,
      kind:                  SessionKind::InPerson,
      facilitator_id:        Uuid::new_v4(),
      expected_participants: 20,
      notes:                 None,
      activities:            vec![],
      questions:             vec![],
    }
  }

  #[test]
  fn validate_rejects_blank_title() {
    let mut input = base_session();
    input.title = "   ".into();
    assert!(matches!(input.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_requires_location_for_in_person() {
    let mut input = base_session();
    input.district = None;
    assert!(matches!(input.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_requires_link_for_virtual() {
    let mut input = base_session();
    input.kind = SessionKind::Virtual;
    input.province = None;
    input.district = None;
    assert!(matches!(input.validate(), Err(Error::Validation(_))));

    input.virtual_link = Some("https://meet.example.org/abc".into());
    assert!(input.validate().is_ok());
  }

  #[test]
  fn terminal_states_accept_no_exit() {
    assert!(!SessionState::Concluded.can_transition_to(SessionState::Scheduled));
    assert!(!SessionState::Cancelled.can_transition_to(SessionState::InProgress));
    // Same-state writes are fine.
    assert!(SessionState::Concluded.can_transition_to(SessionState::Concluded));
    // Everything else is caller-directed.
    assert!(SessionState::Scheduled.can_transition_to(SessionState::Cancelled));
    assert!(SessionState::InProgress.can_transition_to(SessionState::Concluded));
  }

  #[test]
  fn pagination_offset_is_zero_based() {
    let page = Pagination { page: 3, limit: 20 };
    assert_eq!(page.offset(), 40);
    assert!(page.validate().is_ok());
    assert!(Pagination { page: 0, limit: 20 }.validate().is_err());
    assert!(Pagination { page: 1, limit: 101 }.validate().is_err());
  }
}
