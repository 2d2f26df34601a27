//! Enrollment — the per-participant membership record within a session.
//!
//! Keyed by (session, participant): joining twice updates, never duplicates.
//! The gating flags record the participant's progress through the
//! learning → quiz → voting pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
  Pending,
  Confirmed,
  Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
  pub session_id:        Uuid,
  pub participant_id:    Uuid,
  pub status:            EnrollmentStatus,
  pub joined_at:         DateTime<Utc>,
  /// Learning-module completion, 0–100.
  pub training_progress: u8,
  pub quiz_completed:    bool,
  pub quiz_passed:       bool,
  pub voting_completed:  bool,
}

/// Enrollment joined with identity attributes, for facilitator views.
#[derive(Debug, Clone, Serialize)]
pub struct EnrolledParticipant {
  #[serde(flatten)]
  pub enrollment:   Enrollment,
  pub name:         String,
  pub email:        String,
  pub organization: Option<String>,
}

/// Clamp reported training progress to the percentage range. Out-of-range
/// values are clamped, not rejected.
pub fn clamp_progress(percentage: i32) -> u8 {
  percentage.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn progress_clamps_to_percentage_range() {
    assert_eq!(clamp_progress(-5), 0);
    assert_eq!(clamp_progress(0), 0);
    assert_eq!(clamp_progress(62), 62);
    assert_eq!(clamp_progress(100), 100);
    assert_eq!(clamp_progress(140), 100);
  }
}
