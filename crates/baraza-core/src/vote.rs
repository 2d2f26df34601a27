//! Votes and live aggregate ranking.
//!
//! A vote is unique per (participant, activity, session); resubmission
//! updates the existing row. Aggregates are never stored — they are
//! computed on read from whatever committed votes exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, activity::CandidateActivity};

pub const SCORE_MIN: u8 = 1;
pub const SCORE_MAX: u8 = 5;
pub const PRIORITY_MIN: u8 = 1;
pub const PRIORITY_MAX: u8 = 10;

// ─── Vote ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
  pub participant_id: Uuid,
  pub activity_id:    Uuid,
  pub session_id:     Uuid,
  pub score:          u8,
  /// Participant-assigned priority rank.
  pub priority:       u8,
  pub comment:        Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// One entry in a vote-submission batch.
#[derive(Debug, Clone, Deserialize)]
pub struct NewVote {
  pub activity_id: Uuid,
  pub score:       u8,
  pub priority:    u8,
  #[serde(default)]
  pub comment:     Option<String>,
}

impl NewVote {
  pub fn validate(&self) -> Result<()> {
    if !(SCORE_MIN..=SCORE_MAX).contains(&self.score) {
      return Err(Error::Validation(format!(
        "score {} is out of range {SCORE_MIN}–{SCORE_MAX}",
        self.score
      )));
    }
    if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&self.priority) {
      return Err(Error::Validation(format!(
        "priority {} is out of range {PRIORITY_MIN}–{PRIORITY_MAX}",
        self.priority
      )));
    }
    Ok(())
  }
}

/// Returned by a successful vote-batch submission.
#[derive(Debug, Clone, Serialize)]
pub struct VoteReceipt {
  pub session_id:     Uuid,
  pub participant_id: Uuid,
  pub votes_recorded: u32,
  pub completed_at:   DateTime<Utc>,
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

/// Computed per-activity summary — never stored, always derived.
#[derive(Debug, Clone, Serialize)]
pub struct RankedActivity {
  pub activity:      CandidateActivity,
  pub vote_count:    u64,
  /// 0.0 when no votes exist; the divide-by-zero case never surfaces.
  pub mean_score:    f64,
  pub mean_priority: f64,
  /// Non-empty comments only; blank and missing comments are dropped.
  pub comments:      Vec<String>,
}

/// Rank activities by their vote aggregates.
///
/// Input pairs must be in activity creation order — that order is the final
/// tie-break after mean score (descending) and vote count (descending), and
/// it is preserved here by the stability of the sort.
pub fn rank(
  activities: Vec<(CandidateActivity, Vec<Vote>)>,
) -> Vec<RankedActivity> {
  let mut ranked: Vec<RankedActivity> = activities
    .into_iter()
    .map(|(activity, votes)| {
      let count = votes.len() as u64;
      let (mean_score, mean_priority) = if count == 0 {
        (0.0, 0.0)
      } else {
        let n = count as f64;
        (
          votes.iter().map(|v| f64::from(v.score)).sum::<f64>() / n,
          votes.iter().map(|v| f64::from(v.priority)).sum::<f64>() / n,
        )
      };
      let comments = votes
        .into_iter()
        .filter_map(|v| v.comment)
        .filter(|c| !c.trim().is_empty())
        .collect();

      RankedActivity {
        activity,
        vote_count: count,
        mean_score,
        mean_priority,
        comments,
      }
    })
    .collect();

  ranked.sort_by(|a, b| {
    b.mean_score
      .partial_cmp(&a.mean_score)
      .unwrap_or(std::cmp::Ordering::Equal)
      .then_with(|| b.vote_count.cmp(&a.vote_count))
  });

  ranked
}
