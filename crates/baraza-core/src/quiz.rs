//! Quiz questions, submitted answers, and server-side grading.
//!
//! Questions are the authoritative source of correct answers; client
//! payloads get a redacted [`QuestionView`] and submitted correctness is
//! never trusted. Results are append-only: one row per attempt, the most
//! recent attempt by timestamp is the current one.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// The sole hard business threshold: pass iff the unrounded score reaches
/// this percentage. Rounding is display-only and never flips the outcome.
pub const PASS_THRESHOLD_PERCENT: f64 = 75.0;

// ─── Questions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
  pub question_id:    Uuid,
  /// `None` places the question in the shared bank rather than scoping it
  /// to one session.
  pub session_id:     Option<Uuid>,
  pub module:         String,
  pub prompt:         String,
  /// Option key → option text, e.g. `"a" → "Mangrove restoration"`.
  pub options:        BTreeMap<String, String>,
  pub correct_option: String,
  pub explanation:    Option<String>,
  pub active:         bool,
}

impl QuizQuestion {
  /// The client-facing payload. Strips the correct option and the
  /// explanation so neither ever crosses the wire before grading.
  pub fn client_view(&self) -> QuestionView {
    QuestionView {
      question_id: self.question_id,
      module:      self.module.clone(),
      prompt:      self.prompt.clone(),
      options:     self.options.clone(),
    }
  }
}

/// A question as served to participants — no answer key.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
  pub question_id: Uuid,
  pub module:      String,
  pub prompt:      String,
  pub options:     BTreeMap<String, String>,
}

/// One question in a [`crate::session::NewSession`] batch.
#[derive(Debug, Clone, Deserialize)]
pub struct NewQuestion {
  #[serde(default = "NewQuestion::default_module")]
  pub module:         String,
  pub prompt:         String,
  pub options:        BTreeMap<String, String>,
  pub correct_option: String,
  #[serde(default)]
  pub explanation:    Option<String>,
}

impl NewQuestion {
  fn default_module() -> String { "general".into() }

  pub fn validate(&self) -> Result<()> {
    if self.prompt.trim().is_empty() {
      return Err(Error::Validation("question prompt is required".into()));
    }
    if self.options.len() < 2 {
      return Err(Error::Validation(
        "a question needs at least two options".into(),
      ));
    }
    if !self.options.contains_key(&self.correct_option) {
      return Err(Error::Validation(format!(
        "correct option {:?} is not among the options",
        self.correct_option
      )));
    }
    Ok(())
  }
}

// ─── Answers and results ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
  pub question_id: Uuid,
  /// The option key the participant selected.
  pub selected:    String,
}

/// Per-question detail persisted with each attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerReview {
  pub question_id: Uuid,
  pub submitted:   Option<String>,
  pub correct:     String,
  pub is_correct:  bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
  pub result_id:       Uuid,
  pub participant_id:  Uuid,
  pub session_id:      Uuid,
  /// Unrounded percentage in [0, 100]; the pass comparison uses this.
  pub score_percent:   f64,
  pub passed:          bool,
  pub total_questions: u32,
  pub correct_answers: u32,
  pub breakdown:       Vec<AnswerReview>,
  pub completed_at:    DateTime<Utc>,
}

impl QuizResult {
  /// Display form only — never use this for the pass comparison.
  pub fn rounded_score(&self) -> u32 {
    self.score_percent.round() as u32
  }
}

// ─── Grading ─────────────────────────────────────────────────────────────────

/// The outcome of grading one answer set against a question set.
#[derive(Debug, Clone)]
pub struct GradedQuiz {
  pub score_percent:   f64,
  pub passed:          bool,
  pub correct_answers: u32,
  pub total_questions: u32,
  pub breakdown:       Vec<AnswerReview>,
}

/// Grade `answers` against the authoritative `questions`.
///
/// Every question in the set is graded; unanswered questions count as
/// incorrect. An answer referencing a question outside the set is
/// malformed input. Callers guard the zero-question case before grading,
/// so the percentage division is always well-defined here.
pub fn grade(
  questions: &[QuizQuestion],
  answers:   &[SubmittedAnswer],
) -> Result<GradedQuiz> {
  if answers.is_empty() {
    return Err(Error::Validation("the answer list is empty".into()));
  }

  let by_question: HashMap<Uuid, &str> = answers
    .iter()
    .map(|a| (a.question_id, a.selected.as_str()))
    .collect();

  for answer in answers {
    if !questions.iter().any(|q| q.question_id == answer.question_id) {
      return Err(Error::Validation(format!(
        "answer references unknown question {}",
        answer.question_id
      )));
    }
  }

  let mut correct = 0u32;
  let mut breakdown = Vec::with_capacity(questions.len());

  for question in questions {
    let submitted = by_question.get(&question.question_id).copied();
    let is_correct = submitted.is_some_and(|s| {
      s.trim().eq_ignore_ascii_case(&question.correct_option)
    });
    if is_correct {
      correct += 1;
    }
    breakdown.push(AnswerReview {
      question_id: question.question_id,
      submitted:   submitted.map(str::to_owned),
      correct:     question.correct_option.clone(),
      is_correct,
    });
  }

  let total = questions.len() as u32;
  let score = f64::from(correct) / f64::from(total) * 100.0;

  Ok(GradedQuiz {
    score_percent:   score,
    passed:          score >= PASS_THRESHOLD_PERCENT,
    correct_answers: correct,
    total_questions: total,
    breakdown,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn question(id: Uuid, correct: &str) -> QuizQuestion {
    QuizQuestion {
      question_id:    id,
      session_id:     None,
      module:         "general".into(),
      prompt:         "?".into(),
      options:        BTreeMap::from([
        ("a".into(), "first".into()),
        ("b".into(), "second".into()),
      ]),
      correct_option: correct.into(),
      explanation:    None,
      active:         true,
    }
  }

  fn answer(id: Uuid, selected: &str) -> SubmittedAnswer {
    SubmittedAnswer { question_id: id, selected: selected.into() }
  }

  #[test]
  fn three_of_four_is_exactly_seventy_five_and_passes() {
    let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    let questions: Vec<_> = ids.iter().map(|id| question(*id, "a")).collect();
    let answers = vec![
      answer(ids[0], "a"),
      answer(ids[1], "a"),
      answer(ids[2], "a"),
      answer(ids[3], "b"),
    ];

    let graded = grade(&questions, &answers).unwrap();
    assert_eq!(graded.correct_answers, 3);
    assert_eq!(graded.score_percent, 75.0);
    assert!(graded.passed);
  }

  #[test]
  fn just_below_threshold_fails_even_when_rounding_would_pass() {
    // 149/199 = 74.87% rounds to 75 for display but must not pass.
    let ids: Vec<Uuid> = (0..199).map(|_| Uuid::new_v4()).collect();
    let questions: Vec<_> = ids.iter().map(|id| question(*id, "a")).collect();
    let answers: Vec<_> = ids
      .iter()
      .enumerate()
      .map(|(i, id)| answer(*id, if i < 149 { "a" } else { "b" }))
      .collect();

    let graded = grade(&questions, &answers).unwrap();
    assert_eq!(graded.correct_answers, 149);
    assert!(graded.score_percent < PASS_THRESHOLD_PERCENT);
    assert!(!graded.passed);
    assert_eq!(graded.score_percent.round() as u32, 75);
  }

  #[test]
  fn unanswered_questions_count_as_incorrect() {
    let ids: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
    let questions: Vec<_> = ids.iter().map(|id| question(*id, "b")).collect();

    let graded = grade(&questions, &[answer(ids[0], "b")]).unwrap();
    assert_eq!(graded.correct_answers, 1);
    assert_eq!(graded.total_questions, 2);
    assert_eq!(graded.score_percent, 50.0);
    assert!(!graded.passed);

    let unanswered =
      graded.breakdown.iter().find(|r| r.question_id == ids[1]).unwrap();
    assert!(unanswered.submitted.is_none());
    assert!(!unanswered.is_correct);
  }

  #[test]
  fn answer_comparison_ignores_case() {
    let id = Uuid::new_v4();
    let graded = grade(&[question(id, "a")], &[answer(id, " A ")]).unwrap();
    assert!(graded.passed);
  }

  #[test]
  fn empty_answer_list_is_rejected() {
    let id = Uuid::new_v4();
    let err = grade(&[question(id, "a")], &[]).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn unknown_question_reference_is_rejected() {
    let id = Uuid::new_v4();
    let err =
      grade(&[question(id, "a")], &[answer(Uuid::new_v4(), "a")]).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn client_view_carries_no_answer_key() {
    let q = question(Uuid::new_v4(), "a");
    let view = serde_json::to_value(q.client_view()).unwrap();
    assert!(view.get("correct_option").is_none());
    assert!(view.get("explanation").is_none());
  }
}
