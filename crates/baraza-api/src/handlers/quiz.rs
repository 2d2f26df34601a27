//! Handlers for the quiz gate.
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | `GET`  | `/sessions/{id}/questions` | participant |
//! | `POST` | `/sessions/{id}/submit-test` | participant |
//! | `GET`  | `/quiz/result` | participant |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use baraza_core::{
  quiz::{QuestionView, QuizResult, SubmittedAnswer},
  store::WorkshopStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, auth::Auth, error::ApiError, handlers::require_participant,
};

// ─── Questions ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QuestionParams {
  /// Randomly sample down to this many questions.
  pub count: Option<u32>,
}

/// `GET /sessions/{id}/questions[?count=N]`
///
/// Serves [`QuestionView`]s — the correct option never reaches the client.
pub async fn questions<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Path(id): Path<Uuid>,
  Query(params): Query<QuestionParams>,
) -> Result<Json<Vec<QuestionView>>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_participant(&principal)?;

  let questions = state
    .store
    .get_questions(id, params.count)
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(questions.iter().map(|q| q.client_view()).collect()))
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub answers: Vec<SubmittedAnswer>,
}

/// `POST /sessions/{id}/submit-test` — graded server-side; the response
/// includes the full per-question breakdown, which is fine to reveal once
/// the attempt is recorded.
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Path(id): Path<Uuid>,
  Json(body): Json<SubmitBody>,
) -> Result<Json<QuizResult>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_participant(&principal)?;

  let result = state
    .store
    .submit_quiz(id, principal.id, body.answers)
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(
    session_id = %id,
    participant = %principal.id,
    score = result.score_percent,
    passed = result.passed,
    "quiz attempt recorded"
  );
  Ok(Json(result))
}

// ─── Latest result ───────────────────────────────────────────────────────────

/// `GET /quiz/result` — the caller's most recent attempt, or `null` when
/// none exists (a normal outcome, not an error).
pub async fn latest<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
) -> Result<Json<Option<QuizResult>>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_participant(&principal)?;

  let result = state
    .store
    .latest_result(principal.id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(result))
}
