//! Handlers for the voting aggregator.
//!
//! | Method | Path | Auth |
//! |--------|------|------|
//! | `POST` | `/sessions/submit-votes` | participant (quiz-passed) |
//! | `GET`  | `/sessions/{id}/live-results` | any authenticated |
//! | `GET`  | `/sessions/{id}/voting-status` | participant |

use axum::{
  Json,
  extract::{Path, State},
};
use baraza_core::{
  store::WorkshopStore,
  vote::{NewVote, RankedActivity, VoteReceipt},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState, auth::Auth, error::ApiError, handlers::require_participant,
};

// ─── Submission ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitVotesBody {
  pub session_id: Uuid,
  pub votes:      Vec<NewVote>,
}

/// `POST /sessions/submit-votes` — all-or-nothing batch upsert, gated on a
/// passed quiz.
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Json(body): Json<SubmitVotesBody>,
) -> Result<Json<VoteReceipt>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_participant(&principal)?;

  let receipt = state
    .store
    .submit_votes(body.session_id, principal.id, body.votes)
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(
    session_id = %body.session_id,
    participant = %principal.id,
    votes = receipt.votes_recorded,
    "vote batch recorded"
  );

  // Best-effort activity bump, detached from the response path.
  let store = state.store.clone();
  let user_id = principal.id;
  tokio::spawn(async move {
    if let Err(err) = store.touch_last_active(user_id).await {
      tracing::debug!(error = %err, "last-active update failed");
    }
  });

  Ok(Json(receipt))
}

// ─── Live results ────────────────────────────────────────────────────────────

/// `GET /sessions/{id}/live-results` — ranked aggregates; eventually
/// consistent with in-flight submissions, which suits a polled dashboard.
pub async fn live_results<S>(
  State(state): State<AppState<S>>,
  Auth(_principal): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<RankedActivity>>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  let results = state
    .store
    .live_results(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(results))
}

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct VotingStatus {
  /// At least one vote row exists — weaker than `voting_completed`,
  /// which only a full batch sets.
  pub has_voted: bool,
}

/// `GET /sessions/{id}/voting-status`
pub async fn status<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<VotingStatus>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_participant(&principal)?;

  let has_voted = state
    .store
    .has_voted(id, principal.id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(VotingStatus { has_voted }))
}
