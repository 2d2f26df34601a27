//! Handlers for enrollment: PIN redemption, training progress, and the
//! facilitator's participant roster.
//!
//! | Method   | Path | Auth |
//! |----------|------|------|
//! | `POST`   | `/sessions/join` | participant |
//! | `POST`   | `/sessions/progress` | participant |
//! | `GET`    | `/sessions/{id}/participants` | facilitator/admin |
//! | `PATCH`  | `/sessions/{id}/participants/{user_id}` | facilitator/admin |
//! | `DELETE` | `/sessions/{id}/participants/{user_id}` | facilitator/admin |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use baraza_core::{
  enrollment::{EnrolledParticipant, Enrollment, EnrollmentStatus},
  session::Pagination,
  store::WorkshopStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::Auth,
  error::ApiError,
  handlers::{require_manager, require_participant},
  handlers::sessions::PageMeta,
};

// ─── Join ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JoinBody {
  pub pin: String,
}

/// `POST /sessions/join` — body: `{"pin":"AB3X9K"}` (case-insensitive).
pub async fn join<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Json(body): Json<JoinBody>,
) -> Result<Json<Enrollment>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_participant(&principal)?;

  let enrollment = state
    .store
    .join_by_pin(&body.pin, principal.id)
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(
    session_id = %enrollment.session_id,
    participant = %principal.id,
    "participant joined by PIN"
  );
  Ok(Json(enrollment))
}

// ─── Training progress ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ProgressBody {
  pub session_id: Uuid,
  pub percentage: i32,
}

/// `POST /sessions/progress` — clamped to [0, 100].
pub async fn progress<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Json(body): Json<ProgressBody>,
) -> Result<StatusCode, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_participant(&principal)?;

  state
    .store
    .update_training_progress(body.session_id, principal.id, body.percentage)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Roster ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RosterParams {
  pub page:  Option<u32>,
  pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantList {
  pub participants: Vec<EnrolledParticipant>,
  pub pagination:   PageMeta,
}

/// `GET /sessions/{id}/participants`
pub async fn participants<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Path(id): Path<Uuid>,
  Query(params): Query<RosterParams>,
) -> Result<Json<ParticipantList>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_manager(&principal)?;

  let page = Pagination {
    page:  params.page.unwrap_or(1),
    limit: params.limit.unwrap_or(50),
  };
  let (participants, total) = state
    .store
    .list_participants(id, page)
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(ParticipantList {
    participants,
    pagination: PageMeta { page: page.page, limit: page.limit, total },
  }))
}

// ─── Status override ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: EnrollmentStatus,
}

/// `PATCH /sessions/{id}/participants/{user_id}`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Path((id, user_id)): Path<(Uuid, Uuid)>,
  Json(body): Json<StatusBody>,
) -> Result<StatusCode, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_manager(&principal)?;

  state
    .store
    .set_participant_status(id, user_id, body.status)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Removal ─────────────────────────────────────────────────────────────────

/// `DELETE /sessions/{id}/participants/{user_id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_manager(&principal)?;

  state
    .store
    .remove_participant(id, user_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}
