//! Handlers for the session registry.
//!
//! | Method   | Path                        | Auth |
//! |----------|-----------------------------|------|
//! | `POST`   | `/sessions`                 | facilitator/admin |
//! | `GET`    | `/sessions`                 | any authenticated |
//! | `GET`    | `/sessions/{id}`            | any authenticated |
//! | `PATCH`  | `/sessions/{id}`            | owning facilitator or admin |
//! | `DELETE` | `/sessions/{id}`            | admin |
//! | `GET`    | `/sessions/{id}/activities` | any authenticated |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use baraza_core::{
  activity::{CandidateActivity, NewActivity},
  quiz::NewQuestion,
  session::{
    NewSession, Pagination, Session, SessionFilter, SessionKind,
    SessionState, SessionUpdate,
  },
  store::WorkshopStore,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::Auth,
  error::ApiError,
  handlers::{require_admin, require_manager},
};

// ─── Shared response shapes ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PageMeta {
  pub page:  u32,
  pub limit: u32,
  pub total: u64,
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
  pub title:                 String,
  #[serde(default)]
  pub description:           String,
  pub scheduled_date:        NaiveDate,
  #[serde(default = "default_time")]
  pub scheduled_time:        NaiveTime,
  #[serde(default = "default_duration")]
  pub duration_hours:        u32,
  #[serde(default)]
  pub province:              Option<String>,
  #[serde(default)]
  pub district:              Option<String>,
  #[serde(default)]
  pub venue:                 Option<String>,
  #[serde(default)]
  pub virtual_link:          Option<String>,
  #[serde(default = "default_kind")]
  pub kind:                  SessionKind,
  #[serde(default = "default_expected")]
  pub expected_participants: u32,
  #[serde(default)]
  pub notes:                 Option<String>,
  #[serde(default)]
  pub activities:            Vec<NewActivity>,
  #[serde(default)]
  pub questions:             Vec<NewQuestion>,
}

fn default_time() -> NaiveTime { NaiveTime::from_hms_opt(10, 0, 0).unwrap() }

fn default_duration() -> u32 { 2 }

fn default_kind() -> SessionKind { SessionKind::InPerson }

fn default_expected() -> u32 { 20 }

/// `POST /sessions` — the caller becomes the facilitator.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Json(body): Json<CreateSessionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_manager(&principal)?;

  let session = state
    .store
    .create_session(NewSession {
      title:                 body.title,
      description:           body.description,
      scheduled_date:        body.scheduled_date,
      scheduled_time:        body.scheduled_time,
      duration_hours:        body.duration_hours,
      province:              body.province,
      district:              body.district,
      venue:                 body.venue,
      virtual_link:          body.virtual_link,
      kind:                  body.kind,
      facilitator_id:        principal.id,
      expected_participants: body.expected_participants,
      notes:                 body.notes,
      activities:            body.activities,
      questions:             body.questions,
    })
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(
    session_id = %session.session_id,
    facilitator = %principal.id,
    "session created"
  );
  Ok((StatusCode::CREATED, Json(session)))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub province: Option<String>,
  pub district: Option<String>,
  pub state:    Option<SessionState>,
  pub kind:     Option<SessionKind>,
  pub page:     Option<u32>,
  pub limit:    Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SessionList {
  pub sessions:   Vec<Session>,
  pub pagination: PageMeta,
}

/// `GET /sessions?province=&district=&state=&kind=&page=&limit=`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Auth(_principal): Auth,
  Query(params): Query<ListParams>,
) -> Result<Json<SessionList>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  let filter = SessionFilter {
    province: params.province,
    district: params.district,
    state:    params.state,
    kind:     params.kind,
  };
  let page = Pagination {
    page:  params.page.unwrap_or(1),
    limit: params.limit.unwrap_or(20),
  };

  let (sessions, total) = state
    .store
    .list_sessions(&filter, page)
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(SessionList {
    sessions,
    pagination: PageMeta { page: page.page, limit: page.limit, total },
  }))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /sessions/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Auth(_principal): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  let session = state
    .store
    .get_session(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(session))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /sessions/{id}` — owning facilitator or admin.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Path(id): Path<Uuid>,
  Json(body): Json<SessionUpdate>,
) -> Result<StatusCode, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_manager(&principal)?;

  let session = state
    .store
    .get_session(id)
    .await
    .map_err(ApiError::from_store)?;
  if !principal.role.is_admin() && session.facilitator_id != principal.id {
    return Err(ApiError::Forbidden(
      "only the owning facilitator may update this session".into(),
    ));
  }

  state
    .store
    .update_session(id, body)
    .await
    .map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /sessions/{id}` — admin only; cascades.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Auth(principal): Auth,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  require_admin(&principal)?;

  state
    .store
    .delete_session(id)
    .await
    .map_err(ApiError::from_store)?;

  tracing::info!(session_id = %id, admin = %principal.id, "session deleted");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Activities ──────────────────────────────────────────────────────────────

/// `GET /sessions/{id}/activities` — ballot order.
pub async fn activities<S>(
  State(state): State<AppState<S>>,
  Auth(_principal): Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<CandidateActivity>>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  // Resolve the session first so a bad id is a 404, not an empty list.
  state
    .store
    .get_session(id)
    .await
    .map_err(ApiError::from_store)?;

  let activities = state
    .store
    .list_activities(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(activities))
}
