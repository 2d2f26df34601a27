//! `POST /auth/login` — credential verification and token issuance.

use axum::{Json, extract::State};
use baraza_core::{
  store::WorkshopStore,
  user::{Principal, Role},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::verify_password, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub token:   String,
  pub user_id: Uuid,
  pub name:    String,
  pub role:    Role,
}

/// `POST /auth/login` — body: `{"email":"...","password":"..."}`.
///
/// A single 401 covers both unknown emails and wrong passwords; the
/// response never says which.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError>
where
  S: WorkshopStore + Clone + Send + Sync + 'static,
{
  let user = state
    .store
    .find_user_by_email(&body.email)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(ApiError::Unauthorized)?;

  if !verify_password(&body.password, &user.password_hash) {
    return Err(ApiError::Unauthorized);
  }

  let principal = Principal {
    id:   user.user_id,
    role: user.role,
    name: user.name.clone(),
  };
  let token = state.tokens.issue(principal);

  // Best-effort: a failed timestamp bump must never fail the login.
  let store = state.store.clone();
  let user_id = user.user_id;
  tokio::spawn(async move {
    if let Err(err) = store.touch_last_active(user_id).await {
      tracing::debug!(error = %err, "last-active update failed");
    }
  });

  Ok(Json(LoginResponse {
    token,
    user_id: user.user_id,
    name: user.name,
    role: user.role,
  }))
}
