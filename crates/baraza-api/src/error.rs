//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use baraza_core::{ErrorKind, StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Conflict(String),

  /// Datastore connectivity failure; retryable. The message is always the
  /// generic one — backend detail goes to the log, never the response.
  #[error("service temporarily unavailable")]
  Unavailable,

  #[error("internal error")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a typed store error onto its transport class. Validation-class
  /// messages pass through verbatim (they are written to be actionable);
  /// transient and internal faults are redacted and logged instead.
  pub fn from_store<E>(err: E) -> Self
  where
    E: StoreError + Send + Sync + 'static,
  {
    match err.kind() {
      ErrorKind::Validation => Self::BadRequest(err.to_string()),
      ErrorKind::NotFound => Self::NotFound(err.to_string()),
      ErrorKind::Forbidden => Self::Forbidden(err.to_string()),
      ErrorKind::Conflict | ErrorKind::InvalidState => {
        Self::Conflict(err.to_string())
      }
      ErrorKind::Transient => {
        tracing::warn!(error = %err, "datastore unavailable");
        Self::Unavailable
      }
      ErrorKind::Internal => {
        tracing::error!(error = %err, "internal fault in store operation");
        Self::Internal(Box::new(err))
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    // Display is already redacted for the unavailable/internal variants.
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
