//! Error types for `baraza-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::session::SessionState;

/// The coarse classification a boundary layer maps onto transport codes.
///
/// Components raise specific typed errors; only the HTTP layer cares about
/// the class, and only the class is stable across storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Malformed or out-of-range input. Local, never retryable as-is.
  Validation,
  /// A referenced entity does not exist.
  NotFound,
  /// The caller lacks a gating precondition or required role.
  Forbidden,
  /// A uniqueness violation not absorbed by upsert logic.
  Conflict,
  /// The operation is not meaningful in the entity's current state.
  InvalidState,
  /// The datastore is unreachable; safe to retry with backoff.
  Transient,
  /// An unexpected fault; detail belongs in logs, not responses.
  Internal,
}

/// Implemented by every store-level error so generic boundary code can map
/// it to a transport status without knowing the concrete backend.
pub trait StoreError: std::error::Error {
  fn kind(&self) -> ErrorKind;
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Validation(String),

  #[error("session not found: {0}")]
  SessionNotFound(Uuid),

  /// Deliberately does not echo the PIN back; the message doubles as the
  /// user-facing text for both "never existed" and "session closed".
  #[error("invalid or closed PIN")]
  PinNotFound,

  #[error("participant {participant_id} is not enrolled in session {session_id}")]
  EnrollmentNotFound {
    session_id:     Uuid,
    participant_id: Uuid,
  },

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("activity {activity_id} does not belong to session {session_id}")]
  ActivityNotInSession {
    activity_id: Uuid,
    session_id:  Uuid,
  },

  #[error("complete the quiz before voting")]
  QuizNotPassed,

  #[error("could not allocate a unique join PIN")]
  PinExhausted,

  #[error("email {0} is already registered")]
  EmailTaken(String),

  #[error("session {0} is closed")]
  SessionClosed(Uuid),

  #[error("session {session_id}: cannot transition from {from} to {to}")]
  InvalidStateTransition {
    session_id: Uuid,
    from:       SessionState,
    to:         SessionState,
  },

  #[error("session {0} has no active questions")]
  NoActiveQuestions(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl StoreError for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_) | Self::ActivityNotInSession { .. } => {
        ErrorKind::Validation
      }
      Self::SessionNotFound(_)
      | Self::PinNotFound
      | Self::EnrollmentNotFound { .. }
      | Self::UserNotFound(_) => ErrorKind::NotFound,
      Self::QuizNotPassed => ErrorKind::Forbidden,
      Self::PinExhausted | Self::EmailTaken(_) => ErrorKind::Conflict,
      Self::SessionClosed(_)
      | Self::InvalidStateTransition { .. }
      | Self::NoActiveQuestions(_) => ErrorKind::InvalidState,
      Self::Serialization(_) => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
