//! Error type for `baraza-store-sqlite`.

use baraza_core::{ErrorKind, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] baraza_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A stored column value no longer matches its expected shape.
  #[error("decode error: {0}")]
  Decode(String),
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    Self::Database(tokio_rusqlite::Error::Rusqlite(e))
  }
}

impl StoreError for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      // Connection-level failures are the retryable class; the rest are
      // faults in stored data.
      Self::Database(_) => ErrorKind::Transient,
      Self::Json(_) | Self::Uuid(_) | Self::Decode(_) => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
