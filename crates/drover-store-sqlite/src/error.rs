//! Error type for `drover-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] drover_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value outside its domain encoding.
  #[error("column decode error: {0}")]
  Decode(String),

  /// A write transaction kept hitting a locked database after the bounded
  /// retries.
  #[error("database busy after retries")]
  Busy,
}

impl Error {
  /// Whether this error is a transient lock that a retry might clear.
  pub(crate) fn is_busy(&self) -> bool {
    fn busy_code(e: &rusqlite::Error) -> bool {
      matches!(
        e.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy)
          | Some(rusqlite::ErrorCode::DatabaseLocked)
      )
    }
    match self {
      Self::Sqlite(e) => busy_code(e),
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => busy_code(e),
      _ => false,
    }
  }
}

impl From<Error> for drover_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::Busy => drover_core::Error::Conflict,
      other => drover_core::Error::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
