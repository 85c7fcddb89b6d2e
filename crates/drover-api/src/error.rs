//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use drover_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(String),
}

impl ApiError {
  /// Classify a store failure by its domain meaning: unknown ids are 404,
  /// rejected submissions are 400, exhausted lock retries are 409, and the
  /// rest is the backend's problem.
  pub fn from_store<E: Into<CoreError>>(e: E) -> Self {
    let core = e.into();
    match &core {
      CoreError::SubjectNotFound(_)
      | CoreError::GoldTaskNotFound(_, _)
      | CoreError::GoldTaskUnknown(_) => Self::NotFound(core.to_string()),
      CoreError::Conflict => Self::Conflict(core.to_string()),
      CoreError::Storage(_) => Self::Store(core.to_string()),
      _ => Self::BadRequest(core.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
