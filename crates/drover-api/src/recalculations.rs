//! Handlers for `/recalculations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/recalculations` | 202 + the queued job document |
//! | `GET`  | `/recalculations/{id}` | Job status; 404 if unknown |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use drover_core::store::RatingStore;
use uuid::Uuid;

use crate::{ApiState, error::ApiError, jobs::RecalcJob};

/// `POST /recalculations` — queue a full replay and return 202 immediately.
pub async fn start<S>(
  State(state): State<ApiState<S>>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RatingStore + 'static,
{
  let job = state.jobs.spawn(state.store.clone()).await;
  Ok((StatusCode::ACCEPTED, Json(job)))
}

/// `GET /recalculations/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RecalcJob>, ApiError>
where
  S: RatingStore + 'static,
{
  let job = state
    .jobs
    .get(id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("recalculation {id} not found")))?;
  Ok(Json(job))
}
