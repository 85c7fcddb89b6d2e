//! Handlers for `/snapshots` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/snapshots` | Body: `{"name","description","created_by"}`; 201 + the frozen hierarchy |
//! | `GET`  | `/snapshots` | Summaries, oldest first |
//! | `GET`  | `/snapshots/{id}` | Full frozen hierarchy; 404 if unknown |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use drover_core::{
  snapshot::{HierarchySnapshot, NewSnapshot, SnapshotSummary},
  store::RatingStore,
};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `POST /snapshots` — 201 + the captured snapshot.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewSnapshot>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RatingStore + 'static,
{
  let snapshot = state
    .store
    .capture_snapshot(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(snapshot)))
}

/// `GET /snapshots`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<SnapshotSummary>>, ApiError>
where
  S: RatingStore + 'static,
{
  let summaries = state
    .store
    .list_snapshots()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(summaries))
}

/// `GET /snapshots/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<HierarchySnapshot>, ApiError>
where
  S: RatingStore + 'static,
{
  let snapshot = state
    .store
    .get_snapshot(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("snapshot {id} not found")))?;
  Ok(Json(snapshot))
}
