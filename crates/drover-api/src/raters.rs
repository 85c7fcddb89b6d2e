//! Handlers for `/raters` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/raters` | All known raters |
//! | `GET`  | `/raters/{id}` | 404 if the rater has never been seen |
//! | `POST` | `/raters/{id}/active` | Body: `{"active":false}`; upserts |

use axum::{
  Json,
  extract::{Path, State},
};
use drover_core::{rater::Rater, store::RatingStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// `GET /raters`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Rater>>, ApiError>
where
  S: RatingStore + 'static,
{
  let raters = state.store.list_raters().await.map_err(ApiError::from_store)?;
  Ok(Json(raters))
}

/// `GET /raters/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Rater>, ApiError>
where
  S: RatingStore + 'static,
{
  let rater = state
    .store
    .get_rater(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("rater {id} not found")))?;
  Ok(Json(rater))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub active: bool,
}

/// `POST /raters/{id}/active` — body: `{"active":false}`
pub async fn set_active<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ActiveBody>,
) -> Result<Json<Rater>, ApiError>
where
  S: RatingStore + 'static,
{
  let rater = state
    .store
    .set_rater_active(id, body.active)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(rater))
}
