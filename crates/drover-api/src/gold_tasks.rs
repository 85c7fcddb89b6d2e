//! Handlers for `/gold-tasks` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/gold-tasks` | Active tasks; `?include_inactive=true` for all |
//! | `POST` | `/gold-tasks` | Body: [`NewGoldTaskBody`]; 201 + stored task |
//! | `POST` | `/gold-tasks/{id}/deactivate` | Retired tasks stop matching |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use drover_core::{
  comparison::Outcome,
  gold::{GoldDifficulty, GoldTask, NewGoldTask},
  store::RatingStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub include_inactive: bool,
}

/// `GET /gold-tasks[?include_inactive=true]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<GoldTask>>, ApiError>
where
  S: RatingStore + 'static,
{
  let tasks = state
    .store
    .list_gold_tasks(params.include_inactive)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(tasks))
}

/// JSON body accepted by `POST /gold-tasks`, with the expected outcome in
/// the same wire codes the comparison endpoint takes.
#[derive(Debug, Deserialize)]
pub struct NewGoldTaskBody {
  pub subject_a:  Uuid,
  pub subject_b:  Uuid,
  pub winner:     u8,
  pub degree:     u8,
  #[serde(default)]
  pub difficulty: GoldDifficulty,
  pub created_by: Option<Uuid>,
}

impl TryFrom<&NewGoldTaskBody> for NewGoldTask {
  type Error = drover_core::Error;

  fn try_from(b: &NewGoldTaskBody) -> Result<Self, Self::Error> {
    Ok(NewGoldTask {
      subject_a:  b.subject_a,
      subject_b:  b.subject_b,
      expected:   Outcome::from_codes(b.winner, b.degree)?,
      difficulty: b.difficulty,
      created_by: b.created_by,
    })
  }
}

/// `POST /gold-tasks` — 201 + the stored task.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewGoldTaskBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RatingStore + 'static,
{
  let input = NewGoldTask::try_from(&body)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let task = state
    .store
    .create_gold_task(input)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(task)))
}

/// `POST /gold-tasks/{id}/deactivate`
pub async fn deactivate<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<GoldTask>, ApiError>
where
  S: RatingStore + 'static,
{
  let task = state
    .store
    .set_gold_task_active(id, false)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(task))
}
