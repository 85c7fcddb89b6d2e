//! Handlers for `/subjects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects` | Optional `?include_inactive=true` |
//! | `POST` | `/subjects` | Body: `{"subject_id":"..."}`; the registry owns ids |
//! | `GET`  | `/subjects/{id}` | 404 if not found |
//! | `POST` | `/subjects/{id}/deactivate` | Soft-deactivate |
//! | `GET`  | `/subjects/{id}/history` | Rating trajectory, oldest first |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use drover_core::{
  store::RatingStore,
  subject::{RatingHistoryEntry, Subject, SubjectView},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub include_inactive: bool,
}

/// `GET /subjects[?include_inactive=true]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<SubjectView>>, ApiError>
where
  S: RatingStore + 'static,
{
  let subjects = state
    .store
    .list_subjects(params.include_inactive)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(subjects))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub subject_id: Uuid,
}

/// `POST /subjects` — body: `{"subject_id":"..."}`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RatingStore + 'static,
{
  let subject = state
    .store
    .register_subject(body.subject_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(subject)))
}

/// `GET /subjects/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SubjectView>, ApiError>
where
  S: RatingStore + 'static,
{
  let subject = state
    .store
    .get_subject(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?;
  Ok(Json(subject))
}

/// `POST /subjects/{id}/deactivate`
pub async fn deactivate<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError>
where
  S: RatingStore + 'static,
{
  let subject = state
    .store
    .deactivate_subject(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(subject))
}

/// `GET /subjects/{id}/history`
pub async fn history<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<RatingHistoryEntry>>, ApiError>
where
  S: RatingStore + 'static,
{
  let entries = state
    .store
    .rating_history(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(entries))
}
