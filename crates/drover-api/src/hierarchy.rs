//! Handler for `GET /hierarchy`.

use axum::{Json, extract::State};
use drover_core::{hierarchy::Hierarchy, store::RatingStore};

use crate::{ApiState, error::ApiError};

/// `GET /hierarchy` — the current ranked list with its aggregate metrics,
/// assembled from one consistent view of the active generation.
pub async fn get_current<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Hierarchy>, ApiError>
where
  S: RatingStore + 'static,
{
  let hierarchy = state
    .store
    .assemble_hierarchy()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(hierarchy))
}
