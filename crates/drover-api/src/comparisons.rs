//! Handlers for `/comparisons` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/comparisons` | Body: [`NewComparisonBody`]; 201 + the stored comparison, or the graded answer when `is_gold_task` |
//! | `POST` | `/comparisons/triplet` | Body: [`NewTripletBody`]; 201 + the two derived comparisons |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use drover_core::{
  comparison::{NewComparison, NewTriplet, Outcome},
  store::RatingStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── Pairwise ────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /comparisons`, in the crowd platform's wire
/// codes: winner 0 = tie, 1 = subject_a, 2 = subject_b; degree 0 for ties,
/// else 1..=3.
#[derive(Debug, Deserialize)]
pub struct NewComparisonBody {
  pub subject_a:    Uuid,
  pub subject_b:    Uuid,
  pub winner:       u8,
  pub degree:       u8,
  pub rater_id:     Uuid,
  /// Routes the submission to the gold evaluator instead of the rating
  /// update.
  #[serde(default)]
  pub is_gold_task: bool,
}

impl TryFrom<&NewComparisonBody> for NewComparison {
  type Error = drover_core::Error;

  fn try_from(b: &NewComparisonBody) -> Result<Self, Self::Error> {
    Ok(NewComparison {
      subject_a: b.subject_a,
      subject_b: b.subject_b,
      outcome:   Outcome::from_codes(b.winner, b.degree)?,
      rater_id:  b.rater_id,
    })
  }
}

/// `POST /comparisons`
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewComparisonBody>,
) -> Result<Response, ApiError>
where
  S: RatingStore + 'static,
{
  let input = NewComparison::try_from(&body)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  if body.is_gold_task {
    let graded = state
      .store
      .record_gold_answer(input)
      .await
      .map_err(ApiError::from_store)?;
    Ok((StatusCode::CREATED, Json(graded)).into_response())
  } else {
    let comparison = state
      .store
      .record_comparison(input)
      .await
      .map_err(ApiError::from_store)?;
    Ok((StatusCode::CREATED, Json(comparison)).into_response())
  }
}

// ─── Triplet ─────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /comparisons/triplet`.
#[derive(Debug, Deserialize)]
pub struct NewTripletBody {
  pub subject_a:  Uuid,
  pub subject_b:  Uuid,
  pub subject_c:  Uuid,
  /// 1-based: which subject is most severe (1 = a, 2 = b, 3 = c).
  pub preference: u8,
  pub rater_id:   Uuid,
}

impl From<NewTripletBody> for NewTriplet {
  fn from(b: NewTripletBody) -> Self {
    NewTriplet {
      subjects:   [b.subject_a, b.subject_b, b.subject_c],
      preference: b.preference,
      rater_id:   b.rater_id,
    }
  }
}

/// `POST /comparisons/triplet` — 201 + the two derived comparisons.
pub async fn create_triplet<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewTripletBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RatingStore + 'static,
{
  let recorded = state
    .store
    .record_triplet(NewTriplet::from(body))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(recorded)))
}
