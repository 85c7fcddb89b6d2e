//! Error types for `drover-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("subject already exists: {0}")]
  SubjectExists(Uuid),

  #[error("subject {0} is inactive")]
  SubjectInactive(Uuid),

  #[error("rater {0} is inactive")]
  RaterInactive(Uuid),

  #[error("a subject cannot be compared against itself")]
  SelfComparison,

  #[error("invalid winner/degree combination: winner={winner}, degree={degree}")]
  InvalidWinnerOrDegree { winner: u8, degree: u8 },

  #[error("invalid triplet preference: {0}")]
  InvalidPreference(u8),

  #[error("no active gold task covers subjects {0} and {1}")]
  GoldTaskNotFound(Uuid, Uuid),

  #[error("gold task not found: {0}")]
  GoldTaskUnknown(Uuid),

  #[error("conflicting concurrent write, retry the request")]
  Conflict,

  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
