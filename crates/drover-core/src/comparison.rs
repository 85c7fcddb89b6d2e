//! Comparison judgments — the fundamental unit of evidence in the store.
//!
//! A comparison is immutable once recorded: it carries the rater's weight as
//! it was at submission time, so that a later change in the rater's
//! reliability never rewrites history. Recalculation replays these records
//! verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Which of the two presented clips the rater judged more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
  A,
  B,
}

impl Side {
  pub fn opposite(self) -> Self {
    match self {
      Self::A => Self::B,
      Self::B => Self::A,
    }
  }
}

/// The rater's judgment for a single pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
  /// The clips were judged equally severe.
  Tie,
  /// One clip was judged more severe, with a confidence degree of 1
  /// (slightly), 2 (clearly), or 3 (much more severe).
  Decisive { winner: Side, degree: u8 },
}

impl Outcome {
  /// Parse the wire encoding: winner 0 means a tie (degree must be 0),
  /// winner 1 or 2 picks a side (degree must be 1..=3).
  pub fn from_codes(winner: u8, degree: u8) -> Result<Self> {
    match (winner, degree) {
      (0, 0) => Ok(Self::Tie),
      (1, 1..=3) => Ok(Self::Decisive { winner: Side::A, degree }),
      (2, 1..=3) => Ok(Self::Decisive { winner: Side::B, degree }),
      _ => Err(Error::InvalidWinnerOrDegree { winner, degree }),
    }
  }

  /// The `winner` column value: 0 for a tie, 1 or 2 for a side.
  pub fn winner_code(&self) -> u8 {
    match self {
      Self::Tie => 0,
      Self::Decisive { winner: Side::A, .. } => 1,
      Self::Decisive { winner: Side::B, .. } => 2,
    }
  }

  /// The `degree` column value: 0 for a tie.
  pub fn degree_code(&self) -> u8 {
    match self {
      Self::Tie => 0,
      Self::Decisive { degree, .. } => *degree,
    }
  }

  /// The same judgment with the pair presented in the opposite order.
  pub fn mirrored(self) -> Self {
    match self {
      Self::Tie => Self::Tie,
      Self::Decisive { winner, degree } => {
        Self::Decisive { winner: winner.opposite(), degree }
      }
    }
  }
}

// ─── Comparison ──────────────────────────────────────────────────────────────

/// Whether a comparison feeds the ratings or only measures the rater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonKind {
  /// Moves subject ratings.
  Production,
  /// A gold-task answer; grades the rater, never touches the subjects.
  Diagnostic,
}

/// A recorded judgment. `rater_weight` is the rater's effective weight at the
/// moment of submission and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
  pub comparison_id: Uuid,
  pub subject_a:     Uuid,
  pub subject_b:     Uuid,
  pub outcome:       Outcome,
  pub rater_id:      Uuid,
  pub rater_weight:  f64,
  pub kind:          ComparisonKind,
  pub submitted_at:  DateTime<Utc>,
}

// ─── NewComparison ───────────────────────────────────────────────────────────

/// Input to [`crate::store::RatingStore::record_comparison`]. The store
/// assigns the id, the timestamp, and the rater-weight snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComparison {
  pub subject_a: Uuid,
  pub subject_b: Uuid,
  pub outcome:   Outcome,
  pub rater_id:  Uuid,
}

impl NewComparison {
  /// Structural checks that need no store access.
  pub fn validate(&self) -> Result<()> {
    if self.subject_a == self.subject_b {
      return Err(Error::SelfComparison);
    }
    if let Outcome::Decisive { degree, .. } = self.outcome {
      if !(1..=3).contains(&degree) {
        return Err(Error::InvalidWinnerOrDegree {
          winner: self.outcome.winner_code(),
          degree,
        });
      }
    }
    Ok(())
  }
}

// ─── NewTriplet ──────────────────────────────────────────────────────────────

/// A most-severe-of-three judgment. Decomposed into two pairwise comparisons
/// before storage; the triplet itself is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTriplet {
  pub subjects:   [Uuid; 3],
  /// 1-based index of the clip judged most severe.
  pub preference: u8,
  pub rater_id:   Uuid,
}

impl NewTriplet {
  /// The chosen clip beats each of the other two at degree 1. Triplet
  /// judgments carry no per-pair confidence, so the mildest decisive degree
  /// is used for both derived pairs.
  pub fn into_pairwise(self) -> Result<[NewComparison; 2]> {
    if !(1..=3).contains(&self.preference) {
      return Err(Error::InvalidPreference(self.preference));
    }
    let [s0, s1, s2] = self.subjects;
    if s0 == s1 || s0 == s2 || s1 == s2 {
      return Err(Error::SelfComparison);
    }
    let (winner, rest) = match self.preference {
      1 => (s0, [s1, s2]),
      2 => (s1, [s0, s2]),
      _ => (s2, [s0, s1]),
    };
    let outcome = Outcome::Decisive { winner: Side::A, degree: 1 };
    Ok(rest.map(|loser| NewComparison {
      subject_a: winner,
      subject_b: loser,
      outcome,
      rater_id: self.rater_id,
    }))
  }
}
