//! Subjects — the video clips being ranked — and their per-generation
//! rating state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RatingConfig;

// ─── Subject ─────────────────────────────────────────────────────────────────

/// A ranked entity. The subject row itself carries only identity and
/// lifecycle metadata; all rating state lives in [`SubjectRating`], keyed by
/// generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  /// Inactive subjects keep their history but are excluded from assembled
  /// hierarchies and refuse new comparisons.
  pub active:     bool,
  pub created_at: DateTime<Utc>,
}

// ─── SubjectRating ───────────────────────────────────────────────────────────

/// Mutable rating state for one subject within one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRating {
  pub subject_id:  Uuid,
  pub rating:      f64,
  /// Shrinks with every comparison; gates both the K-factor and the
  /// confidence reported in hierarchy entries.
  pub uncertainty: f64,
  pub wins:        u64,
  pub losses:      u64,
  pub ties:        u64,
}

impl SubjectRating {
  /// The state every subject starts from, in every generation.
  pub fn initial(subject_id: Uuid, cfg: &RatingConfig) -> Self {
    Self {
      subject_id,
      rating: cfg.initial_rating,
      uncertainty: cfg.initial_uncertainty,
      wins: 0,
      losses: 0,
      ties: 0,
    }
  }

  pub fn comparison_count(&self) -> u64 {
    self.wins + self.losses + self.ties
  }
}

// ─── Category ────────────────────────────────────────────────────────────────

/// Coarse interpretation of a rating for display. Higher ratings mean more
/// severe, so the upper band is the lame one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  Sound,
  Borderline,
  Lame,
}

impl Category {
  pub fn classify(rating: f64, cfg: &RatingConfig) -> Self {
    if rating < cfg.severity_low {
      Self::Sound
    } else if rating > cfg.severity_high {
      Self::Lame
    } else {
      Self::Borderline
    }
  }
}

// ─── Read views ──────────────────────────────────────────────────────────────

/// A subject joined with its rating state in the active generation; the shape
/// returned by single-subject reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectView {
  pub subject_id:  Uuid,
  pub active:      bool,
  pub created_at:  DateTime<Utc>,
  pub rating:      f64,
  pub uncertainty: f64,
  pub wins:        u64,
  pub losses:      u64,
  pub ties:        u64,
  pub category:    Category,
}

/// One step of a subject's rating trajectory, recorded after every
/// comparison that touches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingHistoryEntry {
  pub subject_id:    Uuid,
  pub comparison_id: Uuid,
  pub rating_before: f64,
  pub rating_after:  f64,
  pub recorded_at:   DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn category_boundaries_are_inclusive_of_borderline() {
    let cfg = RatingConfig::default();
    assert_eq!(Category::classify(1449.9, &cfg), Category::Sound);
    assert_eq!(Category::classify(1450.0, &cfg), Category::Borderline);
    assert_eq!(Category::classify(1550.0, &cfg), Category::Borderline);
    assert_eq!(Category::classify(1550.1, &cfg), Category::Lame);
  }

  #[test]
  fn initial_state_has_no_results() {
    let cfg = RatingConfig::default();
    let r = SubjectRating::initial(Uuid::new_v4(), &cfg);
    assert_eq!(r.rating, cfg.initial_rating);
    assert_eq!(r.uncertainty, cfg.initial_uncertainty);
    assert_eq!(r.comparison_count(), 0);
  }
}
