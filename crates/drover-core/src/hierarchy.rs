//! Hierarchy assembly — the full ranked list with per-entry annotations and
//! population-level quality metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  config::RatingConfig,
  score::{self, PairRecord},
  subject::{Category, SubjectRating},
};

// ─── Linearity ───────────────────────────────────────────────────────────────

/// Label for how transitive the inferred order looks, from the steepness
/// magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderLinearity {
  Strong,
  Moderate,
  Weak,
}

impl OrderLinearity {
  pub fn from_steepness(steepness: f64, cfg: &RatingConfig) -> Self {
    let s = steepness.abs();
    if s >= cfg.linearity_strong {
      Self::Strong
    } else if s >= cfg.linearity_moderate {
      Self::Moderate
    } else {
      Self::Weak
    }
  }
}

// ─── Hierarchy ───────────────────────────────────────────────────────────────

/// One row of the assembled ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyEntry {
  /// 1-based position, descending rating.
  pub rank:         u64,
  pub subject_id:   Uuid,
  pub rating:       f64,
  pub uncertainty:  f64,
  pub davids_score: f64,
  pub wins:         u64,
  pub losses:       u64,
  pub ties:         u64,
  pub category:     Category,
  /// Blend of how much evidence the entry rests on and how settled the
  /// rating is, in [0,1].
  pub confidence:   f64,
}

/// Population-level quality metrics for one assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyMetrics {
  pub steepness:            f64,
  pub steepness_se:         f64,
  pub linearity:            OrderLinearity,
  pub interrater_agreement: f64,
  pub subjects:             u64,
  pub comparisons:          u64,
}

/// The assembled ranking, tagged with the generation it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
  pub generation:   i64,
  pub entries:      Vec<HierarchyEntry>,
  pub metrics:      HierarchyMetrics,
  pub assembled_at: DateTime<Utc>,
}

/// Evidence-and-certainty confidence for one rating state: half from the
/// comparison count (saturating at the cap), half from how far uncertainty
/// has decayed toward the floor.
pub fn confidence(rating: &SubjectRating, cfg: &RatingConfig) -> f64 {
  let count_part = rating.comparison_count().min(cfg.confidence_cap) as f64
    / cfg.confidence_cap as f64;
  let span = cfg.initial_uncertainty - cfg.uncertainty_floor;
  let settled_part = if span > 0.0 {
    1.0 - ((rating.uncertainty - cfg.uncertainty_floor) / span).clamp(0.0, 1.0)
  } else {
    1.0
  };
  (0.5 * count_part + 0.5 * settled_part).clamp(0.0, 1.0)
}

/// Assemble the ranking for a set of rating states and the production
/// judgments behind them.
///
/// `ratings` should already exclude deactivated subjects; `records` should
/// not, so that departed opponents keep lending strength to David's Score.
/// Ordering is descending rating with the subject id as a stable tiebreak.
pub fn assemble(
  generation: i64,
  ratings: &[SubjectRating],
  records: &[PairRecord],
  cfg: &RatingConfig,
  assembled_at: DateTime<Utc>,
) -> Hierarchy {
  let ids: Vec<Uuid> = ratings.iter().map(|r| r.subject_id).collect();
  let scores = score::davids_scores(&ids, records);

  let mut ordered: Vec<&SubjectRating> = ratings.iter().collect();
  ordered.sort_by(|a, b| {
    b.rating
      .total_cmp(&a.rating)
      .then_with(|| a.subject_id.cmp(&b.subject_id))
  });

  let entries: Vec<HierarchyEntry> = ordered
    .iter()
    .enumerate()
    .map(|(i, r)| HierarchyEntry {
      rank: i as u64 + 1,
      subject_id: r.subject_id,
      rating: r.rating,
      uncertainty: r.uncertainty,
      davids_score: scores
        .get(&r.subject_id)
        .copied()
        .unwrap_or(score::NEUTRAL_DAVIDS_SCORE),
      wins: r.wins,
      losses: r.losses,
      ties: r.ties,
      category: Category::classify(r.rating, cfg),
      confidence: confidence(r, cfg),
    })
    .collect();

  let ds: Vec<f64> = entries.iter().map(|e| e.davids_score).collect();
  let (steep, se) = score::steepness(&ds);
  let metrics = HierarchyMetrics {
    steepness: steep,
    steepness_se: se,
    linearity: OrderLinearity::from_steepness(steep, cfg),
    interrater_agreement: score::interrater_agreement(records),
    subjects: entries.len() as u64,
    comparisons: records.len() as u64,
  };

  Hierarchy { generation, entries, metrics, assembled_at }
}
