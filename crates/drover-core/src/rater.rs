//! Rater reliability — how much each judge's opinion moves the ratings.
//!
//! A rater's weight blends gold-task accuracy with inter-rater agreement.
//! The weight is snapshotted into every comparison at submission time, so
//! reliability changes only affect future judgments (until a full
//! recalculation replays history with the snapshots intact).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RatingConfig;

// ─── Tier ────────────────────────────────────────────────────────────────────

/// Coarse reliability badge derived from accuracy and weight.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RaterTier {
  #[default]
  Bronze,
  Silver,
  Gold,
}

// ─── Rater ───────────────────────────────────────────────────────────────────

/// Accumulated reliability state for one judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rater {
  pub rater_id:          Uuid,
  /// Inactive raters keep their history but refuse new submissions.
  pub active:            bool,
  /// Every submission, production and diagnostic alike.
  pub total_comparisons: u64,
  pub gold_attempts:     u64,
  pub gold_correct:      u64,
  /// `None` until the rater has shared at least one pair with another
  /// rater; agreement then stops contributing to the weight.
  pub agreement_rate:    Option<f64>,
  /// How many unordered shared pairs the current agreement rate is based on.
  pub agreement_pairs:   u64,
  /// Production comparisons since agreement was last recomputed.
  pub since_agreement:   u64,
  pub weight:            f64,
  pub tier:              RaterTier,
  pub created_at:        DateTime<Utc>,
  pub last_activity:     Option<DateTime<Utc>>,
}

impl Rater {
  pub fn new(rater_id: Uuid, cfg: &RatingConfig, now: DateTime<Utc>) -> Self {
    Self {
      rater_id,
      active: true,
      total_comparisons: 0,
      gold_attempts: 0,
      gold_correct: 0,
      agreement_rate: None,
      agreement_pairs: 0,
      since_agreement: 0,
      weight: cfg.default_weight,
      tier: RaterTier::Bronze,
      created_at: now,
      last_activity: None,
    }
  }

  pub fn gold_accuracy(&self) -> Option<f64> {
    (self.gold_attempts > 0)
      .then(|| self.gold_correct as f64 / self.gold_attempts as f64)
  }

  /// The weight a comparison submitted right now would be stamped with.
  /// Until the rater has attempted a gold task their influence is capped,
  /// whatever their stored weight says.
  pub fn effective_weight(&self, cfg: &RatingConfig) -> f64 {
    if self.gold_attempts == 0 {
      self.weight.min(cfg.cold_start_cap)
    } else {
      self.weight
    }
  }

  pub fn record_production(&mut self, now: DateTime<Utc>) {
    self.total_comparisons += 1;
    self.since_agreement += 1;
    self.last_activity = Some(now);
  }

  pub fn record_gold_attempt(
    &mut self,
    correct: bool,
    cfg: &RatingConfig,
    now: DateTime<Utc>,
  ) {
    self.total_comparisons += 1;
    self.gold_attempts += 1;
    self.gold_correct += u64::from(correct);
    self.last_activity = Some(now);
    self.recompute(cfg);
  }

  /// Install a freshly computed agreement rate. A rate based on zero shared
  /// pairs carries no information and clears the component instead.
  pub fn record_agreement(
    &mut self,
    rate: f64,
    pairs: u64,
    cfg: &RatingConfig,
  ) {
    self.agreement_rate = (pairs > 0).then_some(rate);
    self.agreement_pairs = pairs;
    self.since_agreement = 0;
    self.recompute(cfg);
  }

  pub fn needs_agreement_refresh(&self, cfg: &RatingConfig) -> bool {
    self.since_agreement >= cfg.agreement_batch
  }

  /// Re-derive weight and tier from the accumulated evidence. A missing
  /// component forfeits its share of the blend to the one that is present.
  pub fn recompute(&mut self, cfg: &RatingConfig) {
    self.weight = match (self.gold_accuracy(), self.agreement_rate) {
      (Some(acc), Some(agr)) => {
        cfg.accuracy_weight * acc + cfg.agreement_weight * agr
      }
      (Some(acc), None) => acc,
      (None, Some(agr)) => agr,
      (None, None) => cfg.default_weight,
    };
    self.tier = self.derive_tier(cfg);
  }

  fn derive_tier(&self, cfg: &RatingConfig) -> RaterTier {
    let Some(acc) = self.gold_accuracy() else {
      return RaterTier::Bronze;
    };
    if acc >= cfg.gold_min_accuracy && self.weight >= cfg.gold_min_weight {
      RaterTier::Gold
    } else if acc >= cfg.silver_min_accuracy
      && self.weight >= cfg.silver_min_weight
    {
      RaterTier::Silver
    } else {
      RaterTier::Bronze
    }
  }
}
