//! Tunable parameters for the rating engine.
//!
//! Every constant that shapes rating movement, reliability weighting, or
//! hierarchy classification lives here, so a deployment can retune the engine
//! from its config file without touching code. The defaults reproduce the
//! behaviour of the reference deployment.

use serde::{Deserialize, Serialize};

/// All engine tunables in one place. Deserialises with per-field defaults so
/// a config file only needs to name the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
  /// Rating assigned to a subject on first sight.
  pub initial_rating:       f64,
  /// Uncertainty assigned to a subject on first sight.
  pub initial_uncertainty:  f64,
  /// Uncertainty never decays below this floor; a subject always stays at
  /// least this responsive to new evidence.
  pub uncertainty_floor:    f64,
  /// Multiplicative decay applied to both subjects' uncertainty after each
  /// comparison they participate in.
  pub uncertainty_decay:    f64,
  /// Base K-factor before rater-weight and uncertainty scaling.
  pub k_base:               f64,
  /// How far one degree of confidence moves the actual score away from 0.5.
  /// With the default, degree 3 yields actual scores of 1.0 and 0.0.
  pub degree_scale:         f64,

  /// Ratings below this are classified as mild.
  pub severity_low:         f64,
  /// Ratings above this are classified as severe.
  pub severity_high:        f64,
  /// Comparison count at which a subject's confidence saturates at 1.0.
  pub confidence_cap:       u64,

  /// Weight of gold-task accuracy in the reliability blend.
  pub accuracy_weight:      f64,
  /// Weight of inter-rater agreement in the reliability blend.
  pub agreement_weight:     f64,
  /// Weight used for a rater with no evidence at all.
  pub default_weight:       f64,
  /// Effective weight is capped here until the rater has attempted at least
  /// one gold task.
  pub cold_start_cap:       f64,

  /// Minimum gold accuracy for the gold tier.
  pub gold_min_accuracy:    f64,
  /// Minimum blended weight for the gold tier.
  pub gold_min_weight:      f64,
  /// Minimum gold accuracy for the silver tier.
  pub silver_min_accuracy:  f64,
  /// Minimum blended weight for the silver tier.
  pub silver_min_weight:    f64,

  /// Agreement is recomputed once a rater has this many production
  /// comparisons since the last recomputation.
  pub agreement_batch:      u64,
  /// A gold answer with the right direction is graded correct when its
  /// degree is within this distance of the expected degree.
  pub gold_degree_tolerance: u8,

  /// Absolute steepness slope at or above which the hierarchy is labelled
  /// strongly linear.
  pub linearity_strong:     f64,
  /// Absolute steepness slope at or above which the hierarchy is labelled
  /// moderately linear.
  pub linearity_moderate:   f64,
}

impl Default for RatingConfig {
  fn default() -> Self {
    Self {
      initial_rating:        1500.0,
      initial_uncertainty:   350.0,
      uncertainty_floor:     50.0,
      uncertainty_decay:     0.95,
      k_base:                32.0,
      degree_scale:          1.0 / 6.0,

      severity_low:          1450.0,
      severity_high:         1550.0,
      confidence_cap:        20,

      accuracy_weight:       0.7,
      agreement_weight:      0.3,
      default_weight:        1.0,
      cold_start_cap:        0.5,

      gold_min_accuracy:     0.85,
      gold_min_weight:       0.8,
      silver_min_accuracy:   0.6,
      silver_min_weight:     0.5,

      agreement_batch:       25,
      gold_degree_tolerance: 1,

      linearity_strong:      0.6,
      linearity_moderate:    0.3,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_config_fills_defaults() {
    let cfg: RatingConfig =
      serde_json::from_str(r#"{ "k_base": 16.0 }"#).unwrap();
    assert_eq!(cfg.k_base, 16.0);
    assert_eq!(cfg.initial_rating, 1500.0);
    assert_eq!(cfg.agreement_batch, 25);
  }

  #[test]
  fn degree_three_saturates_actual_score() {
    let cfg = RatingConfig::default();
    assert!((0.5 + 3.0 * cfg.degree_scale - 1.0).abs() < 1e-12);
  }
}
