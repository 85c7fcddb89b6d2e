//! Incremental rating updates.
//!
//! A single rating update is classical Elo with two twists: the actual score
//! is graded by the rater's stated degree of confidence rather than being a
//! hard 0/1, and the K-factor is scaled by both the rater's weight and the
//! pair's mean uncertainty. One shared K per comparison keeps every update
//! exactly zero-sum.

use crate::{
  comparison::{Outcome, Side},
  config::RatingConfig,
  subject::SubjectRating,
};

/// Logistic scale of the rating difference; 400 points is one order of
/// magnitude in expected odds.
const SCALE: f64 = 400.0;

/// Probability that the first subject is judged more severe, given the two
/// current ratings.
pub fn expected_score(rating_a: f64, rating_b: f64) -> f64 {
  1.0 / (1.0 + 10f64.powf((rating_b - rating_a) / SCALE))
}

/// The graded score for the first subject: 0.5 for a tie, pushed toward 1.0
/// or 0.0 by the rater's degree of confidence.
pub fn actual_score(outcome: Outcome, cfg: &RatingConfig) -> f64 {
  match outcome {
    Outcome::Tie => 0.5,
    Outcome::Decisive { winner, degree } => {
      let offset = f64::from(degree) * cfg.degree_scale;
      match winner {
        Side::A => (0.5 + offset).clamp(0.0, 1.0),
        Side::B => (0.5 - offset).clamp(0.0, 1.0),
      }
    }
  }
}

/// The result of applying one comparison to a pair: new states plus the
/// signed rating movement of the first subject (the second moved by exactly
/// the negation).
#[derive(Debug, Clone, PartialEq)]
pub struct PairUpdate {
  pub delta: f64,
  pub a:     SubjectRating,
  pub b:     SubjectRating,
}

/// Apply one judgment to a pair of rating states.
pub fn rate_pair(
  a: &SubjectRating,
  b: &SubjectRating,
  outcome: Outcome,
  rater_weight: f64,
  cfg: &RatingConfig,
) -> PairUpdate {
  let mean_uncertainty = (a.uncertainty + b.uncertainty) / 2.0;
  let k = cfg.k_base * rater_weight * (mean_uncertainty / cfg.initial_uncertainty);

  let expected = expected_score(a.rating, b.rating);
  let actual = actual_score(outcome, cfg);
  let delta = k * (actual - expected);

  let mut a = a.clone();
  let mut b = b.clone();
  a.rating += delta;
  b.rating -= delta;
  a.uncertainty = (a.uncertainty * cfg.uncertainty_decay).max(cfg.uncertainty_floor);
  b.uncertainty = (b.uncertainty * cfg.uncertainty_decay).max(cfg.uncertainty_floor);

  match outcome {
    Outcome::Tie => {
      a.ties += 1;
      b.ties += 1;
    }
    Outcome::Decisive { winner: Side::A, .. } => {
      a.wins += 1;
      b.losses += 1;
    }
    Outcome::Decisive { winner: Side::B, .. } => {
      a.losses += 1;
      b.wins += 1;
    }
  }

  PairUpdate { delta, a, b }
}
