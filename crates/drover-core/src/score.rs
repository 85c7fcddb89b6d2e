//! Order-independent scoring over the accumulated comparison matrix.
//!
//! Unlike the incremental rating, everything here is pull-based: recomputed
//! from the full set of production judgments each time the hierarchy is
//! assembled. Ties count as half a win throughout.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::comparison::{Outcome, Side};

/// The score reported for a subject that has not been compared yet.
pub const NEUTRAL_DAVIDS_SCORE: f64 = 0.5;

/// The projection of a comparison that the scorers need. Callers pass
/// production judgments only; diagnostic answers never reach this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRecord {
  pub subject_a: Uuid,
  pub subject_b: Uuid,
  pub outcome:   Outcome,
  pub rater_id:  Uuid,
}

// ─── David's Score ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Tally {
  /// Wins (and half-ties) against each opponent.
  credit: HashMap<Uuid, f64>,
  total:  f64,
}

/// Opponent-strength-weighted win proportion for every listed subject.
///
/// Each win contributes the opponent's own raw win rate; each tie half of
/// it; the sum is normalised by the subject's comparison count. A subject
/// with no comparisons takes [`NEUTRAL_DAVIDS_SCORE`]. Records may mention
/// subjects outside `subjects` (deactivated ones); they still count as
/// opponents but get no output entry.
pub fn davids_scores(
  subjects: &[Uuid],
  records: &[PairRecord],
) -> HashMap<Uuid, f64> {
  let mut tallies: HashMap<Uuid, Tally> = HashMap::new();
  for r in records {
    let (credit_a, credit_b) = match r.outcome {
      Outcome::Tie => (0.5, 0.5),
      Outcome::Decisive { winner: Side::A, .. } => (1.0, 0.0),
      Outcome::Decisive { winner: Side::B, .. } => (0.0, 1.0),
    };
    let a = tallies.entry(r.subject_a).or_default();
    *a.credit.entry(r.subject_b).or_default() += credit_a;
    a.total += 1.0;
    let b = tallies.entry(r.subject_b).or_default();
    *b.credit.entry(r.subject_a).or_default() += credit_b;
    b.total += 1.0;
  }

  let strength: HashMap<Uuid, f64> = tallies
    .iter()
    .map(|(id, t)| {
      (*id, t.credit.values().sum::<f64>() / t.total)
    })
    .collect();

  subjects
    .iter()
    .map(|id| {
      let score = match tallies.get(id) {
        Some(t) if t.total > 0.0 => {
          let weighted: f64 = t
            .credit
            .iter()
            .map(|(opp, credit)| {
              credit * strength.get(opp).copied().unwrap_or(0.0)
            })
            .sum();
          (weighted / t.total).clamp(0.0, 1.0)
        }
        _ => NEUTRAL_DAVIDS_SCORE,
      };
      (*id, score)
    })
    .collect()
}

// ─── Steepness ───────────────────────────────────────────────────────────────

/// How linear the inferred order is: the (negated) OLS slope of David's
/// Score against normalised rank, with the slope's standard error.
///
/// Scores are sorted descending internally, ranks are spread over [0,1]. A
/// perfectly transitive population yields a steepness near 1; an intransitive
/// mush yields one near 0. Fewer than three subjects carry no order signal
/// and yield `(0.0, 0.0)`.
pub fn steepness(scores: &[f64]) -> (f64, f64) {
  let n = scores.len();
  if n < 3 {
    return (0.0, 0.0);
  }
  let mut sorted = scores.to_vec();
  sorted.sort_by(|a, b| b.total_cmp(a));

  let step = 1.0 / (n - 1) as f64;
  let xs: Vec<f64> = (0..n).map(|i| i as f64 * step).collect();
  let x_mean = xs.iter().sum::<f64>() / n as f64;
  let y_mean = sorted.iter().sum::<f64>() / n as f64;

  let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
  let sxy: f64 = xs
    .iter()
    .zip(&sorted)
    .map(|(x, y)| (x - x_mean) * (y - y_mean))
    .sum();
  let slope = sxy / sxx;
  let intercept = y_mean - slope * x_mean;

  let residual_ss: f64 = xs
    .iter()
    .zip(&sorted)
    .map(|(x, y)| (y - (intercept + slope * x)).powi(2))
    .sum();
  let se = (residual_ss / (n - 2) as f64 / sxx).sqrt();

  (-slope, se)
}

// ─── Inter-rater agreement ───────────────────────────────────────────────────

/// Direction of a judgment relative to the pair's canonical (sorted-id)
/// orientation: 0 tie, 1 the lower id won, 2 the higher id won.
fn canonical_direction(r: &PairRecord) -> ((Uuid, Uuid), u8) {
  let winner = match r.outcome {
    Outcome::Tie => None,
    Outcome::Decisive { winner: Side::A, .. } => Some(r.subject_a),
    Outcome::Decisive { winner: Side::B, .. } => Some(r.subject_b),
  };
  let key = if r.subject_a < r.subject_b {
    (r.subject_a, r.subject_b)
  } else {
    (r.subject_b, r.subject_a)
  };
  let direction = match winner {
    None => 0,
    Some(w) if w == key.0 => 1,
    Some(_) => 2,
  };
  (key, direction)
}

fn group_by_pair(
  records: &[PairRecord],
) -> HashMap<(Uuid, Uuid), Vec<(Uuid, u8)>> {
  let mut groups: HashMap<(Uuid, Uuid), Vec<(Uuid, u8)>> = HashMap::new();
  for r in records {
    let (key, direction) = canonical_direction(r);
    groups.entry(key).or_default().push((r.rater_id, direction));
  }
  groups
}

/// Fraction of cross-rater judgment pairings that agree on direction, over
/// all subject pairs judged by at least two distinct raters. Ties only agree
/// with ties. With no overlap at all there is nothing observed to disagree,
/// so the rate is 1.0.
pub fn interrater_agreement(records: &[PairRecord]) -> f64 {
  let mut agreements = 0u64;
  let mut total = 0u64;
  for judgments in group_by_pair(records).values() {
    for (i, (rater_i, dir_i)) in judgments.iter().enumerate() {
      for (rater_j, dir_j) in &judgments[i + 1..] {
        if rater_i == rater_j {
          continue;
        }
        total += 1;
        agreements += u64::from(dir_i == dir_j);
      }
    }
  }
  if total == 0 { 1.0 } else { agreements as f64 / total as f64 }
}

/// One rater's agreement with everyone else, plus the number of distinct
/// shared subject pairs it rests on. Zero shared pairs yields `(1.0, 0)`.
pub fn rater_agreement(rater: Uuid, records: &[PairRecord]) -> (f64, u64) {
  let mut agreements = 0u64;
  let mut total = 0u64;
  let mut shared_pairs = 0u64;
  for judgments in group_by_pair(records).values() {
    let mut shared = false;
    for (rater_i, dir_i) in judgments {
      if *rater_i != rater {
        continue;
      }
      for (rater_j, dir_j) in judgments {
        if *rater_j == rater {
          continue;
        }
        shared = true;
        total += 1;
        agreements += u64::from(dir_i == dir_j);
      }
    }
    shared_pairs += u64::from(shared);
  }
  let rate =
    if total == 0 { 1.0 } else { agreements as f64 / total as f64 };
  (rate, shared_pairs)
}
