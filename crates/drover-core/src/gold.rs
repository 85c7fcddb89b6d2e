//! Gold tasks — pairs with a known correct answer, used to measure rater
//! accuracy.
//!
//! Answering a gold task is diagnostic only: the rater's statistics move,
//! the subjects' ratings never do.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  comparison::{Comparison, Outcome},
};

/// How hard the curators judged the pair to be; kept for reporting and for
/// composing balanced task sets.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum GoldDifficulty {
  Easy,
  #[default]
  Medium,
  Hard,
}

/// A curated pair with a known correct outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldTask {
  pub gold_task_id: Uuid,
  pub subject_a:    Uuid,
  pub subject_b:    Uuid,
  pub expected:     Outcome,
  pub difficulty:   GoldDifficulty,
  /// Retired tasks stop matching submissions but keep their grading history
  /// meaningful.
  pub active:       bool,
  pub created_by:   Option<Uuid>,
  pub created_at:   DateTime<Utc>,
}

impl GoldTask {
  /// Whether this task is about the given unordered pair.
  pub fn covers(&self, a: Uuid, b: Uuid) -> bool {
    (self.subject_a == a && self.subject_b == b)
      || (self.subject_a == b && self.subject_b == a)
  }

  /// Grade an answer submitted for the pair `(a, b)`. Returns `None` when
  /// the task is not about that pair. The answer is re-oriented first, so a
  /// submission that presented the clips in the opposite order grades
  /// identically.
  pub fn grade(
    &self,
    a: Uuid,
    b: Uuid,
    answer: Outcome,
    degree_tolerance: u8,
  ) -> Option<bool> {
    if !self.covers(a, b) {
      return None;
    }
    let oriented =
      if self.subject_a == a { answer } else { answer.mirrored() };
    let correct = match (self.expected, oriented) {
      (Outcome::Tie, Outcome::Tie) => true,
      (
        Outcome::Decisive { winner: ew, degree: ed },
        Outcome::Decisive { winner: aw, degree: ad },
      ) => ew == aw && ed.abs_diff(ad) <= degree_tolerance,
      _ => false,
    };
    Some(correct)
  }
}

/// The result of grading one gold answer: the stored diagnostic comparison,
/// the task that matched, and the verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedAnswer {
  pub comparison:   Comparison,
  pub gold_task_id: Uuid,
  pub correct:      bool,
}

/// Input to [`crate::store::RatingStore::create_gold_task`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoldTask {
  pub subject_a:  Uuid,
  pub subject_b:  Uuid,
  pub expected:   Outcome,
  pub difficulty: GoldDifficulty,
  pub created_by: Option<Uuid>,
}

impl NewGoldTask {
  pub fn validate(&self) -> Result<()> {
    if self.subject_a == self.subject_b {
      return Err(Error::SelfComparison);
    }
    if let Outcome::Decisive { degree, .. } = self.expected {
      if !(1..=3).contains(&degree) {
        return Err(Error::InvalidWinnerOrDegree {
          winner: self.expected.winner_code(),
          degree,
        });
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::comparison::Side;

  fn task(expected: Outcome) -> GoldTask {
    GoldTask {
      gold_task_id: Uuid::new_v4(),
      subject_a: Uuid::new_v4(),
      subject_b: Uuid::new_v4(),
      expected,
      difficulty: GoldDifficulty::Medium,
      active: true,
      created_by: None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn exact_answer_is_correct() {
    let expected = Outcome::Decisive { winner: Side::A, degree: 2 };
    let t = task(expected);
    assert_eq!(t.grade(t.subject_a, t.subject_b, expected, 1), Some(true));
  }

  #[test]
  fn degree_within_tolerance_is_correct() {
    let t = task(Outcome::Decisive { winner: Side::A, degree: 2 });
    let near = Outcome::Decisive { winner: Side::A, degree: 3 };
    let far = Outcome::Decisive { winner: Side::A, degree: 2 };
    assert_eq!(t.grade(t.subject_a, t.subject_b, near, 1), Some(true));
    assert_eq!(t.grade(t.subject_a, t.subject_b, far, 0), Some(true));

    let t = task(Outcome::Decisive { winner: Side::A, degree: 1 });
    let off = Outcome::Decisive { winner: Side::A, degree: 3 };
    assert_eq!(t.grade(t.subject_a, t.subject_b, off, 1), Some(false));
  }

  #[test]
  fn wrong_direction_is_incorrect_whatever_the_degree() {
    let t = task(Outcome::Decisive { winner: Side::A, degree: 2 });
    let wrong = Outcome::Decisive { winner: Side::B, degree: 2 };
    assert_eq!(t.grade(t.subject_a, t.subject_b, wrong, 3), Some(false));
  }

  #[test]
  fn reversed_presentation_grades_identically() {
    let t = task(Outcome::Decisive { winner: Side::A, degree: 2 });
    // Presented as (b, a), the rater picks their side A, which is the
    // task's subject_b: wrong direction.
    let picked_first = Outcome::Decisive { winner: Side::A, degree: 2 };
    assert_eq!(
      t.grade(t.subject_b, t.subject_a, picked_first, 1),
      Some(false)
    );
    // Picking their side B is the task's subject_a: correct.
    let picked_second = Outcome::Decisive { winner: Side::B, degree: 2 };
    assert_eq!(
      t.grade(t.subject_b, t.subject_a, picked_second, 1),
      Some(true)
    );
  }

  #[test]
  fn tie_expectations_accept_only_ties() {
    let t = task(Outcome::Tie);
    assert_eq!(t.grade(t.subject_a, t.subject_b, Outcome::Tie, 1), Some(true));
    let decisive = Outcome::Decisive { winner: Side::A, degree: 1 };
    assert_eq!(
      t.grade(t.subject_a, t.subject_b, decisive, 3),
      Some(false)
    );
  }

  #[test]
  fn unrelated_pair_is_not_graded() {
    let t = task(Outcome::Tie);
    assert_eq!(
      t.grade(Uuid::new_v4(), t.subject_b, Outcome::Tie, 1),
      None
    );
  }
}
