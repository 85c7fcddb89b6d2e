//! Integration tests for `SqliteStore` against an in-memory database.

use drover_core::{
  Error as CoreError,
  comparison::{NewComparison, NewTriplet, Outcome, Side},
  config::RatingConfig,
  gold::{GoldDifficulty, NewGoldTask},
  rater::RaterTier,
  snapshot::NewSnapshot,
  store::RatingStore,
  subject::Category,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn decisive(
  a: Uuid,
  b: Uuid,
  winner: Side,
  degree: u8,
  rater: Uuid,
) -> NewComparison {
  NewComparison {
    subject_a: a,
    subject_b: b,
    outcome: Outcome::Decisive { winner, degree },
    rater_id: rater,
  }
}

fn tie(a: Uuid, b: Uuid, rater: Uuid) -> NewComparison {
  NewComparison {
    subject_a: a,
    subject_b: b,
    outcome: Outcome::Tie,
    rater_id: rater,
  }
}

/// Give `rater` one correct gold attempt so the cold-start cap lifts.
async fn qualify(s: &SqliteStore, rater: Uuid) {
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
  s.create_gold_task(NewGoldTask {
    subject_a:  a,
    subject_b:  b,
    expected:   Outcome::Decisive { winner: Side::A, degree: 2 },
    difficulty: GoldDifficulty::Medium,
    created_by: None,
  })
  .await
  .unwrap();
  s.record_gold_answer(decisive(a, b, Side::A, 2, rater))
    .await
    .unwrap();
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_and_get_subject() {
  let s = store().await;
  let id = Uuid::new_v4();

  let subject = s.register_subject(id).await.unwrap();
  assert!(subject.active);

  let view = s.get_subject(id).await.unwrap().unwrap();
  assert_eq!(view.subject_id, id);
  assert_eq!(view.rating, 1500.0);
  assert_eq!(view.uncertainty, 350.0);
  assert_eq!(view.category, Category::Borderline);
  assert_eq!(view.wins + view.losses + view.ties, 0);
}

#[tokio::test]
async fn register_twice_errors() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.register_subject(id).await.unwrap();

  let err = s.register_subject(id).await.unwrap_err();
  assert!(matches!(err, crate::Error::Core(CoreError::SubjectExists(_))));
}

#[tokio::test]
async fn get_subject_missing_returns_none() {
  let s = store().await;
  assert!(s.get_subject(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn subjects_created_on_first_comparison() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  s.record_comparison(decisive(a, b, Side::A, 1, rater))
    .await
    .unwrap();

  let all = s.list_subjects(false).await.unwrap();
  assert_eq!(all.len(), 2);
  assert!(s.get_subject(a).await.unwrap().is_some());
  assert!(s.get_subject(b).await.unwrap().is_some());
}

#[tokio::test]
async fn deactivated_subject_keeps_view_but_leaves_listing() {
  let s = store().await;
  let id = Uuid::new_v4();
  s.register_subject(id).await.unwrap();
  s.deactivate_subject(id).await.unwrap();

  assert!(s.list_subjects(false).await.unwrap().is_empty());
  assert_eq!(s.list_subjects(true).await.unwrap().len(), 1);

  let view = s.get_subject(id).await.unwrap().unwrap();
  assert!(!view.active);
}

#[tokio::test]
async fn deactivated_subject_rejects_new_comparisons() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  s.register_subject(a).await.unwrap();
  s.deactivate_subject(a).await.unwrap();

  let err = s
    .record_comparison(decisive(a, b, Side::B, 1, rater))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(CoreError::SubjectInactive(_))
  ));

  // Nothing was written for the other side either.
  assert!(s.get_subject(b).await.unwrap().is_none());
}

#[tokio::test]
async fn deactivate_missing_errors() {
  let s = store().await;
  let err = s.deactivate_subject(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(CoreError::SubjectNotFound(_))
  ));
}

// ─── Production ingest ───────────────────────────────────────────────────────

#[tokio::test]
async fn decisive_comparison_moves_ratings_zero_sum() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  s.record_comparison(decisive(a, b, Side::A, 2, rater))
    .await
    .unwrap();

  let va = s.get_subject(a).await.unwrap().unwrap();
  let vb = s.get_subject(b).await.unwrap().unwrap();
  assert!(va.rating > 1500.0);
  assert!(vb.rating < 1500.0);
  assert!((va.rating + vb.rating - 3000.0).abs() < 1e-9);
  assert_eq!((va.wins, va.losses), (1, 0));
  assert_eq!((vb.wins, vb.losses), (0, 1));
  assert!(va.uncertainty < 350.0);
}

#[tokio::test]
async fn fresh_rater_is_stamped_with_the_cold_start_cap() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  let c = s
    .record_comparison(decisive(a, b, Side::A, 1, rater))
    .await
    .unwrap();
  assert_eq!(c.rater_weight, 0.5);
}

#[tokio::test]
async fn qualified_rater_is_stamped_at_full_weight() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  qualify(&s, rater).await;

  let c = s
    .record_comparison(decisive(a, b, Side::A, 1, rater))
    .await
    .unwrap();
  assert_eq!(c.rater_weight, 1.0);
}

#[tokio::test]
async fn self_comparison_rejected() {
  let s = store().await;
  let (a, rater) = (Uuid::new_v4(), Uuid::new_v4());

  let err = s
    .record_comparison(decisive(a, a, Side::A, 1, rater))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Core(CoreError::SelfComparison)));
}

#[tokio::test]
async fn out_of_range_degree_rejected() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  let err = s
    .record_comparison(decisive(a, b, Side::A, 5, rater))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(CoreError::InvalidWinnerOrDegree { .. })
  ));
}

#[tokio::test]
async fn inactive_rater_rejected() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  s.set_rater_active(rater, false).await.unwrap();

  let err = s
    .record_comparison(decisive(a, b, Side::A, 1, rater))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Core(CoreError::RaterInactive(_))));
}

#[tokio::test]
async fn ties_decay_uncertainty_to_the_floor() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  for _ in 0..100 {
    s.record_comparison(tie(a, b, rater)).await.unwrap();
  }

  let va = s.get_subject(a).await.unwrap().unwrap();
  assert_eq!(va.rating, 1500.0);
  assert_eq!(va.uncertainty, 50.0);
  assert_eq!(va.ties, 100);
}

#[tokio::test]
async fn sustained_wins_shift_categories() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  qualify(&s, rater).await;

  for _ in 0..6 {
    s.record_comparison(decisive(a, b, Side::A, 3, rater))
      .await
      .unwrap();
  }

  let va = s.get_subject(a).await.unwrap().unwrap();
  let vb = s.get_subject(b).await.unwrap().unwrap();
  assert_eq!(va.category, Category::Lame);
  assert_eq!(vb.category, Category::Sound);
}

#[tokio::test]
async fn rating_history_chains_oldest_first() {
  let s = store().await;
  let (a, b, c, rater) =
    (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  s.record_comparison(decisive(a, b, Side::A, 1, rater))
    .await
    .unwrap();
  s.record_comparison(decisive(a, c, Side::A, 2, rater))
    .await
    .unwrap();
  s.record_comparison(decisive(b, a, Side::A, 1, rater))
    .await
    .unwrap();

  let history = s.rating_history(a).await.unwrap();
  assert_eq!(history.len(), 3);
  assert_eq!(history[0].rating_before, 1500.0);
  for pair in history.windows(2) {
    assert_eq!(pair[0].rating_after, pair[1].rating_before);
  }
  // The third comparison went against a.
  assert!(history[2].rating_after < history[2].rating_before);
}

#[tokio::test]
async fn rating_history_unknown_subject_errors() {
  let s = store().await;
  let err = s.rating_history(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(CoreError::SubjectNotFound(_))
  ));
}

// ─── Triplets ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn triplet_decomposes_into_two_pairwise_comparisons() {
  let s = store().await;
  let subjects = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
  let rater = Uuid::new_v4();

  let recorded = s
    .record_triplet(NewTriplet { subjects, preference: 2, rater_id: rater })
    .await
    .unwrap();

  assert_eq!(recorded.len(), 2);
  assert!(recorded.iter().all(|c| c.subject_a == subjects[1]));
  assert!(recorded.iter().all(|c| {
    c.outcome == Outcome::Decisive { winner: Side::A, degree: 1 }
  }));

  let chosen = s.get_subject(subjects[1]).await.unwrap().unwrap();
  assert_eq!(chosen.wins, 2);
  assert!(chosen.rating > 1500.0);
  assert_eq!(s.list_subjects(false).await.unwrap().len(), 3);
}

#[tokio::test]
async fn triplet_with_duplicate_subject_rejected() {
  let s = store().await;
  let a = Uuid::new_v4();
  let err = s
    .record_triplet(NewTriplet {
      subjects:   [a, a, Uuid::new_v4()],
      preference: 1,
      rater_id:   Uuid::new_v4(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Core(CoreError::SelfComparison)));
}

#[tokio::test]
async fn triplet_with_bad_preference_rejected() {
  let s = store().await;
  let err = s
    .record_triplet(NewTriplet {
      subjects:   [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()],
      preference: 4,
      rater_id:   Uuid::new_v4(),
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(CoreError::InvalidPreference(4))
  ));
}

// ─── Gold tasks ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn gold_answer_graded_and_counted() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  let task = s
    .create_gold_task(NewGoldTask {
      subject_a:  a,
      subject_b:  b,
      expected:   Outcome::Decisive { winner: Side::A, degree: 2 },
      difficulty: GoldDifficulty::Easy,
      created_by: None,
    })
    .await
    .unwrap();

  let graded = s
    .record_gold_answer(decisive(a, b, Side::A, 2, rater))
    .await
    .unwrap();
  assert!(graded.correct);
  assert_eq!(graded.gold_task_id, task.gold_task_id);

  let r = s.get_rater(rater).await.unwrap().unwrap();
  assert_eq!(r.gold_attempts, 1);
  assert_eq!(r.gold_correct, 1);
  assert_eq!(r.weight, 1.0);
  assert_eq!(r.tier, RaterTier::Gold);
}

#[tokio::test]
async fn gold_answer_accepts_mirrored_orientation() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  s.create_gold_task(NewGoldTask {
    subject_a:  a,
    subject_b:  b,
    expected:   Outcome::Decisive { winner: Side::A, degree: 2 },
    difficulty: GoldDifficulty::Medium,
    created_by: None,
  })
  .await
  .unwrap();

  // Presented the other way round, naming the same semantic winner.
  let graded = s
    .record_gold_answer(decisive(b, a, Side::B, 2, rater))
    .await
    .unwrap();
  assert!(graded.correct);
}

#[tokio::test]
async fn gold_degree_tolerance_is_one_step() {
  let s = store().await;
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
  s.create_gold_task(NewGoldTask {
    subject_a:  a,
    subject_b:  b,
    expected:   Outcome::Decisive { winner: Side::A, degree: 1 },
    difficulty: GoldDifficulty::Hard,
    created_by: None,
  })
  .await
  .unwrap();

  let near = s
    .record_gold_answer(decisive(a, b, Side::A, 2, Uuid::new_v4()))
    .await
    .unwrap();
  assert!(near.correct);

  let far = s
    .record_gold_answer(decisive(a, b, Side::A, 3, Uuid::new_v4()))
    .await
    .unwrap();
  assert!(!far.correct);

  let wrong_side = s
    .record_gold_answer(decisive(a, b, Side::B, 1, Uuid::new_v4()))
    .await
    .unwrap();
  assert!(!wrong_side.correct);
}

#[tokio::test]
async fn gold_tie_only_matches_tie() {
  let s = store().await;
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
  s.create_gold_task(NewGoldTask {
    subject_a:  a,
    subject_b:  b,
    expected:   Outcome::Tie,
    difficulty: GoldDifficulty::Medium,
    created_by: None,
  })
  .await
  .unwrap();

  let hedged = s
    .record_gold_answer(decisive(a, b, Side::A, 1, Uuid::new_v4()))
    .await
    .unwrap();
  assert!(!hedged.correct);

  let called = s
    .record_gold_answer(tie(a, b, Uuid::new_v4()))
    .await
    .unwrap();
  assert!(called.correct);
}

#[tokio::test]
async fn gold_answer_never_touches_subjects() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  s.create_gold_task(NewGoldTask {
    subject_a:  a,
    subject_b:  b,
    expected:   Outcome::Decisive { winner: Side::A, degree: 2 },
    difficulty: GoldDifficulty::Medium,
    created_by: None,
  })
  .await
  .unwrap();

  s.record_gold_answer(decisive(a, b, Side::A, 2, rater))
    .await
    .unwrap();

  // Diagnostic pairs are never registered as subjects.
  assert!(s.get_subject(a).await.unwrap().is_none());
  assert!(s.get_subject(b).await.unwrap().is_none());
  assert!(s.list_subjects(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn gold_answer_without_task_errors() {
  let s = store().await;
  let err = s
    .record_gold_answer(decisive(
      Uuid::new_v4(),
      Uuid::new_v4(),
      Side::A,
      1,
      Uuid::new_v4(),
    ))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(CoreError::GoldTaskNotFound(_, _))
  ));
}

#[tokio::test]
async fn retired_gold_task_stops_matching() {
  let s = store().await;
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
  let task = s
    .create_gold_task(NewGoldTask {
      subject_a:  a,
      subject_b:  b,
      expected:   Outcome::Tie,
      difficulty: GoldDifficulty::Medium,
      created_by: None,
    })
    .await
    .unwrap();
  s.set_gold_task_active(task.gold_task_id, false).await.unwrap();

  let err = s
    .record_gold_answer(tie(a, b, Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(CoreError::GoldTaskNotFound(_, _))
  ));

  assert!(s.list_gold_tasks(false).await.unwrap().is_empty());
  assert_eq!(s.list_gold_tasks(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn set_gold_task_active_unknown_errors() {
  let s = store().await;
  let err = s
    .set_gold_task_active(Uuid::new_v4(), true)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(CoreError::GoldTaskUnknown(_))
  ));
}

#[tokio::test]
async fn failed_gold_attempts_sink_the_weight() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  s.create_gold_task(NewGoldTask {
    subject_a:  a,
    subject_b:  b,
    expected:   Outcome::Decisive { winner: Side::A, degree: 3 },
    difficulty: GoldDifficulty::Medium,
    created_by: None,
  })
  .await
  .unwrap();

  for _ in 0..2 {
    let graded = s
      .record_gold_answer(decisive(a, b, Side::B, 3, rater))
      .await
      .unwrap();
    assert!(!graded.correct);
  }

  let r = s.get_rater(rater).await.unwrap().unwrap();
  assert_eq!(r.gold_attempts, 2);
  assert_eq!(r.gold_correct, 0);
  assert_eq!(r.weight, 0.0);
  assert_eq!(r.tier, RaterTier::Bronze);
}

// ─── Agreement ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn agreement_refreshes_after_the_configured_batch() {
  let cfg = RatingConfig { agreement_batch: 2, ..Default::default() };
  let s = SqliteStore::open_in_memory_with(cfg).await.unwrap();
  let (a, b, c, d) =
    (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  let (r1, r2) = (Uuid::new_v4(), Uuid::new_v4());

  s.record_comparison(decisive(a, b, Side::A, 1, r1)).await.unwrap();
  s.record_comparison(decisive(c, d, Side::A, 1, r1)).await.unwrap();

  // r2 agrees on (a, b) but flips (c, d); the second submission crosses the
  // batch threshold and triggers the refresh.
  s.record_comparison(decisive(a, b, Side::A, 2, r2)).await.unwrap();
  s.record_comparison(decisive(c, d, Side::B, 1, r2)).await.unwrap();

  let rater = s.get_rater(r2).await.unwrap().unwrap();
  assert_eq!(rater.agreement_rate, Some(0.5));
  assert_eq!(rater.agreement_pairs, 2);
  assert_eq!(rater.since_agreement, 0);
}

// ─── Hierarchy ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn hierarchy_ranks_by_rating() {
  let s = store().await;
  let (a, b, c, rater) =
    (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  s.record_comparison(decisive(a, b, Side::A, 2, rater)).await.unwrap();
  s.record_comparison(decisive(b, c, Side::A, 2, rater)).await.unwrap();

  let h = s.assemble_hierarchy().await.unwrap();
  assert_eq!(h.generation, 1);
  assert_eq!(h.entries.len(), 3);
  assert_eq!(h.entries[0].subject_id, a);
  assert_eq!(
    h.entries.iter().map(|e| e.rank).collect::<Vec<_>>(),
    vec![1, 2, 3]
  );
  assert!(h.entries.windows(2).all(|w| w[0].rating >= w[1].rating));
  assert!(h.entries.iter().all(|e| (0.0..=1.0).contains(&e.davids_score)));
  assert!(h.entries.iter().all(|e| (0.0..=1.0).contains(&e.confidence)));
  assert_eq!(h.metrics.subjects, 3);
  assert_eq!(h.metrics.comparisons, 2);
  assert!(h.metrics.steepness > 0.0);
  // One rater never overlaps with anyone.
  assert_eq!(h.metrics.interrater_agreement, 1.0);
}

#[tokio::test]
async fn hierarchy_excludes_deactivated_subjects() {
  let s = store().await;
  let (a, b, c, rater) =
    (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

  s.record_comparison(decisive(a, b, Side::A, 1, rater)).await.unwrap();
  s.record_comparison(decisive(b, c, Side::A, 1, rater)).await.unwrap();
  s.deactivate_subject(c).await.unwrap();

  let h = s.assemble_hierarchy().await.unwrap();
  assert_eq!(h.entries.len(), 2);
  assert!(h.entries.iter().all(|e| e.subject_id != c));
  // The deactivated subject's judgments still back the metrics.
  assert_eq!(h.metrics.comparisons, 2);
}

#[tokio::test]
async fn empty_hierarchy_uses_neutral_metrics() {
  let s = store().await;
  let h = s.assemble_hierarchy().await.unwrap();
  assert!(h.entries.is_empty());
  assert_eq!(h.metrics.steepness, 0.0);
  assert_eq!(h.metrics.interrater_agreement, 1.0);
  assert_eq!(h.metrics.subjects, 0);
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_is_immutable_under_later_writes() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  s.record_comparison(decisive(a, b, Side::A, 2, rater)).await.unwrap();

  let snap = s
    .capture_snapshot(NewSnapshot {
      name:        "baseline".into(),
      description: Some("before the second session".into()),
      created_by:  None,
    })
    .await
    .unwrap();
  assert_eq!(snap.hierarchy.entries[0].subject_id, a);
  let frozen_rating = snap.hierarchy.entries[0].rating;

  // Swing the order the other way.
  for _ in 0..5 {
    s.record_comparison(decisive(a, b, Side::B, 3, rater)).await.unwrap();
  }
  let live = s.assemble_hierarchy().await.unwrap();
  assert_eq!(live.entries[0].subject_id, b);

  let fetched = s.get_snapshot(snap.snapshot_id).await.unwrap().unwrap();
  assert_eq!(fetched.hierarchy.entries[0].subject_id, a);
  assert_eq!(fetched.hierarchy.entries[0].rating, frozen_rating);

  let summaries = s.list_snapshots().await.unwrap();
  assert_eq!(summaries.len(), 1);
  assert_eq!(summaries[0].name, "baseline");
  assert_eq!(summaries[0].subjects, 2);
}

#[tokio::test]
async fn get_snapshot_missing_returns_none() {
  let s = store().await;
  assert!(s.get_snapshot(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Recalculation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn recalculation_reproduces_live_ratings_exactly() {
  let s = store().await;
  let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  let (r1, r2) = (Uuid::new_v4(), Uuid::new_v4());

  // Mixed weights: r1 submits cold, qualifies, then submits at full weight.
  s.record_comparison(decisive(a, b, Side::A, 1, r1)).await.unwrap();
  qualify(&s, r1).await;
  s.record_comparison(decisive(b, c, Side::A, 3, r1)).await.unwrap();
  s.record_comparison(tie(a, c, r2)).await.unwrap();

  let before: Vec<_> = [a, b, c]
    .into_iter()
    .map(|id| s.get_subject(id))
    .collect();
  let mut live = Vec::new();
  for fut in before {
    live.push(fut.await.unwrap().unwrap());
  }

  let summary = s.recalculate().await.unwrap();
  assert_eq!(summary.generation, 2);
  assert_eq!(summary.subjects, 3);
  // The gold attempt is diagnostic and is not replayed.
  assert_eq!(summary.comparisons_replayed, 3);

  for old in live {
    let new = s.get_subject(old.subject_id).await.unwrap().unwrap();
    assert_eq!(new.rating, old.rating);
    assert_eq!(new.uncertainty, old.uncertainty);
    assert_eq!(new.wins, old.wins);
    assert_eq!(new.losses, old.losses);
    assert_eq!(new.ties, old.ties);
  }
}

#[tokio::test]
async fn recalculation_replays_deactivated_subjects_too() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  s.record_comparison(decisive(a, b, Side::A, 2, rater)).await.unwrap();
  s.deactivate_subject(b).await.unwrap();

  let before = s.get_subject(b).await.unwrap().unwrap();
  s.recalculate().await.unwrap();
  let after = s.get_subject(b).await.unwrap().unwrap();

  assert!(!after.active);
  assert_eq!(after.rating, before.rating);
  assert_eq!(after.losses, 1);
}

#[tokio::test]
async fn recalculation_rebuilds_history() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  for _ in 0..3 {
    s.record_comparison(decisive(a, b, Side::A, 1, rater)).await.unwrap();
  }

  let before = s.rating_history(a).await.unwrap();
  s.recalculate().await.unwrap();
  let after = s.rating_history(a).await.unwrap();

  assert_eq!(before.len(), after.len());
  for (x, y) in before.iter().zip(&after) {
    assert_eq!(x.comparison_id, y.comparison_id);
    assert_eq!(x.rating_before, y.rating_before);
    assert_eq!(x.rating_after, y.rating_after);
  }
}

#[tokio::test]
async fn recalculation_of_an_empty_store_just_advances() {
  let s = store().await;
  let summary = s.recalculate().await.unwrap();
  assert_eq!(summary.generation, 2);
  assert_eq!(summary.subjects, 0);
  assert_eq!(summary.comparisons_replayed, 0);

  let again = s.recalculate().await.unwrap();
  assert_eq!(again.generation, 3);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_submissions_all_land() {
  let s = store().await;
  let (a, b, rater) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
  // The first submission creates both subjects; the rest race.
  s.record_comparison(decisive(a, b, Side::A, 1, rater)).await.unwrap();

  let mut handles = Vec::new();
  for i in 0..8 {
    let s = s.clone();
    let winner = if i % 2 == 0 { Side::A } else { Side::B };
    handles.push(tokio::spawn(async move {
      for _ in 0..5 {
        s.record_comparison(decisive(a, b, winner, 1, rater))
          .await
          .unwrap();
      }
    }));
  }
  for h in handles {
    h.await.unwrap();
  }

  let va = s.get_subject(a).await.unwrap().unwrap();
  let vb = s.get_subject(b).await.unwrap().unwrap();
  assert_eq!(va.wins + va.losses + va.ties, 41);
  assert_eq!(vb.wins + vb.losses + vb.ties, 41);
  assert!((va.rating + vb.rating - 3000.0).abs() < 1e-6);

  let r = s.get_rater(rater).await.unwrap().unwrap();
  assert_eq!(r.total_comparisons, 41);
}
