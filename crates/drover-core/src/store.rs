//! The `RatingStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `drover-store-sqlite`).
//! Higher layers (`drover-api`, `drover-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  comparison::{Comparison, NewComparison, NewTriplet},
  gold::{GoldTask, GradedAnswer, NewGoldTask},
  hierarchy::Hierarchy,
  rater::Rater,
  snapshot::{HierarchySnapshot, NewSnapshot, SnapshotSummary},
  subject::{RatingHistoryEntry, Subject, SubjectView},
};

/// What a completed recalculation did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalcSummary {
  /// The generation that became active.
  pub generation:           i64,
  pub subjects:             u64,
  pub comparisons_replayed: u64,
  pub started_at:           DateTime<Utc>,
  pub finished_at:          DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a rating store backend.
///
/// Comparisons are append-only; subject rating state is mutable but only
/// through the ingest and recalculation paths. Every ingest method is one
/// atomic transaction: either the comparison, both rating updates, and both
/// history entries land, or nothing does.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait RatingStore: Send + Sync {
  type Error: std::error::Error
    + Into<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Register a subject ahead of its first comparison. The id comes from
  /// the external registry. Errors if the id is already registered.
  fn register_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Soft-deactivate a subject: it keeps its history and its place in past
  /// snapshots but leaves future hierarchies and refuses new comparisons.
  fn deactivate_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Retrieve a subject with its rating state in the active generation.
  /// Returns `None` if not found.
  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SubjectView>, Self::Error>> + Send + '_;

  fn list_subjects(
    &self,
    include_inactive: bool,
  ) -> impl Future<Output = Result<Vec<SubjectView>, Self::Error>> + Send + '_;

  /// A subject's rating trajectory in the active generation, oldest first.
  fn rating_history(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RatingHistoryEntry>, Self::Error>>
  + Send
  + '_;

  // ── Raters ────────────────────────────────────────────────────────────

  /// Returns `None` if the rater has never been seen.
  fn get_rater(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Rater>, Self::Error>> + Send + '_;

  fn list_raters(
    &self,
  ) -> impl Future<Output = Result<Vec<Rater>, Self::Error>> + Send + '_;

  /// Flip a rater's active flag, creating the row first if the directory
  /// pushes status for a rater we have never seen.
  fn set_rater_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<Rater, Self::Error>> + Send + '_;

  // ── Ingest ────────────────────────────────────────────────────────────

  /// Record one production judgment and move both subjects' ratings.
  /// Unknown subjects are created on first appearance; inactive subjects or
  /// raters reject the submission before anything is written.
  fn record_comparison(
    &self,
    input: NewComparison,
  ) -> impl Future<Output = Result<Comparison, Self::Error>> + Send + '_;

  /// Record a most-severe-of-three judgment as its two derived pairwise
  /// comparisons, atomically.
  fn record_triplet(
    &self,
    input: NewTriplet,
  ) -> impl Future<Output = Result<Vec<Comparison>, Self::Error>> + Send + '_;

  /// Grade a judgment against the active gold task covering the pair and
  /// update the rater's reliability. Stores a diagnostic comparison; never
  /// touches any subject's rating state.
  fn record_gold_answer(
    &self,
    input: NewComparison,
  ) -> impl Future<Output = Result<GradedAnswer, Self::Error>> + Send + '_;

  // ── Gold tasks ────────────────────────────────────────────────────────

  fn create_gold_task(
    &self,
    input: NewGoldTask,
  ) -> impl Future<Output = Result<GoldTask, Self::Error>> + Send + '_;

  fn list_gold_tasks(
    &self,
    include_inactive: bool,
  ) -> impl Future<Output = Result<Vec<GoldTask>, Self::Error>> + Send + '_;

  /// Retire (or reinstate) a gold task. Retired tasks stop matching new
  /// submissions.
  fn set_gold_task_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<GoldTask, Self::Error>> + Send + '_;

  // ── Hierarchy and snapshots ───────────────────────────────────────────

  /// Assemble the ranked list from a single consistent view of the active
  /// generation.
  fn assemble_hierarchy(
    &self,
  ) -> impl Future<Output = Result<Hierarchy, Self::Error>> + Send + '_;

  /// Assemble the current hierarchy and persist it immutably.
  fn capture_snapshot(
    &self,
    input: NewSnapshot,
  ) -> impl Future<Output = Result<HierarchySnapshot, Self::Error>> + Send + '_;

  /// Returns `None` if no snapshot has that id.
  fn get_snapshot(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<HierarchySnapshot>, Self::Error>>
  + Send
  + '_;

  /// All snapshots, oldest first, without their ranking payloads.
  fn list_snapshots(
    &self,
  ) -> impl Future<Output = Result<Vec<SnapshotSummary>, Self::Error>> + Send + '_;

  // ── Recalculation ─────────────────────────────────────────────────────

  /// Rebuild every subject's rating by replaying the full production
  /// history, in submission order, with the originally snapshotted rater
  /// weights, into a fresh generation. The new generation becomes active
  /// only if the whole replay succeeds.
  fn recalculate(
    &self,
  ) -> impl Future<Output = Result<RecalcSummary, Self::Error>> + Send + '_;
}
