//! Immutable point-in-time captures of the hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hierarchy::Hierarchy;

/// A named capture of the ranking as it stood at one moment. Never mutated
/// after creation; used for longitudinal comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchySnapshot {
  pub snapshot_id: Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub created_by:  Option<Uuid>,
  pub hierarchy:   Hierarchy,
  pub created_at:  DateTime<Utc>,
}

/// Listing row for snapshots: everything but the (potentially large) ranking
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
  pub snapshot_id: Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub created_by:  Option<Uuid>,
  /// Number of ranked entries in the captured hierarchy.
  pub subjects:    u64,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::store::RatingStore::capture_snapshot`]. The store
/// assembles the hierarchy itself so the capture is consistent with a single
/// transaction's view of the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSnapshot {
  pub name:        String,
  pub description: Option<String>,
  pub created_by:  Option<Uuid>,
}
