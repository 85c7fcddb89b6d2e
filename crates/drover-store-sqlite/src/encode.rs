//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings, UUIDs as hyphenated
//! lowercase strings, enums as their lowercase names, and the snapshot
//! hierarchy payload as compact JSON. Counters are stored as INTEGER and
//! read back as `i64`.

use chrono::{DateTime, Utc};
use drover_core::{
  comparison::{Comparison, ComparisonKind, Outcome},
  config::RatingConfig,
  gold::{GoldDifficulty, GoldTask},
  rater::{Rater, RaterTier},
  snapshot::{HierarchySnapshot, SnapshotSummary},
  subject::{
    Category, RatingHistoryEntry, Subject, SubjectRating, SubjectView,
  },
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── RaterTier ───────────────────────────────────────────────────────────────

pub fn encode_tier(t: RaterTier) -> &'static str {
  match t {
    RaterTier::Bronze => "bronze",
    RaterTier::Silver => "silver",
    RaterTier::Gold => "gold",
  }
}

pub fn decode_tier(s: &str) -> Result<RaterTier> {
  match s {
    "bronze" => Ok(RaterTier::Bronze),
    "silver" => Ok(RaterTier::Silver),
    "gold" => Ok(RaterTier::Gold),
    other => Err(Error::Decode(format!("unknown rater tier: {other:?}"))),
  }
}

// ─── GoldDifficulty ──────────────────────────────────────────────────────────

pub fn encode_difficulty(d: GoldDifficulty) -> &'static str {
  match d {
    GoldDifficulty::Easy => "easy",
    GoldDifficulty::Medium => "medium",
    GoldDifficulty::Hard => "hard",
  }
}

pub fn decode_difficulty(s: &str) -> Result<GoldDifficulty> {
  match s {
    "easy" => Ok(GoldDifficulty::Easy),
    "medium" => Ok(GoldDifficulty::Medium),
    "hard" => Ok(GoldDifficulty::Hard),
    other => {
      Err(Error::Decode(format!("unknown difficulty: {other:?}")))
    }
  }
}

// ─── ComparisonKind ──────────────────────────────────────────────────────────

pub fn encode_kind(k: ComparisonKind) -> &'static str {
  match k {
    ComparisonKind::Production => "production",
    ComparisonKind::Diagnostic => "diagnostic",
  }
}

pub fn decode_kind(s: &str) -> Result<ComparisonKind> {
  match s {
    "production" => Ok(ComparisonKind::Production),
    "diagnostic" => Ok(ComparisonKind::Diagnostic),
    other => {
      Err(Error::Decode(format!("unknown comparison kind: {other:?}")))
    }
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns of a `subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub active:     bool,
  pub created_at: String,
}

impl RawSubject {
  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id: decode_uuid(&self.subject_id)?,
      active:     self.active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A `subjects` row joined with its `ratings` row in the active generation.
pub struct RawSubjectView {
  pub subject_id:  String,
  pub active:      bool,
  pub created_at:  String,
  pub rating:      f64,
  pub uncertainty: f64,
  pub wins:        i64,
  pub losses:      i64,
  pub ties:        i64,
}

impl RawSubjectView {
  pub fn into_view(self, cfg: &RatingConfig) -> Result<SubjectView> {
    Ok(SubjectView {
      subject_id:  decode_uuid(&self.subject_id)?,
      active:      self.active,
      created_at:  decode_dt(&self.created_at)?,
      rating:      self.rating,
      uncertainty: self.uncertainty,
      wins:        self.wins as u64,
      losses:      self.losses as u64,
      ties:        self.ties as u64,
      category:    Category::classify(self.rating, cfg),
    })
  }
}

/// Raw columns of a `ratings` row.
pub struct RawRating {
  pub subject_id:  String,
  pub rating:      f64,
  pub uncertainty: f64,
  pub wins:        i64,
  pub losses:      i64,
  pub ties:        i64,
}

impl RawRating {
  pub fn into_rating(self) -> Result<SubjectRating> {
    Ok(SubjectRating {
      subject_id:  decode_uuid(&self.subject_id)?,
      rating:      self.rating,
      uncertainty: self.uncertainty,
      wins:        self.wins as u64,
      losses:      self.losses as u64,
      ties:        self.ties as u64,
    })
  }
}

/// Raw columns of a `raters` row.
pub struct RawRater {
  pub rater_id:          String,
  pub active:            bool,
  pub total_comparisons: i64,
  pub gold_attempts:     i64,
  pub gold_correct:      i64,
  pub agreement_rate:    Option<f64>,
  pub agreement_pairs:   i64,
  pub since_agreement:   i64,
  pub weight:            f64,
  pub tier:              String,
  pub created_at:        String,
  pub last_activity:     Option<String>,
}

impl RawRater {
  pub fn into_rater(self) -> Result<Rater> {
    Ok(Rater {
      rater_id:          decode_uuid(&self.rater_id)?,
      active:            self.active,
      total_comparisons: self.total_comparisons as u64,
      gold_attempts:     self.gold_attempts as u64,
      gold_correct:      self.gold_correct as u64,
      agreement_rate:    self.agreement_rate,
      agreement_pairs:   self.agreement_pairs as u64,
      since_agreement:   self.since_agreement as u64,
      weight:            self.weight,
      tier:              decode_tier(&self.tier)?,
      created_at:        decode_dt(&self.created_at)?,
      last_activity:     self
        .last_activity
        .as_deref()
        .map(decode_dt)
        .transpose()?,
    })
  }
}

/// Raw columns of a `comparisons` row.
pub struct RawComparison {
  pub comparison_id: String,
  pub subject_a:     String,
  pub subject_b:     String,
  pub winner:        u8,
  pub degree:        u8,
  pub rater_id:      String,
  pub rater_weight:  f64,
  pub kind:          String,
  pub submitted_at:  String,
}

impl RawComparison {
  pub fn into_comparison(self) -> Result<Comparison> {
    Ok(Comparison {
      comparison_id: decode_uuid(&self.comparison_id)?,
      subject_a:     decode_uuid(&self.subject_a)?,
      subject_b:     decode_uuid(&self.subject_b)?,
      outcome:       Outcome::from_codes(self.winner, self.degree)?,
      rater_id:      decode_uuid(&self.rater_id)?,
      rater_weight:  self.rater_weight,
      kind:          decode_kind(&self.kind)?,
      submitted_at:  decode_dt(&self.submitted_at)?,
    })
  }
}

/// Raw columns of a `gold_tasks` row.
pub struct RawGoldTask {
  pub gold_task_id: String,
  pub subject_a:    String,
  pub subject_b:    String,
  pub winner:       u8,
  pub degree:       u8,
  pub difficulty:   String,
  pub active:       bool,
  pub created_by:   Option<String>,
  pub created_at:   String,
}

impl RawGoldTask {
  pub fn into_gold_task(self) -> Result<GoldTask> {
    Ok(GoldTask {
      gold_task_id: decode_uuid(&self.gold_task_id)?,
      subject_a:    decode_uuid(&self.subject_a)?,
      subject_b:    decode_uuid(&self.subject_b)?,
      expected:     Outcome::from_codes(self.winner, self.degree)?,
      difficulty:   decode_difficulty(&self.difficulty)?,
      active:       self.active,
      created_by:   self.created_by.as_deref().map(decode_uuid).transpose()?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw columns of a `rating_history` row.
pub struct RawHistoryEntry {
  pub subject_id:    String,
  pub comparison_id: String,
  pub rating_before: f64,
  pub rating_after:  f64,
  pub recorded_at:   String,
}

impl RawHistoryEntry {
  pub fn into_entry(self) -> Result<RatingHistoryEntry> {
    Ok(RatingHistoryEntry {
      subject_id:    decode_uuid(&self.subject_id)?,
      comparison_id: decode_uuid(&self.comparison_id)?,
      rating_before: self.rating_before,
      rating_after:  self.rating_after,
      recorded_at:   decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw columns of a `snapshots` row, payload included.
pub struct RawSnapshot {
  pub snapshot_id:    String,
  pub name:           String,
  pub description:    Option<String>,
  pub created_by:     Option<String>,
  pub hierarchy_json: String,
  pub created_at:     String,
}

impl RawSnapshot {
  pub fn into_snapshot(self) -> Result<HierarchySnapshot> {
    Ok(HierarchySnapshot {
      snapshot_id: decode_uuid(&self.snapshot_id)?,
      name:        self.name,
      description: self.description,
      created_by:  self.created_by.as_deref().map(decode_uuid).transpose()?,
      hierarchy:   serde_json::from_str(&self.hierarchy_json)?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw columns of a `snapshots` row, payload skipped.
pub struct RawSnapshotSummary {
  pub snapshot_id: String,
  pub name:        String,
  pub description: Option<String>,
  pub created_by:  Option<String>,
  pub subjects:    i64,
  pub created_at:  String,
}

impl RawSnapshotSummary {
  pub fn into_summary(self) -> Result<SnapshotSummary> {
    Ok(SnapshotSummary {
      snapshot_id: decode_uuid(&self.snapshot_id)?,
      name:        self.name,
      description: self.description,
      created_by:  self.created_by.as_deref().map(decode_uuid).transpose()?,
      subjects:    self.subjects as u64,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
