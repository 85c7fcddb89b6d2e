//! [`SqliteStore`] — the SQLite implementation of [`RatingStore`].
//!
//! Every operation is one closure on the single connection actor, and every
//! write runs inside one immediate transaction. Submissions that race on the
//! same subject therefore serialize structurally; there is no per-subject
//! locking anywhere above the database.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use drover_core::{
  Error as CoreError,
  comparison::{Comparison, ComparisonKind, NewComparison, NewTriplet, Outcome},
  config::RatingConfig,
  gold::{GoldTask, GradedAnswer, NewGoldTask},
  hierarchy::{self, Hierarchy},
  rater::Rater,
  rating,
  score::{self, PairRecord},
  snapshot::{HierarchySnapshot, NewSnapshot, SnapshotSummary},
  store::{RatingStore, RecalcSummary},
  subject::{RatingHistoryEntry, Subject, SubjectRating, SubjectView},
};

use crate::{
  Error, Result,
  encode::{
    RawComparison, RawGoldTask, RawHistoryEntry, RawRater, RawRating,
    RawSnapshot, RawSnapshotSummary, RawSubject, RawSubjectView, decode_uuid,
    encode_difficulty, encode_dt, encode_kind, encode_tier, encode_uuid,
  },
  schema::SCHEMA,
};

/// Write transactions retry this many times on a locked database before
/// surfacing [`Error::Busy`].
const BUSY_RETRIES: u32 = 3;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rating store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  cfg:  RatingConfig,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(
    path: impl AsRef<Path>,
    cfg: RatingConfig,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, cfg };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store with default tunables — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(RatingConfig::default()).await
  }

  /// Open an in-memory store with specific tunables.
  pub async fn open_in_memory_with(cfg: RatingConfig) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, cfg };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a read closure. A closure holds the connection exclusively, so a
  /// multi-statement read sees one consistent world without an explicit
  /// transaction.
  async fn read<T, F>(&self, op: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(op(conn))).await?
  }

  /// Run `op` inside one immediate write transaction, retrying a bounded
  /// number of times when another process holds the file locked. The
  /// transaction rolls back whenever `op` fails.
  async fn write_tx<T, F>(&self, op: F) -> Result<T>
  where
    F: Fn(&rusqlite::Connection) -> Result<T> + Clone + Send + 'static,
    T: Send + 'static,
  {
    let mut attempts = 0;
    loop {
      let op = op.clone();
      let out: Result<T> = self
        .conn
        .call(move |conn| {
          let tx = match conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
          {
            Ok(tx) => tx,
            Err(e) => return Ok(Err(e.into())),
          };
          let value = match op(&tx) {
            Ok(v) => v,
            // Dropping the transaction rolls it back.
            Err(e) => return Ok(Err(e)),
          };
          if let Err(e) = tx.commit() {
            return Ok(Err(e.into()));
          }
          Ok(Ok(value))
        })
        .await?;

      match out {
        Err(e) if e.is_busy() => {
          attempts += 1;
          if attempts >= BUSY_RETRIES {
            return Err(Error::Busy);
          }
          let backoff =
            std::time::Duration::from_millis(20 * u64::from(attempts));
          tokio::time::sleep(backoff).await;
        }
        other => return other,
      }
    }
  }
}

// ─── Meta ────────────────────────────────────────────────────────────────────

fn active_generation(conn: &rusqlite::Connection) -> Result<i64> {
  let value: String = conn.query_row(
    "SELECT value FROM meta WHERE key = 'active_generation'",
    [],
    |r| r.get(0),
  )?;
  value
    .parse()
    .map_err(|_| Error::Decode(format!("bad generation: {value:?}")))
}

fn set_active_generation(
  conn: &rusqlite::Connection,
  generation: i64,
) -> Result<()> {
  conn.execute(
    "UPDATE meta SET value = ?1 WHERE key = 'active_generation'",
    rusqlite::params![generation.to_string()],
  )?;
  Ok(())
}

// ─── Subjects ────────────────────────────────────────────────────────────────

fn subject_by_id(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> Result<Option<Subject>> {
  let raw = conn
    .query_row(
      "SELECT subject_id, active, created_at FROM subjects
       WHERE subject_id = ?1",
      rusqlite::params![encode_uuid(id)],
      |row| {
        Ok(RawSubject {
          subject_id: row.get(0)?,
          active:     row.get(1)?,
          created_at: row.get(2)?,
        })
      },
    )
    .optional()?;
  raw.map(RawSubject::into_subject).transpose()
}

fn insert_subject(conn: &rusqlite::Connection, s: &Subject) -> Result<()> {
  conn.execute(
    "INSERT INTO subjects (subject_id, active, created_at)
     VALUES (?1, ?2, ?3)",
    rusqlite::params![
      encode_uuid(s.subject_id),
      s.active,
      encode_dt(s.created_at),
    ],
  )?;
  Ok(())
}

/// Fetch-or-create for the ingest path. Unknown subjects appear with the
/// initial rating state; known-but-deactivated subjects reject the write.
fn ensure_active_subject(
  conn: &rusqlite::Connection,
  generation: i64,
  id: Uuid,
  now: DateTime<Utc>,
  cfg: &RatingConfig,
) -> Result<()> {
  match subject_by_id(conn, id)? {
    Some(s) if s.active => Ok(()),
    Some(_) => Err(Error::Core(CoreError::SubjectInactive(id))),
    None => {
      let subject = Subject { subject_id: id, active: true, created_at: now };
      insert_subject(conn, &subject)?;
      put_rating(conn, generation, &SubjectRating::initial(id, cfg), now)?;
      Ok(())
    }
  }
}

fn subject_view(
  conn: &rusqlite::Connection,
  id: Uuid,
  cfg: &RatingConfig,
) -> Result<Option<SubjectView>> {
  let generation = active_generation(conn)?;
  let raw = conn
    .query_row(
      "SELECT s.subject_id, s.active, s.created_at,
              r.rating, r.uncertainty, r.wins, r.losses, r.ties
       FROM subjects s
       JOIN ratings r
         ON r.subject_id = s.subject_id AND r.generation = ?2
       WHERE s.subject_id = ?1",
      rusqlite::params![encode_uuid(id), generation],
      |row| {
        Ok(RawSubjectView {
          subject_id:  row.get(0)?,
          active:      row.get(1)?,
          created_at:  row.get(2)?,
          rating:      row.get(3)?,
          uncertainty: row.get(4)?,
          wins:        row.get(5)?,
          losses:      row.get(6)?,
          ties:        row.get(7)?,
        })
      },
    )
    .optional()?;
  raw.map(|r| r.into_view(cfg)).transpose()
}

fn list_subject_views(
  conn: &rusqlite::Connection,
  include_inactive: bool,
  cfg: &RatingConfig,
) -> Result<Vec<SubjectView>> {
  let generation = active_generation(conn)?;
  let filter = if include_inactive { "" } else { "AND s.active = 1" };
  let sql = format!(
    "SELECT s.subject_id, s.active, s.created_at,
            r.rating, r.uncertainty, r.wins, r.losses, r.ties
     FROM subjects s
     JOIN ratings r
       ON r.subject_id = s.subject_id AND r.generation = ?1
     WHERE 1 = 1 {filter}
     ORDER BY s.created_at, s.subject_id"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(rusqlite::params![generation], |row| {
      Ok(RawSubjectView {
        subject_id:  row.get(0)?,
        active:      row.get(1)?,
        created_at:  row.get(2)?,
        rating:      row.get(3)?,
        uncertainty: row.get(4)?,
        wins:        row.get(5)?,
        losses:      row.get(6)?,
        ties:        row.get(7)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(|r| r.into_view(cfg)).collect()
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

fn rating_row(
  conn: &rusqlite::Connection,
  generation: i64,
  id: Uuid,
) -> Result<Option<SubjectRating>> {
  let raw = conn
    .query_row(
      "SELECT subject_id, rating, uncertainty, wins, losses, ties
       FROM ratings WHERE generation = ?1 AND subject_id = ?2",
      rusqlite::params![generation, encode_uuid(id)],
      |row| {
        Ok(RawRating {
          subject_id:  row.get(0)?,
          rating:      row.get(1)?,
          uncertainty: row.get(2)?,
          wins:        row.get(3)?,
          losses:      row.get(4)?,
          ties:        row.get(5)?,
        })
      },
    )
    .optional()?;
  raw.map(RawRating::into_rating).transpose()
}

fn put_rating(
  conn: &rusqlite::Connection,
  generation: i64,
  r: &SubjectRating,
  updated_at: DateTime<Utc>,
) -> Result<()> {
  conn.execute(
    "INSERT INTO ratings
       (generation, subject_id, rating, uncertainty, wins, losses, ties,
        updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT (generation, subject_id) DO UPDATE SET
       rating      = excluded.rating,
       uncertainty = excluded.uncertainty,
       wins        = excluded.wins,
       losses      = excluded.losses,
       ties        = excluded.ties,
       updated_at  = excluded.updated_at",
    rusqlite::params![
      generation,
      encode_uuid(r.subject_id),
      r.rating,
      r.uncertainty,
      r.wins as i64,
      r.losses as i64,
      r.ties as i64,
      encode_dt(updated_at),
    ],
  )?;
  Ok(())
}

fn active_ratings(
  conn: &rusqlite::Connection,
  generation: i64,
) -> Result<Vec<SubjectRating>> {
  let mut stmt = conn.prepare(
    "SELECT r.subject_id, r.rating, r.uncertainty, r.wins, r.losses, r.ties
     FROM ratings r
     JOIN subjects s ON s.subject_id = r.subject_id
     WHERE r.generation = ?1 AND s.active = 1",
  )?;
  let raws = stmt
    .query_map(rusqlite::params![generation], |row| {
      Ok(RawRating {
        subject_id:  row.get(0)?,
        rating:      row.get(1)?,
        uncertainty: row.get(2)?,
        wins:        row.get(3)?,
        losses:      row.get(4)?,
        ties:        row.get(5)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawRating::into_rating).collect()
}

// ─── Raters ──────────────────────────────────────────────────────────────────

fn rater_by_id(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> Result<Option<Rater>> {
  let raw = conn
    .query_row(
      "SELECT rater_id, active, total_comparisons, gold_attempts,
              gold_correct, agreement_rate, agreement_pairs,
              since_agreement, weight, tier, created_at, last_activity
       FROM raters WHERE rater_id = ?1",
      rusqlite::params![encode_uuid(id)],
      |row| {
        Ok(RawRater {
          rater_id:          row.get(0)?,
          active:            row.get(1)?,
          total_comparisons: row.get(2)?,
          gold_attempts:     row.get(3)?,
          gold_correct:      row.get(4)?,
          agreement_rate:    row.get(5)?,
          agreement_pairs:   row.get(6)?,
          since_agreement:   row.get(7)?,
          weight:            row.get(8)?,
          tier:              row.get(9)?,
          created_at:        row.get(10)?,
          last_activity:     row.get(11)?,
        })
      },
    )
    .optional()?;
  raw.map(RawRater::into_rater).transpose()
}

fn put_rater(conn: &rusqlite::Connection, r: &Rater) -> Result<()> {
  conn.execute(
    "INSERT INTO raters
       (rater_id, active, total_comparisons, gold_attempts, gold_correct,
        agreement_rate, agreement_pairs, since_agreement, weight, tier,
        created_at, last_activity)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
     ON CONFLICT (rater_id) DO UPDATE SET
       active            = excluded.active,
       total_comparisons = excluded.total_comparisons,
       gold_attempts     = excluded.gold_attempts,
       gold_correct      = excluded.gold_correct,
       agreement_rate    = excluded.agreement_rate,
       agreement_pairs   = excluded.agreement_pairs,
       since_agreement   = excluded.since_agreement,
       weight            = excluded.weight,
       tier              = excluded.tier,
       last_activity     = excluded.last_activity",
    rusqlite::params![
      encode_uuid(r.rater_id),
      r.active,
      r.total_comparisons as i64,
      r.gold_attempts as i64,
      r.gold_correct as i64,
      r.agreement_rate,
      r.agreement_pairs as i64,
      r.since_agreement as i64,
      r.weight,
      encode_tier(r.tier),
      encode_dt(r.created_at),
      r.last_activity.map(encode_dt),
    ],
  )?;
  Ok(())
}

fn list_all_raters(conn: &rusqlite::Connection) -> Result<Vec<Rater>> {
  let mut stmt = conn.prepare(
    "SELECT rater_id, active, total_comparisons, gold_attempts,
            gold_correct, agreement_rate, agreement_pairs,
            since_agreement, weight, tier, created_at, last_activity
     FROM raters ORDER BY created_at, rater_id",
  )?;
  let raws = stmt
    .query_map([], |row| {
      Ok(RawRater {
        rater_id:          row.get(0)?,
        active:            row.get(1)?,
        total_comparisons: row.get(2)?,
        gold_attempts:     row.get(3)?,
        gold_correct:      row.get(4)?,
        agreement_rate:    row.get(5)?,
        agreement_pairs:   row.get(6)?,
        since_agreement:   row.get(7)?,
        weight:            row.get(8)?,
        tier:              row.get(9)?,
        created_at:        row.get(10)?,
        last_activity:     row.get(11)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawRater::into_rater).collect()
}

/// Fetch-or-create for the ingest path; inactive raters reject the write.
fn ensure_active_rater(
  conn: &rusqlite::Connection,
  id: Uuid,
  cfg: &RatingConfig,
  now: DateTime<Utc>,
) -> Result<Rater> {
  match rater_by_id(conn, id)? {
    Some(r) if r.active => Ok(r),
    Some(_) => Err(Error::Core(CoreError::RaterInactive(id))),
    None => {
      let r = Rater::new(id, cfg, now);
      put_rater(conn, &r)?;
      Ok(r)
    }
  }
}

/// Recompute the rater's agreement component from every production judgment
/// on record, including any inserted earlier in this transaction.
fn refresh_agreement(
  conn: &rusqlite::Connection,
  rater: &mut Rater,
  cfg: &RatingConfig,
) -> Result<()> {
  let records = production_records(conn)?;
  let (rate, pairs) = score::rater_agreement(rater.rater_id, &records);
  rater.record_agreement(rate, pairs, cfg);
  Ok(())
}

// ─── Comparisons ─────────────────────────────────────────────────────────────

fn insert_comparison(
  conn: &rusqlite::Connection,
  c: &Comparison,
) -> Result<()> {
  conn.execute(
    "INSERT INTO comparisons
       (comparison_id, subject_a, subject_b, winner, degree, rater_id,
        rater_weight, kind, submitted_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      encode_uuid(c.comparison_id),
      encode_uuid(c.subject_a),
      encode_uuid(c.subject_b),
      i64::from(c.outcome.winner_code()),
      i64::from(c.outcome.degree_code()),
      encode_uuid(c.rater_id),
      c.rater_weight,
      encode_kind(c.kind),
      encode_dt(c.submitted_at),
    ],
  )?;
  Ok(())
}

fn insert_history(
  conn: &rusqlite::Connection,
  generation: i64,
  subject_id: Uuid,
  comparison_id: Uuid,
  rating_before: f64,
  rating_after: f64,
  recorded_at: DateTime<Utc>,
) -> Result<()> {
  conn.execute(
    "INSERT INTO rating_history
       (generation, subject_id, comparison_id, rating_before, rating_after,
        recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      generation,
      encode_uuid(subject_id),
      encode_uuid(comparison_id),
      rating_before,
      rating_after,
      encode_dt(recorded_at),
    ],
  )?;
  Ok(())
}

/// Every production judgment, projected for the scorers.
fn production_records(
  conn: &rusqlite::Connection,
) -> Result<Vec<PairRecord>> {
  let mut stmt = conn.prepare(
    "SELECT subject_a, subject_b, winner, degree, rater_id
     FROM comparisons WHERE kind = 'production'",
  )?;
  let rows = stmt
    .query_map([], |row| {
      Ok((
        row.get::<_, String>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, u8>(2)?,
        row.get::<_, u8>(3)?,
        row.get::<_, String>(4)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(a, b, winner, degree, rater)| {
      Ok(PairRecord {
        subject_a: decode_uuid(&a)?,
        subject_b: decode_uuid(&b)?,
        outcome:   Outcome::from_codes(winner, degree)?,
        rater_id:  decode_uuid(&rater)?,
      })
    })
    .collect()
}

/// Every production judgment in replay order: submission time, then
/// insertion order for identical timestamps (covers the two halves of a
/// triplet, which share one).
fn production_comparisons_ordered(
  conn: &rusqlite::Connection,
) -> Result<Vec<Comparison>> {
  let mut stmt = conn.prepare(
    "SELECT comparison_id, subject_a, subject_b, winner, degree, rater_id,
            rater_weight, kind, submitted_at
     FROM comparisons WHERE kind = 'production'
     ORDER BY submitted_at, rowid",
  )?;
  let raws = stmt
    .query_map([], |row| {
      Ok(RawComparison {
        comparison_id: row.get(0)?,
        subject_a:     row.get(1)?,
        subject_b:     row.get(2)?,
        winner:        row.get(3)?,
        degree:        row.get(4)?,
        rater_id:      row.get(5)?,
        rater_weight:  row.get(6)?,
        kind:          row.get(7)?,
        submitted_at:  row.get(8)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawComparison::into_comparison).collect()
}

/// Move both subjects' rating state for one production comparison, using
/// the weight snapshotted in the record. Live ingest and replay share this
/// path, which is what makes replay reproduce live results exactly.
fn apply_comparison(
  conn: &rusqlite::Connection,
  generation: i64,
  c: &Comparison,
  cfg: &RatingConfig,
) -> Result<()> {
  let a = rating_row(conn, generation, c.subject_a)?
    .ok_or(Error::Core(CoreError::SubjectNotFound(c.subject_a)))?;
  let b = rating_row(conn, generation, c.subject_b)?
    .ok_or(Error::Core(CoreError::SubjectNotFound(c.subject_b)))?;

  let update = rating::rate_pair(&a, &b, c.outcome, c.rater_weight, cfg);
  put_rating(conn, generation, &update.a, c.submitted_at)?;
  put_rating(conn, generation, &update.b, c.submitted_at)?;
  insert_history(
    conn,
    generation,
    c.subject_a,
    c.comparison_id,
    a.rating,
    update.a.rating,
    c.submitted_at,
  )?;
  insert_history(
    conn,
    generation,
    c.subject_b,
    c.comparison_id,
    b.rating,
    update.b.rating,
    c.submitted_at,
  )?;
  Ok(())
}

/// The full production ingest transaction: validate, snapshot the rater's
/// weight, append the comparison, move both ratings, append history, then
/// update the rater's own counters.
fn ingest_production(
  conn: &rusqlite::Connection,
  input: &NewComparison,
  comparison_id: Uuid,
  now: DateTime<Utc>,
  cfg: &RatingConfig,
) -> Result<Comparison> {
  input.validate()?;
  let generation = active_generation(conn)?;
  let mut rater = ensure_active_rater(conn, input.rater_id, cfg, now)?;
  ensure_active_subject(conn, generation, input.subject_a, now, cfg)?;
  ensure_active_subject(conn, generation, input.subject_b, now, cfg)?;

  let comparison = Comparison {
    comparison_id,
    subject_a: input.subject_a,
    subject_b: input.subject_b,
    outcome: input.outcome,
    rater_id: input.rater_id,
    rater_weight: rater.effective_weight(cfg),
    kind: ComparisonKind::Production,
    submitted_at: now,
  };
  insert_comparison(conn, &comparison)?;
  apply_comparison(conn, generation, &comparison, cfg)?;

  rater.record_production(now);
  if rater.needs_agreement_refresh(cfg) {
    refresh_agreement(conn, &mut rater, cfg)?;
  }
  put_rater(conn, &rater)?;

  Ok(comparison)
}

/// The diagnostic ingest transaction: grade against the matching gold task
/// and update the rater. No subject rating state is touched.
fn ingest_gold(
  conn: &rusqlite::Connection,
  input: &NewComparison,
  comparison_id: Uuid,
  now: DateTime<Utc>,
  cfg: &RatingConfig,
) -> Result<GradedAnswer> {
  input.validate()?;
  let mut rater = ensure_active_rater(conn, input.rater_id, cfg, now)?;

  let task = find_active_gold_task(conn, input.subject_a, input.subject_b)?
    .ok_or(Error::Core(CoreError::GoldTaskNotFound(
      input.subject_a,
      input.subject_b,
    )))?;
  warn_gold_misconfiguration(conn, &task)?;

  let correct = task
    .grade(
      input.subject_a,
      input.subject_b,
      input.outcome,
      cfg.gold_degree_tolerance,
    )
    .ok_or(Error::Core(CoreError::GoldTaskNotFound(
      input.subject_a,
      input.subject_b,
    )))?;

  let comparison = Comparison {
    comparison_id,
    subject_a: input.subject_a,
    subject_b: input.subject_b,
    outcome: input.outcome,
    rater_id: input.rater_id,
    rater_weight: rater.effective_weight(cfg),
    kind: ComparisonKind::Diagnostic,
    submitted_at: now,
  };
  insert_comparison(conn, &comparison)?;

  refresh_agreement(conn, &mut rater, cfg)?;
  rater.record_gold_attempt(correct, cfg, now);
  put_rater(conn, &rater)?;

  Ok(GradedAnswer {
    comparison,
    gold_task_id: task.gold_task_id,
    correct,
  })
}

// ─── Gold tasks ──────────────────────────────────────────────────────────────

const GOLD_TASK_COLUMNS: &str = "gold_task_id, subject_a, subject_b, winner, \
                                 degree, difficulty, active, created_by, \
                                 created_at";

fn map_gold_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawGoldTask> {
  Ok(RawGoldTask {
    gold_task_id: row.get(0)?,
    subject_a:    row.get(1)?,
    subject_b:    row.get(2)?,
    winner:       row.get(3)?,
    degree:       row.get(4)?,
    difficulty:   row.get(5)?,
    active:       row.get(6)?,
    created_by:   row.get(7)?,
    created_at:   row.get(8)?,
  })
}

/// The newest active task covering the unordered pair, if any.
fn find_active_gold_task(
  conn: &rusqlite::Connection,
  a: Uuid,
  b: Uuid,
) -> Result<Option<GoldTask>> {
  let sql = format!(
    "SELECT {GOLD_TASK_COLUMNS} FROM gold_tasks
     WHERE active = 1
       AND ((subject_a = ?1 AND subject_b = ?2)
         OR (subject_a = ?2 AND subject_b = ?1))
     ORDER BY created_at DESC, gold_task_id LIMIT 1"
  );
  let raw = conn
    .query_row(
      &sql,
      rusqlite::params![encode_uuid(a), encode_uuid(b)],
      map_gold_task_row,
    )
    .optional()?;
  raw.map(RawGoldTask::into_gold_task).transpose()
}

fn gold_task_by_id(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> Result<Option<GoldTask>> {
  let sql = format!(
    "SELECT {GOLD_TASK_COLUMNS} FROM gold_tasks WHERE gold_task_id = ?1"
  );
  let raw = conn
    .query_row(&sql, rusqlite::params![encode_uuid(id)], map_gold_task_row)
    .optional()?;
  raw.map(RawGoldTask::into_gold_task).transpose()
}

fn list_gold_task_rows(
  conn: &rusqlite::Connection,
  include_inactive: bool,
) -> Result<Vec<GoldTask>> {
  let filter = if include_inactive { "" } else { "WHERE active = 1" };
  let sql = format!(
    "SELECT {GOLD_TASK_COLUMNS} FROM gold_tasks {filter}
     ORDER BY created_at, gold_task_id"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map([], map_gold_task_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawGoldTask::into_gold_task).collect()
}

/// A task referencing unknown or deactivated subjects still grades raters,
/// but somebody should hear about it.
fn warn_gold_misconfiguration(
  conn: &rusqlite::Connection,
  task: &GoldTask,
) -> Result<()> {
  for id in [task.subject_a, task.subject_b] {
    match subject_by_id(conn, id)? {
      Some(s) if !s.active => tracing::warn!(
        gold_task = %task.gold_task_id,
        subject = %id,
        "gold task references a deactivated subject",
      ),
      None => tracing::warn!(
        gold_task = %task.gold_task_id,
        subject = %id,
        "gold task references an unregistered subject",
      ),
      Some(_) => {}
    }
  }
  Ok(())
}

// ─── Hierarchy ───────────────────────────────────────────────────────────────

/// Assemble from one consistent view: active subjects' rating state in the
/// active generation plus the full production record.
fn assemble_current(
  conn: &rusqlite::Connection,
  cfg: &RatingConfig,
) -> Result<Hierarchy> {
  let generation = active_generation(conn)?;
  let ratings = active_ratings(conn, generation)?;
  let records = production_records(conn)?;
  Ok(hierarchy::assemble(generation, &ratings, &records, cfg, Utc::now()))
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

fn insert_snapshot(
  conn: &rusqlite::Connection,
  snap: &HierarchySnapshot,
) -> Result<()> {
  conn.execute(
    "INSERT INTO snapshots
       (snapshot_id, name, description, created_by, subjects,
        hierarchy_json, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_uuid(snap.snapshot_id),
      snap.name,
      snap.description,
      snap.created_by.map(encode_uuid),
      snap.hierarchy.entries.len() as i64,
      serde_json::to_string(&snap.hierarchy)?,
      encode_dt(snap.created_at),
    ],
  )?;
  Ok(())
}

fn snapshot_by_id(
  conn: &rusqlite::Connection,
  id: Uuid,
) -> Result<Option<HierarchySnapshot>> {
  let raw = conn
    .query_row(
      "SELECT snapshot_id, name, description, created_by, hierarchy_json,
              created_at
       FROM snapshots WHERE snapshot_id = ?1",
      rusqlite::params![encode_uuid(id)],
      |row| {
        Ok(RawSnapshot {
          snapshot_id:    row.get(0)?,
          name:           row.get(1)?,
          description:    row.get(2)?,
          created_by:     row.get(3)?,
          hierarchy_json: row.get(4)?,
          created_at:     row.get(5)?,
        })
      },
    )
    .optional()?;
  raw.map(RawSnapshot::into_snapshot).transpose()
}

fn list_snapshot_summaries(
  conn: &rusqlite::Connection,
) -> Result<Vec<SnapshotSummary>> {
  let mut stmt = conn.prepare(
    "SELECT snapshot_id, name, description, created_by, subjects, created_at
     FROM snapshots ORDER BY created_at, snapshot_id",
  )?;
  let raws = stmt
    .query_map([], |row| {
      Ok(RawSnapshotSummary {
        snapshot_id: row.get(0)?,
        name:        row.get(1)?,
        description: row.get(2)?,
        created_by:  row.get(3)?,
        subjects:    row.get(4)?,
        created_at:  row.get(5)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawSnapshotSummary::into_summary).collect()
}

// ─── Recalculation ───────────────────────────────────────────────────────────

/// Replay the full production history into a fresh generation and flip the
/// pointer. Runs inside one write transaction: a failure anywhere rolls the
/// whole thing back and the previous generation stays active.
fn recalculate_tx(
  conn: &rusqlite::Connection,
  cfg: &RatingConfig,
  started_at: DateTime<Utc>,
) -> Result<RecalcSummary> {
  let old_generation = active_generation(conn)?;
  let generation = old_generation + 1;

  let mut stmt =
    conn.prepare("SELECT subject_id FROM subjects ORDER BY rowid")?;
  let subject_ids = stmt
    .query_map([], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  for id in &subject_ids {
    let id = decode_uuid(id)?;
    put_rating(conn, generation, &SubjectRating::initial(id, cfg), started_at)?;
  }

  let comparisons = production_comparisons_ordered(conn)?;
  for c in &comparisons {
    apply_comparison(conn, generation, c, cfg)?;
  }

  set_active_generation(conn, generation)?;
  conn.execute(
    "DELETE FROM rating_history WHERE generation != ?1",
    rusqlite::params![generation],
  )?;
  conn.execute(
    "DELETE FROM ratings WHERE generation != ?1",
    rusqlite::params![generation],
  )?;

  Ok(RecalcSummary {
    generation,
    subjects: subject_ids.len() as u64,
    comparisons_replayed: comparisons.len() as u64,
    started_at,
    finished_at: Utc::now(),
  })
}

// ─── RatingStore impl ────────────────────────────────────────────────────────

impl RatingStore for SqliteStore {
  type Error = Error;

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn register_subject(&self, id: Uuid) -> Result<Subject> {
    let cfg = self.cfg.clone();
    let now = Utc::now();
    self
      .write_tx(move |conn| {
        if subject_by_id(conn, id)?.is_some() {
          return Err(Error::Core(CoreError::SubjectExists(id)));
        }
        let subject =
          Subject { subject_id: id, active: true, created_at: now };
        insert_subject(conn, &subject)?;
        let generation = active_generation(conn)?;
        put_rating(conn, generation, &SubjectRating::initial(id, &cfg), now)?;
        Ok(subject)
      })
      .await
  }

  async fn deactivate_subject(&self, id: Uuid) -> Result<Subject> {
    self
      .write_tx(move |conn| {
        let mut subject = subject_by_id(conn, id)?
          .ok_or(Error::Core(CoreError::SubjectNotFound(id)))?;
        if subject.active {
          conn.execute(
            "UPDATE subjects SET active = 0 WHERE subject_id = ?1",
            rusqlite::params![encode_uuid(id)],
          )?;
          subject.active = false;
        }
        Ok(subject)
      })
      .await
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<SubjectView>> {
    let cfg = self.cfg.clone();
    self.read(move |conn| subject_view(conn, id, &cfg)).await
  }

  async fn list_subjects(
    &self,
    include_inactive: bool,
  ) -> Result<Vec<SubjectView>> {
    let cfg = self.cfg.clone();
    self
      .read(move |conn| list_subject_views(conn, include_inactive, &cfg))
      .await
  }

  async fn rating_history(
    &self,
    subject_id: Uuid,
  ) -> Result<Vec<RatingHistoryEntry>> {
    self
      .read(move |conn| {
        if subject_by_id(conn, subject_id)?.is_none() {
          return Err(Error::Core(CoreError::SubjectNotFound(subject_id)));
        }
        let generation = active_generation(conn)?;
        let mut stmt = conn.prepare(
          "SELECT subject_id, comparison_id, rating_before, rating_after,
                  recorded_at
           FROM rating_history
           WHERE generation = ?1 AND subject_id = ?2
           ORDER BY recorded_at, rowid",
        )?;
        let raws = stmt
          .query_map(
            rusqlite::params![generation, encode_uuid(subject_id)],
            |row| {
              Ok(RawHistoryEntry {
                subject_id:    row.get(0)?,
                comparison_id: row.get(1)?,
                rating_before: row.get(2)?,
                rating_after:  row.get(3)?,
                recorded_at:   row.get(4)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(RawHistoryEntry::into_entry).collect()
      })
      .await
  }

  // ── Raters ────────────────────────────────────────────────────────────────

  async fn get_rater(&self, id: Uuid) -> Result<Option<Rater>> {
    self.read(move |conn| rater_by_id(conn, id)).await
  }

  async fn list_raters(&self) -> Result<Vec<Rater>> {
    self.read(list_all_raters).await
  }

  async fn set_rater_active(&self, id: Uuid, active: bool) -> Result<Rater> {
    let cfg = self.cfg.clone();
    let now = Utc::now();
    self
      .write_tx(move |conn| {
        let mut rater =
          rater_by_id(conn, id)?.unwrap_or_else(|| Rater::new(id, &cfg, now));
        rater.active = active;
        put_rater(conn, &rater)?;
        Ok(rater)
      })
      .await
  }

  // ── Ingest ────────────────────────────────────────────────────────────────

  async fn record_comparison(
    &self,
    input: NewComparison,
  ) -> Result<Comparison> {
    let cfg = self.cfg.clone();
    let now = Utc::now();
    let comparison_id = Uuid::new_v4();
    self
      .write_tx(move |conn| {
        ingest_production(conn, &input, comparison_id, now, &cfg)
      })
      .await
  }

  async fn record_triplet(
    &self,
    input: NewTriplet,
  ) -> Result<Vec<Comparison>> {
    let cfg = self.cfg.clone();
    let now = Utc::now();
    let ids = [Uuid::new_v4(), Uuid::new_v4()];
    self
      .write_tx(move |conn| {
        let pairs = input.clone().into_pairwise()?;
        pairs
          .iter()
          .zip(ids)
          .map(|(pair, id)| ingest_production(conn, pair, id, now, &cfg))
          .collect()
      })
      .await
  }

  async fn record_gold_answer(
    &self,
    input: NewComparison,
  ) -> Result<GradedAnswer> {
    let cfg = self.cfg.clone();
    let now = Utc::now();
    let comparison_id = Uuid::new_v4();
    self
      .write_tx(move |conn| {
        ingest_gold(conn, &input, comparison_id, now, &cfg)
      })
      .await
  }

  // ── Gold tasks ────────────────────────────────────────────────────────────

  async fn create_gold_task(&self, input: NewGoldTask) -> Result<GoldTask> {
    let now = Utc::now();
    let gold_task_id = Uuid::new_v4();
    self
      .write_tx(move |conn| {
        input.validate()?;
        let task = GoldTask {
          gold_task_id,
          subject_a: input.subject_a,
          subject_b: input.subject_b,
          expected: input.expected,
          difficulty: input.difficulty,
          active: true,
          created_by: input.created_by,
          created_at: now,
        };
        conn.execute(
          "INSERT INTO gold_tasks
             (gold_task_id, subject_a, subject_b, winner, degree,
              difficulty, active, created_by, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            encode_uuid(task.gold_task_id),
            encode_uuid(task.subject_a),
            encode_uuid(task.subject_b),
            i64::from(task.expected.winner_code()),
            i64::from(task.expected.degree_code()),
            encode_difficulty(task.difficulty),
            task.active,
            task.created_by.map(encode_uuid),
            encode_dt(task.created_at),
          ],
        )?;
        warn_gold_misconfiguration(conn, &task)?;
        Ok(task)
      })
      .await
  }

  async fn list_gold_tasks(
    &self,
    include_inactive: bool,
  ) -> Result<Vec<GoldTask>> {
    self
      .read(move |conn| list_gold_task_rows(conn, include_inactive))
      .await
  }

  async fn set_gold_task_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> Result<GoldTask> {
    self
      .write_tx(move |conn| {
        let changed = conn.execute(
          "UPDATE gold_tasks SET active = ?2 WHERE gold_task_id = ?1",
          rusqlite::params![encode_uuid(id), active],
        )?;
        if changed == 0 {
          return Err(Error::Core(CoreError::GoldTaskUnknown(id)));
        }
        gold_task_by_id(conn, id)?
          .ok_or(Error::Core(CoreError::GoldTaskUnknown(id)))
      })
      .await
  }

  // ── Hierarchy and snapshots ───────────────────────────────────────────────

  async fn assemble_hierarchy(&self) -> Result<Hierarchy> {
    let cfg = self.cfg.clone();
    self.read(move |conn| assemble_current(conn, &cfg)).await
  }

  async fn capture_snapshot(
    &self,
    input: NewSnapshot,
  ) -> Result<HierarchySnapshot> {
    let cfg = self.cfg.clone();
    let now = Utc::now();
    let snapshot_id = Uuid::new_v4();
    self
      .write_tx(move |conn| {
        let hierarchy = assemble_current(conn, &cfg)?;
        let snap = HierarchySnapshot {
          snapshot_id,
          name: input.name.clone(),
          description: input.description.clone(),
          created_by: input.created_by,
          hierarchy,
          created_at: now,
        };
        insert_snapshot(conn, &snap)?;
        Ok(snap)
      })
      .await
  }

  async fn get_snapshot(
    &self,
    id: Uuid,
  ) -> Result<Option<HierarchySnapshot>> {
    self.read(move |conn| snapshot_by_id(conn, id)).await
  }

  async fn list_snapshots(&self) -> Result<Vec<SnapshotSummary>> {
    self.read(list_snapshot_summaries).await
  }

  // ── Recalculation ─────────────────────────────────────────────────────────

  async fn recalculate(&self) -> Result<RecalcSummary> {
    let cfg = self.cfg.clone();
    let started_at = Utc::now();
    let summary = self
      .write_tx(move |conn| recalculate_tx(conn, &cfg, started_at))
      .await?;
    tracing::info!(
      generation = summary.generation,
      subjects = summary.subjects,
      comparisons = summary.comparisons_replayed,
      "recalculation complete",
    );
    Ok(summary)
  }
}
