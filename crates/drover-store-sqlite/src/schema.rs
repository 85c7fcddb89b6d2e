//! SQL schema for the Drover SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

-- Single-row settings; 'active_generation' names the live ratings.
CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
INSERT OR IGNORE INTO meta (key, value) VALUES ('active_generation', '1');

CREATE TABLE IF NOT EXISTS subjects (
    subject_id TEXT PRIMARY KEY,
    active     INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS raters (
    rater_id          TEXT PRIMARY KEY,
    active            INTEGER NOT NULL DEFAULT 1,
    total_comparisons INTEGER NOT NULL DEFAULT 0,
    gold_attempts     INTEGER NOT NULL DEFAULT 0,
    gold_correct      INTEGER NOT NULL DEFAULT 0,
    agreement_rate    REAL,             -- NULL until the first shared pair
    agreement_pairs   INTEGER NOT NULL DEFAULT 0,
    since_agreement   INTEGER NOT NULL DEFAULT 0,
    weight            REAL NOT NULL,
    tier              TEXT NOT NULL DEFAULT 'bronze',
    created_at        TEXT NOT NULL,
    last_activity     TEXT
);

-- Comparisons are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
-- Subject columns carry no foreign key: diagnostic rows may reference
-- gold-task pairs that were never registered as subjects.
CREATE TABLE IF NOT EXISTS comparisons (
    comparison_id TEXT PRIMARY KEY,
    subject_a     TEXT NOT NULL,
    subject_b     TEXT NOT NULL,
    winner        INTEGER NOT NULL,    -- 0 tie, 1 subject_a, 2 subject_b
    degree        INTEGER NOT NULL,    -- 0 when tie, else 1..3
    rater_id      TEXT NOT NULL REFERENCES raters(rater_id),
    rater_weight  REAL NOT NULL,       -- snapshotted at submission
    kind          TEXT NOT NULL,       -- 'production' | 'diagnostic'
    submitted_at  TEXT NOT NULL,
    CHECK (subject_a != subject_b)
);

CREATE TABLE IF NOT EXISTS gold_tasks (
    gold_task_id TEXT PRIMARY KEY,
    subject_a    TEXT NOT NULL,
    subject_b    TEXT NOT NULL,
    winner       INTEGER NOT NULL,
    degree       INTEGER NOT NULL,
    difficulty   TEXT NOT NULL DEFAULT 'medium',
    active       INTEGER NOT NULL DEFAULT 1,
    created_by   TEXT,
    created_at   TEXT NOT NULL,
    CHECK (subject_a != subject_b)
);

-- Rating state keyed by generation; recalculation writes a fresh generation
-- and flips the meta pointer, so readers never see a half-replayed world.
CREATE TABLE IF NOT EXISTS ratings (
    generation  INTEGER NOT NULL,
    subject_id  TEXT NOT NULL REFERENCES subjects(subject_id),
    rating      REAL NOT NULL,
    uncertainty REAL NOT NULL,
    wins        INTEGER NOT NULL DEFAULT 0,
    losses      INTEGER NOT NULL DEFAULT 0,
    ties        INTEGER NOT NULL DEFAULT 0,
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (generation, subject_id)
);

CREATE TABLE IF NOT EXISTS rating_history (
    generation    INTEGER NOT NULL,
    subject_id    TEXT NOT NULL REFERENCES subjects(subject_id),
    comparison_id TEXT NOT NULL REFERENCES comparisons(comparison_id),
    rating_before REAL NOT NULL,
    rating_after  REAL NOT NULL,
    recorded_at   TEXT NOT NULL
);

-- Snapshots never mutate after creation.
CREATE TABLE IF NOT EXISTS snapshots (
    snapshot_id    TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    description    TEXT,
    created_by     TEXT,
    subjects       INTEGER NOT NULL,  -- entry count, for cheap listing
    hierarchy_json TEXT NOT NULL,     -- serialised Hierarchy
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS comparisons_order_idx
    ON comparisons(submitted_at, comparison_id);
CREATE INDEX IF NOT EXISTS comparisons_rater_idx ON comparisons(rater_id);
CREATE INDEX IF NOT EXISTS gold_tasks_pair_idx   ON gold_tasks(subject_a, subject_b);
CREATE INDEX IF NOT EXISTS history_subject_idx   ON rating_history(generation, subject_id);

PRAGMA user_version = 1;
";
