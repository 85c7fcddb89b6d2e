//! In-process registry of recalculation jobs.
//!
//! A recalculation replays the full comparison history and can take a while
//! on a large store, so the API runs it on the runtime and hands the caller
//! a job id to poll. Jobs live for the lifetime of the process; nothing is
//! persisted.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use drover_core::store::{RatingStore, RecalcSummary};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Lifecycle of one recalculation request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecalcState {
  Queued,
  Running,
  Completed { summary: RecalcSummary },
  Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RecalcJob {
  pub job_id:       Uuid,
  #[serde(flatten)]
  pub state:        RecalcState,
  pub requested_at: DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// Shared job table. Cloning is cheap; all clones see the same jobs.
#[derive(Clone, Default)]
pub struct JobRegistry {
  jobs: Arc<Mutex<HashMap<Uuid, RecalcJob>>>,
}

impl JobRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn get(&self, id: Uuid) -> Option<RecalcJob> {
    self.jobs.lock().await.get(&id).cloned()
  }

  async fn set_state(&self, id: Uuid, state: RecalcState) {
    if let Some(job) = self.jobs.lock().await.get_mut(&id) {
      job.state = state;
      job.updated_at = Utc::now();
    }
  }

  /// Register a job and spawn the replay on the runtime. Returns the job
  /// document in its queued state.
  pub async fn spawn<S>(&self, store: Arc<S>) -> RecalcJob
  where
    S: RatingStore + 'static,
  {
    let job_id = Uuid::new_v4();
    let now = Utc::now();
    let job = RecalcJob {
      job_id,
      state: RecalcState::Queued,
      requested_at: now,
      updated_at: now,
    };
    self.jobs.lock().await.insert(job_id, job.clone());

    let registry = self.clone();
    tokio::spawn(async move {
      registry.set_state(job_id, RecalcState::Running).await;
      tracing::info!(job = %job_id, "recalculation started");
      match store.recalculate().await {
        Ok(summary) => {
          registry
            .set_state(job_id, RecalcState::Completed { summary })
            .await;
        }
        Err(e) => {
          let error = e.to_string();
          tracing::warn!(job = %job_id, %error, "recalculation failed");
          registry.set_state(job_id, RecalcState::Failed { error }).await;
        }
      }
    });

    job
  }
}
