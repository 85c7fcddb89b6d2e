//! JSON REST API for Drover.
//!
//! Exposes an axum [`Router`] backed by any [`drover_core::store::RatingStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(drover_api::api_router(store.clone()))
//! ```

pub mod comparisons;
pub mod error;
pub mod gold_tasks;
pub mod hierarchy;
pub mod jobs;
pub mod raters;
pub mod recalculations;
pub mod snapshots;
pub mod subjects;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use drover_core::store::RatingStore;

pub use error::ApiError;
pub use jobs::{JobRegistry, RecalcJob, RecalcState};

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct ApiState<S> {
  pub store: Arc<S>,
  pub jobs:  JobRegistry,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), jobs: self.jobs.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type. Each call owns a fresh recalculation job registry.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RatingStore + 'static,
{
  let state = ApiState { store, jobs: JobRegistry::new() };
  Router::new()
    // Ingest
    .route("/comparisons", post(comparisons::create::<S>))
    .route("/comparisons/triplet", post(comparisons::create_triplet::<S>))
    // Subjects
    .route("/subjects", get(subjects::list::<S>).post(subjects::create::<S>))
    .route("/subjects/{id}", get(subjects::get_one::<S>))
    .route("/subjects/{id}/deactivate", post(subjects::deactivate::<S>))
    .route("/subjects/{id}/history", get(subjects::history::<S>))
    // Raters
    .route("/raters", get(raters::list::<S>))
    .route("/raters/{id}", get(raters::get_one::<S>))
    .route("/raters/{id}/active", post(raters::set_active::<S>))
    // Gold tasks
    .route(
      "/gold-tasks",
      get(gold_tasks::list::<S>).post(gold_tasks::create::<S>),
    )
    .route("/gold-tasks/{id}/deactivate", post(gold_tasks::deactivate::<S>))
    // Hierarchy and snapshots
    .route("/hierarchy", get(hierarchy::get_current::<S>))
    .route(
      "/snapshots",
      get(snapshots::list::<S>).post(snapshots::create::<S>),
    )
    .route("/snapshots/{id}", get(snapshots::get_one::<S>))
    // Recalculation jobs
    .route("/recalculations", post(recalculations::start::<S>))
    .route("/recalculations/{id}", get(recalculations::get_one::<S>))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
