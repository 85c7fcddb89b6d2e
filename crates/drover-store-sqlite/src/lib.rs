//! SQLite backend for the Drover rating store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Because every store operation
//! is a single closure on that one connection, operations never interleave:
//! each write transaction sees and leaves a consistent world, which is what
//! makes concurrent submissions against the same subject safe.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
