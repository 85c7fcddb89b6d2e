//! Core types, rating mathematics, and trait definitions for the Drover
//! severity-ranking engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod comparison;
pub mod config;
pub mod error;
pub mod gold;
pub mod hierarchy;
pub mod rater;
pub mod rating;
pub mod score;
pub mod snapshot;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
