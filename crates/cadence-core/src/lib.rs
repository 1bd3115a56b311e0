//! Core types and pure scheduling logic for the Cadence habit engine.
//!
//! This crate is deliberately free of database, logging and runtime
//! dependencies. It owns the domain model, the recurrence calculator and the
//! [`store::HabitStore`] abstraction that storage backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod error;
pub mod habit;
pub mod occurrence;
pub mod recurrence;
pub mod schedule;
pub mod sleep;
pub mod store;

pub use error::{Error, Result};
