//! Error types for `cadence-engine`.

use thiserror::Error;

/// An error surfaced by an [`crate::Engine`] operation.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] cadence_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The store neither accepted an occurrence nor returned the conflicting
  /// one.
  #[error("occurrence of habit {habit_id} at {scheduled_at} could not be stored")]
  Unstored {
    habit_id:     uuid::Uuid,
    scheduled_at: chrono::DateTime<chrono::Utc>,
  },
}

impl Error {
  /// `true` when the habit or occurrence id was unknown.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_not_found())
  }

  /// `true` when a habit's schedule cannot produce occurrences.
  pub fn is_invalid_schedule(&self) -> bool {
    matches!(self, Self::Core(cadence_core::Error::InvalidSchedule(_)))
  }
}

/// Box a backend error into [`Error::Store`].
pub(crate) fn store<E>(e: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  Error::Store(Box::new(e))
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
