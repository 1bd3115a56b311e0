//! Error types for `cadence-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::occurrence::OccurrenceStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("habit not found: {0}")]
  HabitNotFound(Uuid),

  #[error("occurrence not found: {0}")]
  OccurrenceNotFound(Uuid),

  #[error("occurrence {occurrence} does not belong to habit {habit}")]
  InvalidReference { occurrence: Uuid, habit: Uuid },

  #[error("invalid schedule: {0}")]
  InvalidSchedule(String),

  #[error("cannot transition occurrence from {from} to {to}")]
  InvalidTransition {
    from: OccurrenceStatus,
    to:   OccurrenceStatus,
  },

  #[error("unknown time zone: {0:?}")]
  UnknownTimeZone(String),
}

impl Error {
  /// `true` for the "id is unknown" family of errors.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::HabitNotFound(_) | Self::OccurrenceNotFound(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
