//! Error types for `quill-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{generator::GenerationError, store::StoreError};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid adventure type")]
  InvalidAdventureType,

  #[error("adventure creation limit reached, retry after {retry_after_secs}s")]
  RateLimited { retry_after_secs: u64 },

  #[error("adventure not found: {0}")]
  AdventureNotFound(Uuid),

  #[error("adventure {0} has concluded")]
  AdventureConcluded(Uuid),

  #[error("a choice is required to advance past chapter {0}")]
  ChoiceRequired(u32),

  #[error("choice not found: {0}")]
  ChoiceNotFound(String),

  #[error("generation failed: {0}")]
  GenerationFailed(#[from] GenerationError),

  /// The store rejected a write because the adventure moved on underneath
  /// this request.
  #[error("conflicting update: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error, promoting lost races to [`Error::Conflict`].
  pub fn from_store<E: StoreError>(e: E) -> Self {
    if e.is_conflict() {
      Self::Conflict(e.to_string())
    } else {
      Self::Store(Box::new(e))
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
