//! Error type for `quill-store-sqlite`.

use quill_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("adventure not found: {0}")]
  AdventureNotFound(uuid::Uuid),

  /// The adventure was concluded by another request.
  #[error("adventure {0} is no longer active")]
  AdventureConcluded(uuid::Uuid),

  /// Another request already appended a chapter.
  #[error("chapter {number} is out of sequence; expected {expected}")]
  ChapterOutOfSequence { number: u32, expected: u32 },

  /// The choice is missing from its chapter or was already chosen.
  #[error("choice {0} is not available")]
  ChoiceUnavailable(uuid::Uuid),
}

impl StoreError for Error {
  fn is_conflict(&self) -> bool {
    matches!(
      self,
      Self::AdventureConcluded(_)
        | Self::ChapterOutOfSequence { .. }
        | Self::ChoiceUnavailable(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
