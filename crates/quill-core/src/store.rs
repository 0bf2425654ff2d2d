//! The `AdventureStore` trait and supporting write types.
//!
//! The trait is implemented by storage backends (e.g. `quill-store-sqlite`).
//! The flows in this crate and the HTTP layer depend on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::adventure::{
  Adventure, AdventureType, AdventureWithSetting, Chapter, ChapterChoice,
  ChapterWithChoices, ChapterWithChosen,
};

// ─── Write types ─────────────────────────────────────────────────────────────

/// Everything one progression step writes, applied by
/// [`AdventureStore::record_step`] as a single unit.
#[derive(Debug, Clone)]
pub struct NewStep {
  pub adventure_id: Uuid,
  /// Sequence number of the new chapter.
  pub number:       u32,
  pub narrative:    String,
  /// The choice taken from the previous chapter; marked chosen.
  pub chosen:       Option<ChosenRef>,
  /// Actions offered by the new chapter. Empty concludes the adventure.
  pub actions:      Vec<String>,
}

/// Identifies a choice together with the chapter that must own it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChosenRef {
  pub choice_id:  Uuid,
  pub chapter_id: Uuid,
}

/// The rows written by [`AdventureStore::record_step`].
#[derive(Debug, Clone)]
pub struct RecordedStep {
  pub chapter:   Chapter,
  pub choices:   Vec<ChapterChoice>,
  /// `true` if the step deactivated the adventure.
  pub concluded: bool,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Bound on backend error types.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// Whether the error means a guarded write lost a race against another
  /// request (chapter number taken, choice already chosen, adventure already
  /// concluded).
  fn is_conflict(&self) -> bool { false }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Quill persistence backend.
///
/// Chapters are never updated or deleted. The only mutations are a choice's
/// `chosen` flag (false to true, once) and an adventure's `active` flag (true
/// to false, once), both issued through [`record_step`](Self::record_step).
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AdventureStore: Send + Sync {
  type Error: StoreError;

  // ── Adventure types ───────────────────────────────────────────────────

  /// List the whole adventure-type catalog.
  fn list_adventure_types(
    &self,
  ) -> impl Future<Output = Result<Vec<AdventureType>, Self::Error>> + Send + '_;

  /// Retrieve an adventure type by UUID. Returns `None` if not found.
  fn get_adventure_type(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AdventureType>, Self::Error>> + Send + '_;

  /// Insert a catalog entry unless one with the same id exists. Returns
  /// `true` if a row was inserted.
  fn seed_adventure_type(
    &self,
    adventure_type: AdventureType,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Adventures ────────────────────────────────────────────────────────

  /// Count adventures created at or after `since`.
  fn count_recent_adventures(
    &self,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Create and persist an active adventure of the given type.
  fn create_adventure(
    &self,
    adventure_type_id: Uuid,
  ) -> impl Future<Output = Result<Adventure, Self::Error>> + Send + '_;

  /// Retrieve an adventure joined with its type's setting.
  fn get_adventure_with_setting(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<AdventureWithSetting>, Self::Error>>
  + Send
  + '_;

  // ── Chapters ──────────────────────────────────────────────────────────

  /// The chapter with the highest number, or `None` before the first step.
  fn get_latest_chapter(
    &self,
    adventure_id: Uuid,
  ) -> impl Future<Output = Result<Option<Chapter>, Self::Error>> + Send + '_;

  /// All chapters in ascending order, each with its chosen choice.
  fn get_chapters_with_chosen_choice(
    &self,
    adventure_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ChapterWithChosen>, Self::Error>> + Send + '_;

  /// All chapters in ascending order, each with every choice it offered.
  fn get_chapters_with_choices(
    &self,
    adventure_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ChapterWithChoices>, Self::Error>> + Send + '_;

  // ── Choices ───────────────────────────────────────────────────────────

  /// Retrieve a choice only if it belongs to `chapter_id`.
  fn get_choice(
    &self,
    choice_id: Uuid,
    chapter_id: Uuid,
  ) -> impl Future<Output = Result<Option<ChapterChoice>, Self::Error>> + Send + '_;

  // ── Steps ─────────────────────────────────────────────────────────────

  /// Atomically create the chapter, mark the previous choice chosen, create
  /// the offered choices, and deactivate the adventure if none were offered.
  ///
  /// Nothing is written if any part fails. Backends report a lost race
  /// through [`StoreError::is_conflict`].
  fn record_step(
    &self,
    step: NewStep,
  ) -> impl Future<Output = Result<RecordedStep, Self::Error>> + Send + '_;
}
