//! Adventure entities.
//!
//! An [`Adventure`] owns its [`Chapter`]s, and each chapter owns the
//! [`ChapterChoice`]s it offers. [`AdventureType`]s are a read-only catalog
//! that adventures reference.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reusable template adventures are created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdventureType {
  pub id:          Uuid,
  pub description: String,
  /// Narrative setting. `None` lets the generator pick one at random.
  pub setting:     Option<String>,
}

/// One play-through.
///
/// `active` flips from `true` to `false` exactly once, when a step produces
/// no further choices. `last_modified` is stamped by that same update and is
/// otherwise `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adventure {
  pub id:                Uuid,
  pub active:            bool,
  pub created_at:        DateTime<Utc>,
  pub last_modified:     Option<DateTime<Utc>>,
  pub adventure_type_id: Uuid,
}

/// An adventure joined with its type's setting.
#[derive(Debug, Clone)]
pub struct AdventureWithSetting {
  pub adventure: Adventure,
  pub setting:   Option<String>,
}

/// One generated narrative beat. Numbers start at 1 and are contiguous per
/// adventure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
  pub id:           Uuid,
  pub adventure_id: Uuid,
  pub number:       u32,
  pub narrative:    String,
  pub created_at:   DateTime<Utc>,
}

/// One selectable action offered at the end of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterChoice {
  pub id:         Uuid,
  pub chapter_id: Uuid,
  pub action:     String,
  pub chosen:     bool,
}

/// A chapter paired with the choice taken from it, if any.
#[derive(Debug, Clone)]
pub struct ChapterWithChosen {
  pub chapter: Chapter,
  pub chosen:  Option<ChapterChoice>,
}

/// A chapter with every choice it offered, in offer order.
#[derive(Debug, Clone)]
pub struct ChapterWithChoices {
  pub chapter: Chapter,
  pub choices: Vec<ChapterChoice>,
}
