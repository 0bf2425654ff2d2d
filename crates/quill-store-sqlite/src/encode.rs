//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision and a `Z` suffix, so string order is time order. UUIDs are
//! stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use quill_core::adventure::{
  Adventure, AdventureType, AdventureWithSetting, Chapter, ChapterChoice,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision timestamps are stored with.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `adventure_types` row.
pub struct RawAdventureType {
  pub id:          String,
  pub description: String,
  pub setting:     Option<String>,
}

impl RawAdventureType {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      description: row.get(1)?,
      setting:     row.get(2)?,
    })
  }

  pub fn into_adventure_type(self) -> Result<AdventureType> {
    Ok(AdventureType {
      id:          decode_uuid(&self.id)?,
      description: self.description,
      setting:     self.setting,
    })
  }
}

/// Raw strings read from an `adventures` row joined with its type's setting.
pub struct RawAdventure {
  pub id:                String,
  pub active:            bool,
  pub created_at:        String,
  pub last_modified:     Option<String>,
  pub adventure_type_id: String,
  pub setting:           Option<String>,
}

impl RawAdventure {
  pub fn into_with_setting(self) -> Result<AdventureWithSetting> {
    Ok(AdventureWithSetting {
      adventure: Adventure {
        id:                decode_uuid(&self.id)?,
        active:            self.active,
        created_at:        decode_dt(&self.created_at)?,
        last_modified:     self.last_modified.as_deref().map(decode_dt).transpose()?,
        adventure_type_id: decode_uuid(&self.adventure_type_id)?,
      },
      setting:   self.setting,
    })
  }
}

/// Raw strings read directly from a `chapters` row.
pub struct RawChapter {
  pub id:           String,
  pub adventure_id: String,
  pub number:       u32,
  pub narrative:    String,
  pub created_at:   String,
}

impl RawChapter {
  /// Read the five chapter columns starting at `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(offset)?,
      adventure_id: row.get(offset + 1)?,
      number:       row.get(offset + 2)?,
      narrative:    row.get(offset + 3)?,
      created_at:   row.get(offset + 4)?,
    })
  }

  pub fn into_chapter(self) -> Result<Chapter> {
    Ok(Chapter {
      id:           decode_uuid(&self.id)?,
      adventure_id: decode_uuid(&self.adventure_id)?,
      number:       self.number,
      narrative:    self.narrative,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `chapter_choices` row.
pub struct RawChoice {
  pub id:         String,
  pub chapter_id: String,
  pub action:     String,
  pub chosen:     bool,
}

impl RawChoice {
  /// Read the four choice columns starting at `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(offset)?,
      chapter_id: row.get(offset + 1)?,
      action:     row.get(offset + 2)?,
      chosen:     row.get(offset + 3)?,
    })
  }

  /// Like [`from_row`](Self::from_row), for a LEFT JOIN that may be all NULL.
  pub fn from_optional_row(
    row: &rusqlite::Row<'_>,
    offset: usize,
  ) -> rusqlite::Result<Option<Self>> {
    let id: Option<String> = row.get(offset)?;
    match id {
      Some(_) => Self::from_row(row, offset).map(Some),
      None => Ok(None),
    }
  }

  pub fn into_choice(self) -> Result<ChapterChoice> {
    Ok(ChapterChoice {
      id:         decode_uuid(&self.id)?,
      chapter_id: decode_uuid(&self.chapter_id)?,
      action:     self.action,
      chosen:     self.chosen,
    })
  }
}
