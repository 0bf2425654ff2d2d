//! [`SqliteStore`]: the SQLite implementation of [`AdventureStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use quill_core::{
  adventure::{
    Adventure, AdventureType, AdventureWithSetting, Chapter, ChapterChoice,
    ChapterWithChoices, ChapterWithChosen,
  },
  store::{AdventureStore, NewStep, RecordedStep},
};

use crate::{
  Error, Result,
  encode::{
    RawAdventure, RawAdventureType, RawChapter, RawChoice, encode_dt, encode_uuid, now,
  },
  schema::SCHEMA,
};

const CHAPTER_COLUMNS: &str = "c.id, c.adventure_id, c.number, c.narrative, c.created_at";
const CHOICE_COLUMNS: &str = "cc.id, cc.chapter_id, cc.action, cc.chosen";

/// Why a step was refused inside its transaction.
enum StepRejection {
  AdventureMissing,
  AdventureConcluded,
  OutOfSequence { expected: u32 },
  ChoiceUnavailable(Uuid),
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Quill adventure store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run one raw statement, bypassing the store's guards.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<usize> {
    let n = self.conn.call(move |conn| Ok(conn.execute(sql, [])?)).await?;
    Ok(n)
  }

  /// Chapters of `adventure_id` in ascending order, each with every choice.
  async fn chapters_with_all_choices(
    &self,
    adventure_id: Uuid,
  ) -> Result<Vec<(RawChapter, Vec<RawChoice>)>> {
    let id_str = encode_uuid(adventure_id);

    let (chapters, choices) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CHAPTER_COLUMNS} FROM chapters c
           WHERE c.adventure_id = ?1
           ORDER BY c.number ASC"
        ))?;
        let chapters = stmt
          .query_map(rusqlite::params![id_str], |row| RawChapter::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {CHOICE_COLUMNS} FROM chapter_choices cc
           JOIN chapters c ON c.id = cc.chapter_id
           WHERE c.adventure_id = ?1
           ORDER BY c.number ASC, cc.position ASC"
        ))?;
        let choices = stmt
          .query_map(rusqlite::params![id_str], |row| RawChoice::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((chapters, choices))
      })
      .await?;

    let mut grouped: Vec<(RawChapter, Vec<RawChoice>)> =
      chapters.into_iter().map(|c| (c, Vec::new())).collect();
    for choice in choices {
      if let Some((_, list)) = grouped.iter_mut().find(|(c, _)| c.id == choice.chapter_id) {
        list.push(choice);
      }
    }
    Ok(grouped)
  }
}

// ─── AdventureStore impl ─────────────────────────────────────────────────────

impl AdventureStore for SqliteStore {
  type Error = Error;

  // ── Adventure types ───────────────────────────────────────────────────────

  async fn list_adventure_types(&self) -> Result<Vec<AdventureType>> {
    let raws: Vec<RawAdventureType> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, description, setting FROM adventure_types ORDER BY description",
        )?;
        let rows = stmt
          .query_map([], RawAdventureType::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAdventureType::into_adventure_type).collect()
  }

  async fn get_adventure_type(&self, id: Uuid) -> Result<Option<AdventureType>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAdventureType> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, description, setting FROM adventure_types WHERE id = ?1",
              rusqlite::params![id_str],
              RawAdventureType::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAdventureType::into_adventure_type).transpose()
  }

  async fn seed_adventure_type(&self, adventure_type: AdventureType) -> Result<bool> {
    let id_str = encode_uuid(adventure_type.id);

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO adventure_types (id, description, setting)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, adventure_type.description, adventure_type.setting],
        )?;
        Ok(n == 1)
      })
      .await?;

    Ok(inserted)
  }

  // ── Adventures ────────────────────────────────────────────────────────────

  async fn count_recent_adventures(&self, since: DateTime<Utc>) -> Result<u64> {
    let since_str = encode_dt(since);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM adventures WHERE created_at >= ?1",
          rusqlite::params![since_str],
          |r| r.get(0),
        )?)
      })
      .await?;

    Ok(u64::try_from(count).unwrap_or_default())
  }

  async fn create_adventure(&self, adventure_type_id: Uuid) -> Result<Adventure> {
    let adventure = Adventure {
      id: Uuid::new_v4(),
      active: true,
      created_at: now(),
      last_modified: None,
      adventure_type_id,
    };

    let id_str   = encode_uuid(adventure.id);
    let at_str   = encode_dt(adventure.created_at);
    let type_str = encode_uuid(adventure_type_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO adventures (id, active, created_at, adventure_type_id)
           VALUES (?1, 1, ?2, ?3)",
          rusqlite::params![id_str, at_str, type_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(adventure)
  }

  async fn get_adventure_with_setting(&self, id: Uuid) -> Result<Option<AdventureWithSetting>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawAdventure> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT a.id, a.active, a.created_at, a.last_modified,
                      a.adventure_type_id, t.setting
               FROM adventures a
               JOIN adventure_types t ON t.id = a.adventure_type_id
               WHERE a.id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawAdventure {
                  id:                row.get(0)?,
                  active:            row.get(1)?,
                  created_at:        row.get(2)?,
                  last_modified:     row.get(3)?,
                  adventure_type_id: row.get(4)?,
                  setting:           row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAdventure::into_with_setting).transpose()
  }

  // ── Chapters ──────────────────────────────────────────────────────────────

  async fn get_latest_chapter(&self, adventure_id: Uuid) -> Result<Option<Chapter>> {
    let id_str = encode_uuid(adventure_id);

    let raw: Option<RawChapter> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CHAPTER_COLUMNS} FROM chapters c
                 WHERE c.adventure_id = ?1
                 ORDER BY c.number DESC
                 LIMIT 1"
              ),
              rusqlite::params![id_str],
              |row| RawChapter::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawChapter::into_chapter).transpose()
  }

  async fn get_chapters_with_chosen_choice(
    &self,
    adventure_id: Uuid,
  ) -> Result<Vec<ChapterWithChosen>> {
    let id_str = encode_uuid(adventure_id);

    let raws: Vec<(RawChapter, Option<RawChoice>)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CHAPTER_COLUMNS}, {CHOICE_COLUMNS}
           FROM chapters c
           LEFT JOIN chapter_choices cc
             ON cc.chapter_id = c.id AND cc.chosen = 1
           WHERE c.adventure_id = ?1
           ORDER BY c.number ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok((RawChapter::from_row(row, 0)?, RawChoice::from_optional_row(row, 5)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(chapter, chosen)| {
        Ok(ChapterWithChosen {
          chapter: chapter.into_chapter()?,
          chosen:  chosen.map(RawChoice::into_choice).transpose()?,
        })
      })
      .collect()
  }

  async fn get_chapters_with_choices(
    &self,
    adventure_id: Uuid,
  ) -> Result<Vec<ChapterWithChoices>> {
    self
      .chapters_with_all_choices(adventure_id)
      .await?
      .into_iter()
      .map(|(chapter, choices)| {
        Ok(ChapterWithChoices {
          chapter: chapter.into_chapter()?,
          choices: choices
            .into_iter()
            .map(RawChoice::into_choice)
            .collect::<Result<_>>()?,
        })
      })
      .collect()
  }

  // ── Choices ───────────────────────────────────────────────────────────────

  async fn get_choice(&self, choice_id: Uuid, chapter_id: Uuid) -> Result<Option<ChapterChoice>> {
    let choice_str  = encode_uuid(choice_id);
    let chapter_str = encode_uuid(chapter_id);

    let raw: Option<RawChoice> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CHOICE_COLUMNS} FROM chapter_choices cc
                 WHERE cc.id = ?1 AND cc.chapter_id = ?2"
              ),
              rusqlite::params![choice_str, chapter_str],
              |row| RawChoice::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawChoice::into_choice).transpose()
  }

  // ── Steps ─────────────────────────────────────────────────────────────────

  async fn record_step(&self, step: NewStep) -> Result<RecordedStep> {
    let now = now();
    let chapter = Chapter {
      id:           Uuid::new_v4(),
      adventure_id: step.adventure_id,
      number:       step.number,
      narrative:    step.narrative,
      created_at:   now,
    };
    let choices: Vec<ChapterChoice> = step
      .actions
      .into_iter()
      .map(|action| ChapterChoice {
        id: Uuid::new_v4(),
        chapter_id: chapter.id,
        action,
        chosen: false,
      })
      .collect();
    let concluded = choices.is_empty();

    let adventure_str = encode_uuid(step.adventure_id);
    let chapter_str   = encode_uuid(chapter.id);
    let number        = chapter.number;
    let narrative     = chapter.narrative.clone();
    let now_str       = encode_dt(now);
    let chosen        = step
      .chosen
      .map(|c| (c.choice_id, encode_uuid(c.choice_id), encode_uuid(c.chapter_id)));
    let choice_rows: Vec<(String, String)> = choices
      .iter()
      .map(|c| (encode_uuid(c.id), c.action.clone()))
      .collect();

    // Returning early drops `tx`, which rolls the transaction back.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let active: Option<bool> = tx
          .query_row(
            "SELECT active FROM adventures WHERE id = ?1",
            rusqlite::params![adventure_str],
            |r| r.get(0),
          )
          .optional()?;
        match active {
          None => return Ok(Err(StepRejection::AdventureMissing)),
          Some(false) => return Ok(Err(StepRejection::AdventureConcluded)),
          Some(true) => {}
        }

        let latest: u32 = tx.query_row(
          "SELECT COALESCE(MAX(number), 0) FROM chapters WHERE adventure_id = ?1",
          rusqlite::params![adventure_str],
          |r| r.get(0),
        )?;
        if number != latest + 1 {
          return Ok(Err(StepRejection::OutOfSequence { expected: latest + 1 }));
        }

        tx.execute(
          "INSERT INTO chapters (id, adventure_id, number, narrative, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![chapter_str, adventure_str, number, narrative, now_str],
        )?;

        if let Some((choice_id, choice_str, owner_str)) = chosen {
          let updated = tx.execute(
            "UPDATE chapter_choices SET chosen = 1
             WHERE id = ?1 AND chapter_id = ?2 AND chosen = 0",
            rusqlite::params![choice_str, owner_str],
          )?;
          if updated != 1 {
            return Ok(Err(StepRejection::ChoiceUnavailable(choice_id)));
          }
        }

        {
          let mut insert = tx.prepare(
            "INSERT INTO chapter_choices (id, chapter_id, position, action, chosen)
             VALUES (?1, ?2, ?3, ?4, 0)",
          )?;
          for (position, (id_str, action)) in choice_rows.iter().enumerate() {
            insert.execute(rusqlite::params![id_str, chapter_str, position as i64, action])?;
          }
        }

        if choice_rows.is_empty() {
          tx.execute(
            "UPDATE adventures SET active = 0, last_modified = ?2
             WHERE id = ?1 AND active = 1",
            rusqlite::params![adventure_str, now_str],
          )?;
        }

        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    match outcome {
      Ok(()) => {}
      Err(StepRejection::AdventureMissing) => {
        return Err(Error::AdventureNotFound(step.adventure_id));
      }
      Err(StepRejection::AdventureConcluded) => {
        return Err(Error::AdventureConcluded(step.adventure_id));
      }
      Err(StepRejection::OutOfSequence { expected }) => {
        tracing::warn!(adventure = %step.adventure_id, number, expected, "step lost a race");
        return Err(Error::ChapterOutOfSequence { number, expected });
      }
      Err(StepRejection::ChoiceUnavailable(id)) => {
        return Err(Error::ChoiceUnavailable(id));
      }
    }

    Ok(RecordedStep { chapter, choices, concluded })
  }
}
