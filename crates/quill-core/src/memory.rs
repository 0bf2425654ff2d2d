//! In-memory [`AdventureStore`] for the flow tests in this crate.

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  adventure::{
    Adventure, AdventureType, AdventureWithSetting, Chapter, ChapterChoice,
    ChapterWithChoices, ChapterWithChosen,
  },
  store::{AdventureStore, NewStep, RecordedStep, StoreError},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("step conflicts with concurrent update")]
  Conflict,
}

impl StoreError for MemoryError {
  fn is_conflict(&self) -> bool { matches!(self, Self::Conflict) }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tables {
  pub types:      Vec<AdventureType>,
  pub adventures: Vec<Adventure>,
  pub chapters:   Vec<Chapter>,
  pub choices:    Vec<ChapterChoice>,
}

#[derive(Default)]
pub struct MemoryStore {
  tables:        Mutex<Tables>,
  fail_conflict: AtomicBool,
}

impl MemoryStore {
  /// A store holding a single adventure type with the given setting.
  pub fn with_type(setting: Option<&str>) -> Arc<Self> {
    let store = Self::default();
    store.tables.lock().unwrap().types.push(AdventureType {
      id:          Uuid::new_v4(),
      description: "test".into(),
      setting:     setting.map(str::to_owned),
    });
    Arc::new(store)
  }

  pub fn type_id(&self) -> Uuid { self.tables.lock().unwrap().types[0].id }

  pub fn new_adventure(&self) -> Uuid {
    let adventure = Adventure {
      id:                Uuid::new_v4(),
      active:            true,
      created_at:        Utc::now(),
      last_modified:     None,
      adventure_type_id: self.type_id(),
    };
    let id = adventure.id;
    self.tables.lock().unwrap().adventures.push(adventure);
    id
  }

  pub fn adventure(&self, id: Uuid) -> Adventure {
    let tables = self.tables.lock().unwrap();
    tables.adventures.iter().find(|a| a.id == id).cloned().unwrap()
  }

  pub fn chapters(&self, adventure_id: Uuid) -> Vec<ChapterWithChoices> {
    let tables = self.tables.lock().unwrap();
    with_choices(&tables, adventure_id)
  }

  pub fn snapshot(&self) -> Tables { self.tables.lock().unwrap().clone() }

  pub fn fail_next_step_with_conflict(&self) {
    self.fail_conflict.store(true, Ordering::SeqCst);
  }
}

fn ordered_chapters(tables: &Tables, adventure_id: Uuid) -> Vec<Chapter> {
  let mut chapters: Vec<Chapter> = tables
    .chapters
    .iter()
    .filter(|c| c.adventure_id == adventure_id)
    .cloned()
    .collect();
  chapters.sort_by_key(|c| c.number);
  chapters
}

fn with_choices(tables: &Tables, adventure_id: Uuid) -> Vec<ChapterWithChoices> {
  ordered_chapters(tables, adventure_id)
    .into_iter()
    .map(|chapter| {
      let choices = tables
        .choices
        .iter()
        .filter(|c| c.chapter_id == chapter.id)
        .cloned()
        .collect();
      ChapterWithChoices { chapter, choices }
    })
    .collect()
}

impl AdventureStore for MemoryStore {
  type Error = MemoryError;

  async fn list_adventure_types(&self) -> Result<Vec<AdventureType>, MemoryError> {
    Ok(self.tables.lock().unwrap().types.clone())
  }

  async fn get_adventure_type(&self, id: Uuid) -> Result<Option<AdventureType>, MemoryError> {
    let tables = self.tables.lock().unwrap();
    Ok(tables.types.iter().find(|t| t.id == id).cloned())
  }

  async fn seed_adventure_type(&self, adventure_type: AdventureType) -> Result<bool, MemoryError> {
    let mut tables = self.tables.lock().unwrap();
    if tables.types.iter().any(|t| t.id == adventure_type.id) {
      return Ok(false);
    }
    tables.types.push(adventure_type);
    Ok(true)
  }

  async fn count_recent_adventures(&self, since: DateTime<Utc>) -> Result<u64, MemoryError> {
    let tables = self.tables.lock().unwrap();
    Ok(tables.adventures.iter().filter(|a| a.created_at >= since).count() as u64)
  }

  async fn create_adventure(&self, adventure_type_id: Uuid) -> Result<Adventure, MemoryError> {
    let adventure = Adventure {
      id: Uuid::new_v4(),
      active: true,
      created_at: Utc::now(),
      last_modified: None,
      adventure_type_id,
    };
    self.tables.lock().unwrap().adventures.push(adventure.clone());
    Ok(adventure)
  }

  async fn get_adventure_with_setting(
    &self,
    id: Uuid,
  ) -> Result<Option<AdventureWithSetting>, MemoryError> {
    let tables = self.tables.lock().unwrap();
    Ok(tables.adventures.iter().find(|a| a.id == id).map(|a| {
      let setting = tables
        .types
        .iter()
        .find(|t| t.id == a.adventure_type_id)
        .and_then(|t| t.setting.clone());
      AdventureWithSetting { adventure: a.clone(), setting }
    }))
  }

  async fn get_latest_chapter(&self, adventure_id: Uuid) -> Result<Option<Chapter>, MemoryError> {
    let tables = self.tables.lock().unwrap();
    Ok(ordered_chapters(&tables, adventure_id).pop())
  }

  async fn get_chapters_with_chosen_choice(
    &self,
    adventure_id: Uuid,
  ) -> Result<Vec<ChapterWithChosen>, MemoryError> {
    let tables = self.tables.lock().unwrap();
    Ok(
      with_choices(&tables, adventure_id)
        .into_iter()
        .map(|c| ChapterWithChosen {
          chosen:  c.choices.into_iter().find(|ch| ch.chosen),
          chapter: c.chapter,
        })
        .collect(),
    )
  }

  async fn get_chapters_with_choices(
    &self,
    adventure_id: Uuid,
  ) -> Result<Vec<ChapterWithChoices>, MemoryError> {
    Ok(self.chapters(adventure_id))
  }

  async fn get_choice(
    &self,
    choice_id: Uuid,
    chapter_id: Uuid,
  ) -> Result<Option<ChapterChoice>, MemoryError> {
    let tables = self.tables.lock().unwrap();
    Ok(
      tables
        .choices
        .iter()
        .find(|c| c.id == choice_id && c.chapter_id == chapter_id)
        .cloned(),
    )
  }

  async fn record_step(&self, step: NewStep) -> Result<RecordedStep, MemoryError> {
    if self.fail_conflict.swap(false, Ordering::SeqCst) {
      return Err(MemoryError::Conflict);
    }

    let mut tables = self.tables.lock().unwrap();
    let chapter = Chapter {
      id:           Uuid::new_v4(),
      adventure_id: step.adventure_id,
      number:       step.number,
      narrative:    step.narrative,
      created_at:   Utc::now(),
    };
    tables.chapters.push(chapter.clone());

    if let Some(chosen) = step.chosen
      && let Some(c) = tables
        .choices
        .iter_mut()
        .find(|c| c.id == chosen.choice_id && c.chapter_id == chosen.chapter_id)
    {
      c.chosen = true;
    }

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
    tables.choices.extend(choices.iter().cloned());

    let concluded = choices.is_empty();
    if concluded
      && let Some(a) = tables.adventures.iter_mut().find(|a| a.id == step.adventure_id)
    {
      a.active = false;
      a.last_modified = Some(Utc::now());
    }

    Ok(RecordedStep { chapter, choices, concluded })
  }
}
