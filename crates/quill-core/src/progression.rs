//! Progression state machine: advance an adventure by one chapter.
//!
//! An adventure is `new` (no chapters), `active` (at least one chapter,
//! choices remain) or `concluded` (`active == false`). Each successful
//! [`Progression::advance`] appends exactly one chapter; a step whose
//! generated chapter offers no choices concludes the adventure, and nothing
//! leaves `concluded`.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  adventure::{Chapter, ChapterChoice},
  generator::NarrativeGenerator,
  prompt::{self, CurrentChoice, PromptContext},
  store::{AdventureStore, ChosenRef, NewStep},
};

/// Story-shape settings shared by every adventure.
#[derive(Debug, Clone, Copy)]
pub struct StorySettings {
  pub max_chapters:     u32,
  pub choices_per_step: u32,
}

/// A choice offered by a freshly generated chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfferedChoice {
  pub id:     Uuid,
  pub action: String,
}

impl From<ChapterChoice> for OfferedChoice {
  fn from(c: ChapterChoice) -> Self { Self { id: c.id, action: c.action } }
}

/// The outcome of one successful step.
#[derive(Debug, Clone)]
pub struct Step {
  pub chapter_number: u32,
  pub narrative:      String,
  pub choices:        Vec<OfferedChoice>,
  /// `true` if this step ended the adventure.
  pub concluded:      bool,
}

pub struct Progression<S, G> {
  store:     Arc<S>,
  generator: G,
  settings:  StorySettings,
}

impl<S, G> Progression<S, G>
where
  S: AdventureStore,
  G: NarrativeGenerator,
{
  pub fn new(store: Arc<S>, generator: G, settings: StorySettings) -> Self {
    Self { store, generator, settings }
  }

  /// Advance `adventure_id` by one chapter, taking `choice` from the latest
  /// chapter.
  ///
  /// Every validation failure is detected before anything is written. A
  /// generation failure also writes nothing. The writes themselves go through
  /// a single [`AdventureStore::record_step`] call.
  ///
  /// Not idempotent: a retried call that succeeds appends another chapter.
  pub async fn advance(&self, adventure_id: Uuid, choice: Option<&str>) -> Result<Step> {
    let found = self
      .store
      .get_adventure_with_setting(adventure_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::AdventureNotFound(adventure_id))?;
    if !found.adventure.active {
      return Err(Error::AdventureConcluded(adventure_id));
    }

    let latest = self
      .store
      .get_latest_chapter(adventure_id)
      .await
      .map_err(Error::from_store)?;

    // The first step never takes a choice; anything supplied is ignored.
    let current = match &latest {
      Some(chapter) => Some(self.resolve_choice(chapter, choice).await?),
      None => None,
    };

    let history = self
      .store
      .get_chapters_with_chosen_choice(adventure_id)
      .await
      .map_err(Error::from_store)?;

    let conversation = prompt::assemble(&PromptContext {
      setting:          found.setting.as_deref(),
      max_chapters:     self.settings.max_chapters,
      choices_per_step: self.settings.choices_per_step,
      history:          &history,
      current:          current.as_ref().map(|(chapter, choice)| CurrentChoice {
        chapter_number: chapter.number,
        action:         &choice.action,
      }),
    });

    let generated = match self.generator.generate(&conversation).await {
      Ok(g) => g.validate()?,
      Err(e) => {
        tracing::error!(adventure = %adventure_id, error = %e, "narrative generation failed");
        return Err(e.into());
      }
    };

    let number = u32::try_from(history.len())
      .map_err(|_| Error::Conflict("chapter count overflow".into()))?
      + 1;

    let recorded = self
      .store
      .record_step(NewStep {
        adventure_id,
        number,
        narrative: generated.narrative,
        chosen: current.map(|(chapter, choice)| ChosenRef {
          choice_id:  choice.id,
          chapter_id: chapter.id,
        }),
        actions: generated.options,
      })
      .await
      .map_err(Error::from_store)?;

    if recorded.concluded {
      tracing::info!(adventure = %adventure_id, chapter = number, "adventure concluded");
    } else {
      tracing::debug!(
        adventure = %adventure_id,
        chapter = number,
        choices = recorded.choices.len(),
        "adventure advanced"
      );
    }

    Ok(Step {
      chapter_number: recorded.chapter.number,
      narrative:      recorded.chapter.narrative,
      choices:        recorded.choices.into_iter().map(OfferedChoice::from).collect(),
      concluded:      recorded.concluded,
    })
  }

  /// Check that `choice` names a choice offered by `latest`.
  async fn resolve_choice(
    &self,
    latest: &Chapter,
    choice: Option<&str>,
  ) -> Result<(Chapter, ChapterChoice)> {
    let raw = choice.ok_or(Error::ChoiceRequired(latest.number))?;
    let not_found = || Error::ChoiceNotFound(raw.to_owned());

    let choice_id = Uuid::parse_str(raw).map_err(|_| not_found())?;
    let choice = self
      .store
      .get_choice(choice_id, latest.id)
      .await
      .map_err(Error::from_store)?
      .ok_or_else(not_found)?;

    Ok((latest.clone(), choice))
  }
}
