//! Handlers for `/adventures` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/adventures` | Body: `{"adventureTypeId":"<uuid>"}` |
//! | `GET`  | `/adventures/:id` | Full history, 404 if not found |
//! | `POST` | `/adventures/:id/forth` | Body: `{"choice":"<uuid>"}`, omitted for the first chapter |

use axum::{
  Json,
  body::Bytes,
  extract::{Path, State},
};
use quill_core::{
  Error as CoreError,
  adventure::ChapterWithChoices,
  generator::NarrativeGenerator,
  progression::{OfferedChoice, Step},
  store::AdventureStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, error::ApiError, lenient_body, path_id};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub adventure_type_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Created {
  pub adventure: Uuid,
}

/// `POST /adventures`
pub async fn create<S, G>(
  State(state): State<AppState<S, G>>,
  body: Bytes,
) -> Result<Json<Created>, ApiError>
where
  S: AdventureStore,
  G: NarrativeGenerator,
{
  let body: CreateBody = lenient_body(&body);
  let adventure = state.creation.create(body.adventure_type_id.as_deref()).await?;
  Ok(Json(Created { adventure: adventure.id }))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AdventureView {
  pub id:       Uuid,
  pub active:   bool,
  pub setting:  Option<String>,
  pub chapters: Vec<ChapterView>,
}

#[derive(Debug, Serialize)]
pub struct ChapterView {
  pub number:    u32,
  pub narrative: String,
  pub choices:   Vec<ChoiceView>,
}

#[derive(Debug, Serialize)]
pub struct ChoiceView {
  pub id:     Uuid,
  pub action: String,
  pub chosen: bool,
}

impl From<ChapterWithChoices> for ChapterView {
  fn from(c: ChapterWithChoices) -> Self {
    Self {
      number:    c.chapter.number,
      narrative: c.chapter.narrative,
      choices:   c
        .choices
        .into_iter()
        .map(|ch| ChoiceView { id: ch.id, action: ch.action, chosen: ch.chosen })
        .collect(),
    }
  }
}

/// `GET /adventures/:id`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Path(raw): Path<String>,
) -> Result<Json<AdventureView>, ApiError>
where
  S: AdventureStore,
  G: NarrativeGenerator,
{
  let id = path_id(&raw, "adventure")?;
  let found = state
    .store
    .get_adventure_with_setting(id)
    .await
    .map_err(CoreError::from_store)?
    .ok_or(CoreError::AdventureNotFound(id))?;

  let chapters = state
    .store
    .get_chapters_with_choices(id)
    .await
    .map_err(CoreError::from_store)?;

  Ok(Json(AdventureView {
    id,
    active: found.adventure.active,
    setting: found.setting,
    chapters: chapters.into_iter().map(ChapterView::from).collect(),
  }))
}

// ─── Forth ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ForthBody {
  pub choice: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
  pub chapter_number: u32,
  pub narrative:      String,
  pub choices:        Vec<OfferedChoice>,
}

impl From<Step> for StepView {
  fn from(s: Step) -> Self {
    Self { chapter_number: s.chapter_number, narrative: s.narrative, choices: s.choices }
  }
}

/// `POST /adventures/:id/forth`
pub async fn forth<S, G>(
  State(state): State<AppState<S, G>>,
  Path(raw): Path<String>,
  body: Bytes,
) -> Result<Json<StepView>, ApiError>
where
  S: AdventureStore,
  G: NarrativeGenerator,
{
  let id = path_id(&raw, "adventure")?;
  let body: ForthBody = lenient_body(&body);
  let step = state.progression.advance(id, body.choice.as_deref()).await?;
  Ok(Json(step.into()))
}
