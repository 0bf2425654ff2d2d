//! Handlers for the read-only `/adventure-types` catalog.

use axum::{
  Json,
  extract::{Path, State},
};
use quill_core::{
  Error as CoreError,
  adventure::AdventureType,
  generator::NarrativeGenerator,
  store::AdventureStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, error::ApiError, path_id};

/// Public view of a type; the setting stays server-side.
#[derive(Debug, Serialize)]
pub struct AdventureTypeView {
  pub id:          Uuid,
  pub description: String,
}

impl From<AdventureType> for AdventureTypeView {
  fn from(t: AdventureType) -> Self { Self { id: t.id, description: t.description } }
}

/// `GET /adventure-types`
pub async fn list<S, G>(
  State(state): State<AppState<S, G>>,
) -> Result<Json<Vec<AdventureTypeView>>, ApiError>
where
  S: AdventureStore,
  G: NarrativeGenerator,
{
  let types = state
    .store
    .list_adventure_types()
    .await
    .map_err(CoreError::from_store)?;
  Ok(Json(types.into_iter().map(Into::into).collect()))
}

/// `GET /adventure-types/:id`
pub async fn get_one<S, G>(
  State(state): State<AppState<S, G>>,
  Path(raw): Path<String>,
) -> Result<Json<AdventureTypeView>, ApiError>
where
  S: AdventureStore,
  G: NarrativeGenerator,
{
  let id = path_id(&raw, "adventure type")?;
  let found = state
    .store
    .get_adventure_type(id)
    .await
    .map_err(CoreError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("adventure type {id} not found")))?;
  Ok(Json(found.into()))
}
