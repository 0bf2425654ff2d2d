//! Composition root for the Quill server: configuration, generator selection,
//! catalog seeding and the top-level router.

use std::{path::PathBuf, time::Duration};

use axum::Router;
use quill_api::AppState;
use quill_core::{
  adventure::AdventureType,
  generator::{GenerationError, Generated, NarrativeGenerator},
  progression::StorySettings,
  prompt::Message,
  store::AdventureStore,
  stub::StubGenerator,
};
use quill_llm::{ChatConfig, ChatGenerator};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `QUILL_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "defaults::host")]
  pub host:                 String,
  #[serde(default = "defaults::port")]
  pub port:                 u16,
  #[serde(default = "defaults::store_path")]
  pub store_path:           PathBuf,
  #[serde(default = "defaults::max_chapters")]
  pub max_chapters:         u32,
  #[serde(default = "defaults::choices_per_step")]
  pub choices_per_step:     u32,
  #[serde(default = "defaults::hourly_adventure_cap")]
  pub hourly_adventure_cap: u64,
  #[serde(default)]
  pub generator:            GeneratorConfig,
  /// Catalog entries inserted at startup if absent.
  #[serde(default)]
  pub adventure_types:      Vec<AdventureType>,
}

impl ServerConfig {
  pub fn story_settings(&self) -> StorySettings {
    StorySettings {
      max_chapters:     self.max_chapters,
      choices_per_step: self.choices_per_step,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
  #[default]
  Stub,
  Chat,
}

/// Narrative backend settings. Only `kind` matters for the stub.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
  #[serde(default)]
  pub kind:         GeneratorKind,
  #[serde(default)]
  pub base_url:     String,
  #[serde(default)]
  pub api_key:      Option<String>,
  #[serde(default)]
  pub model:        String,
  #[serde(default = "defaults::timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    Self {
      kind:         GeneratorKind::Stub,
      base_url:     String::new(),
      api_key:      None,
      model:        String::new(),
      timeout_secs: defaults::timeout_secs(),
    }
  }
}

mod defaults {
  use std::path::PathBuf;

  use quill_llm::ChatConfig;

  pub fn host() -> String { "0.0.0.0".into() }
  pub fn port() -> u16 { 8080 }
  pub fn store_path() -> PathBuf { PathBuf::from("quill.db") }
  pub fn max_chapters() -> u32 { 5 }
  pub fn choices_per_step() -> u32 { 3 }
  pub fn hourly_adventure_cap() -> u64 { 100 }
  pub fn timeout_secs() -> u64 { ChatConfig::DEFAULT_TIMEOUT.as_secs() }
}

// ─── Generator selection ─────────────────────────────────────────────────────

/// The narrative backend chosen by configuration.
pub enum Generator {
  Stub(StubGenerator),
  Chat(ChatGenerator),
}

impl Generator {
  pub fn from_config(config: &ServerConfig) -> quill_llm::Result<Self> {
    let g = &config.generator;
    Ok(match g.kind {
      GeneratorKind::Stub => {
        Self::Stub(StubGenerator::new(config.choices_per_step, config.max_chapters))
      }
      GeneratorKind::Chat => Self::Chat(ChatGenerator::new(ChatConfig {
        base_url: g.base_url.clone(),
        api_key:  g.api_key.clone(),
        model:    g.model.clone(),
        timeout:  Duration::from_secs(g.timeout_secs),
      })?),
    })
  }

  pub fn kind(&self) -> GeneratorKind {
    match self {
      Self::Stub(_) => GeneratorKind::Stub,
      Self::Chat(_) => GeneratorKind::Chat,
    }
  }
}

impl NarrativeGenerator for Generator {
  async fn generate(&self, conversation: &[Message]) -> Result<Generated, GenerationError> {
    match self {
      Self::Stub(g) => g.generate(conversation).await,
      Self::Chat(g) => g.generate(conversation).await,
    }
  }
}

// ─── Startup ──────────────────────────────────────────────────────────────────

/// Insert each configured adventure type that is not already stored.
/// Returns how many were inserted.
pub async fn seed_adventure_types<S: AdventureStore>(
  store: &S,
  types: &[AdventureType],
) -> Result<usize, S::Error> {
  let mut inserted = 0;
  for ty in types {
    if store.seed_adventure_type(ty.clone()).await? {
      tracing::info!(id = %ty.id, description = %ty.description, "seeded adventure type");
      inserted += 1;
    }
  }
  Ok(inserted)
}

/// Build the application router with request tracing.
pub fn app<S, G>(state: AppState<S, G>) -> Router
where
  S: AdventureStore + 'static,
  G: NarrativeGenerator + 'static,
{
  quill_api::api_router(state).layer(TraceLayer::new_for_http())
}
