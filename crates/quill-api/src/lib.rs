//! JSON REST API for Quill.
//!
//! Exposes an axum [`Router`] backed by any
//! [`quill_core::store::AdventureStore`] and
//! [`quill_core::generator::NarrativeGenerator`]. Transport concerns such as
//! tracing layers and the listener belong to the caller.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = quill_api::api_router(state).layer(TraceLayer::new_for_http());
//! ```

pub mod adventure_types;
pub mod adventures;
pub mod error;

use std::sync::Arc;

use axum::{
  Router,
  body::Bytes,
  routing::{get, post},
};
use quill_core::{
  creation::Creation,
  generator::NarrativeGenerator,
  progression::{Progression, StorySettings},
  store::AdventureStore,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, G> {
  pub store:       Arc<S>,
  pub creation:    Arc<Creation<S>>,
  pub progression: Arc<Progression<S, G>>,
}

impl<S, G> Clone for AppState<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:       self.store.clone(),
      creation:    self.creation.clone(),
      progression: self.progression.clone(),
    }
  }
}

impl<S, G> AppState<S, G>
where
  S: AdventureStore,
  G: NarrativeGenerator,
{
  /// Wire both flows to `store`.
  pub fn new(store: Arc<S>, generator: G, settings: StorySettings, hourly_cap: u64) -> Self {
    Self {
      creation: Arc::new(Creation::new(store.clone(), hourly_cap)),
      progression: Arc::new(Progression::new(store.clone(), generator, settings)),
      store,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn api_router<S, G>(state: AppState<S, G>) -> Router<()>
where
  S: AdventureStore + 'static,
  G: NarrativeGenerator + 'static,
{
  Router::new()
    // Adventures
    .route("/adventures", post(adventures::create::<S, G>))
    .route("/adventures/{id}", get(adventures::get_one::<S, G>))
    .route("/adventures/{id}/forth", post(adventures::forth::<S, G>))
    // Catalog
    .route("/adventure-types", get(adventure_types::list::<S, G>))
    .route("/adventure-types/{id}", get(adventure_types::get_one::<S, G>))
    .with_state(state)
}

// ─── Extraction helpers ──────────────────────────────────────────────────────

/// Parse a path segment as a UUID; malformed ids are reported as not found.
fn path_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{what} {raw} not found")))
}

/// Decode an optional JSON body. An empty or unparseable body yields the
/// default, leaving presence checks to the flows.
fn lenient_body<T: DeserializeOwned + Default>(body: &Bytes) -> T {
  if body.iter().all(u8::is_ascii_whitespace) {
    return T::default();
  }
  serde_json::from_slice(body).unwrap_or_else(|e| {
    tracing::debug!(error = %e, "ignoring unparseable request body");
    T::default()
  })
}
