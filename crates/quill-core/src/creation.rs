//! Creation flow: validate the adventure type, apply the hourly rate limit,
//! and create the adventure.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{Error, Result, adventure::Adventure, store::AdventureStore};

/// Width of the trailing window the hourly cap applies to.
pub const RATE_WINDOW_MINUTES: i64 = 60;

/// How long a rate-limited caller is told to wait.
pub const RETRY_AFTER_SECS: u64 = 30 * 60;

pub struct Creation<S> {
  store:      Arc<S>,
  hourly_cap: u64,
}

impl<S: AdventureStore> Creation<S> {
  pub fn new(store: Arc<S>, hourly_cap: u64) -> Self { Self { store, hourly_cap } }

  /// Create an adventure of the type named by `adventure_type_id`.
  ///
  /// The rate check and the insert are separate store calls, so concurrent
  /// requests may overshoot the cap slightly.
  pub async fn create(&self, adventure_type_id: Option<&str>) -> Result<Adventure> {
    let type_id = adventure_type_id
      .and_then(|raw| Uuid::parse_str(raw).ok())
      .ok_or(Error::InvalidAdventureType)?;

    self
      .store
      .get_adventure_type(type_id)
      .await
      .map_err(Error::from_store)?
      .ok_or(Error::InvalidAdventureType)?;

    let since = Utc::now() - Duration::minutes(RATE_WINDOW_MINUTES);
    let recent = self
      .store
      .count_recent_adventures(since)
      .await
      .map_err(Error::from_store)?;
    if recent >= self.hourly_cap {
      tracing::warn!(recent, cap = self.hourly_cap, "adventure creation rate limited");
      return Err(Error::RateLimited { retry_after_secs: RETRY_AFTER_SECS });
    }

    let adventure = self
      .store
      .create_adventure(type_id)
      .await
      .map_err(Error::from_store)?;
    tracing::info!(adventure = %adventure.id, adventure_type = %type_id, "created adventure");
    Ok(adventure)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::memory::MemoryStore;

  #[tokio::test]
  async fn creates_active_adventure_of_known_type() {
    let store = MemoryStore::with_type(Some("a haunted library"));
    let type_id = store.type_id();
    let creation = Creation::new(store.clone(), 10);

    let adventure = creation.create(Some(&type_id.to_string())).await.unwrap();
    assert!(adventure.active);
    assert!(adventure.last_modified.is_none());
    assert_eq!(adventure.adventure_type_id, type_id);
    assert_eq!(store.adventure(adventure.id), adventure);
  }

  #[tokio::test]
  async fn missing_or_unknown_type_is_invalid() {
    let store = MemoryStore::with_type(None);
    let creation = Creation::new(store.clone(), 10);

    let unknown = Uuid::new_v4().to_string();
    for input in [None, Some("nope"), Some(unknown.as_str())] {
      let err = creation.create(input).await.unwrap_err();
      assert!(matches!(err, Error::InvalidAdventureType), "input {input:?}");
    }
    assert!(store.snapshot().adventures.is_empty());
  }

  #[tokio::test]
  async fn cap_is_enforced_on_the_next_request() {
    let store = MemoryStore::with_type(None);
    let type_id = store.type_id().to_string();
    let creation = Creation::new(store.clone(), 2);

    creation.create(Some(&type_id)).await.unwrap();
    creation.create(Some(&type_id)).await.unwrap();
    let err = creation.create(Some(&type_id)).await.unwrap_err();
    assert!(matches!(err, Error::RateLimited { retry_after_secs: RETRY_AFTER_SECS }));
    assert_eq!(store.snapshot().adventures.len(), 2);
  }
}
