//! The `NarrativeGenerator` trait.
//!
//! A generator turns the conversation built by [`crate::prompt::assemble`]
//! into the next chapter's narrative and the actions it offers. Backends live
//! outside this crate (`quill-llm`), apart from the deterministic
//! [`crate::stub::StubGenerator`].

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompt::Message;

/// Narrative and next-action labels produced for one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generated {
  pub narrative: String,
  /// Empty when the story has ended.
  pub options:   Vec<String>,
}

impl Generated {
  /// Reject output that cannot be stored as a chapter: a blank narrative or
  /// a blank action label. Surrounding whitespace is trimmed.
  pub fn validate(self) -> Result<Self, GenerationError> {
    let narrative = self.narrative.trim().to_owned();
    if narrative.is_empty() {
      return Err(GenerationError::Malformed("empty narrative".into()));
    }

    let options = self
      .options
      .into_iter()
      .map(|o| {
        let trimmed = o.trim();
        if trimmed.is_empty() {
          Err(GenerationError::Malformed("empty option label".into()))
        } else {
          Ok(trimmed.to_owned())
        }
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self { narrative, options })
  }
}

#[derive(Debug, Error)]
pub enum GenerationError {
  /// The backend could not be reached or refused the request.
  #[error("backend request failed: {0}")]
  Backend(String),

  /// The backend answered, but not with a usable chapter.
  #[error("malformed response: {0}")]
  Malformed(String),
}

/// Abstraction over a narrative backend.
pub trait NarrativeGenerator: Send + Sync {
  /// Produce the next chapter for `conversation`.
  fn generate<'a>(
    &'a self,
    conversation: &'a [Message],
  ) -> impl Future<Output = Result<Generated, GenerationError>> + Send + 'a;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn validate_trims_narrative_and_options() {
    let g = Generated {
      narrative: "  You wake.\n".into(),
      options:   vec![" open the door ".into(), "wait".into()],
    }
    .validate()
    .unwrap();
    assert_eq!(g.narrative, "You wake.");
    assert_eq!(g.options, vec!["open the door", "wait"]);
  }

  #[test]
  fn validate_rejects_blank_narrative() {
    let err = Generated { narrative: "   ".into(), options: vec![] }
      .validate()
      .unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
  }

  #[test]
  fn validate_rejects_blank_option() {
    let err = Generated {
      narrative: "text".into(),
      options:   vec!["go".into(), "".into()],
    }
    .validate()
    .unwrap_err();
    assert!(matches!(err, GenerationError::Malformed(_)));
  }

  #[test]
  fn validate_accepts_no_options() {
    let g = Generated { narrative: "The end.".into(), options: vec![] }
      .validate()
      .unwrap();
    assert!(g.options.is_empty());
  }
}
