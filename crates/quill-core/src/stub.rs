//! A deterministic [`NarrativeGenerator`] for tests and offline runs.

use crate::{
  generator::{Generated, GenerationError, NarrativeGenerator},
  prompt::{Message, Role},
};

pub const FIRST_NARRATIVE: &str = "the initial chapter goes here!";
pub const NEXT_NARRATIVE: &str = "a new chapter goes here!";
pub const FINAL_NARRATIVE: &str = "this is how the story ends!";

/// Produces placeholder chapters without calling any backend.
///
/// The chapter being generated is inferred from the conversation (one
/// assistant turn per prior chapter). Every chapter before `max_chapters`
/// offers `choices_per_step` actions named `action 1`, `action 2`, ...;
/// chapter `max_chapters` offers none, which concludes the adventure.
#[derive(Debug, Clone, Copy)]
pub struct StubGenerator {
  choices_per_step: u32,
  max_chapters:     u32,
}

impl StubGenerator {
  pub fn new(choices_per_step: u32, max_chapters: u32) -> Self {
    Self { choices_per_step, max_chapters }
  }
}

impl NarrativeGenerator for StubGenerator {
  async fn generate(&self, conversation: &[Message]) -> Result<Generated, GenerationError> {
    let prior = conversation
      .iter()
      .filter(|m| m.role == Role::Assistant)
      .count();
    let chapter = u32::try_from(prior)
      .map_err(|_| GenerationError::Malformed("conversation too long".into()))?
      + 1;

    if chapter >= self.max_chapters {
      return Ok(Generated {
        narrative: FINAL_NARRATIVE.to_owned(),
        options:   Vec::new(),
      });
    }

    let narrative = if chapter == 1 { FIRST_NARRATIVE } else { NEXT_NARRATIVE };
    let options = (1..=self.choices_per_step)
      .map(|i| format!("action {i}"))
      .collect();

    Ok(Generated { narrative: narrative.to_owned(), options })
  }
}
