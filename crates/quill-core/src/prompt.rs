//! Conversation assembly for narrative generation.
//!
//! [`assemble`] is a pure function of an adventure's history; it never
//! touches storage. The conversation it returns always has the same shape:
//!
//! 1. a system turn with the generation instructions,
//! 2. an opening user turn with the setting and chapter budget,
//! 3. per prior chapter, an assistant turn with its narrative followed by a
//!    user turn with the action taken from it (if one was taken),
//! 4. a user turn with the choice submitted by the current step, if any.

use serde::{Deserialize, Serialize};

use crate::{adventure::ChapterWithChosen, template::replace};

// ─── Messages ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
  pub role:    Role,
  pub content: String,
}

impl Message {
  pub fn system(content: impl Into<String>) -> Self {
    Self { role: Role::System, content: content.into() }
  }

  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self { role: Role::Assistant, content: content.into() }
  }
}

// ─── Templates ───────────────────────────────────────────────────────────────

const SYSTEM_TEMPLATE: &str = "You are the narrator of an interactive \
  choose-your-own-adventure story told in the second person. Write one \
  chapter per reply, a few paragraphs long, ending at a point where the \
  reader must decide what to do next. Offer exactly %choices% options, each \
  a short action the reader can take. When the story reaches its ending, \
  offer no options at all. Reply only with a JSON object of the form \
  {\"narrative\": \"...\", \"options\": [{\"action\": \"...\"}]}.";

const OPENING_TEMPLATE: &str = "Begin a new adventure %setting%. The whole \
  story must be told in at most %maxChapters% chapters.";

const CHOICE_TEMPLATE: &str =
  "At the end of chapter %chapter% I choose to: %action%. %progress%";

const FIRST_HALF_HINT: &str = "We are still in the first half of the story.";

const MIDDLE_HINT: &str =
  "We have reached the middle of the story; start steering it towards an ending.";

const FINAL_HINT: &str = "This is my final choice: the next chapter ends the \
  story and offers no options.";

/// The system turn, parameterised by how many options each chapter offers.
pub fn system_prompt(choices_per_step: u32) -> String {
  let choices = choices_per_step.to_string();
  replace(SYSTEM_TEMPLATE, &[("choices", &choices)])
}

/// The opening user turn. A `None` setting leaves the choice to the
/// generator.
pub fn opening_prompt(max_chapters: u32, setting: Option<&str>) -> String {
  let setting = match setting {
    Some(s) => format!("set in {s}"),
    None => "in a setting of your choosing".to_owned(),
  };
  let max = max_chapters.to_string();
  replace(OPENING_TEMPLATE, &[("setting", &setting), ("maxChapters", &max)])
}

/// A user turn describing the action taken at the end of chapter `current`.
pub fn choice_prompt(max_chapters: u32, current: u32, action: &str) -> String {
  let chapter = current.to_string();
  replace(CHOICE_TEMPLATE, &[
    ("chapter", &chapter),
    ("action", action),
    ("progress", progress_hint(max_chapters, current)),
  ])
}

/// First half while `current < max / 2`, final once `current >= max`, the
/// middle otherwise.
fn progress_hint(max_chapters: u32, current: u32) -> &'static str {
  if current >= max_chapters {
    FINAL_HINT
  } else if u64::from(current) * 2 < u64::from(max_chapters) {
    FIRST_HALF_HINT
  } else {
    MIDDLE_HINT
  }
}

// ─── Assembly ────────────────────────────────────────────────────────────────

/// The choice submitted by the step being generated.
#[derive(Debug, Clone, Copy)]
pub struct CurrentChoice<'a> {
  /// Number of the latest chapter, the one the choice belongs to.
  pub chapter_number: u32,
  pub action:         &'a str,
}

/// Inputs to [`assemble`].
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
  pub setting:          Option<&'a str>,
  pub max_chapters:     u32,
  pub choices_per_step: u32,
  /// Prior chapters in ascending order.
  pub history:          &'a [ChapterWithChosen],
  pub current:          Option<CurrentChoice<'a>>,
}

/// Build the conversation for the next chapter.
pub fn assemble(ctx: &PromptContext<'_>) -> Vec<Message> {
  let mut messages = Vec::with_capacity(2 + ctx.history.len() * 2 + 1);
  messages.push(Message::system(system_prompt(ctx.choices_per_step)));
  messages.push(Message::user(opening_prompt(ctx.max_chapters, ctx.setting)));

  for entry in ctx.history {
    messages.push(Message::assistant(entry.chapter.narrative.clone()));
    if let Some(chosen) = &entry.chosen {
      messages.push(Message::user(choice_prompt(
        ctx.max_chapters,
        entry.chapter.number,
        &chosen.action,
      )));
    }
  }

  if let Some(current) = ctx.current {
    messages.push(Message::user(choice_prompt(
      ctx.max_chapters,
      current.chapter_number,
      current.action,
    )));
  }

  messages
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::adventure::{Chapter, ChapterChoice};

  fn chapter(number: u32, narrative: &str, chosen: Option<&str>) -> ChapterWithChosen {
    let id = Uuid::new_v4();
    ChapterWithChosen {
      chapter: Chapter {
        id,
        adventure_id: Uuid::nil(),
        number,
        narrative: narrative.into(),
        created_at: Utc::now(),
      },
      chosen:  chosen.map(|action| ChapterChoice {
        id:         Uuid::new_v4(),
        chapter_id: id,
        action:     action.into(),
        chosen:     true,
      }),
    }
  }

  fn ctx<'a>(
    history: &'a [ChapterWithChosen],
    current: Option<CurrentChoice<'a>>,
  ) -> PromptContext<'a> {
    PromptContext {
      setting: Some("a haunted library"),
      max_chapters: 6,
      choices_per_step: 3,
      history,
      current,
    }
  }

  #[test]
  fn first_step_has_system_and_opening_only() {
    let messages = assemble(&ctx(&[], None));
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[0].content.contains("exactly 3 options"));
    assert_eq!(messages[1].role, Role::User);
    assert!(messages[1].content.contains("set in a haunted library"));
    assert!(messages[1].content.contains("at most 6 chapters"));
  }

  #[test]
  fn missing_setting_leaves_choice_to_generator() {
    let prompt = opening_prompt(4, None);
    assert!(prompt.contains("in a setting of your choosing"));
    assert!(!prompt.contains('%'));
  }

  #[test]
  fn history_alternates_narrative_and_chosen_action() {
    let history = vec![
      chapter(1, "one", Some("open the door")),
      chapter(2, "two", None),
    ];
    let messages = assemble(&ctx(&history, Some(CurrentChoice {
      chapter_number: 2,
      action:         "light a candle",
    })));

    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![
      Role::System,
      Role::User,
      Role::Assistant,
      Role::User,
      Role::Assistant,
      Role::User,
    ]);
    assert_eq!(messages[2].content, "one");
    assert!(messages[3].content.contains("chapter 1"));
    assert!(messages[3].content.contains("open the door"));
    assert_eq!(messages[4].content, "two");
    assert!(messages[5].content.contains("chapter 2"));
    assert!(messages[5].content.contains("light a candle"));
  }

  #[test]
  fn no_current_choice_ends_on_latest_narrative() {
    let history = vec![chapter(1, "one", None)];
    let messages = assemble(&ctx(&history, None));
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].role, Role::Assistant);
  }

  #[test]
  fn progress_hints_follow_chapter_budget() {
    assert_eq!(progress_hint(6, 1), FIRST_HALF_HINT);
    assert_eq!(progress_hint(6, 2), FIRST_HALF_HINT);
    assert_eq!(progress_hint(6, 3), MIDDLE_HINT);
    assert_eq!(progress_hint(6, 5), MIDDLE_HINT);
    assert_eq!(progress_hint(6, 6), FINAL_HINT);
    assert_eq!(progress_hint(6, 9), FINAL_HINT);
    // Odd budgets compare against the exact half.
    assert_eq!(progress_hint(5, 2), FIRST_HALF_HINT);
    assert_eq!(progress_hint(5, 3), MIDDLE_HINT);
  }

  #[test]
  fn action_text_is_inserted_verbatim() {
    let prompt = choice_prompt(4, 1, "say %setting% aloud");
    assert!(prompt.contains("say %setting% aloud"));
  }
}
