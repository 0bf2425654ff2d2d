//! `%placeholder%` substitution for prompt templates.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"%(\w+)%").expect("placeholder pattern compiles"));

/// Replace every `%name%` in `template` whose `name` appears in
/// `replacements`.
///
/// Names are word characters only, so `%two words%` is never a placeholder.
/// Unknown and unterminated placeholders are left as they are. Replacement
/// values are inserted verbatim and not scanned again.
///
/// A name mapped to an empty value is replaced by the empty string; it does
/// not fall back to keeping the placeholder. Only a name absent from
/// `replacements` keeps its `%name%` text.
pub fn replace(template: &str, replacements: &[(&str, &str)]) -> String {
  if replacements.is_empty() {
    return template.to_owned();
  }

  PLACEHOLDER
    .replace_all(template, |caps: &Captures<'_>| {
      let name = &caps[1];
      replacements
        .iter()
        .find(|(key, _)| *key == name)
        .map_or_else(|| caps[0].to_owned(), |(_, value)| (*value).to_owned())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn no_replacements_returns_input() {
    let text = "This is a bit of text";
    assert_eq!(replace(text, &[]), text);
  }

  #[test]
  fn unmatched_placeholder_is_kept() {
    let text = "This is a bit of %notReplaced% text";
    assert_eq!(replace(text, &[("other", "x")]), text);
  }

  #[test]
  fn matched_placeholder_is_replaced() {
    let out = replace("This is a bit of %replace% text", &[("replace", "different")]);
    assert_eq!(out, "This is a bit of different text");
  }

  #[test]
  fn unterminated_placeholder_is_kept() {
    let text = "This is a bit of %replace text ending%";
    assert_eq!(replace(text, &[("replace", "different")]), text);
  }

  #[test]
  fn placeholder_with_spaces_is_not_a_placeholder() {
    let text = "This is a bit of %replace this bit% text";
    assert_eq!(replace(text, &[("replace this bit", "different")]), text);
  }

  #[test]
  fn empty_value_removes_placeholder() {
    let out = replace("[%gap%]", &[("gap", "")]);
    assert_eq!(out, "[]");
  }

  #[test]
  fn replacement_values_are_not_rescanned() {
    let out = replace("%a% and %b%", &[("a", "%b%"), ("b", "B")]);
    assert_eq!(out, "%b% and B");
  }
}
