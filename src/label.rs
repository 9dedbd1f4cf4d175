/// Separator between alternate names.
pub const SEPARATOR: &str = " / ";

/// Joiner used when the word before the slash is the shorter one.
const BIND_BEFORE: &str = "\u{a0}/ ";
/// Joiner used otherwise, also on a tie.
const BIND_AFTER: &str = " /\u{a0}";

fn joiner(before: &str, after: &str) -> &'static str {
  let last_of_first = before.split(' ').next_back().unwrap_or_default();
  let first_of_second = after.split(' ').next().unwrap_or_default();
  if last_of_first.chars().count() < first_of_second.chars().count() {
    BIND_BEFORE
  } else {
    BIND_AFTER
  }
}

/// Binds the first separator to the shorter adjacent word with a no-break space, so a
/// lone slash never starts or ends a wrapped line. Later separators stay as they are.
///
/// The output no longer contains the first separator and must not be wrapped again.
#[must_use]
pub fn wrap_label(label: &str) -> String {
  let names: Vec<&str> = label.split(SEPARATOR).collect();
  if names.len() < 2 {
    return label.to_string();
  }
  format!(
    "{}{}{}",
    names[0],
    joiner(names[0], names[1]),
    names[1..].join(SEPARATOR)
  )
}

/// Like [`wrap_label`] but only ever keeps the first two names.
///
/// Labels composed from reverse geocoding candidates never hold more than two names,
/// anything past the second is dropped.
#[must_use]
pub fn wrap_label_pair(label: &str) -> String {
  let mut names = label.split(SEPARATOR);
  match (names.next(), names.next()) {
    (Some(first), Some(second)) => format!("{first}{}{second}", joiner(first, second)),
    _ => label.to_string(),
  }
}
