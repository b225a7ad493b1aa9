//! Name ordering for mixed Hebrew/Latin text.
//!
//! SQLite and PostgREST both compare TEXT by code point, which puts the
//! Hebrew block (U+0590–U+05FF) after Latin — the opposite of what readers
//! of these listings expect. Every backend therefore re-sorts names in Rust
//! with this comparator, which is total, stable, and identical on every
//! platform: characters compare first by script class (Hebrew, then other
//! letters, then the rest) and then by lowercased code point.

use std::cmp::Ordering;

fn class(c: char) -> u8 {
  if ('\u{0590}'..='\u{05FF}').contains(&c) {
    0
  } else if c.is_alphabetic() {
    1
  } else {
    2
  }
}

fn key(c: char) -> (u8, char) {
  (class(c), c.to_lowercase().next().unwrap_or(c))
}

/// Compare two display names, Hebrew-first, case-insensitive.
pub fn cmp_names(a: &str, b: &str) -> Ordering {
  let mut ita = a.chars();
  let mut itb = b.chars();
  loop {
    match (ita.next(), itb.next()) {
      (Some(ca), Some(cb)) => match key(ca).cmp(&key(cb)) {
        Ordering::Equal => continue,
        other => return other,
      },
      (None, None) => return a.cmp(b), // tiebreak keeps the order total
      (None, Some(_)) => return Ordering::Less,
      (Some(_), None) => return Ordering::Greater,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hebrew_sorts_before_latin() {
    let mut names = vec!["Hapoel Galil", "מכבי תל אביב", "Elitzur", "הפועל חולון"];
    names.sort_by(|a, b| cmp_names(a, b));
    assert_eq!(
      names,
      vec!["הפועל חולון", "מכבי תל אביב", "Elitzur", "Hapoel Galil"]
    );
  }

  #[test]
  fn latin_compares_case_insensitively() {
    assert_eq!(cmp_names("elitzur", "Elitzur B"), Ordering::Less);
    assert_eq!(cmp_names("Maccabi", "maccabi"), "Maccabi".cmp("maccabi"));
  }

  #[test]
  fn order_is_total_and_reproducible() {
    let names = ["א", "ב", "a", "B", "1", "א1", "אa"];
    let mut once: Vec<_> = names.to_vec();
    once.sort_by(|a, b| cmp_names(a, b));
    let mut twice: Vec<_> = names.iter().rev().cloned().collect();
    twice.sort_by(|a, b| cmp_names(a, b));
    assert_eq!(once, twice);
  }

  #[test]
  fn prefix_sorts_first() {
    assert_eq!(cmp_names("הפועל", "הפועל חולון"), Ordering::Less);
  }
}
