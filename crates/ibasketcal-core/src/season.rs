//! Season, competition and group entities.
//!
//! All three are addressed by opaque string IDs assigned upstream; the store
//! never mints its own. Each row carries the full upstream JSON in `raw` for
//! forward-compatibility, alongside the typed columns the indexes use.

use serde::{Deserialize, Serialize};

/// The upstream placeholder name for a competition's regular phase. Groups
/// named like this are not worth showing next to the competition name.
pub const REGULAR_PHASE_NAME: &str = "Regular";

/// A season, e.g. "2025/2026". Season names sort lexicographically by
/// descending year, so "newest first" is a plain reverse name sort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
  pub id:         String,
  pub name:       String,
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
  pub raw:        serde_json::Value,
}

/// A competition (league or cup) within a single season. The name is
/// free-form upstream text, usually right-to-left.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competition {
  pub id:        String,
  pub season_id: String,
  pub name:      String,
  pub raw:       serde_json::Value,
}

/// A competition joined with its groups — the read model of
/// [`Store::list_competitions`](crate::store::Store::list_competitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionWithGroups {
  #[serde(flatten)]
  pub competition: Competition,
  pub groups:      Vec<Group>,
}

/// A group (division/phase) — the smallest calendar-addressable unit
/// upstream. Every match belongs to exactly one group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
  pub id:             String,
  pub competition_id: String,
  pub season_id:      String,
  pub name:           String,
  /// Upstream phase kind: `LEAGUE`, `PLAYOFF`, … Kept as free text.
  pub kind:           Option<String>,
  pub raw:            serde_json::Value,
}

/// Human-readable label for a group in the context of its competition.
///
/// Groups that merely repeat the competition name (or carry the upstream
/// regular-phase placeholder) collapse to the competition name alone.
pub fn group_label(competition_name: &str, group_name: &str) -> String {
  if group_name == competition_name
    || group_name.eq_ignore_ascii_case(REGULAR_PHASE_NAME)
  {
    competition_name.to_string()
  } else {
    format!("{competition_name} — {group_name}")
  }
}

impl Group {
  pub fn display_name(&self, competition_name: &str) -> String {
    group_label(competition_name, &self.name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn group(name: &str) -> Group {
    Group {
      id:             "g1".into(),
      competition_id: "c1".into(),
      season_id:      "s1".into(),
      name:           name.into(),
      kind:           Some("LEAGUE".into()),
      raw:            serde_json::json!({}),
    }
  }

  #[test]
  fn display_name_collapses_duplicate() {
    assert_eq!(group("ליגת העל").display_name("ליגת העל"), "ליגת העל");
  }

  #[test]
  fn display_name_collapses_regular_placeholder() {
    assert_eq!(group("regular").display_name("ליגת העל"), "ליגת העל");
    assert_eq!(group("Regular").display_name("ליגת העל"), "ליגת העל");
  }

  #[test]
  fn display_name_joins_distinct_group() {
    assert_eq!(
      group("פלייאוף עליון").display_name("ליגת העל"),
      "ליגת העל — פלייאוף עליון"
    );
  }

  #[test]
  fn season_names_sort_newest_first_by_reverse_name() {
    let mut names = vec!["2023/2024", "2025/2026", "2024/2025"];
    names.sort_by(|a, b| b.cmp(a));
    assert_eq!(names, vec!["2025/2026", "2024/2025", "2023/2024"]);
  }
}
