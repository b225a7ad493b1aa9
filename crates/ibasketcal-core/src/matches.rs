//! Match — the primary entity.
//!
//! Competition and group names are denormalised onto every match so the
//! store can answer name filters from match indexes alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ─── Status ──────────────────────────────────────────────────────────────────

/// Upstream match status. Scores are meaningful only for [`Closed`](Self::Closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
  NotStarted,
  Live,
  Closed,
}

impl MatchStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      MatchStatus::NotStarted => "NOT_STARTED",
      MatchStatus::Live => "LIVE",
      MatchStatus::Closed => "CLOSED",
    }
  }

  /// Lenient parse for ingest: unrecognised upstream values fall back to
  /// `NotStarted` (the raw string survives in the match's `raw` blob).
  pub fn parse_lenient(s: &str) -> MatchStatus {
    MatchStatus::try_from(s).unwrap_or(MatchStatus::NotStarted)
  }
}

/// Strict parse for query parameters.
impl TryFrom<&str> for MatchStatus {
  type Error = Error;

  fn try_from(s: &str) -> Result<Self, Error> {
    match s {
      "NOT_STARTED" => Ok(MatchStatus::NotStarted),
      "LIVE" => Ok(MatchStatus::Live),
      "CLOSED" => Ok(MatchStatus::Closed),
      other => Err(Error::UnknownStatus(other.to_string())),
    }
  }
}

// ─── Match ───────────────────────────────────────────────────────────────────

/// A single fixture. Team IDs may be absent for yet-unpaired playoff slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
  pub id:               String,
  pub season_id:        String,
  pub competition_id:   Option<String>,
  pub competition_name: String,
  pub group_id:         String,
  pub group_name:       String,
  pub home_team_id:     Option<String>,
  pub home_team_name:   Option<String>,
  pub away_team_id:     Option<String>,
  pub away_team_name:   Option<String>,
  pub date:             DateTime<Utc>,
  pub status:           MatchStatus,
  pub home_score:       Option<u32>,
  pub away_score:       Option<u32>,
  pub venue:            Option<String>,
  pub venue_address:    Option<String>,
  pub raw:              serde_json::Value,
}

impl Match {
  /// `Some((home, away))` only when the match is closed and both totals are
  /// known. A closed match missing a score renders like an upcoming one.
  pub fn final_score(&self) -> Option<(u32, u32)> {
    if self.status != MatchStatus::Closed {
      return None;
    }
    Some((self.home_score?, self.away_score?))
  }

  /// `LOCATION`-style string: venue plus address, comma-joined.
  pub fn location(&self) -> Option<String> {
    match (&self.venue, &self.venue_address) {
      (Some(v), Some(a)) => Some(format!("{v}, {a}")),
      (Some(v), None) => Some(v.clone()),
      (None, Some(a)) => Some(a.clone()),
      (None, None) => None,
    }
  }
}
