//! Serde shapes for the upstream JSON API.
//!
//! Upstream rows are loosely typed, so every shape is parsed tolerantly
//! (missing fields default) and keeps the original [`serde_json::Value`]
//! alongside — that value becomes the entity's `raw` column on ingest.

use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

/// Deserialize `T` out of `value` while keeping `value` itself around.
fn parse_keeping_raw<T: serde::de::DeserializeOwned>(
  value: Value,
) -> Result<(T, Value)> {
  let parsed = serde_json::from_value(value.clone())
    .map_err(|e| Error::Rejected { status: 200, body: format!("body shape: {e}") })?;
  Ok((parsed, value))
}

// ─── Seasons ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RawSeason {
  /// Upstream uses `_id` on seasons and `id` everywhere else.
  #[serde(rename = "_id", alias = "id")]
  pub id:         String,
  #[serde(default)]
  pub name:       String,
  #[serde(rename = "startDate")]
  pub start_date: Option<String>,
  #[serde(rename = "endDate")]
  pub end_date:   Option<String>,
  #[serde(skip)]
  pub raw:        Value,
}

impl RawSeason {
  pub fn from_value(value: Value) -> Result<Self> {
    let (mut season, raw) = parse_keeping_raw::<Self>(value)?;
    season.raw = raw;
    Ok(season)
  }
}

// ─── Competitions and groups ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RawGroup {
  pub id:   Option<String>,
  #[serde(default)]
  pub name: String,
  #[serde(rename = "type")]
  pub kind: Option<String>,
  #[serde(skip)]
  pub raw:  Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCompetition {
  pub id:     Option<String>,
  #[serde(default)]
  pub name:   String,
  #[serde(default)]
  pub groups: Vec<RawGroup>,
  #[serde(skip)]
  pub raw:    Value,
}

impl RawCompetition {
  pub fn from_value(value: Value) -> Result<Self> {
    let (mut comp, raw) = parse_keeping_raw::<Self>(value)?;
    // Group raws are carved out of the competition's own JSON.
    let group_values = raw
      .get("groups")
      .and_then(Value::as_array)
      .cloned()
      .unwrap_or_default();
    for (group, value) in comp.groups.iter_mut().zip(group_values) {
      group.raw = value;
    }
    comp.raw = raw;
    Ok(comp)
  }
}

// ─── Calendar ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCalendar {
  #[serde(default)]
  pub rounds: Vec<RawRound>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRound {
  /// Kept as raw values; each one is re-parsed as [`RawMatch`] during
  /// flattening so a single malformed row cannot sink the whole group.
  #[serde(default)]
  pub matches: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMatch {
  pub id:        Option<String>,
  pub date:      Option<String>,
  pub status:    Option<String>,
  #[serde(rename = "homeTeam")]
  pub home_team: Option<RawTeam>,
  #[serde(rename = "awayTeam")]
  pub away_team: Option<RawTeam>,
  pub score:     Option<RawScore>,
  pub court:     Option<RawCourt>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTeam {
  pub id:   Option<String>,
  pub name: Option<String>,
  pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScore {
  #[serde(default)]
  pub totals: Vec<RawTotal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTotal {
  #[serde(rename = "teamId")]
  pub team_id: Option<String>,
  pub total:   Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCourt {
  pub place:   Option<String>,
  pub address: Option<String>,
  pub town:    Option<String>,
}
