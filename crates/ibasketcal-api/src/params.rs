//! Translation from HTTP query parameters to store filters.
//!
//! Two filter styles are accepted at the same time: exact IDs (`group_id`,
//! `team_id`, season ids) and backward-compatible name substrings
//! (`competition`, `team`, season names). When both name the same dimension
//! the ID wins — the store backends implement that precedence, this module
//! just passes both through. The parameter names are the one externally
//! stable contract and must never change.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use ibasketcal_core::{
  matches::MatchStatus,
  store::{MatchFilter, Store},
};
use ibasketcal_ics::Mode;
use serde::Deserialize;

use crate::error::ApiError;

/// Largest accepted player-mode preparation offset, in minutes.
const MAX_PREP_MINUTES: u32 = 240;

/// Query parameters shared by `/api/matches` and `/calendar.ics`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchQuery {
  /// Season id or name substring.
  pub season:      Option<String>,
  /// Competition name substring.
  pub competition: Option<String>,
  /// Exact group id; wins over `competition`.
  pub group_id:    Option<String>,
  /// Team name substring, either side.
  pub team:        Option<String>,
  /// Exact team id; wins over `team`.
  pub team_id:     Option<String>,
  pub status:      Option<String>,
  pub date_from:   Option<DateTime<Utc>>,
  pub date_to:     Option<DateTime<Utc>>,
  pub limit:       Option<usize>,
  // Calendar-only knobs; ignored by the JSON endpoint.
  pub mode:        Option<String>,
  pub prep:        Option<String>,
  pub tz:          Option<String>,
}

/// Resolve `query` into a [`MatchFilter`], consulting the store for season
/// id-or-name resolution.
pub async fn resolve_filter<S>(
  store: &S,
  query: &MatchQuery,
) -> Result<MatchFilter, ApiError>
where
  S: Store,
{
  let status = query
    .status
    .as_deref()
    .map(|s| {
      MatchStatus::try_from(s)
        .map_err(|_| ApiError::InvalidFilter(format!("unknown status {s:?}")))
    })
    .transpose()?;

  let season_id = match &query.season {
    None => None,
    Some(season) => Some(resolve_season(store, season).await?),
  };

  Ok(MatchFilter {
    season_id,
    group_id: query.group_id.clone(),
    competition_name: query.competition.clone(),
    team_id: query.team_id.clone(),
    team_name: query.team.clone(),
    status,
    date_from: query.date_from,
    date_to: query.date_to,
    limit: query.limit,
  })
}

/// Accepts a season id verbatim, or a case-insensitive name substring. Among
/// name matches the newest season wins (the list is newest-first). A value
/// matching nothing is kept as an id filter — it simply selects no matches,
/// which is the right answer on a not-yet-populated store.
async fn resolve_season<S>(store: &S, season: &str) -> Result<String, ApiError>
where
  S: Store,
{
  let seasons = store.list_seasons().await.map_err(ApiError::store)?;
  if seasons.iter().any(|s| s.id == season) {
    return Ok(season.to_string());
  }

  let needle = season.to_lowercase();
  Ok(
    seasons
      .iter()
      .find(|s| s.name.to_lowercase().contains(&needle))
      .map(|s| s.id.clone())
      .unwrap_or_else(|| season.to_string()),
  )
}

/// Parse the calendar-only `mode`/`prep`/`tz` knobs.
pub fn resolve_calendar_mode(query: &MatchQuery) -> Result<(Mode, Option<Tz>), ApiError> {
  let mode = match query.mode.as_deref() {
    None | Some("fan") => Mode::Fan,
    Some("player") => {
      let prep_minutes = match query.prep.as_deref() {
        None => 0,
        Some(raw) => {
          let minutes: u32 = raw.parse().map_err(|_| {
            ApiError::InvalidFilter(format!("prep must be a number, got {raw:?}"))
          })?;
          if minutes > MAX_PREP_MINUTES {
            return Err(ApiError::InvalidFilter(format!(
              "prep must be 0..={MAX_PREP_MINUTES} minutes, got {minutes}"
            )));
          }
          minutes
        }
      };
      Mode::Player { prep_minutes }
    }
    Some(other) => {
      return Err(ApiError::InvalidFilter(format!("unknown mode {other:?}")));
    }
  };

  let tz = query
    .tz
    .as_deref()
    .map(|s| {
      s.parse::<Tz>()
        .map_err(|_| ApiError::InvalidFilter(format!("unknown time zone {s:?}")))
    })
    .transpose()?;

  Ok((mode, tz))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn player(prep: Option<&str>, tz: Option<&str>) -> MatchQuery {
    MatchQuery {
      mode: Some("player".into()),
      prep: prep.map(str::to_string),
      tz: tz.map(str::to_string),
      ..Default::default()
    }
  }

  #[test]
  fn fan_mode_is_the_default() {
    let (mode, tz) = resolve_calendar_mode(&MatchQuery::default()).unwrap();
    assert_eq!(mode, Mode::Fan);
    assert!(tz.is_none());
  }

  #[test]
  fn player_mode_parses_prep_and_tz() {
    let (mode, tz) =
      resolve_calendar_mode(&player(Some("45"), Some("Asia/Jerusalem"))).unwrap();
    assert_eq!(mode, Mode::Player { prep_minutes: 45 });
    assert_eq!(tz, Some(chrono_tz::Asia::Jerusalem));
  }

  #[test]
  fn player_mode_defaults_prep_to_zero() {
    let (mode, _) = resolve_calendar_mode(&player(None, None)).unwrap();
    assert_eq!(mode, Mode::Player { prep_minutes: 0 });
  }

  #[test]
  fn out_of_range_prep_is_rejected() {
    assert!(matches!(
      resolve_calendar_mode(&player(Some("241"), None)),
      Err(ApiError::InvalidFilter(_))
    ));
  }

  #[test]
  fn garbage_prep_mode_and_tz_are_rejected() {
    let coach = MatchQuery { mode: Some("coach".into()), ..Default::default() };
    let mars = MatchQuery { tz: Some("Mars/Olympus".into()), ..Default::default() };
    for q in [player(Some("soon"), None), coach, mars] {
      assert!(matches!(
        resolve_calendar_mode(&q),
        Err(ApiError::InvalidFilter(_))
      ));
    }
  }
}
