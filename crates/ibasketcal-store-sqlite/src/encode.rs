//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings (UTC, so lexicographic order is
//! chronological order). The `raw` columns hold the upstream JSON verbatim.

use chrono::{DateTime, Utc};
use ibasketcal_core::{
  matches::{Match, MatchStatus},
  season::{Competition, Group, Season},
  store::StandingRow,
  team::Team,
};

use crate::{Error, Result};

// ─── Scalar codecs ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn decode_status(s: &str) -> Result<MatchStatus> {
  MatchStatus::try_from(s).map_err(|e| Error::Decode(e.to_string()))
}

pub fn encode_raw(raw: &serde_json::Value) -> String { raw.to_string() }

pub fn decode_raw(s: &str) -> Result<serde_json::Value> {
  Ok(serde_json::from_str(s)?)
}

pub fn decode_score(v: Option<i64>) -> Result<Option<u32>> {
  v.map(|n| {
    u32::try_from(n).map_err(|_| Error::Decode(format!("negative score {n}")))
  })
  .transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub struct RawSeasonRow {
  pub id:         String,
  pub name:       String,
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
  pub raw:        String,
}

impl RawSeasonRow {
  pub fn into_season(self) -> Result<Season> {
    Ok(Season {
      id:         self.id,
      name:       self.name,
      start_date: self.start_date,
      end_date:   self.end_date,
      raw:        decode_raw(&self.raw)?,
    })
  }
}

pub struct RawCompetitionRow {
  pub id:        String,
  pub season_id: String,
  pub name:      String,
  pub raw:       String,
}

impl RawCompetitionRow {
  pub fn into_competition(self) -> Result<Competition> {
    Ok(Competition {
      id:        self.id,
      season_id: self.season_id,
      name:      self.name,
      raw:       decode_raw(&self.raw)?,
    })
  }
}

pub struct RawGroupRow {
  pub id:             String,
  pub competition_id: String,
  pub season_id:      String,
  pub name:           String,
  pub kind:           Option<String>,
  pub raw:            String,
}

impl RawGroupRow {
  pub fn into_group(self) -> Result<Group> {
    Ok(Group {
      id:             self.id,
      competition_id: self.competition_id,
      season_id:      self.season_id,
      name:           self.name,
      kind:           self.kind,
      raw:            decode_raw(&self.raw)?,
    })
  }
}

pub struct RawTeamRow {
  pub id:       String,
  pub name:     String,
  pub logo_url: Option<String>,
}

impl RawTeamRow {
  pub fn into_team(self) -> Team {
    Team { id: self.id, name: self.name, logo_url: self.logo_url }
  }
}

pub struct RawMatchRow {
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
  pub date:             String,
  pub status:           String,
  pub home_score:       Option<i64>,
  pub away_score:       Option<i64>,
  pub venue:            Option<String>,
  pub venue_address:    Option<String>,
  pub raw:              String,
}

impl RawMatchRow {
  pub fn into_match(self) -> Result<Match> {
    Ok(Match {
      id:               self.id,
      season_id:        self.season_id,
      competition_id:   self.competition_id,
      competition_name: self.competition_name,
      group_id:         self.group_id,
      group_name:       self.group_name,
      home_team_id:     self.home_team_id,
      home_team_name:   self.home_team_name,
      away_team_id:     self.away_team_id,
      away_team_name:   self.away_team_name,
      date:             decode_dt(&self.date)?,
      status:           decode_status(&self.status)?,
      home_score:       decode_score(self.home_score)?,
      away_score:       decode_score(self.away_score)?,
      venue:            self.venue,
      venue_address:    self.venue_address,
      raw:              decode_raw(&self.raw)?,
    })
  }
}

pub struct RawStandingRow {
  pub group_id: String,
  pub team_id:  String,
  pub position: Option<i64>,
  pub raw:      String,
}

impl RawStandingRow {
  pub fn into_standing(self) -> Result<StandingRow> {
    Ok(StandingRow {
      group_id: self.group_id,
      team_id:  self.team_id,
      position: self
        .position
        .map(|p| {
          u32::try_from(p)
            .map_err(|_| Error::Decode(format!("negative position {p}")))
        })
        .transpose()?,
      raw:      decode_raw(&self.raw)?,
    })
  }
}

pub const MATCH_COLUMNS: &str = "id, season_id, competition_id, \
   competition_name, group_id, group_name, home_team_id, home_team_name, \
   away_team_id, away_team_name, date, status, home_score, away_score, \
   venue, venue_address, raw";

/// Read a [`RawMatchRow`] from a row selected with [`MATCH_COLUMNS`].
pub fn match_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMatchRow> {
  Ok(RawMatchRow {
    id:               row.get(0)?,
    season_id:        row.get(1)?,
    competition_id:   row.get(2)?,
    competition_name: row.get(3)?,
    group_id:         row.get(4)?,
    group_name:       row.get(5)?,
    home_team_id:     row.get(6)?,
    home_team_name:   row.get(7)?,
    away_team_id:     row.get(8)?,
    away_team_name:   row.get(9)?,
    date:             row.get(10)?,
    status:           row.get(11)?,
    home_score:       row.get(12)?,
    away_score:       row.get(13)?,
    venue:            row.get(14)?,
    venue_address:    row.get(15)?,
    raw:              row.get(16)?,
  })
}
