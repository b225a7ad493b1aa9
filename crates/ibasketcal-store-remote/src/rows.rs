//! Wire-row types shared by both remote backends.
//!
//! The edge-SQL backend fills these from positional result cells; the
//! row-store backend deserialises them straight from JSON objects. Both
//! funnel into the core entity types through the `into_*` conversions.

use chrono::{DateTime, Utc};
use ibasketcal_core::{
  matches::{Match, MatchStatus},
  season::{Competition, Group, Season},
  store::StandingRow,
  team::Team,
};
use serde::Deserialize;

use crate::{Error, Result};

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn decode_status(s: &str) -> Result<MatchStatus> {
  MatchStatus::try_from(s).map_err(|e| Error::Decode(e.to_string()))
}

fn decode_score(v: Option<i64>) -> Result<Option<u32>> {
  v.map(|n| {
    u32::try_from(n).map_err(|_| Error::Decode(format!("negative score {n}")))
  })
  .transpose()
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SeasonRecord {
  pub id:         String,
  pub name:       String,
  pub start_date: Option<String>,
  pub end_date:   Option<String>,
  pub raw:        serde_json::Value,
}

impl SeasonRecord {
  pub fn into_season(self) -> Season {
    Season {
      id:         self.id,
      name:       self.name,
      start_date: self.start_date,
      end_date:   self.end_date,
      raw:        self.raw,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct CompetitionRecord {
  pub id:        String,
  pub season_id: String,
  pub name:      String,
  pub raw:       serde_json::Value,
}

impl CompetitionRecord {
  pub fn into_competition(self) -> Competition {
    Competition {
      id:        self.id,
      season_id: self.season_id,
      name:      self.name,
      raw:       self.raw,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct GroupRecord {
  pub id:             String,
  pub competition_id: String,
  pub season_id:      String,
  pub name:           String,
  pub kind:           Option<String>,
  pub raw:            serde_json::Value,
}

impl GroupRecord {
  pub fn into_group(self) -> Group {
    Group {
      id:             self.id,
      competition_id: self.competition_id,
      season_id:      self.season_id,
      name:           self.name,
      kind:           self.kind,
      raw:            self.raw,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct TeamRecord {
  pub id:       String,
  pub name:     String,
  pub logo_url: Option<String>,
}

impl TeamRecord {
  pub fn into_team(self) -> Team {
    Team { id: self.id, name: self.name, logo_url: self.logo_url }
  }
}

#[derive(Debug, Deserialize)]
pub struct MatchRecord {
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
  pub raw:              serde_json::Value,
}

impl MatchRecord {
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
      raw:              self.raw,
    })
  }
}

#[derive(Debug, Deserialize)]
pub struct StandingRecord {
  pub group_id: String,
  pub team_id:  String,
  pub position: Option<i64>,
  pub raw:      serde_json::Value,
}

impl StandingRecord {
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
      raw:      self.raw,
    })
  }
}
