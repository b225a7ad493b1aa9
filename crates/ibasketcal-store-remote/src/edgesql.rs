//! [`EdgeSqlStore`] — SQL over HTTPS against a hosted libSQL-style service.
//!
//! The wire protocol is the v2 "pipeline" endpoint: a JSON list of
//! statements executed sequentially on one connection. A bulk replace ships
//! as a single pipeline wrapped in `BEGIN`/`COMMIT`; if any statement fails
//! the service skips the rest and drops the connection, which rolls the
//! transaction back, so the all-or-nothing contract holds without client
//! bookkeeping.

use std::time::Duration;

use chrono::Utc;
use ibasketcal_core::{
  collate,
  matches::Match,
  season::{CompetitionWithGroups, Group, Season},
  store::{
    MatchFilter, META_LAST_SCRAPE, META_SCHEMA_VERSION, SCHEMA_VERSION,
    Snapshot, StandingRow, Store, StoreStats,
  },
  team::Team,
};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  rows::{
    CompetitionRecord, GroupRecord, MatchRecord, SeasonRecord,
    StandingRecord, TeamRecord,
  },
};

// ─── Schema ──────────────────────────────────────────────────────────────────

/// Mirrors the embedded backend's DDL, one statement per entry because the
/// pipeline endpoint has no batch-script form.
const SCHEMA_STATEMENTS: &[&str] = &[
  "CREATE TABLE IF NOT EXISTS metadata (
     key TEXT PRIMARY KEY, value TEXT NOT NULL, updated_at TEXT NOT NULL)",
  "CREATE TABLE IF NOT EXISTS seasons (
     id TEXT PRIMARY KEY, name TEXT NOT NULL,
     start_date TEXT, end_date TEXT, raw TEXT NOT NULL)",
  "CREATE TABLE IF NOT EXISTS competitions (
     id TEXT PRIMARY KEY, season_id TEXT NOT NULL,
     name TEXT NOT NULL, raw TEXT NOT NULL)",
  "CREATE TABLE IF NOT EXISTS groups (
     id TEXT PRIMARY KEY, competition_id TEXT NOT NULL,
     season_id TEXT NOT NULL, name TEXT NOT NULL, kind TEXT,
     raw TEXT NOT NULL)",
  "CREATE TABLE IF NOT EXISTS matches (
     id TEXT PRIMARY KEY, season_id TEXT NOT NULL, competition_id TEXT,
     competition_name TEXT NOT NULL, group_id TEXT NOT NULL,
     group_name TEXT NOT NULL, home_team_id TEXT, home_team_name TEXT,
     away_team_id TEXT, away_team_name TEXT, date TEXT NOT NULL,
     status TEXT NOT NULL, home_score INTEGER, away_score INTEGER,
     venue TEXT, venue_address TEXT, raw TEXT NOT NULL)",
  "CREATE TABLE IF NOT EXISTS teams (
     id TEXT PRIMARY KEY, name TEXT NOT NULL, logo_url TEXT)",
  "CREATE TABLE IF NOT EXISTS standings (
     group_id TEXT NOT NULL, team_id TEXT NOT NULL, position INTEGER,
     raw TEXT NOT NULL, PRIMARY KEY (group_id, team_id))",
  "CREATE INDEX IF NOT EXISTS matches_season_idx ON matches(season_id)",
  "CREATE INDEX IF NOT EXISTS matches_group_idx ON matches(group_id)",
  "CREATE INDEX IF NOT EXISTS matches_comp_name_idx ON matches(competition_name)",
  "CREATE INDEX IF NOT EXISTS matches_date_idx ON matches(date)",
  "CREATE INDEX IF NOT EXISTS matches_status_idx ON matches(status)",
  "CREATE INDEX IF NOT EXISTS matches_home_id_idx ON matches(home_team_id)",
  "CREATE INDEX IF NOT EXISTS matches_away_id_idx ON matches(away_team_id)",
  "CREATE INDEX IF NOT EXISTS matches_home_name_idx ON matches(home_team_name)",
  "CREATE INDEX IF NOT EXISTS matches_away_name_idx ON matches(away_team_name)",
  "CREATE INDEX IF NOT EXISTS groups_comp_idx ON groups(competition_id)",
  "CREATE INDEX IF NOT EXISTS groups_season_idx ON groups(season_id)",
  "CREATE INDEX IF NOT EXISTS competitions_season_idx ON competitions(season_id)",
];

const MATCH_COLUMNS: &str = "id, season_id, competition_id, \
   competition_name, group_id, group_name, home_team_id, home_team_name, \
   away_team_id, away_team_name, date, status, home_score, away_score, \
   venue, venue_address, raw";

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct Stmt {
  sql:  String,
  args: Vec<Arg>,
}

impl Stmt {
  pub(crate) fn new(sql: impl Into<String>, args: Vec<Arg>) -> Self {
    Self { sql: sql.into(), args }
  }

  fn bare(sql: &str) -> Self { Self::new(sql, Vec::new()) }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum Arg {
  Text { value: String },
  Integer { value: String },
  Null,
}

impl Arg {
  pub(crate) fn text(s: impl Into<String>) -> Self {
    Arg::Text { value: s.into() }
  }

  pub(crate) fn opt_text(s: Option<impl Into<String>>) -> Self {
    match s {
      Some(s) => Arg::text(s),
      None => Arg::Null,
    }
  }

  pub(crate) fn opt_int(n: Option<u32>) -> Self {
    match n {
      Some(n) => Arg::Integer { value: n.to_string() },
      None => Arg::Null,
    }
  }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum PipelineEntry {
  Execute { stmt: Stmt },
  Close,
}

#[derive(Serialize)]
struct PipelineRequest {
  requests: Vec<PipelineEntry>,
}

#[derive(Deserialize)]
struct PipelineResponse {
  results: Vec<EntryResult>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum EntryResult {
  Ok { response: EntryResponse },
  Error { error: WireError },
}

#[derive(Deserialize)]
struct WireError {
  message: String,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum EntryResponse {
  Execute { result: StmtResult },
  Close,
}

#[derive(Deserialize, Default)]
struct StmtResult {
  #[serde(default)]
  rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Cell {
  Text { value: String },
  Integer { value: String },
  Float { value: f64 },
  Null,
}

impl Cell {
  fn str(&self) -> Result<String> {
    match self {
      Cell::Text { value } => Ok(value.clone()),
      Cell::Integer { value } => Ok(value.clone()),
      other => Err(Error::Decode(format!("expected text, got {other:?}"))),
    }
  }

  fn opt_str(&self) -> Result<Option<String>> {
    match self {
      Cell::Null => Ok(None),
      other => other.str().map(Some),
    }
  }

  fn opt_i64(&self) -> Result<Option<i64>> {
    match self {
      Cell::Null => Ok(None),
      Cell::Integer { value } => value
        .parse::<i64>()
        .map(Some)
        .map_err(|e| Error::Decode(format!("integer {value:?}: {e}"))),
      Cell::Float { value } => Ok(Some(*value as i64)),
      Cell::Text { value } => Err(Error::Decode(format!(
        "expected integer, got text {value:?}"
      ))),
    }
  }

  fn i64(&self) -> Result<i64> {
    self
      .opt_i64()?
      .ok_or_else(|| Error::Decode("expected integer, got null".into()))
  }

  fn json(&self) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(&self.str()?)?)
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A basketball data store on a hosted libSQL-style edge service.
#[derive(Clone)]
pub struct EdgeSqlStore {
  http:  reqwest::Client,
  url:   String,
  token: String,
}

impl EdgeSqlStore {
  /// Connect, authenticate and run schema initialisation.
  pub async fn connect(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    let store = Self {
      http,
      url: url.into().trim_end_matches('/').to_string(),
      token: token.into(),
    };

    let mut stmts: Vec<Stmt> =
      SCHEMA_STATEMENTS.iter().map(|s| Stmt::bare(s)).collect();
    stmts.push(Stmt::new(
      "INSERT OR REPLACE INTO metadata (key, value, updated_at)
       VALUES (?, ?, ?)",
      vec![
        Arg::text(META_SCHEMA_VERSION),
        Arg::text(SCHEMA_VERSION.to_string()),
        Arg::text(Utc::now().to_rfc3339()),
      ],
    ));
    store.pipeline(stmts, None).await?;
    Ok(store)
  }

  /// Execute `stmts` sequentially on one connection and return each
  /// statement's rows. `timeout` overrides the client default for long
  /// ingest pipelines.
  async fn pipeline(
    &self,
    stmts: Vec<Stmt>,
    timeout: Option<Duration>,
  ) -> Result<Vec<Vec<Vec<Cell>>>> {
    let mut requests: Vec<PipelineEntry> =
      stmts.into_iter().map(|stmt| PipelineEntry::Execute { stmt }).collect();
    requests.push(PipelineEntry::Close);

    let mut req = self
      .http
      .post(format!("{}/v2/pipeline", self.url))
      .bearer_auth(&self.token)
      .json(&PipelineRequest { requests });
    if let Some(timeout) = timeout {
      req = req.timeout(timeout);
    }

    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Api {
        status: status.as_u16(),
        body:   resp.text().await.unwrap_or_default(),
      });
    }

    let parsed: PipelineResponse = resp.json().await?;
    let mut results = Vec::new();
    for entry in parsed.results {
      match entry {
        EntryResult::Ok { response: EntryResponse::Execute { result } } => {
          results.push(result.rows);
        }
        EntryResult::Ok { response: EntryResponse::Close } => {}
        EntryResult::Error { error } => {
          return Err(Error::Statement(error.message));
        }
      }
    }
    Ok(results)
  }

  async fn query(&self, stmt: Stmt) -> Result<Vec<Vec<Cell>>> {
    let mut results = self.pipeline(vec![stmt], None).await?;
    Ok(results.pop().unwrap_or_default())
  }
}

// ─── Cell-to-record decoding ─────────────────────────────────────────────────

fn season_from_cells(cells: &[Cell]) -> Result<SeasonRecord> {
  Ok(SeasonRecord {
    id:         cells[0].str()?,
    name:       cells[1].str()?,
    start_date: cells[2].opt_str()?,
    end_date:   cells[3].opt_str()?,
    raw:        cells[4].json()?,
  })
}

fn competition_from_cells(cells: &[Cell]) -> Result<CompetitionRecord> {
  Ok(CompetitionRecord {
    id:        cells[0].str()?,
    season_id: cells[1].str()?,
    name:      cells[2].str()?,
    raw:       cells[3].json()?,
  })
}

fn group_from_cells(cells: &[Cell]) -> Result<GroupRecord> {
  Ok(GroupRecord {
    id:             cells[0].str()?,
    competition_id: cells[1].str()?,
    season_id:      cells[2].str()?,
    name:           cells[3].str()?,
    kind:           cells[4].opt_str()?,
    raw:            cells[5].json()?,
  })
}

fn team_from_cells(cells: &[Cell]) -> Result<TeamRecord> {
  Ok(TeamRecord {
    id:       cells[0].str()?,
    name:     cells[1].str()?,
    logo_url: cells[2].opt_str()?,
  })
}

fn match_from_cells(cells: &[Cell]) -> Result<MatchRecord> {
  Ok(MatchRecord {
    id:               cells[0].str()?,
    season_id:        cells[1].str()?,
    competition_id:   cells[2].opt_str()?,
    competition_name: cells[3].str()?,
    group_id:         cells[4].str()?,
    group_name:       cells[5].str()?,
    home_team_id:     cells[6].opt_str()?,
    home_team_name:   cells[7].opt_str()?,
    away_team_id:     cells[8].opt_str()?,
    away_team_name:   cells[9].opt_str()?,
    date:             cells[10].str()?,
    status:           cells[11].str()?,
    home_score:       cells[12].opt_i64()?,
    away_score:       cells[13].opt_i64()?,
    venue:            cells[14].opt_str()?,
    venue_address:    cells[15].opt_str()?,
    raw:              cells[16].json()?,
  })
}

fn standing_from_cells(cells: &[Cell]) -> Result<StandingRecord> {
  Ok(StandingRecord {
    group_id: cells[0].str()?,
    team_id:  cells[1].str()?,
    position: cells[2].opt_i64()?,
    raw:      cells[3].json()?,
  })
}

/// Build the WHERE clause and ordered args for a [`MatchFilter`].
pub(crate) fn filter_sql(filter: &MatchFilter) -> (String, Vec<Arg>) {
  let mut conds: Vec<&'static str> = Vec::new();
  let mut args: Vec<Arg> = Vec::new();

  if let Some(season_id) = &filter.season_id {
    conds.push("season_id = ?");
    args.push(Arg::text(season_id.clone()));
  }
  if let Some(group_id) = &filter.group_id {
    conds.push("group_id = ?");
    args.push(Arg::text(group_id.clone()));
  } else if let Some(name) = &filter.competition_name {
    conds.push("competition_name LIKE ? ESCAPE '\\'");
    args.push(Arg::text(like_pattern(name)));
  }
  if let Some(team_id) = &filter.team_id {
    conds.push("(home_team_id = ? OR away_team_id = ?)");
    args.push(Arg::text(team_id.clone()));
    args.push(Arg::text(team_id.clone()));
  } else if let Some(team_name) = &filter.team_name {
    conds.push(
      "(home_team_name LIKE ? ESCAPE '\\' OR away_team_name LIKE ? ESCAPE '\\')",
    );
    args.push(Arg::text(like_pattern(team_name)));
    args.push(Arg::text(like_pattern(team_name)));
  }
  if let Some(status) = filter.status {
    conds.push("status = ?");
    args.push(Arg::text(status.as_str()));
  }
  if let Some(from) = filter.date_from {
    conds.push("date >= ?");
    args.push(Arg::text(from.to_rfc3339()));
  }
  if let Some(to) = filter.date_to {
    conds.push("date <= ?");
    args.push(Arg::text(to.to_rfc3339()));
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (where_clause, args)
}

fn like_pattern(needle: &str) -> String {
  let escaped = needle
    .replace('\\', "\\\\")
    .replace('%', "\\%")
    .replace('_', "\\_");
  format!("%{escaped}%")
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for EdgeSqlStore {
  type Error = Error;

  async fn list_seasons(&self) -> Result<Vec<Season>> {
    let rows = self
      .query(Stmt::bare(
        "SELECT id, name, start_date, end_date, raw
         FROM seasons ORDER BY name DESC",
      ))
      .await?;
    rows
      .iter()
      .map(|cells| Ok(season_from_cells(cells)?.into_season()))
      .collect()
  }

  async fn list_competitions(
    &self,
    season_id: &str,
  ) -> Result<Vec<CompetitionWithGroups>> {
    let results = self
      .pipeline(
        vec![
          Stmt::new(
            "SELECT id, season_id, name, raw FROM competitions
             WHERE season_id = ? ORDER BY name",
            vec![Arg::text(season_id)],
          ),
          Stmt::new(
            "SELECT id, competition_id, season_id, name, kind, raw
             FROM groups WHERE season_id = ? ORDER BY name",
            vec![Arg::text(season_id)],
          ),
        ],
        None,
      )
      .await?;

    let [comp_rows, group_rows] = results.as_slice() else {
      return Err(Error::Decode("pipeline returned wrong shape".into()));
    };

    let groups: Vec<Group> = group_rows
      .iter()
      .map(|cells| Ok(group_from_cells(cells)?.into_group()))
      .collect::<Result<_>>()?;

    comp_rows
      .iter()
      .map(|cells| {
        let competition = competition_from_cells(cells)?.into_competition();
        let groups = groups
          .iter()
          .filter(|g| g.competition_id == competition.id)
          .cloned()
          .collect();
        Ok(CompetitionWithGroups { competition, groups })
      })
      .collect()
  }

  async fn list_groups(&self, competition_id: &str) -> Result<Vec<Group>> {
    let rows = self
      .query(Stmt::new(
        "SELECT id, competition_id, season_id, name, kind, raw
         FROM groups WHERE competition_id = ? ORDER BY name",
        vec![Arg::text(competition_id)],
      ))
      .await?;
    rows
      .iter()
      .map(|cells| Ok(group_from_cells(cells)?.into_group()))
      .collect()
  }

  async fn list_teams(&self, group_id: &str) -> Result<Vec<Team>> {
    let rows = self
      .query(Stmt::new(
        "SELECT DISTINCT t.id, t.name, t.logo_url
         FROM teams t
         JOIN matches m ON t.id = m.home_team_id OR t.id = m.away_team_id
         WHERE m.group_id = ?",
        vec![Arg::text(group_id)],
      ))
      .await?;

    let mut teams: Vec<Team> = rows
      .iter()
      .map(|cells| Ok(team_from_cells(cells)?.into_team()))
      .collect::<Result<_>>()?;
    teams.sort_by(|a, b| collate::cmp_names(&a.name, &b.name));
    Ok(teams)
  }

  async fn find_matches(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
    let (where_clause, args) = filter_sql(filter);
    let limit_clause = filter
      .limit
      .map(|n| format!(" LIMIT {n}"))
      .unwrap_or_default();
    let rows = self
      .query(Stmt::new(
        format!(
          "SELECT {MATCH_COLUMNS} FROM matches {where_clause}
           ORDER BY date ASC, id ASC{limit_clause}"
        ),
        args,
      ))
      .await?;

    rows
      .iter()
      .map(|cells| match_from_cells(cells)?.into_match())
      .collect()
  }

  async fn list_standings(&self, group_id: &str) -> Result<Vec<StandingRow>> {
    let rows = self
      .query(Stmt::new(
        "SELECT group_id, team_id, position, raw FROM standings
         WHERE group_id = ? ORDER BY position",
        vec![Arg::text(group_id)],
      ))
      .await?;
    rows
      .iter()
      .map(|cells| standing_from_cells(cells)?.into_standing())
      .collect()
  }

  async fn bulk_replace(&self, snapshot: Snapshot) -> Result<()> {
    let mut stmts = vec![Stmt::bare("BEGIN")];

    for s in &snapshot.seasons {
      stmts.push(Stmt::new(
        "INSERT OR REPLACE INTO seasons (id, name, start_date, end_date, raw)
         VALUES (?, ?, ?, ?, ?)",
        vec![
          Arg::text(s.id.clone()),
          Arg::text(s.name.clone()),
          Arg::opt_text(s.start_date.clone()),
          Arg::opt_text(s.end_date.clone()),
          Arg::text(s.raw.to_string()),
        ],
      ));
    }
    for c in &snapshot.competitions {
      stmts.push(Stmt::new(
        "INSERT OR REPLACE INTO competitions (id, season_id, name, raw)
         VALUES (?, ?, ?, ?)",
        vec![
          Arg::text(c.id.clone()),
          Arg::text(c.season_id.clone()),
          Arg::text(c.name.clone()),
          Arg::text(c.raw.to_string()),
        ],
      ));
    }
    for g in &snapshot.groups {
      stmts.push(Stmt::new(
        "INSERT OR REPLACE INTO groups
         (id, competition_id, season_id, name, kind, raw)
         VALUES (?, ?, ?, ?, ?, ?)",
        vec![
          Arg::text(g.id.clone()),
          Arg::text(g.competition_id.clone()),
          Arg::text(g.season_id.clone()),
          Arg::text(g.name.clone()),
          Arg::opt_text(g.kind.clone()),
          Arg::text(g.raw.to_string()),
        ],
      ));
    }
    for t in &snapshot.teams {
      stmts.push(Stmt::new(
        "INSERT OR REPLACE INTO teams (id, name, logo_url) VALUES (?, ?, ?)",
        vec![
          Arg::text(t.id.clone()),
          Arg::text(t.name.clone()),
          Arg::opt_text(t.logo_url.clone()),
        ],
      ));
    }
    for m in &snapshot.matches {
      stmts.push(Stmt::new(
        format!(
          "INSERT OR REPLACE INTO matches ({MATCH_COLUMNS})
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        vec![
          Arg::text(m.id.clone()),
          Arg::text(m.season_id.clone()),
          Arg::opt_text(m.competition_id.clone()),
          Arg::text(m.competition_name.clone()),
          Arg::text(m.group_id.clone()),
          Arg::text(m.group_name.clone()),
          Arg::opt_text(m.home_team_id.clone()),
          Arg::opt_text(m.home_team_name.clone()),
          Arg::opt_text(m.away_team_id.clone()),
          Arg::opt_text(m.away_team_name.clone()),
          Arg::text(m.date.to_rfc3339()),
          Arg::text(m.status.as_str()),
          Arg::opt_int(m.home_score),
          Arg::opt_int(m.away_score),
          Arg::opt_text(m.venue.clone()),
          Arg::opt_text(m.venue_address.clone()),
          Arg::text(m.raw.to_string()),
        ],
      ));
    }
    for s in &snapshot.standings {
      stmts.push(Stmt::new(
        "INSERT OR REPLACE INTO standings (group_id, team_id, position, raw)
         VALUES (?, ?, ?, ?)",
        vec![
          Arg::text(s.group_id.clone()),
          Arg::text(s.team_id.clone()),
          Arg::opt_int(s.position),
          Arg::text(s.raw.to_string()),
        ],
      ));
    }

    let now = Utc::now().to_rfc3339();
    stmts.push(Stmt::new(
      "INSERT OR REPLACE INTO metadata (key, value, updated_at)
       VALUES (?, ?, ?)",
      vec![Arg::text(META_LAST_SCRAPE), Arg::text(now.clone()), Arg::text(now)],
    ));
    stmts.push(Stmt::bare("COMMIT"));

    // Ingest pipelines can carry ~10⁵ rows; no deadline here.
    self.pipeline(stmts, Some(Duration::from_secs(3600))).await?;
    Ok(())
  }

  async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
    let rows = self
      .query(Stmt::new(
        "SELECT value FROM metadata WHERE key = ?",
        vec![Arg::text(key)],
      ))
      .await?;
    rows.first().map(|cells| cells[0].str()).transpose()
  }

  async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
    self
      .query(Stmt::new(
        "INSERT OR REPLACE INTO metadata (key, value, updated_at)
         VALUES (?, ?, ?)",
        vec![
          Arg::text(key),
          Arg::text(value),
          Arg::text(Utc::now().to_rfc3339()),
        ],
      ))
      .await?;
    Ok(())
  }

  async fn stats(&self) -> Result<StoreStats> {
    let tables =
      ["seasons", "competitions", "groups", "teams", "matches", "standings"];
    let stmts = tables
      .iter()
      .map(|t| Stmt::bare(&format!("SELECT COUNT(*) FROM {t}")))
      .collect();
    let results = self.pipeline(stmts, None).await?;

    let mut counts = [0u64; 6];
    for (i, rows) in results.iter().enumerate() {
      let cells = rows
        .first()
        .ok_or_else(|| Error::Decode("missing count row".into()))?;
      counts[i] = cells[0].i64()? as u64;
    }
    Ok(StoreStats {
      seasons:      counts[0],
      competitions: counts[1],
      groups:       counts[2],
      teams:        counts[3],
      matches:      counts[4],
      standings:    counts[5],
    })
  }

  async fn database_size_bytes(&self) -> Result<Option<u64>> { Ok(None) }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use ibasketcal_core::matches::MatchStatus;

  use super::*;

  #[test]
  fn filter_sql_orders_args_with_clauses() {
    let filter = MatchFilter {
      season_id: Some("s1".into()),
      team_name: Some("מכבי".into()),
      status: Some(MatchStatus::Closed),
      ..Default::default()
    };
    let (where_clause, args) = filter_sql(&filter);
    assert_eq!(
      where_clause,
      "WHERE season_id = ? AND (home_team_name LIKE ? ESCAPE '\\' OR \
       away_team_name LIKE ? ESCAPE '\\') AND status = ?"
    );
    assert_eq!(args.len(), 4);
    assert!(matches!(&args[1], Arg::Text { value } if value == "%מכבי%"));
    assert!(matches!(&args[3], Arg::Text { value } if value == "CLOSED"));
  }

  #[test]
  fn group_id_suppresses_competition_name() {
    let filter = MatchFilter {
      group_id: Some("g1".into()),
      competition_name: Some("ליגה".into()),
      ..Default::default()
    };
    let (where_clause, args) = filter_sql(&filter);
    assert_eq!(where_clause, "WHERE group_id = ?");
    assert_eq!(args.len(), 1);
  }

  #[test]
  fn statement_args_serialize_in_wire_shape() {
    let stmt = Stmt::new(
      "SELECT 1",
      vec![Arg::text("x"), Arg::opt_int(Some(3)), Arg::opt_text(None::<String>)],
    );
    let json = serde_json::to_value(&stmt).unwrap();
    assert_eq!(
      json["args"],
      serde_json::json!([
        { "type": "text", "value": "x" },
        { "type": "integer", "value": "3" },
        { "type": "null" },
      ])
    );
  }

  #[test]
  fn cells_decode_expected_variants() {
    let cell: Cell =
      serde_json::from_value(serde_json::json!({ "type": "integer", "value": "42" }))
        .unwrap();
    assert_eq!(cell.i64().unwrap(), 42);
    let cell: Cell =
      serde_json::from_value(serde_json::json!({ "type": "null" })).unwrap();
    assert_eq!(cell.opt_str().unwrap(), None);
  }
}
