//! [`RowStore`] — a hosted Postgres behind a PostgREST-style REST dialect.
//!
//! Rows are upserted per table with `Prefer: resolution=merge-duplicates`
//! and chunked at 500 per request. The freshness stamp is written last, so
//! staleness only ever improves once a whole ingest has landed; the REST
//! dialect offers no cross-table transaction, which is the accepted
//! trade-off of this backend. The schema is provisioned out of band with
//! row-level read policies; `connect` only verifies it is reachable.

use std::time::Duration;

use chrono::Utc;
use ibasketcal_core::{
  collate,
  matches::Match,
  season::{Competition, CompetitionWithGroups, Group, Season},
  store::{
    MatchFilter, META_LAST_SCRAPE, Snapshot, StandingRow, Store, StoreStats,
  },
  team::Team,
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
  Error, Result,
  rows::{
    CompetitionRecord, GroupRecord, MatchRecord, SeasonRecord,
    StandingRecord, TeamRecord,
  },
};

/// Upsert batch size; the REST gateway rejects oversized payloads.
const BATCH_SIZE: usize = 500;

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RowStore {
  http: reqwest::Client,
  url:  String,
  key:  String,
}

impl RowStore {
  /// Connect and verify the schema is reachable.
  pub async fn connect(url: impl Into<String>, key: impl Into<String>) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    let store = Self {
      http,
      url: url.into().trim_end_matches('/').to_string(),
      key: key.into(),
    };

    // A minimal probe; fails fast when the tables were never provisioned.
    store
      .select::<Value>("metadata", &[("select", "key".into()), ("limit", "1".into())])
      .await?;
    Ok(store)
  }

  fn endpoint(&self, table: &str) -> String {
    format!("{}/rest/v1/{table}", self.url)
  }

  fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    req.header("apikey", &self.key).bearer_auth(&self.key)
  }

  async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
      Ok(resp)
    } else {
      Err(Error::Api {
        status: status.as_u16(),
        body:   resp.text().await.unwrap_or_default(),
      })
    }
  }

  async fn select<T: DeserializeOwned>(
    &self,
    table: &str,
    query: &[(&str, String)],
  ) -> Result<Vec<T>> {
    let resp = self
      .authed(self.http.get(self.endpoint(table)).query(query))
      .send()
      .await?;
    Ok(Self::check(resp).await?.json().await?)
  }

  /// Upsert `rows` by `on_conflict` key, in chunks.
  async fn upsert(
    &self,
    table: &str,
    on_conflict: &str,
    rows: Vec<Value>,
  ) -> Result<()> {
    for chunk in rows.chunks(BATCH_SIZE) {
      let resp = self
        .authed(
          self
            .http
            .post(self.endpoint(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&chunk),
        )
        .send()
        .await?;
      Self::check(resp).await?;
    }
    Ok(())
  }

  /// Exact row count via the Content-Range response header.
  async fn count(&self, table: &str) -> Result<u64> {
    let resp = self
      .authed(
        self
          .http
          .get(self.endpoint(table))
          .query(&[("select", "id"), ("limit", "1")])
          .header("Prefer", "count=exact"),
      )
      .send()
      .await?;
    let resp = Self::check(resp).await?;
    let range = resp
      .headers()
      .get("content-range")
      .and_then(|v| v.to_str().ok())
      .unwrap_or("");
    range
      .rsplit('/')
      .next()
      .and_then(|total| total.parse::<u64>().ok())
      .ok_or_else(|| Error::Decode(format!("content-range {range:?}")))
  }
}

// ─── Filter helpers ──────────────────────────────────────────────────────────

/// Double-quote a value for use inside `or=(…)` so commas and parens in
/// team names cannot break the filter grammar.
fn quoted(value: &str) -> String {
  format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `*substring*` for `ilike`; literal wildcard characters are escaped.
fn ilike_pattern(needle: &str) -> String {
  let escaped = needle
    .replace('\\', "\\\\")
    .replace('%', "\\%")
    .replace('_', "\\_")
    .replace('*', "\\*");
  format!("*{escaped}*")
}

fn filter_query(filter: &MatchFilter) -> Vec<(&'static str, String)> {
  let mut query: Vec<(&'static str, String)> = vec![
    ("select", "*".into()),
    ("order", "date.asc,id.asc".into()),
  ];

  if let Some(season_id) = &filter.season_id {
    query.push(("season_id", format!("eq.{season_id}")));
  }
  if let Some(group_id) = &filter.group_id {
    query.push(("group_id", format!("eq.{group_id}")));
  } else if let Some(name) = &filter.competition_name {
    query.push(("competition_name", format!("ilike.{}", ilike_pattern(name))));
  }
  if let Some(team_id) = &filter.team_id {
    let v = quoted(team_id);
    query.push(("or", format!("(home_team_id.eq.{v},away_team_id.eq.{v})")));
  } else if let Some(team_name) = &filter.team_name {
    let v = quoted(&ilike_pattern(team_name));
    query.push((
      "or",
      format!("(home_team_name.ilike.{v},away_team_name.ilike.{v})"),
    ));
  }
  if let Some(status) = filter.status {
    query.push(("status", format!("eq.{}", status.as_str())));
  }
  if let Some(from) = filter.date_from {
    query.push(("date", format!("gte.{}", from.to_rfc3339())));
  }
  if let Some(to) = filter.date_to {
    query.push(("date", format!("lte.{}", to.to_rfc3339())));
  }
  if let Some(limit) = filter.limit {
    query.push(("limit", limit.to_string()));
  }
  query
}

// ─── Row serialisation ───────────────────────────────────────────────────────

fn season_row(s: &Season) -> Value {
  json!({
    "id": s.id,
    "name": s.name,
    "start_date": s.start_date,
    "end_date": s.end_date,
    "raw": s.raw,
  })
}

fn competition_row(c: &Competition) -> Value {
  json!({
    "id": c.id,
    "season_id": c.season_id,
    "name": c.name,
    "raw": c.raw,
  })
}

fn group_row(g: &Group) -> Value {
  json!({
    "id": g.id,
    "competition_id": g.competition_id,
    "season_id": g.season_id,
    "name": g.name,
    "kind": g.kind,
    "raw": g.raw,
  })
}

fn team_row(t: &Team) -> Value {
  json!({ "id": t.id, "name": t.name, "logo_url": t.logo_url })
}

fn match_row(m: &Match) -> Value {
  json!({
    "id": m.id,
    "season_id": m.season_id,
    "competition_id": m.competition_id,
    "competition_name": m.competition_name,
    "group_id": m.group_id,
    "group_name": m.group_name,
    "home_team_id": m.home_team_id,
    "home_team_name": m.home_team_name,
    "away_team_id": m.away_team_id,
    "away_team_name": m.away_team_name,
    "date": m.date.to_rfc3339(),
    "status": m.status.as_str(),
    "home_score": m.home_score,
    "away_score": m.away_score,
    "venue": m.venue,
    "venue_address": m.venue_address,
    "raw": m.raw,
  })
}

fn standing_row(s: &StandingRow) -> Value {
  json!({
    "group_id": s.group_id,
    "team_id": s.team_id,
    "position": s.position,
    "raw": s.raw,
  })
}

#[derive(Deserialize)]
struct MatchSides {
  home_team_id: Option<String>,
  away_team_id: Option<String>,
}

#[derive(Deserialize)]
struct MetadataValue {
  value: String,
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for RowStore {
  type Error = Error;

  async fn list_seasons(&self) -> Result<Vec<Season>> {
    let records: Vec<SeasonRecord> = self
      .select(
        "seasons",
        &[("select", "*".into()), ("order", "name.desc".into())],
      )
      .await?;
    Ok(records.into_iter().map(SeasonRecord::into_season).collect())
  }

  async fn list_competitions(
    &self,
    season_id: &str,
  ) -> Result<Vec<CompetitionWithGroups>> {
    let comps: Vec<CompetitionRecord> = self
      .select(
        "competitions",
        &[
          ("select", "*".into()),
          ("season_id", format!("eq.{season_id}")),
          ("order", "name.asc".into()),
        ],
      )
      .await?;
    let groups: Vec<GroupRecord> = self
      .select(
        "groups",
        &[
          ("select", "*".into()),
          ("season_id", format!("eq.{season_id}")),
          ("order", "name.asc".into()),
        ],
      )
      .await?;

    let groups: Vec<Group> =
      groups.into_iter().map(GroupRecord::into_group).collect();
    Ok(
      comps
        .into_iter()
        .map(|record| {
          let competition = record.into_competition();
          let groups = groups
            .iter()
            .filter(|g| g.competition_id == competition.id)
            .cloned()
            .collect();
          CompetitionWithGroups { competition, groups }
        })
        .collect(),
    )
  }

  async fn list_groups(&self, competition_id: &str) -> Result<Vec<Group>> {
    let records: Vec<GroupRecord> = self
      .select(
        "groups",
        &[
          ("select", "*".into()),
          ("competition_id", format!("eq.{competition_id}")),
          ("order", "name.asc".into()),
        ],
      )
      .await?;
    Ok(records.into_iter().map(GroupRecord::into_group).collect())
  }

  async fn list_teams(&self, group_id: &str) -> Result<Vec<Team>> {
    let sides: Vec<MatchSides> = self
      .select(
        "matches",
        &[
          ("select", "home_team_id,away_team_id".into()),
          ("group_id", format!("eq.{group_id}")),
        ],
      )
      .await?;

    let mut ids: Vec<String> = sides
      .into_iter()
      .flat_map(|s| [s.home_team_id, s.away_team_id])
      .flatten()
      .collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
      return Ok(Vec::new());
    }

    let id_list = ids
      .iter()
      .map(|id| quoted(id))
      .collect::<Vec<_>>()
      .join(",");
    let records: Vec<TeamRecord> = self
      .select(
        "teams",
        &[("select", "*".into()), ("id", format!("in.({id_list})"))],
      )
      .await?;

    let mut teams: Vec<Team> =
      records.into_iter().map(TeamRecord::into_team).collect();
    teams.sort_by(|a, b| collate::cmp_names(&a.name, &b.name));
    Ok(teams)
  }

  async fn find_matches(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
    let query = filter_query(filter);
    let records: Vec<MatchRecord> = self.select("matches", &query).await?;
    records.into_iter().map(MatchRecord::into_match).collect()
  }

  async fn list_standings(&self, group_id: &str) -> Result<Vec<StandingRow>> {
    let records: Vec<StandingRecord> = self
      .select(
        "standings",
        &[
          ("select", "*".into()),
          ("group_id", format!("eq.{group_id}")),
          ("order", "position.asc".into()),
        ],
      )
      .await?;
    records.into_iter().map(StandingRecord::into_standing).collect()
  }

  async fn bulk_replace(&self, snapshot: Snapshot) -> Result<()> {
    self
      .upsert("seasons", "id", snapshot.seasons.iter().map(season_row).collect())
      .await?;
    self
      .upsert(
        "competitions",
        "id",
        snapshot.competitions.iter().map(competition_row).collect(),
      )
      .await?;
    self
      .upsert("groups", "id", snapshot.groups.iter().map(group_row).collect())
      .await?;
    self
      .upsert("teams", "id", snapshot.teams.iter().map(team_row).collect())
      .await?;
    self
      .upsert("matches", "id", snapshot.matches.iter().map(match_row).collect())
      .await?;
    self
      .upsert(
        "standings",
        "group_id,team_id",
        snapshot.standings.iter().map(standing_row).collect(),
      )
      .await?;

    // Written last: freshness only advances once every table has landed.
    let now = Utc::now().to_rfc3339();
    self
      .upsert(
        "metadata",
        "key",
        vec![json!({ "key": META_LAST_SCRAPE, "value": now, "updated_at": now })],
      )
      .await?;
    Ok(())
  }

  async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
    let rows: Vec<MetadataValue> = self
      .select(
        "metadata",
        &[("select", "value".into()), ("key", format!("eq.{key}"))],
      )
      .await?;
    Ok(rows.into_iter().next().map(|row| row.value))
  }

  async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    self
      .upsert(
        "metadata",
        "key",
        vec![json!({ "key": key, "value": value, "updated_at": now })],
      )
      .await
  }

  async fn stats(&self) -> Result<StoreStats> {
    Ok(StoreStats {
      seasons:      self.count("seasons").await?,
      competitions: self.count("competitions").await?,
      groups:       self.count("groups").await?,
      teams:        self.count("teams").await?,
      matches:      self.count("matches").await?,
      standings:    self.count("standings").await?,
    })
  }

  async fn database_size_bytes(&self) -> Result<Option<u64>> { Ok(None) }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
