//! Full-pass scrape orchestration.
//!
//! One run walks the whole entity graph: token → seasons → competitions per
//! season → calendar (and standings) per group, with a bounded number of
//! group fetches in flight. Rounds are flattened into match rows with
//! competition and group names denormalised on, and everything lands in a
//! single [`Snapshot`] — only the final bulk replace is observable.
//!
//! A 401 anywhere triggers exactly one token renewal shared by all in-flight
//! group tasks; a second expiry fails the scrape.

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use futures::StreamExt as _;
use ibasketcal_core::{
  matches::{Match, MatchStatus},
  season::{Competition, Group, Season},
  store::{Snapshot, StandingRow},
  team::Team,
};
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  harvester::{Token, TokenHarvester},
  raw::{RawCalendar, RawMatch},
  refresh::{ProgressSink, ScrapeProgress, ScrapeRunner},
  upstream::UpstreamClient,
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
  /// Bound on simultaneous in-flight group fetches.
  pub parallelism:   usize,
  /// Budget for the whole fetch phase. The bulk replace that follows runs
  /// outside this budget — it must commit or fail on its own terms.
  pub fetch_timeout: Duration,
}

impl Default for ScrapeConfig {
  fn default() -> Self {
    Self { parallelism: 6, fetch_timeout: Duration::from_secs(15 * 60) }
  }
}

// ─── Shared token cell ───────────────────────────────────────────────────────

/// The scrape-wide token, renewable exactly once.
struct TokenCell {
  harvester: Arc<TokenHarvester>,
  token:     Mutex<Token>,
  renewed:   AtomicBool,
}

impl TokenCell {
  fn new(harvester: Arc<TokenHarvester>, token: Token) -> Self {
    Self { harvester, token: Mutex::new(token), renewed: AtomicBool::new(false) }
  }

  async fn current(&self) -> Token { self.token.lock().await.clone() }

  /// Renew after `failed` bounced with a 401. Concurrent losers of the race
  /// just pick up the fresh token; a renewal after the one allowed renewal
  /// fails the scrape.
  async fn renew(&self, failed: &Token) -> Result<Token> {
    let mut slot = self.token.lock().await;
    if *slot != *failed {
      return Ok(slot.clone());
    }
    if self.renewed.swap(true, Ordering::SeqCst) {
      return Err(Error::AuthExpired);
    }
    info!("upstream token expired mid-scrape, harvesting a fresh one");
    let fresh = self.harvester.acquire().await?;
    *slot = fresh.clone();
    Ok(fresh)
  }
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct Orchestrator {
  harvester: Arc<TokenHarvester>,
  client:    UpstreamClient,
  cfg:       ScrapeConfig,
}

/// Denormalisation context for one group's matches.
#[derive(Debug, Clone)]
struct GroupContext {
  season_id:        String,
  season_name:      String,
  competition_id:   String,
  competition_name: String,
  group_id:         String,
  group_name:       String,
}

struct GroupData {
  ctx:       GroupContext,
  calendar:  RawCalendar,
  standings: Vec<Value>,
}

impl Orchestrator {
  pub fn new(
    harvester: Arc<TokenHarvester>,
    client: UpstreamClient,
    cfg: ScrapeConfig,
  ) -> Self {
    Self { harvester, client, cfg }
  }

  /// Run `call` with the current token, retrying once after a renewal.
  async fn with_token<T, F, Fut>(&self, cell: &TokenCell, call: F) -> Result<T>
  where
    F: Fn(Token) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let token = cell.current().await;
    match call(token.clone()).await {
      Err(Error::AuthExpired) => {
        let fresh = cell.renew(&token).await?;
        call(fresh).await
      }
      other => other,
    }
  }

  async fn fetch_group(&self, cell: &TokenCell, ctx: GroupContext) -> Result<GroupData> {
    let calendar = self
      .with_token(cell, |token| {
        let group_id = ctx.group_id.clone();
        async move { self.client.calendar(&token, &group_id).await }
      })
      .await?;

    // Standings enrich the store but are not worth failing a scrape over.
    let standings = match self
      .with_token(cell, |token| {
        let group_id = ctx.group_id.clone();
        async move { self.client.standings(&token, &group_id).await }
      })
      .await
    {
      Ok(rows) => rows,
      Err(e) => {
        warn!(group = %ctx.group_id, error = %e, "standings fetch failed, skipping");
        Vec::new()
      }
    };

    Ok(GroupData { ctx, calendar, standings })
  }

  async fn fetch_snapshot(
    &self,
    cell: &TokenCell,
    progress: &ProgressSink,
    cancel: &mut watch::Receiver<bool>,
  ) -> Result<Snapshot> {
    if *cancel.borrow() {
      return Err(Error::Cancelled);
    }

    let raw_seasons = self
      .with_token(cell, |token| async move { self.client.seasons(&token).await })
      .await?;
    info!(seasons = raw_seasons.len(), "seasons fetched");

    let mut snapshot = Snapshot::default();
    let mut jobs: Vec<GroupContext> = Vec::new();

    for raw_season in &raw_seasons {
      snapshot.seasons.push(Season {
        id:         raw_season.id.clone(),
        name:       raw_season.name.clone(),
        start_date: raw_season.start_date.clone(),
        end_date:   raw_season.end_date.clone(),
        raw:        raw_season.raw.clone(),
      });

      let competitions = self
        .with_token(cell, |token| {
          let season_id = raw_season.id.clone();
          async move { self.client.competitions(&token, &season_id).await }
        })
        .await?;

      for comp in competitions {
        // Some competitions arrive without an id of their own.
        let competition_id = comp
          .id
          .clone()
          .unwrap_or_else(|| format!("{}_{}", raw_season.id, comp.name));

        snapshot.competitions.push(Competition {
          id:        competition_id.clone(),
          season_id: raw_season.id.clone(),
          name:      comp.name.clone(),
          raw:       comp.raw.clone(),
        });

        for group in &comp.groups {
          let Some(group_id) = group.id.clone() else {
            debug!(competition = %comp.name, "skipping group without id");
            continue;
          };
          snapshot.groups.push(Group {
            id:             group_id.clone(),
            competition_id: competition_id.clone(),
            season_id:      raw_season.id.clone(),
            name:           group.name.clone(),
            kind:           group.kind.clone(),
            raw:            group.raw.clone(),
          });
          jobs.push(GroupContext {
            season_id: raw_season.id.clone(),
            season_name: raw_season.name.clone(),
            competition_id: competition_id.clone(),
            competition_name: comp.name.clone(),
            group_id,
            group_name: group.name.clone(),
          });
        }
      }
    }

    let total = jobs.len();
    info!(groups = total, "walking group calendars");
    progress.publish(ScrapeProgress {
      groups_done:    0,
      groups_total:   total,
      current_season: None,
    });
    let mut done = 0usize;

    let mut stream = futures::stream::iter(
      jobs.into_iter().map(|ctx| self.fetch_group(cell, ctx)),
    )
    .buffer_unordered(self.cfg.parallelism.max(1));

    let mut teams: std::collections::BTreeMap<String, Team> = Default::default();
    loop {
      let item = tokio::select! {
        item = stream.next() => item,
        _ = cancel.wait_for(|stop| *stop) => return Err(Error::Cancelled),
      };
      let Some(item) = item else { break };
      let data = item?;

      done += 1;
      progress.publish(ScrapeProgress {
        groups_done:    done,
        groups_total:   total,
        current_season: Some(data.ctx.season_name.clone()),
      });

      let (matches, group_teams) = flatten_group(&data.ctx, &data.calendar);
      for team in group_teams {
        teams.insert(team.id.clone(), team);
      }
      snapshot.matches.extend(matches);
      snapshot
        .standings
        .extend(standing_rows(&data.ctx.group_id, data.standings));
    }

    snapshot.teams = teams.into_values().collect();
    Ok(snapshot)
  }
}

// ─── Flattening ──────────────────────────────────────────────────────────────

/// Flatten a group's rounds into match rows plus the teams seen in them.
fn flatten_group(ctx: &GroupContext, calendar: &RawCalendar) -> (Vec<Match>, Vec<Team>) {
  let mut matches = Vec::new();
  let mut teams: Vec<Team> = Vec::new();

  for round in &calendar.rounds {
    for value in &round.matches {
      let Some(m) = match_from_value(ctx, value) else {
        debug!(group = %ctx.group_id, "skipping malformed match row");
        continue;
      };
      for raw_team in [&value["homeTeam"], &value["awayTeam"]] {
        if let (Some(id), name) = (
          raw_team["id"].as_str(),
          raw_team["name"].as_str().unwrap_or_default(),
        ) {
          teams.push(Team {
            id:       id.to_string(),
            name:     name.to_string(),
            logo_url: raw_team["logo"].as_str().map(str::to_string),
          });
        }
      }
      matches.push(m);
    }
  }

  (matches, teams)
}

fn match_from_value(ctx: &GroupContext, value: &Value) -> Option<Match> {
  let raw: RawMatch = serde_json::from_value(value.clone()).ok()?;
  let id = raw.id?;
  let date = parse_upstream_date(raw.date.as_deref()?)?;
  let status = MatchStatus::parse_lenient(raw.status.as_deref().unwrap_or(""));

  let home = raw.home_team.as_ref();
  let away = raw.away_team.as_ref();
  let home_id = home.and_then(|t| t.id.clone());
  let away_id = away.and_then(|t| t.id.clone());

  // Totals carry a teamId each; order in the array is not guaranteed.
  let totals = raw.score.as_ref().map(|s| s.totals.as_slice()).unwrap_or(&[]);
  let score_for = |team_id: &Option<String>| {
    let team_id = team_id.as_deref()?;
    totals
      .iter()
      .find(|t| t.team_id.as_deref() == Some(team_id))
      .and_then(|t| t.total)
      .and_then(|n| u32::try_from(n).ok())
  };

  Some(Match {
    id,
    season_id: ctx.season_id.clone(),
    competition_id: Some(ctx.competition_id.clone()),
    competition_name: ctx.competition_name.clone(),
    group_id: ctx.group_id.clone(),
    group_name: ctx.group_name.clone(),
    home_score: score_for(&home_id),
    away_score: score_for(&away_id),
    home_team_id: home_id,
    home_team_name: home.and_then(|t| t.name.clone()),
    away_team_id: away_id,
    away_team_name: away.and_then(|t| t.name.clone()),
    date,
    status,
    venue: raw.court.as_ref().and_then(|c| c.place.clone()),
    venue_address: raw.court.as_ref().and_then(|c| c.address.clone()),
    raw: value.clone(),
  })
}

fn parse_upstream_date(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .ok()
}

fn standing_rows(group_id: &str, rows: Vec<Value>) -> Vec<StandingRow> {
  rows
    .into_iter()
    .filter_map(|value| {
      let team_id = value["teamId"].as_str()?.to_string();
      let position = value["position"].as_u64().and_then(|p| u32::try_from(p).ok());
      Some(StandingRow {
        group_id: group_id.to_string(),
        team_id,
        position,
        raw: value,
      })
    })
    .collect()
}

// ─── ScrapeRunner impl ───────────────────────────────────────────────────────

impl ScrapeRunner for Orchestrator {
  async fn run(
    &self,
    progress: ProgressSink,
    mut cancel: watch::Receiver<bool>,
  ) -> Result<Snapshot> {
    let started = Instant::now();

    let token = self.harvester.acquire().await?;
    let cell = TokenCell::new(self.harvester.clone(), token);

    let snapshot = tokio::time::timeout(
      self.cfg.fetch_timeout,
      self.fetch_snapshot(&cell, &progress, &mut cancel),
    )
    .await
    .map_err(|_| Error::Timeout(self.cfg.fetch_timeout))??;

    info!(
      seasons = snapshot.seasons.len(),
      groups = snapshot.groups.len(),
      matches = snapshot.matches.len(),
      teams = snapshot.teams.len(),
      elapsed_s = started.elapsed().as_secs(),
      "scrape fetch phase complete"
    );
    Ok(snapshot)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn ctx() -> GroupContext {
    GroupContext {
      season_id:        "s1".into(),
      season_name:      "2025/2026".into(),
      competition_id:   "c1".into(),
      competition_name: "ליגת העל".into(),
      group_id:         "g17".into(),
      group_name:       "Regular".into(),
    }
  }

  fn calendar() -> RawCalendar {
    serde_json::from_value(json!({
      "rounds": [
        {
          "round": 1,
          "matches": [
            {
              "id": "m1",
              "date": "2025-11-04T18:30:00Z",
              "status": "CLOSED",
              "homeTeam": { "id": "t7", "name": "הפועל", "logo": "h.png" },
              "awayTeam": { "id": "t8", "name": "מכבי" },
              "score": { "totals": [
                { "teamId": "t8", "total": 81 },
                { "teamId": "t7", "total": 88 },
              ]},
              "court": { "place": "היכל טוטו", "address": "חולון" },
            },
            { "name": "row without id is skipped" },
          ],
        },
        {
          "round": 2,
          "matches": [
            {
              "id": "m2",
              "date": "2025-11-11T19:00:00Z",
              "status": "NOT_STARTED",
              "homeTeam": { "id": "t8", "name": "מכבי" },
            },
          ],
        },
      ],
    }))
    .unwrap()
  }

  #[test]
  fn flatten_denormalises_names_and_extracts_scores_by_team_id() {
    let (matches, _) = flatten_group(&ctx(), &calendar());
    assert_eq!(matches.len(), 2);

    let m1 = &matches[0];
    assert_eq!(m1.id, "m1");
    assert_eq!(m1.competition_name, "ליגת העל");
    assert_eq!(m1.group_name, "Regular");
    assert_eq!(m1.status, MatchStatus::Closed);
    // Totals arrive away-first; team-id matching must not care.
    assert_eq!(m1.final_score(), Some((88, 81)));
    assert_eq!(m1.venue.as_deref(), Some("היכל טוטו"));
    assert_eq!(m1.venue_address.as_deref(), Some("חולון"));

    let m2 = &matches[1];
    assert_eq!(m2.status, MatchStatus::NotStarted);
    assert_eq!(m2.home_score, None);
    assert!(m2.away_team_id.is_none());
  }

  #[test]
  fn flatten_collects_teams_with_logos() {
    let (_, teams) = flatten_group(&ctx(), &calendar());
    let hapoel = teams.iter().find(|t| t.id == "t7").unwrap();
    assert_eq!(hapoel.name, "הפועל");
    assert_eq!(hapoel.logo_url.as_deref(), Some("h.png"));
  }

  #[test]
  fn match_rows_keep_the_upstream_value_as_raw() {
    let (matches, _) = flatten_group(&ctx(), &calendar());
    assert_eq!(matches[0].raw["score"]["totals"][0]["total"], json!(81));
  }

  #[test]
  fn unparsable_dates_drop_the_row() {
    let cal: RawCalendar = serde_json::from_value(json!({
      "rounds": [{ "matches": [
        { "id": "bad", "date": "tomorrow-ish", "status": "NOT_STARTED" },
        { "id": "ok", "date": "2025-11-04T18:30:00Z" },
      ]}],
    }))
    .unwrap();
    let (matches, _) = flatten_group(&ctx(), &cal);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "ok");
  }

  #[test]
  fn unknown_status_falls_back_to_not_started() {
    let cal: RawCalendar = serde_json::from_value(json!({
      "rounds": [{ "matches": [
        { "id": "m", "date": "2025-11-04T18:30:00Z", "status": "POSTPONED" },
      ]}],
    }))
    .unwrap();
    let (matches, _) = flatten_group(&ctx(), &cal);
    assert_eq!(matches[0].status, MatchStatus::NotStarted);
  }

  // ── Token renewal ─────────────────────────────────────────────────────────

  fn harvester() -> Arc<TokenHarvester> {
    Arc::new(TokenHarvester::new(crate::harvester::HarvesterConfig {
      widget_url: "https://example.test/widget/".into(),
      api_host:   "api.example.test".into(),
      headless:   true,
      timeout:    Duration::from_secs(1),
    }))
  }

  #[tokio::test]
  async fn renewal_after_a_peer_already_renewed_reuses_the_fresh_token() {
    let cell = TokenCell::new(harvester(), Token::new("fresh"));
    // A task that bounced with the stale token joins after the renewal.
    let got = cell.renew(&Token::new("stale")).await.unwrap();
    assert_eq!(got, Token::new("fresh"));
    assert!(!cell.renewed.load(Ordering::SeqCst), "no second harvest");
  }

  #[tokio::test]
  async fn second_expiry_of_the_renewed_token_fails_the_scrape() {
    let cell = TokenCell::new(harvester(), Token::new("renewed"));
    cell.renewed.store(true, Ordering::SeqCst);
    let err = cell.renew(&Token::new("renewed")).await.unwrap_err();
    assert!(matches!(err, Error::AuthExpired));
  }

  #[tokio::test]
  async fn with_token_gives_up_after_the_single_allowed_renewal() {
    let orchestrator = Orchestrator::new(
      harvester(),
      crate::upstream::UpstreamClient::new(crate::upstream::UpstreamConfig {
        base_url: "https://api.example.test".into(),
        origin:   "https://example.test".into(),
      })
      .unwrap(),
      ScrapeConfig::default(),
    );
    let cell = TokenCell::new(harvester(), Token::new("t"));
    cell.renewed.store(true, Ordering::SeqCst);

    let err = orchestrator
      .with_token(&cell, |_| async { Err::<(), _>(Error::AuthExpired) })
      .await
      .unwrap_err();
    assert!(matches!(err, Error::AuthExpired));
  }

  #[test]
  fn standing_rows_require_team_id() {
    let rows = standing_rows("g1", vec![
      json!({ "teamId": "t1", "position": 2, "stats": { "wins": 9 } }),
      json!({ "position": 3 }),
    ]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].team_id, "t1");
    assert_eq!(rows[0].position, Some(2));
    assert_eq!(rows[0].raw["stats"]["wins"], json!(9));
  }
}
