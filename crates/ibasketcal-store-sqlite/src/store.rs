//! [`SqliteStore`] — the embedded file-backed implementation of [`Store`].

use std::path::{Path, PathBuf};

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
use rusqlite::{OptionalExtension as _, types::Value as SqlValue};

use crate::{
  Error, Result,
  encode::{
    MATCH_COLUMNS, RawCompetitionRow, RawGroupRow, RawSeasonRow,
    RawStandingRow, RawTeamRow, encode_dt, encode_raw, match_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A basketball data store backed by a single SQLite file with a write-ahead
/// log beside it.
///
/// Cloning is cheap — the inner connection is reference-counted. All writes
/// go through one connection, so readers on the same handle see either the
/// pre- or post-transaction state of a bulk replace, never a mix.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
  path: Option<PathBuf>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::Decode(format!("creating {parent:?}: {e}")))?;
    }
    let conn = tokio_rusqlite::Connection::open(path.clone()).await?;
    let store = Self { conn, path: Some(path) };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, path: None };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;
        conn.execute(
          "INSERT OR REPLACE INTO metadata (key, value, updated_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![META_SCHEMA_VERSION, SCHEMA_VERSION.to_string(), now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Filter translation ──────────────────────────────────────────────────────

/// Build the WHERE clause and parameter list for a [`MatchFilter`].
fn filter_sql(filter: &MatchFilter) -> (String, Vec<SqlValue>) {
  let mut conds: Vec<String> = Vec::new();
  let mut params: Vec<SqlValue> = Vec::new();

  if let Some(season_id) = &filter.season_id {
    params.push(SqlValue::Text(season_id.clone()));
    conds.push(format!("season_id = ?{}", params.len()));
  }
  if let Some(group_id) = &filter.group_id {
    params.push(SqlValue::Text(group_id.clone()));
    conds.push(format!("group_id = ?{}", params.len()));
  } else if let Some(name) = &filter.competition_name {
    params.push(SqlValue::Text(like_pattern(name)));
    conds.push(format!(
      "competition_name LIKE ?{} ESCAPE '\\'",
      params.len()
    ));
  }
  if let Some(team_id) = &filter.team_id {
    params.push(SqlValue::Text(team_id.clone()));
    conds.push(format!(
      "(home_team_id = ?{0} OR away_team_id = ?{0})",
      params.len()
    ));
  } else if let Some(team_name) = &filter.team_name {
    params.push(SqlValue::Text(like_pattern(team_name)));
    conds.push(format!(
      "(home_team_name LIKE ?{0} ESCAPE '\\' OR away_team_name LIKE ?{0} ESCAPE '\\')",
      params.len()
    ));
  }
  if let Some(status) = filter.status {
    params.push(SqlValue::Text(status.as_str().to_string()));
    conds.push(format!("status = ?{}", params.len()));
  }
  if let Some(from) = filter.date_from {
    params.push(SqlValue::Text(encode_dt(from)));
    conds.push(format!("date >= ?{}", params.len()));
  }
  if let Some(to) = filter.date_to {
    params.push(SqlValue::Text(encode_dt(to)));
    conds.push(format!("date <= ?{}", params.len()));
  }

  let where_clause = if conds.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conds.join(" AND "))
  };
  (where_clause, params)
}

/// `%substring%` with LIKE metacharacters escaped. SQLite's LIKE is already
/// case-insensitive for ASCII; Hebrew has no case to fold.
fn like_pattern(needle: &str) -> String {
  let escaped = needle
    .replace('\\', "\\\\")
    .replace('%', "\\%")
    .replace('_', "\\_");
  format!("%{escaped}%")
}

// ─── Store impl ──────────────────────────────────────────────────────────────

impl Store for SqliteStore {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list_seasons(&self) -> Result<Vec<Season>> {
    let raws: Vec<RawSeasonRow> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT id, name, start_date, end_date, raw
           FROM seasons ORDER BY name DESC",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawSeasonRow {
              id:         row.get(0)?,
              name:       row.get(1)?,
              start_date: row.get(2)?,
              end_date:   row.get(3)?,
              raw:        row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSeasonRow::into_season).collect()
  }

  async fn list_competitions(
    &self,
    season_id: &str,
  ) -> Result<Vec<CompetitionWithGroups>> {
    let season_id = season_id.to_owned();
    let (comps, groups): (Vec<RawCompetitionRow>, Vec<RawGroupRow>) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, season_id, name, raw FROM competitions
           WHERE season_id = ?1 ORDER BY name",
        )?;
        let comps = stmt
          .query_map(rusqlite::params![season_id], |row| {
            Ok(RawCompetitionRow {
              id:        row.get(0)?,
              season_id: row.get(1)?,
              name:      row.get(2)?,
              raw:       row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT id, competition_id, season_id, name, kind, raw FROM groups
           WHERE season_id = ?1 ORDER BY name",
        )?;
        let groups = stmt
          .query_map(rusqlite::params![season_id], |row| {
            Ok(RawGroupRow {
              id:             row.get(0)?,
              competition_id: row.get(1)?,
              season_id:      row.get(2)?,
              name:           row.get(3)?,
              kind:           row.get(4)?,
              raw:            row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((comps, groups))
      })
      .await?;

    let groups: Vec<Group> = groups
      .into_iter()
      .map(RawGroupRow::into_group)
      .collect::<Result<_>>()?;

    comps
      .into_iter()
      .map(|raw| {
        let competition = raw.into_competition()?;
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
    let competition_id = competition_id.to_owned();
    let raws: Vec<RawGroupRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, competition_id, season_id, name, kind, raw FROM groups
           WHERE competition_id = ?1 ORDER BY name",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![competition_id], |row| {
            Ok(RawGroupRow {
              id:             row.get(0)?,
              competition_id: row.get(1)?,
              season_id:      row.get(2)?,
              name:           row.get(3)?,
              kind:           row.get(4)?,
              raw:            row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGroupRow::into_group).collect()
  }

  async fn list_teams(&self, group_id: &str) -> Result<Vec<Team>> {
    let group_id = group_id.to_owned();
    let raws: Vec<RawTeamRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT t.id, t.name, t.logo_url
           FROM teams t
           JOIN matches m ON t.id = m.home_team_id OR t.id = m.away_team_id
           WHERE m.group_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![group_id], |row| {
            Ok(RawTeamRow {
              id:       row.get(0)?,
              name:     row.get(1)?,
              logo_url: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut teams: Vec<Team> =
      raws.into_iter().map(RawTeamRow::into_team).collect();
    teams.sort_by(|a, b| collate::cmp_names(&a.name, &b.name));
    Ok(teams)
  }

  async fn find_matches(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
    let (where_clause, params) = filter_sql(filter);
    let limit_clause = filter
      .limit
      .map(|n| format!(" LIMIT {n}"))
      .unwrap_or_default();
    let sql = format!(
      "SELECT {MATCH_COLUMNS} FROM matches {where_clause}
       ORDER BY date ASC, id ASC{limit_clause}"
    );

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), match_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(|r| r.into_match()).collect()
  }

  async fn list_standings(&self, group_id: &str) -> Result<Vec<StandingRow>> {
    let group_id = group_id.to_owned();
    let raws: Vec<RawStandingRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT group_id, team_id, position, raw FROM standings
           WHERE group_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![group_id], |row| {
            Ok(RawStandingRow {
              group_id: row.get(0)?,
              team_id:  row.get(1)?,
              position: row.get(2)?,
              raw:      row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawStandingRow::into_standing).collect()
  }

  // ── Ingest ────────────────────────────────────────────────────────────────

  async fn bulk_replace(&self, snapshot: Snapshot) -> Result<()> {
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO seasons (id, name, start_date, end_date, raw)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for s in &snapshot.seasons {
            stmt.execute(rusqlite::params![
              s.id,
              s.name,
              s.start_date,
              s.end_date,
              encode_raw(&s.raw),
            ])?;
          }

          let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO competitions (id, season_id, name, raw)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for c in &snapshot.competitions {
            stmt.execute(rusqlite::params![
              c.id,
              c.season_id,
              c.name,
              encode_raw(&c.raw),
            ])?;
          }

          let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO groups
             (id, competition_id, season_id, name, kind, raw)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for g in &snapshot.groups {
            stmt.execute(rusqlite::params![
              g.id,
              g.competition_id,
              g.season_id,
              g.name,
              g.kind,
              encode_raw(&g.raw),
            ])?;
          }

          let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO teams (id, name, logo_url)
             VALUES (?1, ?2, ?3)",
          )?;
          for t in &snapshot.teams {
            stmt.execute(rusqlite::params![t.id, t.name, t.logo_url])?;
          }

          let mut stmt = tx.prepare(&format!(
            "INSERT OR REPLACE INTO matches ({MATCH_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, ?15, ?16, ?17)"
          ))?;
          for m in &snapshot.matches {
            stmt.execute(rusqlite::params![
              m.id,
              m.season_id,
              m.competition_id,
              m.competition_name,
              m.group_id,
              m.group_name,
              m.home_team_id,
              m.home_team_name,
              m.away_team_id,
              m.away_team_name,
              encode_dt(m.date),
              m.status.as_str(),
              m.home_score,
              m.away_score,
              m.venue,
              m.venue_address,
              encode_raw(&m.raw),
            ])?;
          }

          let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO standings (group_id, team_id, position, raw)
             VALUES (?1, ?2, ?3, ?4)",
          )?;
          for s in &snapshot.standings {
            stmt.execute(rusqlite::params![
              s.group_id,
              s.team_id,
              s.position,
              encode_raw(&s.raw),
            ])?;
          }

          // The freshness stamp commits or rolls back with the data.
          tx.execute(
            "INSERT OR REPLACE INTO metadata (key, value, updated_at)
             VALUES (?1, ?2, ?2)",
            rusqlite::params![META_LAST_SCRAPE, now],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Metadata ──────────────────────────────────────────────────────────────

  async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let value = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM metadata WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
    let key = key.to_owned();
    let value = value.to_owned();
    let now = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO metadata (key, value, updated_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![key, value, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn stats(&self) -> Result<StoreStats> {
    let stats = self
      .conn
      .call(|conn| {
        let count = |table: &str| -> rusqlite::Result<u64> {
          conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get::<_, i64>(0).map(|n| n as u64)
          })
        };
        Ok(StoreStats {
          seasons:      count("seasons")?,
          competitions: count("competitions")?,
          groups:       count("groups")?,
          teams:        count("teams")?,
          matches:      count("matches")?,
          standings:    count("standings")?,
        })
      })
      .await?;
    Ok(stats)
  }

  async fn database_size_bytes(&self) -> Result<Option<u64>> {
    match &self.path {
      None => Ok(None),
      Some(path) => match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(_) => Ok(None),
      },
    }
  }
}
