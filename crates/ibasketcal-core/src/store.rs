//! The `Store` trait and supporting query/snapshot types.
//!
//! The trait is implemented by storage backends (embedded SQLite, remote
//! edge-SQL, remote row-store). Higher layers (the scrape orchestrator, the
//! HTTP API) depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  matches::{Match, MatchStatus},
  season::{Competition, CompetitionWithGroups, Group, Season},
  team::Team,
};

// ─── Metadata keys ───────────────────────────────────────────────────────────

/// Schema revision of the persisted layout.
pub const META_SCHEMA_VERSION: &str = "schema_version";
/// RFC 3339 timestamp of the last successful full scrape. Advances
/// monotonically; written only inside a committed `bulk_replace`.
pub const META_LAST_SCRAPE: &str = "last_scrape_completed_at";

pub const SCHEMA_VERSION: u32 = 1;

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`Store::find_matches`]. All filters combine with AND;
/// name filters are case-insensitive substring matches, and the team filters
/// accept either side of the fixture.
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
  pub season_id:        Option<String>,
  /// Exact group filter; preferred over `competition_name`.
  pub group_id:         Option<String>,
  pub competition_name: Option<String>,
  /// Exact team filter (home or away); preferred over `team_name`.
  pub team_id:          Option<String>,
  pub team_name:        Option<String>,
  pub status:           Option<MatchStatus>,
  /// Inclusive bounds.
  pub date_from:        Option<DateTime<Utc>>,
  pub date_to:          Option<DateTime<Utc>>,
  pub limit:            Option<usize>,
}

// ─── Snapshot types ──────────────────────────────────────────────────────────

/// One standings row for a group, kept verbatim from upstream. Stored and
/// served but never consulted by the calendar path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingRow {
  pub group_id: String,
  pub team_id:  String,
  pub position: Option<u32>,
  pub raw:      serde_json::Value,
}

/// The output of one full scrape — everything [`Store::bulk_replace`]
/// ingests in a single logical transaction.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
  pub seasons:      Vec<Season>,
  pub competitions: Vec<Competition>,
  pub groups:       Vec<Group>,
  pub teams:        Vec<Team>,
  pub matches:      Vec<Match>,
  pub standings:    Vec<StandingRow>,
}

impl Snapshot {
  pub fn is_empty(&self) -> bool {
    self.seasons.is_empty() && self.matches.is_empty()
  }
}

/// Per-table row counts, surfaced through the cache-info endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
  pub seasons:      u64,
  pub competitions: u64,
  pub groups:       u64,
  pub teams:        u64,
  pub matches:      u64,
  pub standings:    u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a basketball data store backend.
///
/// Ingest is upsert-only: `bulk_replace` writes a whole scrape output
/// atomically, and nothing ever deletes entity rows. Readers must see either
/// the pre-replace or the post-replace graph, never a mix.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes (tokio with axum).
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All seasons, newest first (descending name).
  fn list_seasons(
    &self,
  ) -> impl Future<Output = Result<Vec<Season>, Self::Error>> + Send + '_;

  /// Competitions of a season, each joined with its groups.
  fn list_competitions<'a>(
    &'a self,
    season_id: &'a str,
  ) -> impl Future<Output = Result<Vec<CompetitionWithGroups>, Self::Error>> + Send + 'a;

  /// Groups of a competition.
  fn list_groups<'a>(
    &'a self,
    competition_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Group>, Self::Error>> + Send + 'a;

  /// Distinct teams appearing in a group's matches, sorted with
  /// [`collate::cmp_names`](crate::collate::cmp_names).
  fn list_teams<'a>(
    &'a self,
    group_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Team>, Self::Error>> + Send + 'a;

  /// Filtered matches, sorted by `(date, id)` ascending.
  fn find_matches<'a>(
    &'a self,
    filter: &'a MatchFilter,
  ) -> impl Future<Output = Result<Vec<Match>, Self::Error>> + Send + 'a;

  /// Stored standings of a group, by position.
  fn list_standings<'a>(
    &'a self,
    group_id: &'a str,
  ) -> impl Future<Output = Result<Vec<StandingRow>, Self::Error>> + Send + 'a;

  // ── Ingest ────────────────────────────────────────────────────────────

  /// Atomically upsert a full scrape output and stamp
  /// [`META_LAST_SCRAPE`]. On any error the store is left unchanged.
  fn bulk_replace(
    &self,
    snapshot: Snapshot,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Metadata ──────────────────────────────────────────────────────────

  fn get_metadata<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  fn set_metadata<'a>(
    &'a self,
    key: &'a str,
    value: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Per-table row counts.
  fn stats(
    &self,
  ) -> impl Future<Output = Result<StoreStats, Self::Error>> + Send + '_;

  /// Best-effort on-disk size; `None` for remote backends.
  fn database_size_bytes(
    &self,
  ) -> impl Future<Output = Result<Option<u64>, Self::Error>> + Send + '_;
}
