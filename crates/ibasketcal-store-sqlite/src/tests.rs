//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{TimeZone, Utc};
use ibasketcal_core::{
  matches::{Match, MatchStatus},
  season::{Competition, Group, Season},
  store::{MatchFilter, META_LAST_SCRAPE, Snapshot, StandingRow, Store},
  team::Team,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn season(id: &str, name: &str) -> Season {
  Season {
    id:         id.into(),
    name:       name.into(),
    start_date: None,
    end_date:   None,
    raw:        serde_json::json!({ "_id": id, "name": name }),
  }
}

fn team(id: &str, name: &str) -> Team {
  Team { id: id.into(), name: name.into(), logo_url: None }
}

fn fixture(id: &str, group_id: &str, day: u32, hour: u32) -> Match {
  Match {
    id:               id.into(),
    season_id:        "s1".into(),
    competition_id:   Some("c1".into()),
    competition_name: "ליגת העל".into(),
    group_id:         group_id.into(),
    group_name:       "Regular".into(),
    home_team_id:     Some("t1".into()),
    home_team_name:   Some("הפועל חולון".into()),
    away_team_id:     Some("t2".into()),
    away_team_name:   Some("Maccabi Haifa".into()),
    date:             Utc.with_ymd_and_hms(2025, 11, day, hour, 0, 0).unwrap(),
    status:           MatchStatus::NotStarted,
    home_score:       None,
    away_score:       None,
    venue:            None,
    venue_address:    None,
    raw:              serde_json::json!({ "id": id }),
  }
}

fn snapshot() -> Snapshot {
  Snapshot {
    seasons:      vec![season("s1", "2025/2026"), season("s0", "2024/2025")],
    competitions: vec![Competition {
      id:        "c1".into(),
      season_id: "s1".into(),
      name:      "ליגת העל".into(),
      raw:       serde_json::json!({}),
    }],
    groups:       vec![
      Group {
        id:             "g1".into(),
        competition_id: "c1".into(),
        season_id:      "s1".into(),
        name:           "Regular".into(),
        kind:           Some("LEAGUE".into()),
        raw:            serde_json::json!({}),
      },
      Group {
        id:             "g2".into(),
        competition_id: "c1".into(),
        season_id:      "s1".into(),
        name:           "פלייאוף".into(),
        kind:           Some("PLAYOFF".into()),
        raw:            serde_json::json!({}),
      },
    ],
    teams:        vec![
      team("t1", "הפועל חולון"),
      team("t2", "Maccabi Haifa"),
      team("t3", "אליצור נתניה"),
    ],
    matches:      vec![
      fixture("m1", "g1", 4, 18),
      fixture("m2", "g1", 4, 20),
      {
        let mut m = fixture("m3", "g2", 6, 19);
        m.home_team_id = Some("t3".into());
        m.home_team_name = Some("אליצור נתניה".into());
        m.status = MatchStatus::Closed;
        m.home_score = Some(88);
        m.away_score = Some(81);
        m
      },
    ],
    standings:    vec![StandingRow {
      group_id: "g1".into(),
      team_id:  "t1".into(),
      position: Some(1),
      raw:      serde_json::json!({ "teamId": "t1", "position": 1 }),
    }],
  }
}

// ─── Empty store ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_store_reads_return_empty() {
  let s = store().await;
  assert!(s.list_seasons().await.unwrap().is_empty());
  assert!(s.list_competitions("s1").await.unwrap().is_empty());
  assert!(s.list_teams("g1").await.unwrap().is_empty());
  assert!(
    s.find_matches(&MatchFilter::default())
      .await
      .unwrap()
      .is_empty()
  );
  assert!(s.get_metadata(META_LAST_SCRAPE).await.unwrap().is_none());
}

// ─── Bulk replace ────────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_replace_makes_every_match_findable_by_group() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  for (group, expected) in [("g1", vec!["m1", "m2"]), ("g2", vec!["m3"])] {
    let found = s
      .find_matches(&MatchFilter {
        group_id: Some(group.into()),
        ..Default::default()
      })
      .await
      .unwrap();
    let ids: Vec<_> = found.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, expected);
  }
}

#[tokio::test]
async fn bulk_replace_is_idempotent() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();
  s.bulk_replace(snapshot()).await.unwrap();

  let stats = s.stats().await.unwrap();
  assert_eq!(stats.seasons, 2);
  assert_eq!(stats.competitions, 1);
  assert_eq!(stats.groups, 2);
  assert_eq!(stats.teams, 3);
  assert_eq!(stats.matches, 3);
  assert_eq!(stats.standings, 1);
}

#[tokio::test]
async fn bulk_replace_updates_changed_rows_in_place() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  let mut snap = snapshot();
  snap.matches[0].status = MatchStatus::Closed;
  snap.matches[0].home_score = Some(90);
  snap.matches[0].away_score = Some(70);
  s.bulk_replace(snap).await.unwrap();

  let found = s
    .find_matches(&MatchFilter {
      group_id: Some("g1".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(found.len(), 2, "upsert must not duplicate");
  assert_eq!(found[0].home_score, Some(90));
}

#[tokio::test]
async fn bulk_replace_advances_last_scrape_stamp() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();
  let first = s.get_metadata(META_LAST_SCRAPE).await.unwrap().unwrap();

  s.bulk_replace(snapshot()).await.unwrap();
  let second = s.get_metadata(META_LAST_SCRAPE).await.unwrap().unwrap();

  assert!(second >= first, "stamp went backwards: {first} > {second}");
}

// ─── Seasons / competitions / groups ─────────────────────────────────────────

#[tokio::test]
async fn seasons_are_listed_newest_first() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  let names: Vec<_> = s
    .list_seasons()
    .await
    .unwrap()
    .into_iter()
    .map(|s| s.name)
    .collect();
  assert_eq!(names, vec!["2025/2026", "2024/2025"]);
}

#[tokio::test]
async fn competitions_come_joined_with_their_groups() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  let comps = s.list_competitions("s1").await.unwrap();
  assert_eq!(comps.len(), 1);
  assert_eq!(comps[0].competition.name, "ליגת העל");
  let group_ids: Vec<_> =
    comps[0].groups.iter().map(|g| g.id.as_str()).collect();
  assert_eq!(group_ids.len(), 2);
  assert!(group_ids.contains(&"g1") && group_ids.contains(&"g2"));

  assert!(s.list_competitions("s0").await.unwrap().is_empty());
}

#[tokio::test]
async fn list_groups_filters_by_competition() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();
  assert_eq!(s.list_groups("c1").await.unwrap().len(), 2);
  assert!(s.list_groups("cX").await.unwrap().is_empty());
}

// ─── Teams ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_teams_derives_from_group_matches_and_sorts_hebrew_first() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  // g1 has t1/t2 twice over two matches; dedup leaves two teams, Hebrew
  // before Latin.
  let names: Vec<_> = s
    .list_teams("g1")
    .await
    .unwrap()
    .into_iter()
    .map(|t| t.name)
    .collect();
  assert_eq!(names, vec!["הפועל חולון", "Maccabi Haifa"]);

  let g2: Vec<_> = s
    .list_teams("g2")
    .await
    .unwrap()
    .into_iter()
    .map(|t| t.id)
    .collect();
  assert_eq!(g2, vec!["t3", "t2"]);
}

// ─── find_matches filters ────────────────────────────────────────────────────

#[tokio::test]
async fn find_matches_sorts_by_date_then_id() {
  let s = store().await;
  let mut snap = snapshot();
  // Same instant as m1, id tiebreak applies.
  snap.matches.push(fixture("m0", "g1", 4, 18));
  s.bulk_replace(snap).await.unwrap();

  let ids: Vec<_> = s
    .find_matches(&MatchFilter::default())
    .await
    .unwrap()
    .into_iter()
    .map(|m| m.id)
    .collect();
  assert_eq!(ids, vec!["m0", "m1", "m2", "m3"]);
}

#[tokio::test]
async fn find_matches_by_team_id_matches_either_side() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  let ids: Vec<_> = s
    .find_matches(&MatchFilter {
      team_id: Some("t2".into()),
      ..Default::default()
    })
    .await
    .unwrap()
    .into_iter()
    .map(|m| m.id)
    .collect();
  assert_eq!(ids, vec!["m1", "m2", "m3"]);
}

#[tokio::test]
async fn find_matches_by_hebrew_team_substring() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  let ids: Vec<_> = s
    .find_matches(&MatchFilter {
      team_name: Some("אליצור".into()),
      ..Default::default()
    })
    .await
    .unwrap()
    .into_iter()
    .map(|m| m.id)
    .collect();
  assert_eq!(ids, vec!["m3"]);
}

#[tokio::test]
async fn find_matches_latin_team_substring_is_case_insensitive() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  let found = s
    .find_matches(&MatchFilter {
      team_name: Some("maccabi".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(found.len(), 3);
}

#[tokio::test]
async fn find_matches_by_status_and_date_window() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  let closed = s
    .find_matches(&MatchFilter {
      status: Some(MatchStatus::Closed),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(closed.len(), 1);
  assert_eq!(closed[0].final_score(), Some((88, 81)));

  // Inclusive bounds: m1 sits exactly on date_from.
  let windowed = s
    .find_matches(&MatchFilter {
      date_from: Some(Utc.with_ymd_and_hms(2025, 11, 4, 18, 0, 0).unwrap()),
      date_to: Some(Utc.with_ymd_and_hms(2025, 11, 4, 23, 59, 0).unwrap()),
      ..Default::default()
    })
    .await
    .unwrap();
  let ids: Vec<_> = windowed.into_iter().map(|m| m.id).collect();
  assert_eq!(ids, vec!["m1", "m2"]);
}

#[tokio::test]
async fn find_matches_group_id_beats_competition_name() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  // Filter carries both; the exact group must win (competition substring
  // alone would match all three).
  let found = s
    .find_matches(&MatchFilter {
      group_id: Some("g2".into()),
      competition_name: Some("ליגת".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].id, "m3");
}

#[tokio::test]
async fn find_matches_like_metacharacters_are_literal() {
  let s = store().await;
  let mut snap = snapshot();
  snap.matches[0].home_team_name = Some("100% Hoops".into());
  s.bulk_replace(snap).await.unwrap();

  let found = s
    .find_matches(&MatchFilter {
      team_name: Some("100%".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].id, "m1");
}

#[tokio::test]
async fn find_matches_honours_limit() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  let found = s
    .find_matches(&MatchFilter { limit: Some(2), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(found.len(), 2);
}

// ─── Standings / metadata / stats ────────────────────────────────────────────

#[tokio::test]
async fn standings_round_trip() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  let rows = s.list_standings("g1").await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].team_id, "t1");
  assert_eq!(rows[0].position, Some(1));
  assert!(s.list_standings("g2").await.unwrap().is_empty());
}

#[tokio::test]
async fn metadata_set_get_overwrites() {
  let s = store().await;
  s.set_metadata("k", "v1").await.unwrap();
  s.set_metadata("k", "v2").await.unwrap();
  assert_eq!(s.get_metadata("k").await.unwrap().as_deref(), Some("v2"));
  assert!(s.get_metadata("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn in_memory_store_has_no_file_size() {
  let s = store().await;
  assert_eq!(s.database_size_bytes().await.unwrap(), None);
}

#[tokio::test]
async fn file_store_reports_size_and_survives_reopen() {
  let dir = std::env::temp_dir().join(format!(
    "ibasketcal-test-{}-{}",
    std::process::id(),
    Utc::now().timestamp_nanos_opt().unwrap_or_default(),
  ));
  let path = dir.join("basketball.db");

  let s = SqliteStore::open(&path).await.unwrap();
  s.bulk_replace(snapshot()).await.unwrap();
  assert!(s.database_size_bytes().await.unwrap().unwrap() > 0);
  drop(s);

  let reopened = SqliteStore::open(&path).await.unwrap();
  assert_eq!(reopened.list_seasons().await.unwrap().len(), 2);
  assert!(
    reopened
      .get_metadata(META_LAST_SCRAPE)
      .await
      .unwrap()
      .is_some()
  );

  let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn raw_blobs_survive_round_trip() {
  let s = store().await;
  s.bulk_replace(snapshot()).await.unwrap();

  let seasons = s.list_seasons().await.unwrap();
  let newest = &seasons[0];
  assert_eq!(newest.raw["name"], serde_json::json!("2025/2026"));
}
