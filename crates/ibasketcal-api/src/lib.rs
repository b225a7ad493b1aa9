//! HTTP surface for the basketball calendar.
//!
//! Exposes an axum [`Router`] backed by any [`Store`] plus the refresh
//! controller. TLS, static assets and deployment wiring are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = ibasketcal_api::router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod calendar;
pub mod catalog;
pub mod error;
pub mod matches;
pub mod params;
pub mod status;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use ibasketcal_core::store::Store;
use ibasketcal_scrape::RefreshController;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:   Arc<S>,
  pub refresh: Arc<RefreshController<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), refresh: self.refresh.clone() }
  }
}

/// Build the full router for `store` + `refresh`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: Store + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/api/seasons", get(catalog::seasons::<S>))
    .route("/api/competitions/{season_id}", get(catalog::competitions::<S>))
    .route("/api/teams/{group_id}", get(catalog::teams::<S>))
    .route("/api/standings/{group_id}", get(catalog::standings::<S>))
    .route("/api/matches", get(matches::handler::<S>))
    .route("/calendar.ics", get(calendar::handler::<S>))
    .route("/api/cache-info", get(status::cache_info::<S>))
    .route("/api/refresh", post(status::refresh::<S>))
    .route("/api/refresh-status", get(status::refresh_status::<S>))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use chrono::{TimeZone, Utc};
  use ibasketcal_core::{
    matches::{Match, MatchStatus},
    season::Season,
    store::{Snapshot, Store as _},
    team::Team,
  };
  use ibasketcal_scrape::{
    ProgressSink, RefreshConfig, Result as ScrapeResult, ScrapeRunner,
  };
  use ibasketcal_store_sqlite::SqliteStore;
  use tokio::sync::watch;
  use tower::ServiceExt as _;

  use super::*;

  /// A runner that never finishes within a test.
  struct HangingRunner;

  impl ScrapeRunner for HangingRunner {
    async fn run(
      &self,
      _progress: ProgressSink,
      mut cancel: watch::Receiver<bool>,
    ) -> ScrapeResult<Snapshot> {
      let _ = cancel.wait_for(|stop| *stop).await;
      Err(ibasketcal_scrape::Error::Cancelled)
    }
  }

  async fn make_state(cooldown: Duration) -> (AppState<SqliteStore>, SqliteStore) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let refresh = RefreshController::new(
      store.clone(),
      HangingRunner,
      RefreshConfig { cooldown, ttl: Duration::from_secs(7 * 24 * 3600) },
    );
    (AppState { store: Arc::new(store.clone()), refresh }, store)
  }

  fn seeded_snapshot() -> Snapshot {
    Snapshot {
      seasons: vec![Season {
        id:         "SX".into(),
        name:       "2025/2026".into(),
        start_date: None,
        end_date:   None,
        raw:        serde_json::json!({}),
      }],
      teams: vec![
        Team { id: "T7".into(), name: "Hapoel".into(), logo_url: None },
        Team { id: "T8".into(), name: "Maccabi".into(), logo_url: None },
      ],
      matches: vec![Match {
        id:               "M1".into(),
        season_id:        "SX".into(),
        competition_id:   Some("C1".into()),
        competition_name: "ליגת העל".into(),
        group_id:         "G17".into(),
        group_name:       "Regular".into(),
        home_team_id:     Some("T7".into()),
        home_team_name:   Some("Hapoel".into()),
        away_team_id:     Some("T8".into()),
        away_team_name:   Some("Maccabi".into()),
        date:             Utc.with_ymd_and_hms(2025, 11, 4, 18, 30, 0).unwrap(),
        status:           MatchStatus::Closed,
        home_score:       Some(88),
        away_score:       Some(81),
        venue:            None,
        venue_address:    None,
        raw:              serde_json::json!({}),
      }],
      ..Default::default()
    }
  }

  async fn get(state: AppState<SqliteStore>, uri: &str) -> (StatusCode, String) {
    let resp = router(state)
      .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
  }

  async fn post_refresh(state: AppState<SqliteStore>) -> serde_json::Value {
    let resp = router(state)
      .oneshot(
        Request::builder()
          .method("POST")
          .uri("/api/refresh")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  // ── Cold start ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn cold_start_serves_empty_calendar_and_starts_scrape() {
    let (state, _) = make_state(Duration::from_secs(300)).await;

    let (status, body) = get(state.clone(), "/calendar.ics?season=SX").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(body.contains("END:VCALENDAR\r\n"));
    assert!(!body.contains("BEGIN:VEVENT"));

    let (_, status_body) = get(state.clone(), "/api/refresh-status").await;
    let parsed: serde_json::Value = serde_json::from_str(&status_body).unwrap();
    assert_eq!(parsed["is_scraping"], serde_json::json!(true));

    state.refresh.shutdown();
    state.refresh.await_idle().await;
  }

  // ── Manual refresh rate limiting ──────────────────────────────────────────

  #[tokio::test]
  async fn second_refresh_within_cooldown_is_rate_limited() {
    let (state, _) = make_state(Duration::from_secs(300)).await;

    let first = post_refresh(state.clone()).await;
    assert_eq!(first["status"], serde_json::json!("started"));

    let second = post_refresh(state.clone()).await;
    assert_eq!(second["status"], serde_json::json!("rate_limited"));
    let retry_after = second["retry_after"].as_u64().unwrap();
    assert!(retry_after <= 300 && retry_after >= 295, "got {retry_after}");

    state.refresh.shutdown();
    state.refresh.await_idle().await;
  }

  // ── Feed generation ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn calendar_filters_by_team_id_and_formats_final_score() {
    let (state, store) = make_state(Duration::from_secs(300)).await;
    store.bulk_replace(seeded_snapshot()).await.unwrap();

    let (status, body) = get(state, "/calendar.ics?team_id=T7").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("UID:M1@ibasketcal\r\n"), "body:\n{body}");
    assert!(body.contains("DTSTART:20251104T183000Z\r\n"));
    assert!(body.contains("DTEND:20251104T203000Z\r\n"));
    assert!(body.contains("SUMMARY:Hapoel 88:81 Maccabi [FINAL]\r\n"));
  }

  #[tokio::test]
  async fn calendar_with_unmatched_team_id_has_no_events() {
    let (state, store) = make_state(Duration::from_secs(300)).await;
    store.bulk_replace(seeded_snapshot()).await.unwrap();

    let (status, body) = get(state, "/calendar.ics?team_id=T999").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("BEGIN:VEVENT"));
  }

  #[tokio::test]
  async fn player_mode_with_timezone_shifts_start_and_emits_vtimezone() {
    let (state, store) = make_state(Duration::from_secs(300)).await;
    store.bulk_replace(seeded_snapshot()).await.unwrap();

    let (status, body) = get(
      state,
      "/calendar.ics?team_id=T7&mode=player&prep=45&tz=Asia/Jerusalem",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("BEGIN:VTIMEZONE\r\n"), "body:\n{body}");
    assert!(body.contains("TZID:Asia/Jerusalem\r\n"));
    // 18:30Z is 20:30 in Jerusalem (standard time), minus 45 minutes prep.
    assert!(body.contains("DTSTART;TZID=Asia/Jerusalem:20251104T194500\r\n"));
    assert!(body.contains("DTEND;TZID=Asia/Jerusalem:20251104T223000\r\n"));
  }

  #[tokio::test]
  async fn malformed_calendar_parameters_return_400() {
    for uri in [
      "/calendar.ics?mode=coach",
      "/calendar.ics?mode=player&prep=soon",
      "/calendar.ics?mode=player&prep=300",
      "/calendar.ics?tz=Mars/Olympus",
      "/calendar.ics?status=POSTPONED",
    ] {
      let (state, _) = make_state(Duration::from_secs(300)).await;
      let (status, body) = get(state, uri).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} -> {body}");
      assert!(body.contains("error"), "{uri} -> {body}");
    }
  }

  // ── JSON endpoints ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn matches_endpoint_filters_by_name_and_resolves_season_names() {
    let (state, store) = make_state(Duration::from_secs(300)).await;
    store.bulk_replace(seeded_snapshot()).await.unwrap();

    let (status, body) = get(state.clone(), "/api/matches?team=maccabi").await;
    assert_eq!(status, StatusCode::OK);
    let rows: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], serde_json::json!("M1"));

    // A season name fragment resolves to the newest matching season id.
    let (_, body) = get(state.clone(), "/api/matches?season=2025").await;
    let rows: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(rows.len(), 1);

    let (_, body) = get(state, "/api/matches?season=1999").await;
    let rows: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    assert!(rows.is_empty());
  }

  #[tokio::test]
  async fn teams_endpoint_lists_group_teams() {
    let (state, store) = make_state(Duration::from_secs(300)).await;
    store.bulk_replace(seeded_snapshot()).await.unwrap();

    let (status, body) = get(state, "/api/teams/G17").await;
    assert_eq!(status, StatusCode::OK);
    let teams: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    let names: Vec<&str> =
      teams.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Hapoel", "Maccabi"]);
  }

  #[tokio::test]
  async fn seasons_endpoint_returns_newest_first() {
    let (state, store) = make_state(Duration::from_secs(300)).await;
    let mut snap = seeded_snapshot();
    snap.seasons.push(Season {
      id:         "SO".into(),
      name:       "2024/2025".into(),
      start_date: None,
      end_date:   None,
      raw:        serde_json::json!({}),
    });
    store.bulk_replace(snap).await.unwrap();

    let (_, body) = get(state, "/api/seasons").await;
    let seasons: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(seasons[0]["name"], serde_json::json!("2025/2026"));
    assert_eq!(seasons[1]["name"], serde_json::json!("2024/2025"));
  }

  // ── Cache info ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn cache_info_tracks_population_and_stats() {
    let (state, store) = make_state(Duration::from_secs(300)).await;

    let (_, body) = get(state.clone(), "/api/cache-info").await;
    let info: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(info["exists"], serde_json::json!(false));
    assert_eq!(info["stale"], serde_json::json!(true));

    store.bulk_replace(seeded_snapshot()).await.unwrap();
    state.refresh.load_persisted().await;

    let (_, body) = get(state, "/api/cache-info").await;
    let info: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(info["exists"], serde_json::json!(true));
    assert_eq!(info["stale"], serde_json::json!(false));
    assert_eq!(info["stats"]["matches"], serde_json::json!(1));
    assert_eq!(info["is_scraping"], serde_json::json!(false));
  }
}
