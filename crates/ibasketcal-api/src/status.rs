//! Cache and refresh endpoints.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use ibasketcal_core::store::{Store, StoreStats};
use ibasketcal_scrape::{RefreshOutcome, RefreshStatus};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize)]
pub struct CacheInfo {
  pub exists:       bool,
  pub stale:        bool,
  pub last_updated: Option<DateTime<Utc>>,
  pub age_minutes:  Option<i64>,
  pub size_bytes:   Option<u64>,
  pub stats:        StoreStats,
  pub is_scraping:  bool,
}

/// `GET /api/cache-info`
pub async fn cache_info<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<CacheInfo>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let stats = state.store.stats().await.map_err(ApiError::store)?;
  let size_bytes = state
    .store
    .database_size_bytes()
    .await
    .map_err(ApiError::store)?;

  let last_updated = state.refresh.last_completed_at();
  Ok(Json(CacheInfo {
    exists: last_updated.is_some(),
    stale: state.refresh.is_stale(),
    last_updated,
    age_minutes: last_updated
      .map(|at| Utc::now().signed_duration_since(at).num_minutes()),
    size_bytes,
    stats,
    is_scraping: state.refresh.is_scraping(),
  }))
}

/// `POST /api/refresh` — manual refresh, rate limited by the controller.
pub async fn refresh<S>(State(state): State<AppState<S>>) -> Json<Value>
where
  S: Store + Clone + Send + Sync + 'static,
{
  Json(match state.refresh.request_refresh() {
    RefreshOutcome::Started => json!({
      "status": "started",
      "message": "refresh started in the background",
    }),
    RefreshOutcome::InProgress => json!({
      "status": "in_progress",
      "message": "a refresh is already running",
    }),
    RefreshOutcome::RateLimited { retry_after } => json!({
      "status": "rate_limited",
      "retry_after": retry_after.as_secs(),
      "message": format!(
        "please wait {} seconds before refreshing again",
        retry_after.as_secs()
      ),
    }),
  })
}

/// `GET /api/refresh-status`
pub async fn refresh_status<S>(State(state): State<AppState<S>>) -> Json<RefreshStatus>
where
  S: Store + Clone + Send + Sync + 'static,
{
  Json(state.refresh.status())
}
