//! Handler for `GET /api/matches` — the JSON preview of a feed.

use axum::{
  Json,
  extract::{Query, State},
};
use ibasketcal_core::{matches::Match, store::Store};

use crate::{AppState, error::ApiError, params::MatchQuery};

/// `GET /api/matches[?season=…][&competition=…][&group_id=…][&team=…]
/// [&team_id=…][&status=…]`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(query): Query<MatchQuery>,
) -> Result<Json<Vec<Match>>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let filter = crate::params::resolve_filter(state.store.as_ref(), &query).await?;
  let matches = state
    .store
    .find_matches(&filter)
    .await
    .map_err(ApiError::store)?;

  if matches.is_empty() {
    // A cold store answers empty and fills itself in the background.
    state.refresh.ensure_populated().await;
  }
  Ok(Json(matches))
}
