//! Handlers for the entity catalog: seasons, competitions, teams, standings.

use axum::{
  Json,
  extract::{Path, State},
};
use ibasketcal_core::{
  season::{CompetitionWithGroups, Season},
  store::{StandingRow, Store},
  team::Team,
};

use crate::{AppState, error::ApiError};

/// `GET /api/seasons` — newest first.
pub async fn seasons<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<Season>>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let seasons = state.store.list_seasons().await.map_err(ApiError::store)?;
  Ok(Json(seasons))
}

/// `GET /api/competitions/{season_id}` — competitions joined with groups.
pub async fn competitions<S>(
  State(state): State<AppState<S>>,
  Path(season_id): Path<String>,
) -> Result<Json<Vec<CompetitionWithGroups>>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let competitions = state
    .store
    .list_competitions(&season_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(competitions))
}

/// `GET /api/teams/{group_id}` — the deduplicated home/away teams of a
/// group's matches, in display order.
pub async fn teams<S>(
  State(state): State<AppState<S>>,
  Path(group_id): Path<String>,
) -> Result<Json<Vec<Team>>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let teams = state
    .store
    .list_teams(&group_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(teams))
}

/// `GET /api/standings/{group_id}`
pub async fn standings<S>(
  State(state): State<AppState<S>>,
  Path(group_id): Path<String>,
) -> Result<Json<Vec<StandingRow>>, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let standings = state
    .store
    .list_standings(&group_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(standings))
}
