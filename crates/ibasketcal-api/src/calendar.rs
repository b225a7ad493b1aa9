//! Handler for `GET /calendar.ics` — the subscribable feed itself.

use axum::{
  extract::{Query, State},
  http::header,
  response::Response,
};
use ibasketcal_core::store::Store;
use ibasketcal_ics::{CalendarOptions, calendar_name, render};

use crate::{AppState, error::ApiError, params::MatchQuery};

/// `GET /calendar.ics` with the stable parameter set: `season`,
/// `competition`, `group_id`, `team`, `team_id`, `status`, `mode`, `prep`,
/// `tz`.
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(query): Query<MatchQuery>,
) -> Result<Response, ApiError>
where
  S: Store + Clone + Send + Sync + 'static,
{
  let (mode, tz) = crate::params::resolve_calendar_mode(&query)?;
  let filter = crate::params::resolve_filter(state.store.as_ref(), &query).await?;

  let matches = state
    .store
    .find_matches(&filter)
    .await
    .map_err(ApiError::store)?;
  if matches.is_empty() {
    // Calendar clients poll; an empty-but-valid document now and a filled
    // one on the next poll beats an error page.
    state.refresh.ensure_populated().await;
  }

  let options = CalendarOptions {
    name: calendar_name(query.competition.as_deref(), query.team.as_deref()),
    mode,
    tz,
    now: chrono::Utc::now(),
  };
  let body = render(&matches, &options);

  Response::builder()
    .header(header::CONTENT_TYPE, "text/calendar; charset=utf-8")
    .header(
      header::CONTENT_DISPOSITION,
      "attachment; filename=basketball.ics",
    )
    .header(header::CACHE_CONTROL, "public, max-age=900")
    .body(body.into())
    .map_err(|e| ApiError::Store(Box::new(e)))
}
