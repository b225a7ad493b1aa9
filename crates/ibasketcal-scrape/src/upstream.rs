//! Typed client for the upstream JSON API.
//!
//! Every call carries the harvested bearer token and the widget page's
//! `Origin` header — the upstream refuses requests without them, which is
//! the whole reason the harvester exists. Server errors and network
//! failures are retried with exponential backoff; a 401 surfaces as
//! [`Error::AuthExpired`] so the orchestrator can re-token and resume.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::{
  Error, Result,
  harvester::Token,
  raw::{RawCalendar, RawCompetition, RawSeason},
};

const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
  /// e.g. `https://api.swish.nbn23.com`
  pub base_url: String,
  /// Origin of the widget host page, e.g. `https://ibasketball.co.il`
  pub origin:   String,
}

/// Stateless wrapper around the upstream endpoints. Cheap to clone.
#[derive(Clone)]
pub struct UpstreamClient {
  http: reqwest::Client,
  cfg:  UpstreamConfig,
}

/// Delay before retry attempt `attempt` (1-based).
fn backoff_delay(attempt: u32) -> Duration {
  Duration::from_millis(500 * 2u64.pow(attempt.saturating_sub(1)))
}

impl UpstreamClient {
  pub fn new(cfg: UpstreamConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(CALL_TIMEOUT)
      .build()
      .map_err(|e| Error::Unreachable(e.to_string()))?;
    Ok(Self { http, cfg })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.cfg.base_url.trim_end_matches('/'))
  }

  async fn get_json(
    &self,
    token: &Token,
    path: &str,
    params: &[(&str, &str)],
  ) -> Result<Value> {
    let url = self.url(path);

    for attempt in 1..=MAX_ATTEMPTS {
      let outcome = self
        .http
        .get(&url)
        .query(params)
        .header("Authorization", token.as_str())
        .header("Origin", &self.cfg.origin)
        .header("Accept", "application/json")
        .send()
        .await;

      let resp = match outcome {
        Ok(resp) => resp,
        Err(e) if attempt < MAX_ATTEMPTS => {
          debug!(%url, attempt, error = %e, "upstream call failed, retrying");
          tokio::time::sleep(backoff_delay(attempt)).await;
          continue;
        }
        Err(e) => return Err(Error::Unreachable(e.to_string())),
      };

      let status = resp.status();
      if status.as_u16() == 401 {
        return Err(Error::AuthExpired);
      }
      if status.is_server_error() && attempt < MAX_ATTEMPTS {
        debug!(%url, attempt, %status, "upstream server error, retrying");
        tokio::time::sleep(backoff_delay(attempt)).await;
        continue;
      }
      if !status.is_success() {
        return Err(Error::Rejected {
          status: status.as_u16(),
          body:   resp.text().await.unwrap_or_default(),
        });
      }

      return resp
        .json()
        .await
        .map_err(|e| Error::Rejected { status: status.as_u16(), body: e.to_string() });
    }

    unreachable!("retry loop always returns")
  }

  // ── Endpoints ─────────────────────────────────────────────────────────────

  /// `GET /seasons`
  pub async fn seasons(&self, token: &Token) -> Result<Vec<RawSeason>> {
    let body = self.get_json(token, "/seasons", &[]).await?;
    as_array(body)?.into_iter().map(RawSeason::from_value).collect()
  }

  /// `GET /competitions?seasonId=…` — competitions with nested groups.
  pub async fn competitions(
    &self,
    token: &Token,
    season_id: &str,
  ) -> Result<Vec<RawCompetition>> {
    let body = self
      .get_json(token, "/competitions", &[("seasonId", season_id)])
      .await?;
    as_array(body)?
      .into_iter()
      .map(RawCompetition::from_value)
      .collect()
  }

  /// `GET /calendar?groupId=…` — rounds with nested matches.
  pub async fn calendar(&self, token: &Token, group_id: &str) -> Result<RawCalendar> {
    let body = self
      .get_json(token, "/calendar", &[("groupId", group_id)])
      .await?;
    serde_json::from_value(body)
      .map_err(|e| Error::Rejected { status: 200, body: format!("calendar shape: {e}") })
  }

  /// `GET /standings?groupId=…` — stored verbatim, never interpreted.
  pub async fn standings(&self, token: &Token, group_id: &str) -> Result<Vec<Value>> {
    let body = self
      .get_json(token, "/standings", &[("groupId", group_id)])
      .await?;
    // Some groups answer standings with an object or nothing at all.
    Ok(match body {
      Value::Array(rows) => rows,
      Value::Null => Vec::new(),
      other => vec![other],
    })
  }
}

fn as_array(body: Value) -> Result<Vec<Value>> {
  match body {
    Value::Array(rows) => Ok(rows),
    Value::Null => Ok(Vec::new()),
    other => Err(Error::Rejected {
      status: 200,
      body:   format!("expected array, got {other}"),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backoff_doubles_per_attempt() {
    assert_eq!(backoff_delay(1), Duration::from_millis(500));
    assert_eq!(backoff_delay(2), Duration::from_millis(1000));
    assert_eq!(backoff_delay(3), Duration::from_millis(2000));
  }

  #[test]
  fn url_joins_without_double_slash() {
    let client = UpstreamClient::new(UpstreamConfig {
      base_url: "https://api.example.test/".into(),
      origin:   "https://example.test".into(),
    })
    .unwrap();
    assert_eq!(client.url("/seasons"), "https://api.example.test/seasons");
  }

  #[test]
  fn as_array_tolerates_null() {
    assert!(as_array(Value::Null).unwrap().is_empty());
    assert!(as_array(serde_json::json!({ "not": "array" })).is_err());
  }
}
