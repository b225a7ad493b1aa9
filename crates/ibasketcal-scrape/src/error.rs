//! Error taxonomy of the ingest side.
//!
//! Everything here is recoverable at the process level: scrape failures are
//! captured into the refresh controller's `last_error` slot and readers keep
//! serving last-known-good data.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Upstream returned 401. The orchestrator recovers once by harvesting a
  /// fresh token; surfaced only if that recovery also fails.
  #[error("upstream bearer token expired")]
  AuthExpired,

  /// Upstream refused the request with a non-401 client error, or kept
  /// failing server-side after retries.
  #[error("upstream rejected request ({status}): {body}")]
  Rejected { status: u16, body: String },

  /// Network-level failure that survived the retry budget.
  #[error("upstream unreachable: {0}")]
  Unreachable(String),

  /// The browser driver timed out or the widget page changed shape.
  #[error("token acquisition failed: {0}")]
  TokenAcquisition(String),

  /// A scrape finished but produced no entities; the previous snapshot is
  /// kept instead of replacing good data with nothing.
  #[error("scrape produced an empty snapshot")]
  EmptySnapshot,

  /// The store rejected the bulk replace.
  #[error("store error: {0}")]
  Store(String),

  #[error("scrape cancelled by shutdown")]
  Cancelled,

  #[error("scrape exceeded its {0:?} fetch budget")]
  Timeout(Duration),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
