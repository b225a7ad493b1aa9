//! Error type for `ibasketcal-store-remote`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] ibasketcal_core::Error),

  #[error("transport error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("backend rejected request: {status}: {body}")]
  Api { status: u16, body: String },

  /// The SQL service reported a statement-level failure.
  #[error("statement failed: {0}")]
  Statement(String),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("row decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
