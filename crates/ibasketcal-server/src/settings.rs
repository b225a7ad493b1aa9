//! Runtime configuration.
//!
//! Loaded by layering an optional `ibasketcal.toml` under plain environment
//! variables (`DB_TYPE`, `DATA_DIR`, `CACHE_TTL_MINUTES`, …). Every key has
//! a default; unknown keys are ignored.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
  File,
  Edgesql,
  Rowstore,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub host: String,
  pub port: u16,

  pub db_type:  DbType,
  /// Directory holding the embedded database; the unit of backup.
  pub data_dir: PathBuf,

  pub cache_ttl_minutes:        u64,
  pub refresh_cooldown_seconds: u64,

  pub widget_url:        String,
  pub upstream_base_url: String,
  /// `Origin` header the upstream insists on — the widget page's origin.
  pub upstream_origin:   String,
  /// Host substring that marks upstream API traffic during interception.
  pub upstream_api_host: String,
  pub scraper_headless:  bool,
  pub scrape_parallelism: usize,

  pub edgesql_url:        Option<String>,
  pub edgesql_auth_token: Option<String>,
  pub rowstore_url:       Option<String>,
  pub rowstore_key:       Option<String>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      host: "0.0.0.0".into(),
      port: 8000,
      db_type: DbType::File,
      data_dir: PathBuf::from("data"),
      cache_ttl_minutes: 10_080,
      refresh_cooldown_seconds: 300,
      widget_url: "https://ibasketball.co.il/swish/".into(),
      upstream_base_url: "https://api.swish.nbn23.com".into(),
      upstream_origin: "https://ibasketball.co.il".into(),
      upstream_api_host: "api.swish.nbn23.com".into(),
      scraper_headless: true,
      scrape_parallelism: 6,
      edgesql_url: None,
      edgesql_auth_token: None,
      rowstore_url: None,
      rowstore_key: None,
    }
  }
}
