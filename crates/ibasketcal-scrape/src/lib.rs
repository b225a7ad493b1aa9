//! Ingest side of the Israeli basketball calendar.
//!
//! The upstream JSON API refuses unauthenticated requests, so ingest starts
//! with a headless browser harvesting a short-lived bearer token from the
//! embedded widget page ([`harvester`]). The [`upstream`] client then walks
//! the seasons → competitions → groups → matches graph ([`orchestrator`]),
//! and the [`refresh`] controller serialises scrapes, enforces the manual
//! cooldown and tracks progress and staleness.

pub mod error;
pub mod harvester;
pub mod orchestrator;
pub mod raw;
pub mod refresh;
pub mod upstream;

pub use error::{Error, Result};
pub use harvester::{HarvesterConfig, Token, TokenHarvester};
pub use orchestrator::{Orchestrator, ScrapeConfig};
pub use refresh::{
  ProgressSink, RefreshConfig, RefreshController, RefreshOutcome,
  RefreshStatus, ScrapeProgress, ScrapeRunner,
};
pub use upstream::{UpstreamClient, UpstreamConfig};
