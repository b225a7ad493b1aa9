//! [`RefreshController`] — process-wide scrape state.
//!
//! One controller instance is created at process start and passed explicitly
//! to every component that needs it; there are no module-level globals. A
//! single mutex guards the `{scraping, last_completed_at, last_error,
//! cooldown, progress}` tuple; a watch channel mirrors the scraping flag so
//! `await_idle` and shutdown need no polling.
//!
//! The scrape body itself is abstracted behind [`ScrapeRunner`], which keeps
//! the controller testable without a browser in the room.

use std::{
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use ibasketcal_core::store::{META_LAST_SCRAPE, Snapshot, Store};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{Error, Result};

// ─── Scrape contract ─────────────────────────────────────────────────────────

/// Progress of the group walk, consumable while a scrape runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeProgress {
  pub groups_done:    usize,
  pub groups_total:   usize,
  pub current_season: Option<String>,
}

/// Callback the runner feeds progress into.
#[derive(Clone)]
pub struct ProgressSink(Arc<dyn Fn(ScrapeProgress) + Send + Sync>);

impl ProgressSink {
  pub fn new(publish: impl Fn(ScrapeProgress) + Send + Sync + 'static) -> Self {
    Self(Arc::new(publish))
  }

  pub fn publish(&self, progress: ScrapeProgress) { (self.0.as_ref())(progress) }
}

/// The actual scrape work: produce a full [`Snapshot`], honouring `cancel`.
/// Production uses [`Orchestrator`](crate::orchestrator::Orchestrator);
/// tests substitute stubs.
pub trait ScrapeRunner: Send + Sync {
  fn run(
    &self,
    progress: ProgressSink,
    cancel: watch::Receiver<bool>,
  ) -> impl Future<Output = Result<Snapshot>> + Send + '_;
}

impl<T: ScrapeRunner> ScrapeRunner for Arc<T> {
  fn run(
    &self,
    progress: ProgressSink,
    cancel: watch::Receiver<bool>,
  ) -> impl Future<Output = Result<Snapshot>> + Send + '_ {
    T::run(self, progress, cancel)
  }
}

/// Object-safe shim over [`ScrapeRunner`] so the controller carries no
/// runner type parameter.
trait DynRunner: Send + Sync {
  fn run_boxed<'a>(
    &'a self,
    progress: ProgressSink,
    cancel: watch::Receiver<bool>,
  ) -> BoxFuture<'a, Result<Snapshot>>;
}

impl<R: ScrapeRunner> DynRunner for R {
  fn run_boxed<'a>(
    &'a self,
    progress: ProgressSink,
    cancel: watch::Receiver<bool>,
  ) -> BoxFuture<'a, Result<Snapshot>> {
    Box::pin(self.run(progress, cancel))
  }
}

// ─── Public types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RefreshConfig {
  /// Minimum interval between scrape starts honoured for manual requests.
  pub cooldown: Duration,
  /// Data older than this is stale.
  pub ttl:      Duration,
}

impl Default for RefreshConfig {
  fn default() -> Self {
    Self {
      cooldown: Duration::from_secs(300),
      ttl:      Duration::from_secs(7 * 24 * 60 * 60),
    }
  }
}

/// Outcome of a manual refresh request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
  Started,
  InProgress,
  RateLimited { retry_after: Duration },
}

/// Point-in-time view of the controller state.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
  pub is_scraping:       bool,
  pub last_error:        Option<String>,
  pub last_completed_at: Option<DateTime<Utc>>,
  pub progress:          Option<ScrapeProgress>,
}

// ─── Controller ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct RefreshState {
  scraping:          bool,
  last_completed_at: Option<DateTime<Utc>>,
  last_error:        Option<String>,
  cooldown_until:    Option<Instant>,
  progress:          Option<ScrapeProgress>,
}

pub struct RefreshController<S> {
  store:       S,
  runner:      Arc<dyn DynRunner>,
  cfg:         RefreshConfig,
  state:       Arc<Mutex<RefreshState>>,
  scraping_tx: watch::Sender<bool>,
  cancel_tx:   watch::Sender<bool>,
}

impl<S> RefreshController<S>
where
  S: Store + Clone + Send + Sync + 'static,
{
  pub fn new(
    store: S,
    runner: impl ScrapeRunner + 'static,
    cfg: RefreshConfig,
  ) -> Arc<Self> {
    Arc::new(Self {
      store,
      runner: Arc::new(runner),
      cfg,
      state: Arc::new(Mutex::new(RefreshState::default())),
      scraping_tx: watch::channel(false).0,
      cancel_tx: watch::channel(false).0,
    })
  }

  /// Re-read the persisted freshness stamp, e.g. after a restart.
  pub async fn load_persisted(&self) {
    let value = match self.store.get_metadata(META_LAST_SCRAPE).await {
      Ok(value) => value,
      Err(e) => {
        warn!(error = %e, "could not read persisted scrape stamp");
        return;
      }
    };
    let parsed = value
      .as_deref()
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|dt| dt.with_timezone(&Utc));
    self.state.lock().unwrap().last_completed_at = parsed;
  }

  // ── Observers ─────────────────────────────────────────────────────────────

  pub fn is_scraping(&self) -> bool { self.state.lock().unwrap().scraping }

  pub fn last_completed_at(&self) -> Option<DateTime<Utc>> {
    self.state.lock().unwrap().last_completed_at
  }

  pub fn last_error(&self) -> Option<String> {
    self.state.lock().unwrap().last_error.clone()
  }

  /// True when the store has never been filled, or not recently enough.
  pub fn is_stale(&self) -> bool {
    match self.last_completed_at() {
      None => true,
      Some(at) => {
        let age = Utc::now().signed_duration_since(at);
        age
          > chrono::Duration::from_std(self.cfg.ttl)
            .unwrap_or(chrono::Duration::MAX)
      }
    }
  }

  pub fn status(&self) -> RefreshStatus {
    let st = self.state.lock().unwrap();
    RefreshStatus {
      is_scraping:       st.scraping,
      last_error:        st.last_error.clone(),
      last_completed_at: st.last_completed_at,
      progress:          st.progress.clone(),
    }
  }

  /// Resolve once no scrape is running. Mostly for tests.
  pub async fn await_idle(&self) {
    let mut rx = self.scraping_tx.subscribe();
    let _ = rx.wait_for(|scraping| !scraping).await;
  }

  // ── Refresh requests ──────────────────────────────────────────────────────

  /// Manual refresh. The cooldown runs from the last successful scrape
  /// start, so a request during a just-started scrape reports the remaining
  /// cooldown rather than merely "in progress".
  pub fn request_refresh(&self) -> RefreshOutcome {
    let now = Instant::now();
    let mut st = self.state.lock().unwrap();

    if let Some(until) = st.cooldown_until
      && now < until
    {
      return RefreshOutcome::RateLimited { retry_after: until - now };
    }
    if st.scraping {
      return RefreshOutcome::InProgress;
    }

    self.begin_locked(&mut st, now);
    drop(st);
    self.spawn_scrape();
    RefreshOutcome::Started
  }

  /// Start a scrape if the store has never been populated. Skips the
  /// cooldown check (a boot-time fill should not wait on it) but still
  /// honours the single-writer invariant.
  pub async fn ensure_populated(&self) {
    if self.is_scraping() {
      return;
    }
    let empty = match self.store.stats().await {
      Ok(stats) => stats.seasons == 0 && stats.matches == 0,
      Err(e) => {
        warn!(error = %e, "could not probe store emptiness");
        false
      }
    };
    if !empty {
      return;
    }

    let now = Instant::now();
    let mut st = self.state.lock().unwrap();
    if st.scraping {
      return;
    }
    info!("store is empty, starting automatic scrape");
    self.begin_locked(&mut st, now);
    drop(st);
    self.spawn_scrape();
  }

  /// Signal the in-flight scrape (if any) to stop. The bulk replace is not
  /// interrupted: it either commits fully or never starts.
  pub fn shutdown(&self) { self.cancel_tx.send_replace(true); }

  // ── Internals ─────────────────────────────────────────────────────────────

  fn begin_locked(&self, st: &mut RefreshState, now: Instant) {
    st.scraping = true;
    st.progress = None;
    st.cooldown_until = Some(now + self.cfg.cooldown);
    self.scraping_tx.send_replace(true);
  }

  fn spawn_scrape(&self) {
    let store = self.store.clone();
    let runner = self.runner.clone();
    let state = self.state.clone();
    let scraping_tx = self.scraping_tx.clone();
    let cancel = self.cancel_tx.subscribe();

    tokio::spawn(async move {
      let sink = ProgressSink::new({
        let state = state.clone();
        move |p: ScrapeProgress| {
          state.lock().unwrap().progress = Some(p);
        }
      });
      let started = Instant::now();

      let outcome = match runner.run_boxed(sink, cancel).await {
        Ok(snapshot) if snapshot.is_empty() => Err(Error::EmptySnapshot),
        Ok(snapshot) => store
          .bulk_replace(snapshot)
          .await
          .map_err(|e| Error::Store(e.to_string())),
        Err(e) => Err(e),
      };

      let mut st = state.lock().unwrap();
      st.scraping = false;
      st.progress = None;
      match outcome {
        Ok(()) => {
          st.last_completed_at = Some(Utc::now());
          st.last_error = None;
          drop(st);
          info!(elapsed_s = started.elapsed().as_secs(), "scrape committed");
        }
        Err(e) => {
          st.last_error = Some(e.to_string());
          drop(st);
          warn!(error = %e, "scrape failed, keeping previous data");
        }
      }
      scraping_tx.send_replace(false);
    });
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
