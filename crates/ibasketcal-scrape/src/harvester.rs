//! Token harvesting via a headless browser.
//!
//! The upstream widget authenticates itself with a short-lived bearer token
//! that never appears in any page source — it only exists on the wire. So
//! the harvester drives a headless Chromium to the widget page, watches CDP
//! network events for requests to the API host, and lifts the
//! `Authorization` header off the first one it sees.
//!
//! This module is the only place in the workspace that knows a browser
//! exists. Tokens are opaque and short-lived; expiry is detected reactively
//! by the upstream returning 401, never predicted here.

use std::{fmt, sync::Arc, time::Duration};

use chromiumoxide::{
  Browser, BrowserConfig, cdp::browser_protocol::network::EventRequestWillBeSent,
};
use futures::{
  FutureExt as _, StreamExt as _,
  future::{BoxFuture, Shared},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{Error, Result};

pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(60);

// ─── Token ───────────────────────────────────────────────────────────────────

/// An opaque upstream credential, passed verbatim in `Authorization`.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
  pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

/// Redacted: tokens must never reach logs.
impl fmt::Debug for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Token(len={})", self.0.len())
  }
}

// ─── Harvester ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HarvesterConfig {
  /// The page embedding the widget, e.g. `https://ibasketball.co.il/swish/`.
  pub widget_url: String,
  /// Host substring that identifies upstream API requests,
  /// e.g. `api.swish.nbn23.com`.
  pub api_host:   String,
  pub headless:   bool,
  pub timeout:    Duration,
}

type SharedAcquire = Shared<BoxFuture<'static, Result<Token, String>>>;

/// Acquires tokens by intercepting the widget's network traffic.
///
/// Acquisitions are single-flight: callers that arrive while one is pending
/// share its future instead of launching a second browser.
pub struct TokenHarvester {
  cfg:      HarvesterConfig,
  inflight: Mutex<Option<SharedAcquire>>,
}

impl TokenHarvester {
  pub fn new(cfg: HarvesterConfig) -> Self {
    Self { cfg, inflight: Mutex::new(None) }
  }

  /// Obtain a fresh token, joining any acquisition already in flight.
  pub async fn acquire(&self) -> Result<Token> {
    let fut = {
      let mut slot = self.inflight.lock().await;
      match slot.as_ref() {
        Some(pending) => {
          debug!("joining pending token acquisition");
          pending.clone()
        }
        None => {
          let cfg = self.cfg.clone();
          let fut = intercept_token(cfg).boxed().shared();
          *slot = Some(fut.clone());
          fut
        }
      }
    };

    let outcome = fut.clone().await;

    // Clear the slot, but only if it still holds our acquisition — a later
    // caller may already have started a new one.
    let mut slot = self.inflight.lock().await;
    if slot.as_ref().is_some_and(|pending| pending.ptr_eq(&fut)) {
      *slot = None;
    }
    drop(slot);

    outcome.map_err(Error::TokenAcquisition)
  }
}

// ─── Browser session ─────────────────────────────────────────────────────────

/// One browser round-trip: launch, navigate, intercept, tear down.
///
/// The whole session runs under the configured timeout. Dropping the future
/// (timeout or caller cancellation) drops the [`Browser`], which kills the
/// Chromium child process, so no exit path leaks a browser.
async fn intercept_token(cfg: HarvesterConfig) -> Result<Token, String> {
  let timeout = cfg.timeout;
  tokio::time::timeout(timeout, browser_session(cfg))
    .await
    .map_err(|_| format!("no token intercepted within {timeout:?}"))?
}

async fn browser_session(cfg: HarvesterConfig) -> Result<Token, String> {
  let mut builder = BrowserConfig::builder()
    .no_sandbox()
    .window_size(1280, 900)
    .arg("--disable-blink-features=AutomationControlled")
    .arg("--disable-dev-shm-usage")
    .arg("--lang=he-IL");
  if !cfg.headless {
    builder = builder.with_head();
  }
  let browser_cfg = builder.build().map_err(|e| format!("browser config: {e}"))?;

  let (mut browser, mut handler) = Browser::launch(browser_cfg)
    .await
    .map_err(|e| format!("browser launch: {e}"))?;

  // The handler must be polled for the CDP connection to make progress.
  let handler_task = tokio::spawn(async move {
    while let Some(event) = handler.next().await {
      if event.is_err() {
        break;
      }
    }
  });

  let result = watch_for_token(&browser, &cfg).await;

  if let Err(e) = browser.close().await {
    warn!(error = %e, "browser close failed");
  }
  let _ = browser.wait().await;
  handler_task.abort();

  result
}

async fn watch_for_token(
  browser: &Browser,
  cfg: &HarvesterConfig,
) -> Result<Token, String> {
  let page = browser
    .new_page("about:blank")
    .await
    .map_err(|e| format!("new page: {e}"))?;

  // Listen before navigating so the widget's very first API call counts.
  let mut requests = page
    .event_listener::<EventRequestWillBeSent>()
    .await
    .map_err(|e| format!("event listener: {e}"))?;

  let nav_page = page.clone();
  let widget_url = cfg.widget_url.clone();
  let nav = tokio::spawn(async move {
    // Navigation failures are not fatal: a partially-loaded widget can
    // still fire the API call we are waiting for.
    if let Err(e) = nav_page.goto(widget_url).await {
      debug!(error = %e, "widget navigation reported an error");
    }
  });

  info!(url = %cfg.widget_url, "waiting for widget to call its API");
  let token = loop {
    let Some(event) = requests.next().await else {
      break Err("browser event stream ended before a token appeared".to_string());
    };
    if !event.request.url.contains(&cfg.api_host) {
      continue;
    }
    if let Some(headers) = event.request.headers.inner().as_object()
      && let Some(value) = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("authorization"))
        .and_then(|(_, v)| v.as_str())
    {
      info!("authorization header intercepted");
      break Ok(Token::new(value));
    }
  };

  nav.abort();
  token
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_debug_never_prints_the_value() {
    let token = Token::new("Bearer super-secret-value");
    let printed = format!("{token:?}");
    assert!(!printed.contains("secret"), "leaked: {printed}");
    assert!(printed.contains("len=25"));
  }

  #[test]
  fn tokens_compare_by_value() {
    assert_eq!(Token::new("a"), Token::new("a"));
    assert_ne!(Token::new("a"), Token::new("b"));
  }
}
