//! RFC 5545 calendar generation for basketball fixtures.
//!
//! Produces a complete VCALENDAR document from a match list: CRLF line
//! endings everywhere, content lines folded at 75 octets, text values
//! escaped per the RFC. Fan mode emits events at kick-off in UTC Zulu form;
//! player mode shifts DTSTART earlier by a preparation offset, and a named
//! IANA zone switches the datetimes to `TZID=` form with a VTIMEZONE block.

pub mod fold;
pub mod tz;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use ibasketcal_core::{matches::Match, season::group_label};

use crate::fold::{escape_text, fold_line};

/// Base title of every generated calendar.
pub const CALENDAR_TITLE: &str = "Israeli Basketball";
/// Domain suffix of event UIDs; UIDs are stable across regenerations.
pub const UID_DOMAIN: &str = "ibasketcal";
const PRODID: &str = "-//ibasketcal//Israeli Basketball Calendar//EN";
/// Matches without an upstream end time run this long.
const DEFAULT_DURATION_MIN: i64 = 120;

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
  /// Events at kick-off, for spectators.
  #[default]
  Fan,
  /// Events starting `prep_minutes` before kick-off, for the people who
  /// have to be at the hall early. The end time is unchanged.
  Player { prep_minutes: u32 },
}

#[derive(Debug, Clone)]
pub struct CalendarOptions {
  /// `X-WR-CALNAME` value; see [`calendar_name`].
  pub name: String,
  pub mode: Mode,
  /// When set, datetimes are rendered in this zone with `TZID=` parameters
  /// and a VTIMEZONE block is emitted after the calendar header.
  pub tz:   Option<Tz>,
  /// DTSTAMP source, injectable so output is reproducible under test.
  pub now:  DateTime<Utc>,
}

impl CalendarOptions {
  pub fn new(name: String) -> Self {
    Self { name, mode: Mode::Fan, tz: None, now: Utc::now() }
  }
}

/// `"Israeli Basketball — <competition?> — <team?>"`, skipping absent parts.
pub fn calendar_name(competition: Option<&str>, team: Option<&str>) -> String {
  let mut parts = vec![CALENDAR_TITLE];
  parts.extend(competition);
  parts.extend(team);
  parts.join(" — ")
}

// ─── Datetime rendering ──────────────────────────────────────────────────────

fn format_utc(dt: DateTime<Utc>) -> String {
  dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Render a `DTSTART`/`DTEND` property, either Zulu or `TZID=` local form.
fn dt_property(prop: &str, dt: DateTime<Utc>, tz: Option<Tz>) -> String {
  match tz {
    None => format!("{prop}:{}", format_utc(dt)),
    Some(tz) => format!(
      "{prop};TZID={tz}:{}",
      dt.with_timezone(&tz).format("%Y%m%dT%H%M%S")
    ),
  }
}

// ─── Event assembly ──────────────────────────────────────────────────────────

fn summary(m: &Match) -> String {
  let home = m.home_team_name.as_deref().unwrap_or("TBD");
  let away = m.away_team_name.as_deref().unwrap_or("TBD");
  match m.final_score() {
    Some((hs, aws)) => format!("{home} {hs}:{aws} {away} [FINAL]"),
    None => format!("{home} vs {away}"),
  }
}

fn description(m: &Match) -> String {
  let mut lines = Vec::new();
  if !m.competition_name.is_empty() {
    lines.push(format!(
      "Competition: {}",
      group_label(&m.competition_name, &m.group_name)
    ));
  }
  if let Some((hs, aws)) = m.final_score() {
    lines.push(format!("Final score: {hs}:{aws}"));
  }
  lines.join("\n")
}

fn push_event(out: &mut String, m: &Match, opts: &CalendarOptions) {
  let dtend = m.date + Duration::minutes(DEFAULT_DURATION_MIN);
  let dtstart = match opts.mode {
    Mode::Fan => m.date,
    Mode::Player { prep_minutes } => {
      m.date - Duration::minutes(i64::from(prep_minutes))
    }
  };

  out.push_str("BEGIN:VEVENT\r\n");
  out.push_str(&fold_line(&format!("UID:{}@{UID_DOMAIN}", m.id)));
  out.push_str(&fold_line(&format!("DTSTAMP:{}", format_utc(opts.now))));
  out.push_str(&fold_line(&dt_property("DTSTART", dtstart, opts.tz)));
  out.push_str(&fold_line(&dt_property("DTEND", dtend, opts.tz)));
  out.push_str(&fold_line(&format!("SUMMARY:{}", escape_text(&summary(m)))));

  if let Some(location) = m.location() {
    out.push_str(&fold_line(&format!("LOCATION:{}", escape_text(&location))));
  }
  let desc = description(m);
  if !desc.is_empty() {
    out.push_str(&fold_line(&format!("DESCRIPTION:{}", escape_text(&desc))));
  }

  out.push_str("STATUS:CONFIRMED\r\n");
  out.push_str("END:VEVENT\r\n");
}

// ─── Calendar assembly ───────────────────────────────────────────────────────

/// Render a full VCALENDAR document for `matches`.
pub fn render(matches: &[Match], opts: &CalendarOptions) -> String {
  let mut out = String::new();
  out.push_str("BEGIN:VCALENDAR\r\n");
  out.push_str("VERSION:2.0\r\n");
  out.push_str(&fold_line(&format!("PRODID:{PRODID}")));
  out.push_str(&fold_line(&format!(
    "X-WR-CALNAME:{}",
    escape_text(&opts.name)
  )));
  out.push_str("CALSCALE:GREGORIAN\r\n");
  out.push_str("METHOD:PUBLISH\r\n");

  if let Some(tz) = opts.tz {
    out.push_str(&tz::vtimezone(tz, opts.now));
  }

  for m in matches {
    push_event(&mut out, m, opts);
  }

  out.push_str("END:VCALENDAR\r\n");
  out
}

// ─── Tests ───────────────────────────────────────────────────────────────────
