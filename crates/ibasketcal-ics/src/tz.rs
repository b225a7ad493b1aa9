//! VTIMEZONE blocks for named IANA zones.

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

/// Asia/Jerusalem with its IST/IDT recurrence rules. Nearly every feed this
/// service produces uses this zone, so it gets the full definition.
const JERUSALEM: &str = "BEGIN:VTIMEZONE\r\n\
TZID:Asia/Jerusalem\r\n\
X-LIC-LOCATION:Asia/Jerusalem\r\n\
BEGIN:STANDARD\r\n\
TZOFFSETFROM:+0300\r\n\
TZOFFSETTO:+0200\r\n\
TZNAME:IST\r\n\
DTSTART:19701025T020000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU\r\n\
END:STANDARD\r\n\
BEGIN:DAYLIGHT\r\n\
TZOFFSETFROM:+0200\r\n\
TZOFFSETTO:+0300\r\n\
TZNAME:IDT\r\n\
DTSTART:19700329T020000\r\n\
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1FR\r\n\
END:DAYLIGHT\r\n\
END:VTIMEZONE\r\n";

fn format_offset(seconds: i32) -> String {
  let sign = if seconds < 0 { '-' } else { '+' };
  let abs = seconds.unsigned_abs();
  format!("{sign}{:02}{:02}", abs / 3600, (abs % 3600) / 60)
}

/// Emit a VTIMEZONE block for `tz`, CRLF-terminated.
///
/// Zones other than Asia/Jerusalem get a single STANDARD sub-component
/// pinned to the zone's offset at `anchor` — enough for calendar clients to
/// resolve the TZID, without reproducing the full transition history.
pub fn vtimezone(tz: Tz, anchor: DateTime<Utc>) -> String {
  if tz == chrono_tz::Asia::Jerusalem {
    return JERUSALEM.to_string();
  }

  let offset = tz
    .offset_from_utc_datetime(&anchor.naive_utc())
    .fix()
    .local_minus_utc();
  let offset = format_offset(offset);

  format!(
    "BEGIN:VTIMEZONE\r\n\
     TZID:{tz}\r\n\
     BEGIN:STANDARD\r\n\
     TZOFFSETFROM:{offset}\r\n\
     TZOFFSETTO:{offset}\r\n\
     DTSTART:19700101T000000\r\n\
     END:STANDARD\r\n\
     END:VTIMEZONE\r\n"
  )
}
