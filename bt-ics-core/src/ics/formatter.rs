//! Value formatting primitives shared by every ICS builder.
//!
//! All date-time text in an export goes through these functions so the
//! line-based and structured event paths can never disagree on a format.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// `YYYYMMDDTHHMMSSZ`
const UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// `YYYYMMDDTHHMMSS`, used with a `TZID` parameter
const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";

const DATE_FORMAT: &str = "%Y%m%d";

/// Longest physical line before folding (RFC 5545 §3.1).
const MAX_LINE_OCTETS: usize = 75;

/// Zone names that never get a VTIMEZONE and always render with a `Z` suffix.
const UTC_ZONES: [&str; 2] = ["UTC", "Etc/UTC"];

/// Current instant in UTC, for `DTSTAMP`.
pub fn timestamp() -> String {
    Utc::now().format(UTC_FORMAT).to_string()
}

/// Format an instant as a UTC date-time.
pub fn utc_time(instant: Option<DateTime<Utc>>) -> Option<String> {
    instant.map(|at| at.format(UTC_FORMAT).to_string())
}

/// Format an instant as wall-clock time in `zone`, without offset or `Z`.
///
/// Returns `None` when the instant is absent or the zone is not a known
/// IANA name.
pub fn local_time(instant: Option<DateTime<Utc>>, zone: &str) -> Option<String> {
    let at = instant?;
    let tz: Tz = zone.parse().ok()?;
    Some(at.with_timezone(&tz).format(LOCAL_FORMAT).to_string())
}

/// Format an instant's UTC wall clock without the `Z` marker.
///
/// Used for a `TZID` whose zone the database cannot resolve.
pub fn floating_time(instant: Option<DateTime<Utc>>) -> Option<String> {
    instant.map(|at| at.format(LOCAL_FORMAT).to_string())
}

/// Format a calendar date (`VALUE=DATE`).
pub fn date(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}

/// Format signed seconds east of UTC as `±HHMM`.
pub fn utc_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let magnitude = i64::from(seconds).abs();
    let hours = magnitude / 3600;
    let minutes = (magnitude % 3600) / 60;
    format!("{sign}{hours:02}{minutes:02}")
}

/// Format a signed duration as a DURATION value in its largest whole unit
/// (`-PT24H`, `-PT90M`, `PT0S`).
pub fn duration(span: Duration) -> String {
    let seconds = span.num_seconds();
    let sign = if seconds < 0 { "-" } else { "" };
    let magnitude = seconds.abs();

    let body = match magnitude {
        0 => "0S".to_string(),
        m if m % 3600 == 0 => format!("{}H", m / 3600),
        m if m % 60 == 0 => format!("{}M", m / 60),
        m => format!("{m}S"),
    };
    format!("{sign}PT{body}")
}

/// Fold a content line into 75-octet physical lines joined by CRLF + space.
///
/// Splits only on UTF-8 character boundaries.
pub fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    let mut limit = MAX_LINE_OCTETS;

    for ch in line.chars() {
        if width + ch.len_utf8() > limit {
            out.push_str("\r\n ");
            // the leading space counts against the continuation line
            width = 1;
            limit = MAX_LINE_OCTETS;
        }
        out.push(ch);
        width += ch.len_utf8();
    }

    out
}

/// Join folded physical lines back into content lines.
pub fn unfold(text: &str) -> String {
    text.replace("\r\n ", "").replace("\r\n\t", "")
}

/// Replace every LF not already preceded by CR with CRLF.
pub fn normalize_line_endings(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 32);
    let mut previous = None;

    for ch in text.chars() {
        if ch == '\n' && previous != Some('\r') {
            out.push('\r');
        }
        out.push(ch);
        previous = Some(ch);
    }

    out
}

/// Escape a TEXT value (RFC 5545 §3.3.11).
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }

    out
}

/// Whether a schedulable's zone should be rendered as plain UTC.
pub fn is_utc_zone(zone: Option<&str>) -> bool {
    match zone {
        None => true,
        Some(name) => name.trim().is_empty() || UTC_ZONES.contains(&name),
    }
}
