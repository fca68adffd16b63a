//! VTIMEZONE generation.
//!
//! A zone's STANDARD/DAYLIGHT observances are derived from the offsets the
//! timezone database reports in a window of ten years either side of the
//! event's reference instant. Older history is deliberately out of reach so
//! pre-standardization offsets (LMT and friends) never leak into exports.

use chrono::{DateTime, Duration, Months, Offset, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};
use tracing::{debug, trace, warn};

use super::formatter;

/// Years searched on each side of the reference instant.
const WINDOW_YEARS: u32 = 10;

/// A change of UTC offset in a zone. Offsets are seconds east of UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// First instant at which `offset_to` applies.
    pub at: DateTime<Utc>,
    pub offset_from: i32,
    pub offset_to: i32,
}

/// Read-only view of a timezone database.
///
/// Every method returns `None` for a zone name the database does not know.
pub trait TimezoneProvider {
    /// Total observed UTC offset at `at`.
    fn offset_at(&self, zone: &str, at: DateTime<Utc>) -> Option<i32>;

    /// Standard (non-DST) UTC offset in effect at `at`.
    fn base_offset_at(&self, zone: &str, at: DateTime<Utc>) -> Option<i32>;

    /// Whether daylight saving time is in effect at `at`.
    fn is_dst(&self, zone: &str, at: DateTime<Utc>) -> Option<bool> {
        Some(self.offset_at(zone, at)? != self.base_offset_at(zone, at)?)
    }

    /// Offset transitions in `(from, to]`, oldest first.
    fn transitions_in(
        &self,
        zone: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Option<Vec<Transition>>;
}

/// [`TimezoneProvider`] backed by the IANA database compiled into `chrono-tz`.
///
/// `chrono-tz` keeps its transition table private, so transitions are found
/// by sampling once a day and bisecting every change to the exact second.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChronoTzProvider;

/// (total offset, dst offset) in seconds
type ZoneState = (i32, i32);

impl ChronoTzProvider {
    fn zone(name: &str) -> Option<Tz> {
        name.parse().ok()
    }

    fn state(tz: Tz, at: DateTime<Utc>) -> ZoneState {
        let offset = tz.offset_from_utc_datetime(&at.naive_utc());
        let total = offset.fix().local_minus_utc();
        let dst = offset.dst_offset().num_seconds() as i32;
        (total, dst)
    }

    /// (base, dst) offsets with DST never negative.
    ///
    /// Zones like Europe/Dublin record summer as standard time and winter as a
    /// negative saving. Those are flipped so winter is standard and summer is
    /// daylight.
    fn observed(tz: Tz, at: DateTime<Utc>) -> (i32, i32) {
        let offset = tz.offset_from_utc_datetime(&at.naive_utc());
        let total = offset.fix().local_minus_utc();
        let base = offset.base_utc_offset().num_seconds() as i32;
        let dst = offset.dst_offset().num_seconds() as i32;

        if dst < 0 {
            return (total, 0);
        }

        // winter is reachable from any summer instant at one of these
        let negative_saving = [-182, -91, 91, 182]
            .into_iter()
            .map(|days| Self::state(tz, at + Duration::days(days)).1)
            .find(|saving| *saving < 0);

        match negative_saving {
            Some(saving) => (base + saving, total - (base + saving)),
            None => (base, dst),
        }
    }

    /// First instant in `(lo, hi]` whose state differs from `before`.
    fn bisect(tz: Tz, lo: DateTime<Utc>, hi: DateTime<Utc>, before: ZoneState) -> DateTime<Utc> {
        let (mut lo_secs, mut hi_secs) = (lo.timestamp(), hi.timestamp());
        while hi_secs - lo_secs > 1 {
            let mid_secs = lo_secs + (hi_secs - lo_secs) / 2;
            let Some(mid) = DateTime::from_timestamp(mid_secs, 0) else {
                break;
            };
            if Self::state(tz, mid) == before {
                lo_secs = mid_secs;
            } else {
                hi_secs = mid_secs;
            }
        }
        DateTime::from_timestamp(hi_secs, 0).unwrap_or(hi)
    }
}

impl TimezoneProvider for ChronoTzProvider {
    fn offset_at(&self, zone: &str, at: DateTime<Utc>) -> Option<i32> {
        let tz = Self::zone(zone)?;
        Some(Self::state(tz, at).0)
    }

    fn base_offset_at(&self, zone: &str, at: DateTime<Utc>) -> Option<i32> {
        let tz = Self::zone(zone)?;
        Some(Self::observed(tz, at).0)
    }

    fn is_dst(&self, zone: &str, at: DateTime<Utc>) -> Option<bool> {
        let tz = Self::zone(zone)?;
        Some(Self::observed(tz, at).1 != 0)
    }

    fn transitions_in(
        &self,
        zone: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Option<Vec<Transition>> {
        let tz = Self::zone(zone)?;
        let step = Duration::days(1);
        let mut transitions = Vec::new();

        let mut cursor = from;
        let mut state = Self::state(tz, cursor);
        while cursor < to {
            let next = (cursor + step).min(to);
            let next_state = Self::state(tz, next);

            if next_state != state {
                let at = Self::bisect(tz, cursor, next, state);
                trace!(zone, %at, from = state.0, to = next_state.0, "offset transition");
                transitions.push(Transition {
                    at,
                    offset_from: state.0,
                    offset_to: next_state.0,
                });
            }

            cursor = next;
            state = next_state;
        }

        Some(transitions)
    }
}

/// Build the VTIMEZONE lines for `zone` around `reference`.
///
/// Returns no lines for UTC (or an absent zone) and for zones the provider
/// cannot resolve; events in an unresolvable zone still export with their
/// `TZID`, clients fall back to their own guess for it.
pub fn build_vtimezone<P>(provider: &P, zone: Option<&str>, reference: DateTime<Utc>) -> Vec<String>
where
    P: TimezoneProvider + ?Sized,
{
    let zone = match zone {
        Some(name) if !formatter::is_utc_zone(Some(name)) => name,
        _ => return Vec::new(),
    };

    let (Some(current), Some(dtstart)) = (
        provider.offset_at(zone, reference),
        formatter::local_time(Some(reference), zone),
    ) else {
        warn!(zone, "unknown timezone, omitting VTIMEZONE");
        return Vec::new();
    };
    let base = provider.base_offset_at(zone, reference).unwrap_or(current);

    let window_start = reference
        .checked_sub_months(Months::new(WINDOW_YEARS * 12))
        .unwrap_or(reference);
    let window_end = reference
        .checked_add_months(Months::new(WINDOW_YEARS * 12))
        .unwrap_or(reference);
    let transitions = provider
        .transitions_in(zone, window_start, window_end)
        .unwrap_or_default();

    let dst_transitions: Vec<&Transition> = transitions
        .iter()
        .filter(|t| provider.is_dst(zone, t.at) == Some(true))
        .collect();

    let (standard_from, standard_to) = standard_offsets(&transitions, reference, current, base);

    let mut lines = vec!["BEGIN:VTIMEZONE".to_string(), format!("TZID:{zone}")];
    push_observance(&mut lines, "STANDARD", &dtstart, standard_from, standard_to);

    if !dst_transitions.is_empty() {
        let daylight = if provider.is_dst(zone, reference) == Some(true) {
            Some(current)
        } else {
            dst_transitions
                .iter()
                .min_by_key(|t| (t.at - reference).num_seconds().abs())
                .map(|t| t.offset_to)
        };

        if let Some(daylight) = daylight.filter(|offset| *offset != base) {
            push_observance(&mut lines, "DAYLIGHT", &dtstart, base, daylight);
        }
    }

    lines.push("END:VTIMEZONE".to_string());

    debug!(
        zone,
        transitions = transitions.len(),
        observes_dst = !dst_transitions.is_empty(),
        "built VTIMEZONE"
    );

    lines
}

/// TZOFFSETFROM/TZOFFSETTO for the STANDARD observance.
///
/// Prefers the last switch into the base offset at or before `reference`,
/// then the last transition of any kind. A zone without transitions in the
/// window is fixed at its current offset.
fn standard_offsets(
    transitions: &[Transition],
    reference: DateTime<Utc>,
    current: i32,
    base: i32,
) -> (i32, i32) {
    let mut past = transitions
        .iter()
        .rev()
        .filter(|t| t.at <= reference && t.offset_from != t.offset_to);

    let latest = past.clone().next();
    let into_standard = past.find(|t| t.offset_to == base);

    match into_standard.or(latest) {
        Some(t) => (t.offset_from, base),
        None => (current, current),
    }
}

fn push_observance(lines: &mut Vec<String>, kind: &str, dtstart: &str, from: i32, to: i32) {
    lines.push(format!("BEGIN:{kind}"));
    lines.push(format!("DTSTART:{dtstart}"));
    lines.push(format!("TZOFFSETFROM:{}", formatter::utc_offset(from)));
    lines.push(format!("TZOFFSETTO:{}", formatter::utc_offset(to)));
    lines.push(format!("END:{kind}"));
}
