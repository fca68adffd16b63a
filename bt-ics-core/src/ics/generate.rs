//! ICS document generation.

use icalendar::Calendar;
use tracing::debug;

use super::event;
use super::formatter;
use super::timezone::{self, ChronoTzProvider, TimezoneProvider};
use crate::error::IcsResult;
use crate::i18n::{Catalog, Translator};
use crate::schedulable::Schedulable;

pub const PRODUCT_ID: &str = "-//Better Together Community Engine//EN";

/// Calendar-level properties, in output order.
fn header_lines() -> [String; 4] {
    [
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODUCT_ID}"),
        "CALSCALE:GREGORIAN".to_string(),
        // static calendar to import, not an invitation awaiting RSVP
        "METHOD:PUBLISH".to_string(),
    ]
}

/// Builds complete VCALENDAR documents.
///
/// Holds only borrowed, read-only collaborators, so one generator can serve
/// any number of concurrent exports.
#[derive(Clone, Copy)]
pub struct Generator<'a> {
    provider: &'a dyn TimezoneProvider,
    translator: &'a dyn Translator,
}

impl<'a> Generator<'a> {
    pub fn new(provider: &'a dyn TimezoneProvider, translator: &'a dyn Translator) -> Self {
        Generator {
            provider,
            translator,
        }
    }

    /// Generate one document holding a VEVENT per schedulable.
    ///
    /// Any event error aborts the whole export; no partial document is
    /// ever returned.
    pub fn generate(&self, schedulables: &[Schedulable]) -> IcsResult<String> {
        let mut cal = Calendar::new();
        for schedulable in schedulables {
            let mut ics_event = icalendar::Event::new();
            event::build_icalendar_event(schedulable, self.translator, &mut ics_event)?;
            cal.push(ics_event.done());
        }
        let cal = cal.done();

        let timezones = self.timezone_lines(schedulables);
        let output = rewrite_envelope(&cal.to_string(), &timezones);

        debug!(
            events = schedulables.len(),
            timezone_lines = timezones.len(),
            "generated calendar"
        );

        Ok(formatter::normalize_line_endings(&output))
    }

    pub fn generate_one(&self, schedulable: &Schedulable) -> IcsResult<String> {
        self.generate(std::slice::from_ref(schedulable))
    }

    /// VTIMEZONE blocks for every distinct non-UTC zone, first use wins.
    fn timezone_lines(&self, schedulables: &[Schedulable]) -> Vec<String> {
        let mut seen: Vec<&str> = Vec::new();
        let mut lines = Vec::new();

        for schedulable in schedulables {
            let Some(zone) = schedulable.timezone.as_deref() else {
                continue;
            };
            if schedulable.is_utc() || seen.contains(&zone) {
                continue;
            }
            seen.push(zone);

            lines.extend(timezone::build_vtimezone(
                self.provider,
                Some(zone),
                schedulable.reference_time(),
            ));
        }

        lines
    }
}

/// Generate a document with the bundled timezone database and English strings.
pub fn generate_ics(schedulables: &[Schedulable]) -> IcsResult<String> {
    let catalog = Catalog::english();
    Generator::new(&ChronoTzProvider, &catalog).generate(schedulables)
}

/// Download filename for an export.
pub fn generate_filename(schedulables: &[Schedulable]) -> String {
    match schedulables {
        [single] => {
            let slug = slug::slugify(&single.name);
            if slug.is_empty() {
                "event.ics".to_string()
            } else {
                format!("{slug}.ics")
            }
        }
        _ => "events.ics".to_string(),
    }
}

/// Rewrite the `icalendar` crate's output into the exported envelope.
/// - Replace its calendar header with ours (fixed PRODID, METHOD:PUBLISH)
/// - Insert VTIMEZONE blocks ahead of the first VEVENT
/// - Remove DTSTAMP and UID inside VALARM sections (not required by RFC 5545)
fn rewrite_envelope(ics: &str, timezones: &[String]) -> String {
    let extra: usize = timezones.iter().map(|l| l.len() + 2).sum();
    let mut result = String::with_capacity(ics.len() + extra);
    let mut depth = 0usize;
    let mut in_valarm = false;
    let mut timezones_written = false;

    for line in ics.lines() {
        if line == "BEGIN:VCALENDAR" {
            push(&mut result, line);
            for header in header_lines() {
                push(&mut result, &header);
            }
            depth = 1;
            continue;
        }

        if let Some(kind) = line.strip_prefix("BEGIN:") {
            if kind == "VEVENT" && !timezones_written {
                for tz_line in timezones {
                    push(&mut result, tz_line);
                }
                timezones_written = true;
            }
            in_valarm |= kind == "VALARM";
            depth += 1;
        } else if let Some(kind) = line.strip_prefix("END:") {
            if kind == "VCALENDAR" && !timezones_written {
                for tz_line in timezones {
                    push(&mut result, tz_line);
                }
                timezones_written = true;
            }
            if kind == "VALARM" {
                in_valarm = false;
            }
            depth = depth.saturating_sub(1);
        } else if depth == 1 {
            // calendar-level property (or its continuation) from the library
            continue;
        } else if in_valarm && (line.starts_with("DTSTAMP:") || line.starts_with("UID:")) {
            continue;
        }

        push(&mut result, line);
    }

    result
}

fn push(result: &mut String, line: &str) {
    result.push_str(line);
    result.push_str("\r\n");
}
