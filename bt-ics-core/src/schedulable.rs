//! Input model for calendar export.
//!
//! A [`Schedulable`] is anything the community platform can put on a
//! calendar. Optional collaborator data (description, URL, recurrence) is
//! modelled as optional fields rather than probed for at runtime.

use chrono::{DateTime, NaiveDate, Utc};
use rrule::{RRule, RRuleError, Unvalidated};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ics::formatter;

/// Column width handed to the HTML renderer; wide enough that it never wraps.
const PLAIN_TEXT_WIDTH: usize = 4096;

/// An event-like record to export (provider-neutral)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedulable {
    pub id: String,
    pub name: String,

    // Timing
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    /// IANA zone name; absent means UTC
    #[serde(default)]
    pub timezone: Option<String>,

    // Content
    #[serde(default)]
    pub description: Option<Description>,
    /// Public page for the event
    #[serde(default)]
    pub url: Option<String>,

    // Recurrence
    #[serde(default)]
    pub recurring: bool,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
}

impl Schedulable {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Schedulable {
            id: id.into(),
            name: name.into(),
            starts_at: None,
            ends_at: None,
            timezone: None,
            description: None,
            url: None,
            recurring: false,
            schedule: None,
            recurrence: None,
        }
    }

    pub fn with_times(mut self, starts_at: DateTime<Utc>, ends_at: Option<DateTime<Utc>>) -> Self {
        self.starts_at = Some(starts_at);
        self.ends_at = ends_at;
        self
    }

    pub fn with_timezone(mut self, zone: impl Into<String>) -> Self {
        self.timezone = Some(zone.into());
        self
    }

    pub fn with_description(mut self, description: Description) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Mark the event recurring on `schedule`.
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.recurring = true;
        self.schedule = Some(schedule);
        self
    }

    pub fn with_exception_dates(mut self, dates: Vec<NaiveDate>) -> Self {
        self.recurrence = Some(Recurrence {
            exception_dates: dates,
        });
        self
    }

    /// Whether times render as UTC (`Z` suffix, no `TZID`).
    pub fn is_utc(&self) -> bool {
        formatter::is_utc_zone(self.timezone.as_deref())
    }

    /// Instant the VTIMEZONE for this event is derived around.
    pub fn reference_time(&self) -> DateTime<Utc> {
        self.starts_at.unwrap_or_else(Utc::now)
    }

    /// Exception dates, empty when the event has no recurrence record.
    pub fn exception_dates(&self) -> &[NaiveDate] {
        self.recurrence
            .as_ref()
            .map(|r| r.exception_dates.as_slice())
            .unwrap_or_default()
    }
}

/// Event description as stored by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Description {
    Plain(String),
    /// Rich text body (HTML)
    Html(String),
}

impl Description {
    /// Plain-text rendering with surrounding whitespace trimmed.
    pub fn to_plain_text(&self) -> String {
        match self {
            Description::Plain(text) => text.trim().to_string(),
            Description::Html(html) => match html2text::from_read(html.as_bytes(), PLAIN_TEXT_WIDTH) {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    warn!(error = %e, "could not render HTML description, using raw markup");
                    html.trim().to_string()
                }
            },
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Description::Plain(text) | Description::Html(text) => text.trim().is_empty(),
        }
    }
}

/// A recurrence rule, kept in the rule library's own representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Schedule {
    rule: RRule<Unvalidated>,
}

impl Schedule {
    /// Parse an RRULE value, with or without the `RRULE:` prefix.
    pub fn parse(text: &str) -> Result<Self, RRuleError> {
        let text = text.trim();
        let value = text.strip_prefix("RRULE:").unwrap_or(text);
        let rule = value.parse::<RRule<Unvalidated>>()?;
        Ok(Schedule { rule })
    }

    /// Validate against the series start and render RFC 5545 RRULE text.
    pub fn to_rrule(&self, dtstart: DateTime<Utc>) -> Result<String, RRuleError> {
        let tz: rrule::Tz = Utc.into();
        self.rule.clone().validate(dtstart.with_timezone(&tz))?;
        Ok(self.rule_text())
    }

    fn rule_text(&self) -> String {
        let text = self.rule.to_string();
        match text.strip_prefix("RRULE:") {
            Some(value) => value.to_string(),
            None => text,
        }
    }
}

impl TryFrom<String> for Schedule {
    type Error = RRuleError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Schedule::parse(&text)
    }
}

impl From<Schedule> for String {
    fn from(schedule: Schedule) -> Self {
        schedule.rule_text()
    }
}

/// Recurrence details kept alongside a schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    /// Occurrence dates removed from the series, in order
    #[serde(default)]
    pub exception_dates: Vec<NaiveDate>,
}
