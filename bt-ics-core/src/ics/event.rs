//! VEVENT building.
//!
//! Two paths share the same value formatting: [`build`] returns folded,
//! escaped content lines, [`build_icalendar_event`] fills an `icalendar`
//! event (which escapes and folds on output) and additionally carries
//! recurrence, exception dates and reminders.

use chrono::{DateTime, Duration, Utc};
use icalendar::{Alarm, Component, EventLike, Property, Trigger, ValueType};
use tracing::{debug, warn};

use super::formatter;
use crate::error::{IcsError, IcsResult};
use crate::i18n::{self, Translator};
use crate::schedulable::Schedulable;

/// Suffix of every exported UID.
const UID_DOMAIN: &str = "better-together";

/// (hours before start, description key)
const REMINDERS: [(i64, &str); 3] = [
    (24, i18n::REMINDER_24_HOURS),
    (1, i18n::REMINDER_1_HOUR),
    (0, i18n::REMINDER_AT_START),
];

/// A DTSTART/DTEND value, ready to emit.
struct TimeValue {
    name: &'static str,
    tzid: Option<String>,
    value: String,
}

impl TimeValue {
    fn line(&self) -> String {
        match &self.tzid {
            Some(tzid) => format!("{};TZID={}:{}", self.name, tzid, self.value),
            None => format!("{}:{}", self.name, self.value),
        }
    }

    fn property(&self) -> Property {
        let mut prop = Property::new(self.name, self.value.clone());
        if let Some(ref tzid) = self.tzid {
            prop.add_parameter("TZID", tzid);
        }
        prop
    }
}

/// Deterministic UID for a schedulable.
pub fn uid(schedulable: &Schedulable) -> String {
    format!("event-{}@{}", schedulable.id, UID_DOMAIN)
}

/// Content lines for one VEVENT body (without BEGIN/END).
///
/// Lines longer than 75 octets come back folded.
pub fn build(schedulable: &Schedulable, translator: &dyn Translator) -> Vec<String> {
    let mut lines = vec![
        format!("DTSTAMP:{}", formatter::timestamp()),
        format!("UID:{}", uid(schedulable)),
        format!("SUMMARY:{}", formatter::escape_text(&text_value(&schedulable.name))),
    ];

    if let Some(description) = description_text(schedulable, translator) {
        lines.push(format!("DESCRIPTION:{}", formatter::escape_text(&description)));
    }

    for time in time_values(schedulable) {
        lines.push(time.line());
    }

    if let Some(ref url) = schedulable.url {
        lines.push(format!("URL:{url}"));
    }

    lines.iter().map(|line| formatter::fold_line(line)).collect()
}

/// Populate `target` with the full VEVENT for `schedulable`.
///
/// Fails without touching `target` when the schedulable claims to recur but
/// its rule is missing or invalid.
pub fn build_icalendar_event(
    schedulable: &Schedulable,
    translator: &dyn Translator,
    target: &mut icalendar::Event,
) -> IcsResult<()> {
    let rrule = recurrence_rule(schedulable)?;

    target.add_property("DTSTAMP", formatter::timestamp());
    target.uid(&uid(schedulable));
    target.summary(&text_value(&schedulable.name));

    if let Some(description) = description_text(schedulable, translator) {
        target.description(&description);
    }

    for time in time_values(schedulable) {
        target.append_property(time.property());
    }

    if let Some(ref url) = schedulable.url {
        target.add_property("URL", url);
    }

    if let Some(ref rrule) = rrule {
        target.add_property("RRULE", rrule);
    }

    for day in schedulable.exception_dates() {
        let mut prop = Property::new("EXDATE", formatter::date(*day));
        prop.append_parameter(ValueType::Date);
        target.append_multi_property(prop);
    }

    for (hours, key) in REMINDERS {
        let before = Duration::hours(hours);
        let description = translator.translate(key, &[("event_name", &schedulable.name)]);
        let mut alarm = Alarm::display(&text_value(&description), Trigger::before_start(before));
        // icalendar writes durations in seconds (-PT86400S)
        alarm.add_property("TRIGGER", formatter::duration(-before));
        target.alarm(alarm);
    }

    debug!(
        uid = %uid(schedulable),
        recurring = rrule.is_some(),
        exdates = schedulable.exception_dates().len(),
        "built VEVENT"
    );

    Ok(())
}

/// Convenience wrapper returning a finished `icalendar` event.
pub fn to_icalendar_event(
    schedulable: &Schedulable,
    translator: &dyn Translator,
) -> IcsResult<icalendar::Event> {
    let mut event = icalendar::Event::new();
    build_icalendar_event(schedulable, translator, &mut event)?;
    Ok(event.done())
}

/// Unescaped DESCRIPTION value, with the "view details" line when a URL exists.
fn description_text(schedulable: &Schedulable, translator: &dyn Translator) -> Option<String> {
    let description = schedulable.description.as_ref()?;
    if description.is_blank() {
        return None;
    }

    let mut text = description.to_plain_text();
    if let Some(ref url) = schedulable.url {
        text.push_str("\n\n");
        text.push_str(&translator.translate(i18n::VIEW_DETAILS_URL, &[("url", url)]));
    }

    Some(text_value(&text))
}

/// TEXT with CRLF and lone CR collapsed to LF, so both paths escape it alike.
fn text_value(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn time_values(schedulable: &Schedulable) -> Vec<TimeValue> {
    [
        ("DTSTART", schedulable.starts_at),
        ("DTEND", schedulable.ends_at),
    ]
    .into_iter()
    .filter_map(|(name, at)| time_value(schedulable, name, at?))
    .collect()
}

fn time_value(schedulable: &Schedulable, name: &'static str, at: DateTime<Utc>) -> Option<TimeValue> {
    let zone = match schedulable.timezone.as_deref() {
        Some(zone) if !schedulable.is_utc() => zone,
        _ => {
            return Some(TimeValue {
                name,
                tzid: None,
                value: formatter::utc_time(Some(at))?,
            });
        }
    };

    let value = match formatter::local_time(Some(at), zone) {
        Some(value) => value,
        None => {
            warn!(zone, id = %schedulable.id, "unknown timezone, emitting UTC wall clock under TZID");
            formatter::floating_time(Some(at))?
        }
    };

    Some(TimeValue {
        name,
        tzid: Some(zone.to_string()),
        value,
    })
}

/// RRULE text for a recurring schedulable, `None` for one-off events.
fn recurrence_rule(schedulable: &Schedulable) -> IcsResult<Option<String>> {
    if !schedulable.recurring {
        return Ok(None);
    }

    let schedule = schedulable
        .schedule
        .as_ref()
        .ok_or_else(|| IcsError::MissingSchedule {
            id: schedulable.id.clone(),
        })?;
    let start = schedulable.starts_at.ok_or_else(|| IcsError::MissingStart {
        id: schedulable.id.clone(),
    })?;

    let rrule = schedule
        .to_rrule(start)
        .map_err(|e| IcsError::InvalidRecurrence {
            id: schedulable.id.clone(),
            reason: e.to_string(),
        })?;

    Ok(Some(rrule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Catalog;
    use crate::schedulable::{Description, Schedule};
    use chrono::{NaiveDate, TimeZone};

    fn make_test_event() -> Schedulable {
        Schedulable::new("7", "Test Event").with_times(
            Utc.with_ymd_and_hms(2024, 3, 15, 14, 0, 0).unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 16, 0, 0).unwrap()),
        )
    }

    fn render(event: &Schedulable) -> String {
        let mut cal = icalendar::Calendar::new();
        cal.push(to_icalendar_event(event, &Catalog::english()).unwrap());
        cal.done().to_string()
    }

    fn valarm_sections(ics: &str) -> Vec<String> {
        ics.split("BEGIN:VALARM")
            .skip(1)
            .map(|s| s.split("END:VALARM").next().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_build_utc_event() {
        let lines = build(&make_test_event(), &Catalog::english());

        assert!(lines[0].starts_with("DTSTAMP:"));
        assert_eq!(lines[1], "UID:event-7@better-together");
        assert_eq!(lines[2], "SUMMARY:Test Event");
        assert!(lines.contains(&"DTSTART:20240315T140000Z".to_string()));
        assert!(lines.contains(&"DTEND:20240315T160000Z".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("DESCRIPTION")));
        assert!(!lines.iter().any(|l| l.starts_with("URL")));
    }

    #[test]
    fn test_build_zoned_event() {
        let event = make_test_event().with_timezone("America/New_York");
        let lines = build(&event, &Catalog::english());

        assert!(lines.contains(&"DTSTART;TZID=America/New_York:20240315T100000".to_string()));
        assert!(lines.contains(&"DTEND;TZID=America/New_York:20240315T120000".to_string()));
    }

    #[test]
    fn test_build_unknown_zone_keeps_tzid() {
        let event = make_test_event().with_timezone("Atlantis/Central");
        let lines = build(&event, &Catalog::english());

        assert!(lines.contains(&"DTSTART;TZID=Atlantis/Central:20240315T140000".to_string()));
    }

    #[test]
    fn test_build_without_end() {
        let event = Schedulable::new("8", "Open house")
            .with_times(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(), None);
        let lines = build(&event, &Catalog::english());

        assert!(lines.iter().any(|l| l.starts_with("DTSTART")));
        assert!(!lines.iter().any(|l| l.starts_with("DTEND")));
    }

    #[test]
    fn test_description_gets_details_link() {
        let event = make_test_event()
            .with_description(Description::Html("<p>Bring snacks</p>".to_string()))
            .with_url("https://community.example.org/events/7");
        let lines = build(&event, &Catalog::english());

        let description = lines
            .iter()
            .find(|l| l.starts_with("DESCRIPTION:"))
            .map(|l| formatter::unfold(l))
            .expect("Should have DESCRIPTION line");
        assert!(description.contains("Bring snacks"));
        assert!(description.ends_with("\\n\\nView details: https://community.example.org/events/7"));
        assert!(lines.contains(&"URL:https://community.example.org/events/7".to_string()));
    }

    #[test]
    fn test_url_without_description() {
        let event = make_test_event().with_url("https://community.example.org/events/7");
        let lines = build(&event, &Catalog::english());

        assert!(!lines.iter().any(|l| l.starts_with("DESCRIPTION")));
        assert!(lines.contains(&"URL:https://community.example.org/events/7".to_string()));
    }

    #[test]
    fn test_summary_is_escaped() {
        let event = Schedulable::new("9", "Soup, bread; games");
        let lines = build(&event, &Catalog::english());
        assert_eq!(lines[2], "SUMMARY:Soup\\, bread\\; games");
    }

    #[test]
    fn test_structured_text_is_escaped_once() {
        let event = Schedulable::new("9", "Soup, bread; games")
            .with_description(Description::Plain("a\nb\\c".to_string()));
        let ics = render(&event);

        assert!(ics.contains("SUMMARY:Soup\\, bread\\; games\r\n"), "ICS:\n{}", ics);
        assert!(ics.contains("DESCRIPTION:a\\nb\\\\c\r\n"), "ICS:\n{}", ics);
        assert!(
            ics.contains("DESCRIPTION:Reminder: Soup\\, bread\\; games starts in 1 hour\r\n"),
            "ICS:\n{}",
            ics
        );
    }

    #[test]
    fn test_carriage_returns_become_newlines() {
        let event = make_test_event()
            .with_description(Description::Plain("one\r\ntwo\rthree".to_string()));

        let lines = build(&event, &Catalog::english());
        assert!(lines.contains(&"DESCRIPTION:one\\ntwo\\nthree".to_string()));

        let ics = render(&event);
        assert!(ics.contains("DESCRIPTION:one\\ntwo\\nthree\r\n"), "ICS:\n{}", ics);
    }

    #[test]
    fn test_long_lines_are_folded() {
        let event = make_test_event()
            .with_description(Description::Plain("word ".repeat(30)));
        let lines = build(&event, &Catalog::english());

        let description = lines
            .iter()
            .find(|l| l.starts_with("DESCRIPTION:"))
            .expect("Should have DESCRIPTION line");
        assert!(description.contains("\r\n "));
        for physical in description.split("\r\n") {
            assert!(physical.len() <= 75);
        }
    }

    #[test]
    fn test_structured_event_has_three_reminders() {
        let ics = render(&make_test_event());
        let alarms = valarm_sections(&ics);

        assert_eq!(alarms.len(), 3, "ICS:\n{}", ics);
        assert!(alarms[0].contains("TRIGGER:-PT24H"));
        assert!(alarms[1].contains("TRIGGER:-PT1H"));
        assert!(alarms[2].contains("TRIGGER:PT0S"));
        for alarm in &alarms {
            assert!(alarm.contains("ACTION:DISPLAY"));
            assert!(alarm.contains("Test Event"));
        }
    }

    #[test]
    fn test_reminders_even_for_past_events() {
        let event = Schedulable::new("10", "Founding meeting")
            .with_times(Utc.with_ymd_and_hms(2001, 1, 1, 12, 0, 0).unwrap(), None);
        let ics = render(&event);
        assert_eq!(valarm_sections(&ics).len(), 3);
    }

    #[test]
    fn test_structured_recurrence_and_exdates() {
        let event = Schedulable::new("11", "Standup")
            .with_times(
                Utc.with_ymd_and_hms(2024, 3, 11, 14, 0, 0).unwrap(),
                Some(Utc.with_ymd_and_hms(2024, 3, 11, 14, 30, 0).unwrap()),
            )
            .with_schedule(Schedule::parse("FREQ=WEEKLY;BYDAY=MO,WE").unwrap())
            .with_exception_dates(vec![
                NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 25).unwrap(),
            ]);
        let ics = render(&event);

        let rrule = ics
            .lines()
            .find(|l| l.starts_with("RRULE:"))
            .expect("Should have RRULE line");
        assert!(rrule.contains("FREQ=WEEKLY"), "Got: {}", rrule);
        assert!(rrule.contains("BYDAY=MO,WE"), "Got: {}", rrule);

        let exdates: Vec<&str> = ics.lines().filter(|l| l.starts_with("EXDATE")).collect();
        assert_eq!(
            exdates,
            vec!["EXDATE;VALUE=DATE:20240318", "EXDATE;VALUE=DATE:20240325"]
        );
    }

    #[test]
    fn test_recurring_without_schedule_is_an_error() {
        let mut event = make_test_event();
        event.recurring = true;

        let mut target = icalendar::Event::new();
        let err = build_icalendar_event(&event, &Catalog::english(), &mut target).unwrap_err();
        assert!(matches!(err, IcsError::MissingSchedule { ref id } if id == "7"));
    }

    #[test]
    fn test_recurring_without_start_is_an_error() {
        let event = Schedulable::new("12", "Floating")
            .with_schedule(Schedule::parse("FREQ=DAILY").unwrap());

        let err = to_icalendar_event(&event, &Catalog::english()).unwrap_err();
        assert!(matches!(err, IcsError::MissingStart { .. }));
    }

    #[test]
    fn test_schedule_ignored_when_not_recurring() {
        let mut event = make_test_event().with_schedule(Schedule::parse("FREQ=DAILY").unwrap());
        event.recurring = false;

        let ics = render(&event);
        assert!(!ics.contains("RRULE"));
    }
}
