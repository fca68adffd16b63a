//! Localized strings used inside exported calendars.

use std::collections::HashMap;

use tracing::warn;

pub const VIEW_DETAILS_URL: &str = "ics.view_details_url";
pub const REMINDER_24_HOURS: &str = "ics.reminder_24_hours";
pub const REMINDER_1_HOUR: &str = "ics.reminder_1_hour";
pub const REMINDER_AT_START: &str = "ics.reminder_at_start";

/// Source of translated strings.
///
/// `args` are substituted for `%{name}` placeholders.
pub trait Translator {
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String;
}

/// In-memory translation table.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: HashMap<String, String>,
}

impl Catalog {
    /// The strings shipped with the engine.
    pub fn english() -> Self {
        let templates = [
            (VIEW_DETAILS_URL, "View details: %{url}"),
            (REMINDER_24_HOURS, "Reminder: %{event_name} starts in 24 hours"),
            (REMINDER_1_HOUR, "Reminder: %{event_name} starts in 1 hour"),
            (REMINDER_AT_START, "%{event_name} is starting now"),
        ]
        .into_iter()
        .map(|(key, template)| (key.to_string(), template.to_string()))
        .collect();

        Catalog { templates }
    }

    /// Layer `overrides` on top of the current templates.
    pub fn merge<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, template) in overrides {
            self.templates.insert(key.into(), template.into());
        }
        self
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str, args: &[(&str, &str)]) -> String {
        let Some(template) = self.templates.get(key) else {
            warn!(key, "missing translation");
            return key.to_string();
        };

        interpolate(template, args)
    }
}

/// Substitute `%{name}` placeholders. Unknown placeholders are left as-is.
fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("%{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match args.iter().find(|(arg, _)| *arg == name) {
            Some((_, value)) => out.push_str(value),
            None => {
                warn!(placeholder = name, "missing interpolation argument");
                out.push_str(&rest[start..start + 2 + end + 1]);
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_reminders() {
        let catalog = Catalog::english();
        assert_eq!(
            catalog.translate(REMINDER_1_HOUR, &[("event_name", "Board meeting")]),
            "Reminder: Board meeting starts in 1 hour"
        );
        assert_eq!(
            catalog.translate(VIEW_DETAILS_URL, &[("url", "https://example.org/e/1")]),
            "View details: https://example.org/e/1"
        );
    }

    #[test]
    fn test_missing_key_renders_key() {
        let catalog = Catalog::english();
        assert_eq!(catalog.translate("ics.unknown", &[]), "ics.unknown");
    }

    #[test]
    fn test_missing_argument_keeps_placeholder() {
        let catalog = Catalog::english();
        assert_eq!(
            catalog.translate(REMINDER_AT_START, &[]),
            "%{event_name} is starting now"
        );
    }

    #[test]
    fn test_merge_overrides() {
        let catalog =
            Catalog::english().merge([(REMINDER_AT_START, "%{event_name} commence maintenant")]);
        assert_eq!(
            catalog.translate(REMINDER_AT_START, &[("event_name", "Atelier")]),
            "Atelier commence maintenant"
        );
        assert_eq!(
            catalog.translate(REMINDER_1_HOUR, &[("event_name", "Atelier")]),
            "Reminder: Atelier starts in 1 hour"
        );
    }

    #[test]
    fn test_unterminated_placeholder() {
        assert_eq!(interpolate("50%{off", &[("off", "x")]), "50%{off");
    }
}
