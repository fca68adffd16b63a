use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bt_ics_core::Catalog;
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides, e.g. `BT_ICS_DEFAULT_TIMEZONE`.
const ENV_PREFIX: &str = "BT_ICS";

/// CLI configuration at ~/.config/better-together/ics.toml
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Zone applied to events that carry none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timezone: Option<String>,

    /// Translation overrides, keyed without the `ics.` prefix
    /// (e.g. `reminder_1_hour = "%{event_name} in einer Stunde"`)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub translations: HashMap<String, String>,
}

impl Config {
    /// English strings with the configured overrides applied.
    pub fn catalog(&self) -> Catalog {
        Catalog::english().merge(
            self.translations
                .iter()
                .map(|(key, template)| (format!("ics.{key}"), template.clone())),
        )
    }
}

/// Get the config directory path (~/.config/better-together)
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("better-together");
    Ok(config_dir)
}

/// Get the config file path (~/.config/better-together/ics.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("ics.toml"))
}

/// Load config from the default location, layered with environment overrides.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()
        .with_context(|| format!("Could not read config at {}", path.display()))?;

    settings
        .try_deserialize()
        .with_context(|| format!("Invalid config at {}", path.display()))
}

/// Create a default config file with all options commented out.
pub fn create_default_config(path: &Path) -> Result<()> {
    let contents = "\
# bt-ics configuration

# Timezone for events exported without one:
# default_timezone = \"America/Toronto\"

# Override the strings embedded in exported calendars:
# [translations]
# view_details_url = \"View details: %{url}\"
# reminder_24_hours = \"Reminder: %{event_name} starts in 24 hours\"
# reminder_1_hour = \"Reminder: %{event_name} starts in 1 hour\"
# reminder_at_start = \"%{event_name} is starting now\"
";

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Could not create config directory")?;
    }

    std::fs::write(path, contents).context("Could not write config file")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bt_ics_core::Translator;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("ics.toml")).unwrap();
        assert!(cfg.default_timezone.is_none());
        assert!(cfg.translations.is_empty());
    }

    #[test]
    fn test_default_config_parses_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ics.toml");
        create_default_config(&path).unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert!(cfg.default_timezone.is_none());
    }

    #[test]
    fn test_translation_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ics.toml");
        std::fs::write(
            &path,
            "default_timezone = \"Europe/Berlin\"\n\n[translations]\nreminder_at_start = \"%{event_name} beginnt jetzt\"\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.default_timezone.as_deref(), Some("Europe/Berlin"));

        let catalog = cfg.catalog();
        assert_eq!(
            catalog.translate("ics.reminder_at_start", &[("event_name", "Plenum")]),
            "Plenum beginnt jetzt"
        );
        assert_eq!(
            catalog.translate("ics.reminder_1_hour", &[("event_name", "Plenum")]),
            "Reminder: Plenum starts in 1 hour"
        );
    }
}
