use anyhow::{Context, Result};
use bt_ics_core::ics::{ChronoTzProvider, build_vtimezone};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

pub fn run(zone: &str, at: Option<&str>) -> Result<()> {
    let reference = match at {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("Invalid instant '{}'. Expected RFC 3339", s))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let lines = build_vtimezone(&ChronoTzProvider, Some(zone), reference);

    if lines.is_empty() {
        println!(
            "{}",
            format!("No VTIMEZONE for '{}' (UTC or unknown zone)", zone).dimmed()
        );
        return Ok(());
    }

    for line in &lines {
        println!("{line}");
    }

    Ok(())
}
