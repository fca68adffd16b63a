use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bt_ics_core::ics::generate_filename;
use bt_ics_core::{ChronoTzProvider, Generator, Schedulable};
use owo_colors::OwoColorize;
use serde::Deserialize;
use tracing::info;

use crate::config::Config;

/// Export input: a single event or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum Input {
    Many(Vec<Schedulable>),
    One(Box<Schedulable>),
}

pub fn run(cfg: &Config, input: &Path, output: Option<&Path>) -> Result<()> {
    let mut schedulables = read_schedulables(input)?;
    apply_default_timezone(&mut schedulables, cfg.default_timezone.as_deref());

    let catalog = cfg.catalog();
    let ics = Generator::new(&ChronoTzProvider, &catalog)
        .generate(&schedulables)
        .context("Could not generate calendar")?;

    match output {
        Some(path) => {
            let path = resolve_output_path(path, &schedulables);
            std::fs::write(&path, &ics)
                .with_context(|| format!("Could not write {}", path.display()))?;
            info!(path = %path.display(), events = schedulables.len(), "wrote calendar");
            eprintln!(
                "Exported {} event(s) to {}",
                schedulables.len(),
                path.display().green()
            );
        }
        None => print!("{ics}"),
    }

    Ok(())
}

fn read_schedulables(input: &Path) -> Result<Vec<Schedulable>> {
    let content = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Could not read stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Could not read {}", input.display()))?
    };

    parse_schedulables(&content).with_context(|| format!("Invalid event data in {}", input.display()))
}

fn parse_schedulables(content: &str) -> Result<Vec<Schedulable>> {
    let schedulables = match serde_json::from_str::<Input>(content)? {
        Input::Many(list) => list,
        Input::One(single) => vec![*single],
    };
    Ok(schedulables)
}

fn apply_default_timezone(schedulables: &mut [Schedulable], zone: Option<&str>) {
    let Some(zone) = zone else {
        return;
    };

    for schedulable in schedulables.iter_mut().filter(|s| s.timezone.is_none()) {
        schedulable.timezone = Some(zone.to_string());
    }
}

/// A directory gets the export's generated filename appended.
fn resolve_output_path(path: &Path, schedulables: &[Schedulable]) -> PathBuf {
    if path.is_dir() {
        path.join(generate_filename(schedulables))
    } else {
        path.to_path_buf()
    }
}
