use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config::{self, create_default_config};

pub fn run(init: bool) -> Result<()> {
    let config_path = config::config_path()?;

    if init {
        if config_path.exists() {
            anyhow::bail!("Config file already exists at {}", config_path.display());
        }
        create_default_config(&config_path)?;
        println!("Created {}", config_path.display().green());
        return Ok(());
    }

    println!("{}", "Paths".bold());
    println!("  Config:  {}", config_path.display());

    let cfg = config::load_config()?;
    let resolved = toml::to_string_pretty(&cfg)?;

    println!();
    println!("{}", "Settings".bold());
    if resolved.trim().is_empty() {
        println!("  {}", "(defaults)".dimmed());
    } else {
        for line in resolved.lines() {
            println!("  {line}");
        }
    }

    Ok(())
}
