mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bt-ics")]
#[command(about = "Export Better Together events as iCalendar (.ics) files")]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an .ics document from a JSON file of events
    Export {
        /// JSON file holding one event or an array of events ("-" for stdin)
        input: PathBuf,

        /// Write here instead of stdout (a directory gets a generated filename)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the VTIMEZONE block generated for a zone
    Timezone {
        /// IANA zone name (e.g. "America/New_York")
        zone: String,

        /// Reference instant (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Show the config file location and resolved settings
    Config {
        /// Create a commented default config file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Export { input, output } => {
            let cfg = config::load_config()?;
            commands::export::run(&cfg, &input, output.as_deref())
        }
        Commands::Timezone { zone, at } => commands::timezone::run(&zone, at.as_deref()),
        Commands::Config { init } => commands::config::run(init),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
