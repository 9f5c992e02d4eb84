//! `booking` CLI: list and check training-session availability from the
//! command line.
//!
//! ## Usage
//!
//! ```sh
//! # Slots for a day with the default venue (Bogota, 08:00-20:00, 60 min)
//! booking slots --date 2026-03-16
//!
//! # Subtract the busy events from a Google Calendar events.list export
//! booking slots --date 2026-03-16 --busy events.json
//!
//! # Machine-readable output
//! booking slots --date 2026-03-16 --json
//!
//! # Is 10:00 still free?
//! booking check --date 2026-03-16 --time 10:00 --busy events.json
//!
//! # Print the effective venue configuration
//! booking config --config venue.toml
//! ```

use std::process;

use anyhow::{Context, Result};
use booking_engine::{google, BookingService, InMemoryCalendar, Slot, VenueConfig};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "booking",
    version,
    about = "Training-session availability CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log more detail to stderr (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct VenueArgs {
    /// Venue configuration file (TOML); defaults apply when omitted
    #[arg(short, long)]
    config: Option<String>,
    /// Google Calendar events.list JSON with the day's busy events
    #[arg(short, long)]
    busy: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available slots for a date
    Slots {
        /// Date in YYYY-MM-DD format
        #[arg(short, long)]
        date: String,
        #[command(flatten)]
        venue: VenueArgs,
        /// Print slots as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a slot starting at a given time is available
    Check {
        /// Date in YYYY-MM-DD format
        #[arg(short, long)]
        date: String,
        /// Start time in HH:MM format
        #[arg(short, long)]
        time: String,
        #[command(flatten)]
        venue: VenueArgs,
    },
    /// Print the effective venue configuration as TOML
    Config {
        /// Venue configuration file (TOML); defaults apply when omitted
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[derive(Serialize)]
struct SlotDto {
    start: String,
    end: String,
    label: String,
}

impl From<&Slot> for SlotDto {
    fn from(slot: &Slot) -> Self {
        Self {
            start: slot.start.to_rfc3339(),
            end: slot.end.to_rfc3339(),
            label: slot.label(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Slots { date, venue, json } => {
            let date = parse_date(&date)?;
            let service = build_service(&venue)?;
            let slots = service
                .available_slots(date)
                .with_context(|| format!("Failed to compute availability for {}", date))?;

            if json {
                let dtos: Vec<SlotDto> = slots.iter().map(SlotDto::from).collect();
                println!("{}", serde_json::to_string_pretty(&dtos)?);
            } else if slots.is_empty() {
                println!("No available slots on {}", date);
            } else {
                for slot in &slots {
                    println!("{}", slot);
                }
            }
        }
        Commands::Check { date, time, venue } => {
            let date = parse_date(&date)?;
            let time = parse_time(&time)?;
            let service = build_service(&venue)?;
            let slots = service
                .available_slots(date)
                .with_context(|| format!("Failed to compute availability for {}", date))?;

            if slots.iter().any(|slot| slot.start_time() == time) {
                println!("available");
            } else {
                println!("unavailable");
                process::exit(1);
            }
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            config.resolve().context("Invalid venue configuration")?;
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_service(args: &VenueArgs) -> Result<BookingService<InMemoryCalendar>> {
    let config = load_config(args.config.as_deref())?;
    let venue = config.resolve().context("Invalid venue configuration")?;

    let entries = match args.busy.as_deref() {
        Some(path) => {
            let body = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path))?;
            google::parse_events_list(&body)
                .with_context(|| format!("Failed to parse busy events from {}", path))?
        }
        None => Vec::new(),
    };
    tracing::debug!(entries = entries.len(), "loaded busy entries");

    let calendar =
        InMemoryCalendar::with_entries(&venue.calendar_id, entries).in_timezone(venue.tz);
    Ok(BookingService::new(calendar, venue))
}

fn load_config(path: Option<&str>) -> Result<VenueConfig> {
    match path {
        Some(path) => {
            VenueConfig::load(path).with_context(|| format!("Failed to load config: {}", path))
        }
        None => Ok(VenueConfig::default()),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD", s))
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .with_context(|| format!("Invalid time '{}': expected HH:MM", s))
}
