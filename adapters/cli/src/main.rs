#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a seeded, scripted arena run and prints
//! every coordination event the session broadcasts.

mod output;
mod scenario;

use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
    time::Duration,
};

use anyhow::{Context, Result};
use arena_waves_core::{AccountingMode, ManualClock, Timestamp};
use arena_waves_session::{Session, SessionConfig};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{output::Printer, scenario::Scenario};

const DEFAULT_SEED: u64 = 0x5eed_a7e4_a000_0001;
const DEFAULT_LOG_FILTER: &str = "info";

/// Accounting convention selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Accounting {
    /// Count primary enemies only.
    Legacy,
    /// Count every enemy category.
    Unified,
}

impl From<Accounting> for AccountingMode {
    fn from(value: Accounting) -> Self {
        match value {
            Accounting::Legacy => Self::Legacy,
            Accounting::Unified => Self::Unified,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "arena-waves")]
#[command(about = "Play a seeded arena run and print every wave and boss event")]
#[command(version)]
struct Args {
    /// TOML file with session settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the spawn sampler and the scripted producers
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Number of waves to play
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    waves: u32,

    /// Simulated milliseconds per tick
    #[arg(long, default_value_t = 250, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,

    /// Accounting convention, overriding the config file
    #[arg(long, value_enum)]
    accounting: Option<Accounting>,

    /// Log filter directive; falls back to RUST_LOG, then "info"
    #[arg(long)]
    log_filter: Option<String>,
}

/// Entry point for the arena waves command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_filter.as_deref())?;

    let mut config = load_config(args.config.as_deref())?;
    if let Some(accounting) = args.accounting {
        config.waves.accounting_mode = accounting.into();
    }
    info!(
        seed = args.seed,
        waves = args.waves,
        tick_ms = args.tick_ms,
        accounting = ?config.waves.accounting_mode,
        "starting scripted run"
    );

    let clock = Rc::new(ManualClock::new(Timestamp::ZERO));
    let session = Session::new(&config, Rc::clone(&clock));
    let mut printer = Printer::new(Rc::clone(&clock));
    let mut scenario = Scenario::new(
        session,
        clock,
        args.seed,
        Duration::from_millis(args.tick_ms),
    );

    let summary = scenario.run(args.waves, &mut printer)?;
    printer.print_summary(&summary, scenario.session());
    Ok(())
}

fn init_logging(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log filter `{directive}`"))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}
