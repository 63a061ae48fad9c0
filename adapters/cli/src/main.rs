#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays matches with the reference player and
//! manages map files.

mod map_io;

use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use skirmish_core::Rules;
use skirmish_system_example_player::ExamplePlayer;
use skirmish_system_match_log::MatchLog;
use skirmish_world::{query, RoundStatus, World};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::map_io::{load_map, save_map, BUILTIN_MAPS};

/// Command-line arguments accepted by the runner.
#[derive(Debug, Parser)]
#[command(name = "skirmish", about = "Deterministic two-team grid contest runner")]
struct Cli {
    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Directory holding `<name>.map.json` files.
    #[arg(long, global = true, default_value = "maps")]
    maps_dir: PathBuf,
    /// TOML file overriding the default rules.
    #[arg(long, global = true)]
    rules: Option<PathBuf>,
    #[command(subcommand)]
    command: Mode,
}

/// Operations offered by the runner.
#[derive(Debug, Subcommand)]
enum Mode {
    /// Plays one match and writes its event log as JSON lines.
    Run {
        /// Map to play on.
        #[arg(long, default_value = "quadrants")]
        map: String,
        /// Overrides the map's round limit.
        #[arg(long)]
        rounds: Option<u32>,
        /// Destination for the event log; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Writes a map into the maps directory.
    ExportMap {
        /// Map to export.
        map: String,
    },
    /// Lists the maps available in the maps directory and built in.
    ListMaps,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    let rules = load_rules(cli.rules.as_deref())?;

    match cli.command {
        Mode::Run {
            map,
            rounds,
            output,
        } => run(&map, rounds, output.as_deref(), &cli.maps_dir, rules),
        Mode::ExportMap { map } => {
            let loaded = load_map(&map, &cli.maps_dir)?;
            let path = save_map(&loaded, &cli.maps_dir, &rules)?;
            info!(map = %map, path = %path.display(), "map exported");
            Ok(())
        }
        Mode::ListMaps => {
            for name in available_maps(&cli.maps_dir)? {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log filter '{level}'"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|error| anyhow!("failed to install the log subscriber: {error}"))
}

fn load_rules(path: Option<&Path>) -> Result<Rules> {
    let Some(path) = path else {
        return Ok(Rules::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read rules from {}", path.display()))?;
    let rules: Rules = toml::from_str(&text)
        .with_context(|| format!("failed to parse rules in {}", path.display()))?;
    rules
        .validate()
        .with_context(|| format!("rules in {} are out of range", path.display()))?;
    Ok(rules)
}

/// Built-in names followed by any extra map files in `dir`.
fn available_maps(dir: &Path) -> Result<Vec<String>> {
    let mut names: Vec<String> = BUILTIN_MAPS.iter().map(|name| (*name).to_owned()).collect();
    if dir.is_dir() {
        let entries =
            fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
        let mut found: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .and_then(|file| file.strip_suffix(".map.json"))
                    .map(str::to_owned)
            })
            .filter(|name| !names.contains(name))
            .collect();
        found.sort();
        names.extend(found);
    }
    Ok(names)
}

fn run(
    map_name: &str,
    rounds: Option<u32>,
    output: Option<&Path>,
    maps_dir: &Path,
    rules: Rules,
) -> Result<()> {
    let mut map = load_map(map_name, maps_dir)?;
    if let Some(rounds) = rounds {
        map = map.with_rounds(rounds);
    }

    let mut world = World::new(map, rules)
        .with_context(|| format!("map '{map_name}' cannot start a match"))?;
    let mut player = ExamplePlayer::new();
    let mut log = MatchLog::new();
    while world.run_round(&mut player, &mut log) == RoundStatus::Running {
        debug!(round = query::round(&world), "round played");
    }

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            log.write_json_lines(BufWriter::new(file))
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => log
            .write_json_lines(io::stdout().lock())
            .context("failed to write the event log")?,
    }

    match log.outcome() {
        Some(outcome) => info!(
            winner = ?outcome.winner,
            factor = ?outcome.factor,
            events = log.len(),
            fingerprint = %log.fingerprint(),
            "match finished"
        ),
        None => info!(
            events = log.len(),
            fingerprint = %log.fingerprint(),
            "match aborted without a winner"
        ),
    }
    Ok(())
}
