//! Astras - headless runner
//!
//! Loads a species table and config, runs the simulation for a fixed number
//! of ticks and prints a population report.

use std::path::PathBuf;

use astras::core::error::Result;
use astras::rules::{default_species_table, load_config, load_species_table};
use astras::{SetupParams, Simulation, SimulationConfig};
use clap::Parser;

/// Headless ecosystem runner
#[derive(Parser, Debug)]
#[command(name = "astras")]
#[command(about = "Run the clan/loner ecosystem simulation without a UI")]
struct Args {
    /// Species table (TOML); the built-in table when omitted
    #[arg(long)]
    species: Option<PathBuf>,

    /// Simulation config overrides (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ticks to simulate
    #[arg(long, default_value_t = 3000)]
    ticks: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Start population, repeatable: --population Icefang=12
    #[arg(long, value_parser = parse_population)]
    population: Vec<(String, u32)>,

    /// Number of food places
    #[arg(long, default_value_t = 20)]
    food_places: usize,

    /// Food per place
    #[arg(long, default_value_t = 100.0)]
    food_amount: f32,

    /// Fixed start temperature
    #[arg(long, allow_hyphen_values = true)]
    temperature: Option<f32>,

    /// Start at night
    #[arg(long)]
    night: bool,

    /// Region from the species table
    #[arg(long)]
    region: Option<String>,

    /// Print a status line every N ticks (0 disables)
    #[arg(long, default_value_t = 500)]
    report_every: u64,

    /// Write the final statistics as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,
}

fn parse_population(arg: &str) -> std::result::Result<(String, u32), String> {
    let (name, count) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=COUNT, got '{}'", arg))?;
    let count = count
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("bad count in '{}': {}", arg, e))?;
    Ok((name.trim().to_string(), count))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("astras=info")),
        )
        .init();

    let args = Args::parse();

    let species = match &args.species {
        Some(path) => load_species_table(path)?,
        None => default_species_table()?,
    };
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimulationConfig::default(),
    };

    let mut params = if args.population.is_empty() {
        SetupParams::uniform(&species, 12)
    } else {
        SetupParams { population: args.population.iter().cloned().collect(), ..SetupParams::default() }
    };
    params.food_places = args.food_places;
    params.food_amount = args.food_amount;
    params.start_temperature = args.temperature;
    params.start_is_day = !args.night;
    params.region = args.region.clone();
    params.seed = args.seed;

    let mut sim = Simulation::with_setup(config, &species, &params)?;
    tracing::info!(ticks = args.ticks, "running");

    for _ in 0..args.ticks {
        let snapshot = sim.step();
        if args.report_every > 0 && snapshot.tick % args.report_every == 0 {
            println!(
                "[{:>6}] {} clans, {} loners, {} alive, {:.1}°C, {}",
                snapshot.tick,
                snapshot.clan_count(),
                snapshot.individuals.len(),
                snapshot.stats.total_population(),
                snapshot.temperature,
                if snapshot.is_day { "day" } else { "night" },
            );
        }
        if snapshot.stats.total_population() == 0 {
            println!("Every species died out at tick {}", snapshot.tick);
            break;
        }
    }

    let stats = sim.final_stats();
    println!();
    println!("{}", stats.summary());

    if let Some(path) = &args.json {
        std::fs::write(path, stats.to_json()?)?;
        println!("Statistics written to {}", path.display());
    }
    Ok(())
}
