// ABOUTME: CLI harness - builds a default simulation, steps it, and prints summaries
// ABOUTME: Outside the simulation core's contract; a benchmarking/demo shell only

use clap::Parser;
use tracing::info;

use aridform::{Simulation, SimulationConfig};

#[derive(Parser, Debug)]
#[command(name = "aridform", about = "Step a terraforming simulation and print summaries")]
struct Cli {
    /// Number of ticks to run.
    #[arg(long, default_value_t = 200)]
    ticks: u64,

    /// PRNG seed for reproducible runs.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Print a summary every N ticks.
    #[arg(long, default_value_t = 20)]
    summary_every: u64,

    /// Optional YAML config to load instead of the default column.
    #[arg(long)]
    config: Option<String>,

    /// Optional path to save the config used for this run (for inspection/reuse).
    #[arg(long)]
    save_config: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SimulationConfig::load_from_file(path)?,
        None => SimulationConfig::default(),
    };

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
        info!(path, "saved config");
    }

    info!(
        width = config.grid_width,
        height = config.grid_height,
        ticks = cli.ticks,
        seed = cli.seed,
        "starting simulation"
    );

    let mut sim = Simulation::new(config, cli.seed);

    for tick in 1..=cli.ticks {
        sim.tick();

        if cli.summary_every > 0 && tick % cli.summary_every == 0 {
            let stats = sim.connectivity.stats();
            info!(
                tick,
                day = sim.weather.day,
                turn_in_day = sim.weather.turn_in_day,
                heat = sim.weather.heat,
                raining = sim.weather.raining,
                surface_water = sim.water_grid.sum(),
                pool_total = sim.pool.total_volume,
                pool_atmosphere = sim.pool.atmospheric_reserve,
                total_water = sim.total_water(),
                cache_rebuilds = stats.rebuild_count,
                "tick summary"
            );
        }

        if sim.weather.is_night {
            for message in sim.end_day() {
                info!(tick, "{message}");
            }
        }
    }

    for message in sim.messages.iter() {
        println!("{message}");
    }

    Ok(())
}
