//! Chemotaxis simulation CLI.
//!
//! Commands:
//! - run: run an experiment on a map and write the JSON summary
//! - field: print the concentration field after a number of ticks

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use chemotaxis_core::{CellKind, SimConfig, TileMap, World};

#[derive(Parser)]
#[command(name = "chemotaxis")]
#[command(version)]
#[command(about = "Chemical diffusion and chemotactic agents on a tile grid")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an experiment and write the run summary as JSON
    Run {
        /// Text map: '#' wall, '.' empty, '*' full, 'S' source, 'K' sink
        #[arg(long)]
        map: PathBuf,

        /// JSON simulation config; missing fields take defaults
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "1000")]
        steps: usize,

        #[arg(long, default_value = "100")]
        sample_every: usize,

        /// Also record agent poses every N steps
        #[arg(long)]
        snapshot_every: Option<usize>,

        /// Override the config seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the number of agents
        #[arg(long)]
        agents: Option<usize>,

        /// Output path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the concentration field after N ticks
    Field {
        #[arg(long)]
        map: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "0")]
        steps: usize,
    },
}

fn load_map(path: &Path) -> Result<TileMap> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read map {}", path.display()))?;
    TileMap::from_ascii(&text).with_context(|| format!("invalid map {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn render_field(world: &World) -> String {
    let grid = world.grid();
    let mut out = String::new();
    for y in 0..grid.height() as i64 {
        let row: Vec<String> = (0..grid.width() as i64)
            .map(|x| match grid.classification_at([x, y]) {
                CellKind::Wall => "  ## ".to_string(),
                _ => format!("{:5.3}", grid.concentration_at([x, y])),
            })
            .collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::Run {
            map,
            config,
            steps,
            sample_every,
            snapshot_every,
            seed,
            agents,
            out,
        } => {
            let tile_map = load_map(&map)?;
            let mut sim_config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                sim_config.seed = seed;
            }
            if let Some(agents) = agents {
                sim_config.num_agents = agents;
            }

            let mut world = World::try_new(&tile_map, sim_config)?;
            let snapshot_steps: Vec<usize> = match snapshot_every {
                Some(every) if every > 0 => (every..=steps).step_by(every).collect(),
                _ => Vec::new(),
            };
            let summary =
                world.try_run_experiment_with_snapshots(steps, sample_every, &snapshot_steps)?;
            let json = serde_json::to_string_pretty(&summary)?;

            match out {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), steps, "run summary written");
                }
                None => println!("{json}"),
            }
        }
        Commands::Field { map, config, steps } => {
            let tile_map = load_map(&map)?;
            let sim_config = load_config(config.as_deref())?;
            let mut world = World::try_new(
                &tile_map,
                SimConfig {
                    num_agents: 0,
                    ..sim_config
                },
            )?;
            for _ in 0..steps {
                world.step();
            }
            print!("{}", render_field(&world));
        }
    }

    Ok(())
}
