pub mod lifecycle;
pub mod metrics;

pub use metrics::*;

use crate::agent::Agent;
use crate::config::{SimConfig, SimConfigError};
use crate::diffusion::DiffusionSolver;
use crate::grid::{Grid, GridError};
use crate::map::TileMap;
use crate::sampler::FieldSampler;
use crate::spatial;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rstar::RTree;
use std::{error::Error, fmt};
use tracing::{debug, info, warn};

pub struct World {
    pub agents: Vec<Agent>,
    pub(crate) grid: Grid,
    pub(crate) solver: DiffusionSolver,
    pub(crate) sampler: FieldSampler,
    pub(crate) config: SimConfig,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) source_index: RTree<[f64; 2]>,
    pub(crate) step_index: usize,
    pub(crate) turns_last_step: TurnCounts,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
    Grid(GridError),
    NoOpenCells { requested_agents: usize },
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::Grid(e) => write!(f, "{}", e),
            WorldInitError::NoOpenCells { requested_agents } => write!(
                f,
                "cannot place {requested_agents} agents: map has no open cells"
            ),
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl From<GridError> for WorldInitError {
    fn from(err: GridError) -> Self {
        WorldInitError::Grid(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            WorldInitError::Grid(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentError {
    InvalidSampleEvery,
    TooManySteps { max: usize, actual: usize },
    TooManySamples { max: usize, actual: usize },
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::InvalidSampleEvery => write!(f, "sample_every must be positive"),
            ExperimentError::TooManySteps { max, actual } => {
                write!(f, "steps ({actual}) exceed supported maximum ({max})")
            }
            ExperimentError::TooManySamples { max, actual } => {
                write!(
                    f,
                    "sample count ({actual}) exceeds supported maximum ({max})"
                )
            }
        }
    }
}

impl Error for ExperimentError {}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    pub fn new(map: &TileMap, config: SimConfig) -> Self {
        Self::try_new(map, config).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Build the grid from `map` and place `config.num_agents` agents on random open
    /// cells with random headings.
    pub fn try_new(map: &TileMap, config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let grid = Grid::new(map)?;
        let mut world = Self::assemble(grid, Vec::new(), config);
        world.spawn_agents(world.config.num_agents)?;
        info!(
            width = world.grid.width(),
            height = world.grid.height(),
            active_cells = world.grid.active_cells().len(),
            agents = world.agents.len(),
            seed = world.config.seed,
            "world initialized"
        );
        Ok(world)
    }

    /// Use host-placed agents; `config.num_agents` is ignored.
    pub fn try_with_agents(
        grid: Grid,
        agents: Vec<Agent>,
        config: SimConfig,
    ) -> Result<Self, WorldInitError> {
        config.validate()?;
        let world = Self::assemble(grid, agents, config);
        debug!(agents = world.agents.len(), "world initialized with host agents");
        Ok(world)
    }

    fn assemble(grid: Grid, agents: Vec<Agent>, config: SimConfig) -> Self {
        Self::warn_if_unstable(&grid, config.diffusion_rate);
        Self {
            agents,
            solver: DiffusionSolver::new(config.parallel_diffusion),
            sampler: config.sampler(),
            source_index: spatial::build_source_index(&grid),
            rng: ChaCha12Rng::seed_from_u64(config.seed),
            grid,
            config,
            step_index: 0,
            turns_last_step: TurnCounts::default(),
        }
    }

    fn warn_if_unstable(grid: &Grid, rate: f32) {
        let limit = DiffusionSolver::stable_rate_limit(grid);
        if rate > limit {
            warn!(
                diffusion_rate = rate,
                stable_limit = limit,
                "diffusion rate exceeds the bound that keeps open cells within [0, 1]"
            );
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replace the configuration. Agent parameters are updated in place; the grid,
    /// agent poses, and RNG state are kept.
    pub fn set_config(&mut self, config: SimConfig) -> Result<(), WorldInitError> {
        config.validate()?;
        if config.parallel_diffusion != self.config.parallel_diffusion {
            self.solver = DiffusionSolver::new(config.parallel_diffusion);
        }
        if config.diffusion_rate != self.config.diffusion_rate {
            Self::warn_if_unstable(&self.grid, config.diffusion_rate);
        }
        self.sampler = config.sampler();
        let params = config.agent_params();
        for agent in &mut self.agents {
            agent.params = params;
        }
        self.config = config;
        Ok(())
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn sampler(&self) -> &FieldSampler {
        &self.sampler
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn turns_last_step(&self) -> TurnCounts {
        self.turns_last_step
    }

    pub fn run_experiment(&mut self, steps: usize, sample_every: usize) -> RunSummary {
        self.try_run_experiment(steps, sample_every)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        self.try_run_experiment_with_snapshots(steps, sample_every, &[])
    }

    /// Run an experiment like `try_run_experiment`, but also collect agent
    /// snapshots at the specified steps.
    pub fn try_run_experiment_with_snapshots(
        &mut self,
        steps: usize,
        sample_every: usize,
        snapshot_steps: &[usize],
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        debug!(steps, sample_every, "experiment started");
        let mut samples = Vec::with_capacity(estimated_samples);
        let mut snapshots = Vec::with_capacity(snapshot_steps.len());
        for step in 1..=steps {
            self.step();
            if step % sample_every == 0 || step == steps {
                samples.push(self.collect_step_metrics(step));
            }
            if snapshot_steps.contains(&step) {
                snapshots.push(self.collect_agent_snapshots(step));
            }
        }
        debug!(
            steps,
            total_concentration = self.grid.total_concentration(),
            "experiment finished"
        );

        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            seed: self.config.seed,
            samples,
            final_agents: self.collect_agent_snapshots(self.step_index).agents,
            agent_snapshots: snapshots,
        })
    }
}
