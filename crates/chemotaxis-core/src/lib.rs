//! Chemical diffusion on a walled 2D grid and two-sensor chemotactic agents.
//!
//! Per tick, [`world::World::step`] advances the field with the
//! [`diffusion::DiffusionSolver`] and then steps every [`agent::Agent`] in index
//! order; agents read the field through a [`sampler::FieldSampler`].

pub mod agent;
pub mod cell;
pub mod config;
pub mod diffusion;
pub mod grid;
pub mod map;
pub mod sampler;
pub mod spatial;
pub mod world;

pub use agent::{Agent, AgentParams, SteeringMode};
pub use cell::{CellKind, Tile, WALL_SENTINEL};
pub use config::{SimConfig, SimConfigError};
pub use diffusion::DiffusionSolver;
pub use grid::{CellCoord, Grid, GridError};
pub use map::TileMap;
pub use sampler::{FieldSampler, Sample};
pub use world::{ExperimentError, RunSummary, World, WorldInitError};
