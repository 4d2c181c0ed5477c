use super::World;
use crate::cell::CellKind;
use crate::spatial;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug)]
pub struct StepTimings {
    pub diffusion_us: u64,
    pub agent_us: u64,
    pub total_us: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnCounts {
    pub left: usize,
    pub right: usize,
    pub straight: usize,
}

impl TurnCounts {
    pub fn record(&mut self, direction: i8) {
        match direction {
            d if d > 0 => self.left += 1,
            d if d < 0 => self.right += 1,
            _ => self.straight += 1,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    /// Sum over all active cells, sources and sinks included.
    pub total_concentration: f64,
    pub mean_open_concentration: f32,
    pub min_open_concentration: f32,
    pub max_open_concentration: f32,
    /// Mean concentration of the cells the agents occupy; off-grid agents read the sentinel.
    pub mean_agent_concentration: f32,
    /// `None` when the map has no sources or there are no agents.
    pub mean_source_distance: Option<f64>,
    pub turns: TurnCounts,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AgentSnapshot {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub last_turn_direction: i8,
    pub left_reading: f64,
    pub right_reading: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SnapshotFrame {
    pub step: usize,
    pub agents: Vec<AgentSnapshot>,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    #[serde(default)]
    pub seed: u64,
    pub samples: Vec<StepMetrics>,
    #[serde(default)]
    pub final_agents: Vec<AgentSnapshot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_snapshots: Vec<SnapshotFrame>,
}

impl World {
    pub(crate) fn collect_step_metrics(&self, step: usize) -> StepMetrics {
        let field = self.grid.concentrations();
        let mut open_sum = 0.0f64;
        let mut open_count = 0usize;
        let mut min_open = f32::INFINITY;
        let mut max_open = f32::NEG_INFINITY;
        for cell in self
            .grid
            .active_cells()
            .iter()
            .filter(|c| c.kind == CellKind::Open)
        {
            let c = field[cell.index];
            open_sum += c as f64;
            open_count += 1;
            min_open = min_open.min(c);
            max_open = max_open.max(c);
        }
        if open_count == 0 {
            min_open = 0.0;
            max_open = 0.0;
        }

        let agent_denom = self.agents.len().max(1) as f32;
        let agent_sum: f32 = self
            .agents
            .iter()
            .map(|a| self.grid.concentration_at(a.occupied_cell(&self.grid)))
            .sum();

        StepMetrics {
            step,
            total_concentration: self.grid.total_concentration(),
            mean_open_concentration: (open_sum / open_count.max(1) as f64) as f32,
            min_open_concentration: min_open,
            max_open_concentration: max_open,
            mean_agent_concentration: agent_sum / agent_denom,
            mean_source_distance: spatial::mean_nearest_source_distance(
                &self.source_index,
                self.agents.iter().map(|a| a.position),
            ),
            turns: self.turns_last_step,
        }
    }

    pub(crate) fn collect_agent_snapshots(&self, step: usize) -> SnapshotFrame {
        let agents = self
            .agents
            .iter()
            .map(|agent| {
                let readings = agent.last_readings();
                AgentSnapshot {
                    id: agent.id,
                    x: agent.position[0],
                    y: agent.position[1],
                    heading: agent.heading,
                    last_turn_direction: agent.last_turn_direction(),
                    left_reading: readings.left,
                    right_reading: readings.right,
                }
            })
            .collect();
        SnapshotFrame { step, agents }
    }
}
