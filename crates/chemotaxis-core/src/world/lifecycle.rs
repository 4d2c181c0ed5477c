use super::metrics::{StepTimings, TurnCounts};
use super::{World, WorldInitError};
use crate::agent::Agent;
use crate::cell::CellKind;
use rand::Rng;
use std::time::Instant;

impl World {
    /// Place `count` agents uniformly over open cells, at a uniform offset inside
    /// the chosen cell, each with a random heading.
    pub(crate) fn spawn_agents(&mut self, count: usize) -> Result<(), WorldInitError> {
        if count == 0 {
            return Ok(());
        }
        let open: Vec<_> = self.grid.cells_of_kind(CellKind::Open).collect();
        if open.is_empty() {
            return Err(WorldInitError::NoOpenCells {
                requested_agents: count,
            });
        }
        let params = self.config.agent_params();
        let first_id = self.agents.iter().map(|a| a.id + 1).max().unwrap_or(0);
        self.agents.reserve(count);
        for i in 0..count {
            let [x, y] = open[self.rng.random_range(0..open.len())];
            let position = [
                x as f64 + self.rng.random::<f64>(),
                y as f64 + self.rng.random::<f64>(),
            ];
            let agent =
                Agent::with_random_heading(first_id + i as u32, position, params, &mut self.rng);
            self.agents.push(agent);
        }
        Ok(())
    }

    pub(crate) fn step_diffusion_phase(&mut self) {
        self.solver.advance(
            &mut self.grid,
            self.config.diffusion_rate,
            self.config.num_diffusion_steps,
        );
    }

    /// Agents sense, steer, move, and deplete in index order.
    fn step_agent_phase(&mut self) {
        let mut turns = TurnCounts::default();
        for agent in &mut self.agents {
            agent.step(&mut self.grid, &self.sampler, &mut self.rng);
            turns.record(agent.last_turn_direction());
        }
        self.turns_last_step = turns;
    }

    /// One tick: diffusion completes before any agent reads or depletes the field.
    pub fn step(&mut self) -> StepTimings {
        let total_start = Instant::now();
        self.step_index = self.step_index.saturating_add(1);

        let t0 = Instant::now();
        self.step_diffusion_phase();
        let diffusion_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        self.step_agent_phase();
        let agent_us = t1.elapsed().as_micros() as u64;

        StepTimings {
            diffusion_us,
            agent_us,
            total_us: total_start.elapsed().as_micros() as u64,
        }
    }
}
