use crate::grid::{CellCoord, Grid};
use crate::sampler::FieldSampler;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Lower bound applied to sensor readings before taking `log10`.
pub const LOG_SENSING_FLOOR: f64 = 1e-6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteeringMode {
    /// Two-sensor bang-bang turning toward the higher reading.
    #[default]
    Chemotaxis,
    /// Move along the forward-difference gradient of the occupied cell.
    GradientAscent,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
    pub sensor_distance: f64,
    /// Radians per tick.
    pub turn_speed: f64,
    pub movement_speed: f64,
    pub noise_scale: f64,
    pub depletion_rate: f32,
    pub use_log_sensing: bool,
    pub steering_mode: SteeringMode,
}

impl Default for AgentParams {
    fn default() -> Self {
        Self {
            sensor_distance: 0.5,
            turn_speed: 0.1,
            movement_speed: 0.05,
            noise_scale: 0.0,
            depletion_rate: 0.0,
            use_log_sensing: true,
            steering_mode: SteeringMode::Chemotaxis,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReadings {
    pub left: f64,
    pub right: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SensorPoints {
    pub left: [f64; 2],
    pub right: [f64; 2],
}

/// Sign of the steering signal: `+1` turns counter-clockwise toward the left
/// sensor, `-1` clockwise, `0` keeps the heading (ties and NaN).
pub fn steering_direction(c_left: f64, c_right: f64, noise: f64, log_sensing: bool) -> i8 {
    let difference = if log_sensing {
        c_left.max(LOG_SENSING_FLOOR).log10() - c_right.max(LOG_SENSING_FLOOR).log10()
    } else {
        c_left - c_right
    };
    let signal = difference + noise;
    if signal > 0.0 {
        1
    } else if signal < 0.0 {
        -1
    } else {
        0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    pub id: u32,
    pub position: [f64; 2],
    /// Radians, counter-clockwise from +x.
    pub heading: f64,
    pub params: AgentParams,
    last_turn_direction: i8,
    last_readings: SensorReadings,
    observed_gradient: [f64; 2],
}

impl Agent {
    pub fn new(id: u32, position: [f64; 2], heading: f64, params: AgentParams) -> Self {
        Self {
            id,
            position,
            heading: heading.rem_euclid(TAU),
            params,
            last_turn_direction: 0,
            last_readings: SensorReadings::default(),
            observed_gradient: [0.0, 0.0],
        }
    }

    /// Agent with a uniformly random heading.
    pub fn with_random_heading<R: Rng + ?Sized>(
        id: u32,
        position: [f64; 2],
        params: AgentParams,
        rng: &mut R,
    ) -> Self {
        Self::new(id, position, rng.random_range(0.0..TAU), params)
    }

    pub fn forward(&self) -> [f64; 2] {
        [self.heading.cos(), self.heading.sin()]
    }

    /// Forward rotated a quarter turn clockwise.
    pub fn right(&self) -> [f64; 2] {
        let [fx, fy] = self.forward();
        [fy, -fx]
    }

    pub fn sensor_points(&self) -> SensorPoints {
        let [fx, fy] = self.forward();
        let [rx, ry] = self.right();
        let d = self.params.sensor_distance;
        let [px, py] = self.position;
        SensorPoints {
            left: [px + d * (fx - rx), py + d * (fy - ry)],
            right: [px + d * (fx + rx), py + d * (fy + ry)],
        }
    }

    pub fn occupied_cell(&self, grid: &Grid) -> CellCoord {
        grid.cell_of(self.position)
    }

    pub fn last_turn_direction(&self) -> i8 {
        self.last_turn_direction
    }

    pub fn last_readings(&self) -> SensorReadings {
        self.last_readings
    }

    pub fn observed_gradient(&self) -> [f64; 2] {
        self.observed_gradient
    }

    /// Advance the agent by one tick and deplete the cell it lands on.
    pub fn step<R: Rng + ?Sized>(
        &mut self,
        grid: &mut Grid,
        sampler: &FieldSampler,
        rng: &mut R,
    ) {
        match self.params.steering_mode {
            SteeringMode::Chemotaxis => self.chemotaxis_step(grid, sampler, rng),
            SteeringMode::GradientAscent => self.gradient_step(grid, rng),
        }
        let cell = self.occupied_cell(grid);
        grid.deplete(cell, self.params.depletion_rate);
    }

    fn chemotaxis_step<R: Rng + ?Sized>(
        &mut self,
        grid: &Grid,
        sampler: &FieldSampler,
        rng: &mut R,
    ) {
        let sensors = self.sensor_points();
        let readings = SensorReadings {
            left: sampler.value(grid, sensors.left),
            right: sampler.value(grid, sensors.right),
        };
        let noise = if self.params.noise_scale > 0.0 {
            self.params.noise_scale * rng.random_range(-1.0..1.0)
        } else {
            0.0
        };
        let direction = steering_direction(
            readings.left,
            readings.right,
            noise,
            self.params.use_log_sensing,
        );

        self.heading = (self.heading + self.params.turn_speed * direction as f64).rem_euclid(TAU);
        let [fx, fy] = self.forward();
        self.position[0] += self.params.movement_speed * fx;
        self.position[1] += self.params.movement_speed * fy;

        self.last_turn_direction = direction;
        self.last_readings = readings;
    }

    fn gradient_step<R: Rng + ?Sized>(&mut self, grid: &Grid, rng: &mut R) {
        let [x, y] = self.occupied_cell(grid);
        let here = grid.concentration_at([x, y]) as f64;
        let mut gradient = [
            grid.concentration_at([x.saturating_add(1), y]) as f64 - here,
            grid.concentration_at([x, y.saturating_add(1)]) as f64 - here,
        ];
        if self.params.noise_scale > 0.0 {
            // Uniform point in the unit disc.
            let theta = rng.random_range(0.0..TAU);
            let radius = rng.random::<f64>().sqrt() * self.params.noise_scale;
            gradient[0] += radius * theta.cos();
            gradient[1] += radius * theta.sin();
        }

        self.position[0] += gradient[0] * self.params.movement_speed;
        self.position[1] += gradient[1] * self.params.movement_speed;
        if gradient[0] != 0.0 || gradient[1] != 0.0 {
            self.heading = gradient[1].atan2(gradient[0]).rem_euclid(TAU);
        }

        self.observed_gradient = gradient;
        self.last_turn_direction = 0;
    }
}
