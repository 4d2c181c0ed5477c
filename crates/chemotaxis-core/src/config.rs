use crate::agent::{AgentParams, SteeringMode};
use crate::sampler::FieldSampler;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    /// Agents placed at random on open cells when the host does not supply any.
    pub num_agents: usize,
    pub diffusion_rate: f32,
    pub num_diffusion_steps: usize,
    pub parallel_diffusion: bool,
    pub sensor_distance: f64,
    pub turn_speed: f64,
    pub movement_speed: f64,
    pub noise_scale: f64,
    pub depletion_rate: f32,
    pub wall_avoidance_rate: f64,
    pub use_log_sensing: bool,
    pub steering_mode: SteeringMode,
}

impl Default for SimConfig {
    fn default() -> Self {
        let agent = AgentParams::default();
        Self {
            seed: 42,
            num_agents: 1,
            diffusion_rate: 0.25,
            num_diffusion_steps: 1,
            parallel_diffusion: false,
            sensor_distance: agent.sensor_distance,
            turn_speed: agent.turn_speed,
            movement_speed: agent.movement_speed,
            noise_scale: agent.noise_scale,
            depletion_rate: agent.depletion_rate,
            wall_avoidance_rate: 0.0,
            use_log_sensing: agent.use_log_sensing,
            steering_mode: agent.steering_mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimConfigError {
    DiffusionRateOutOfRange { value: f32 },
    DepletionRateOutOfRange { value: f32 },
    NonFinite { field: &'static str },
    Negative { field: &'static str, value: f64 },
    TooManyAgents { max: usize, actual: usize },
    TooManyDiffusionSteps { max: usize, actual: usize },
}

impl fmt::Display for SimConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimConfigError::DiffusionRateOutOfRange { value } => {
                write!(f, "diffusion_rate ({value}) must be in (0, 1]")
            }
            SimConfigError::DepletionRateOutOfRange { value } => {
                write!(f, "depletion_rate ({value}) must be in [0, 1]")
            }
            SimConfigError::NonFinite { field } => write!(f, "{field} must be finite"),
            SimConfigError::Negative { field, value } => {
                write!(f, "{field} ({value}) must be non-negative")
            }
            SimConfigError::TooManyAgents { max, actual } => {
                write!(f, "num_agents ({actual}) exceeds supported maximum ({max})")
            }
            SimConfigError::TooManyDiffusionSteps { max, actual } => write!(
                f,
                "num_diffusion_steps ({actual}) exceeds supported maximum ({max})"
            ),
        }
    }
}

impl Error for SimConfigError {}

impl SimConfig {
    pub const MAX_AGENTS: usize = 100_000;
    pub const MAX_DIFFUSION_STEPS: usize = 10_000;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        // `!(a > b)` also rejects NaN.
        if !(self.diffusion_rate > 0.0 && self.diffusion_rate <= 1.0) {
            return Err(SimConfigError::DiffusionRateOutOfRange {
                value: self.diffusion_rate,
            });
        }
        if !(0.0..=1.0).contains(&self.depletion_rate) {
            return Err(SimConfigError::DepletionRateOutOfRange {
                value: self.depletion_rate,
            });
        }
        let non_negative = [
            ("sensor_distance", self.sensor_distance),
            ("movement_speed", self.movement_speed),
            ("noise_scale", self.noise_scale),
            ("wall_avoidance_rate", self.wall_avoidance_rate),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() {
                return Err(SimConfigError::NonFinite { field });
            }
            if value < 0.0 {
                return Err(SimConfigError::Negative { field, value });
            }
        }
        if !self.turn_speed.is_finite() {
            return Err(SimConfigError::NonFinite {
                field: "turn_speed",
            });
        }
        if self.num_agents > Self::MAX_AGENTS {
            return Err(SimConfigError::TooManyAgents {
                max: Self::MAX_AGENTS,
                actual: self.num_agents,
            });
        }
        if self.num_diffusion_steps > Self::MAX_DIFFUSION_STEPS {
            return Err(SimConfigError::TooManyDiffusionSteps {
                max: Self::MAX_DIFFUSION_STEPS,
                actual: self.num_diffusion_steps,
            });
        }
        Ok(())
    }

    pub fn agent_params(&self) -> AgentParams {
        AgentParams {
            sensor_distance: self.sensor_distance,
            turn_speed: self.turn_speed,
            movement_speed: self.movement_speed,
            noise_scale: self.noise_scale,
            depletion_rate: self.depletion_rate,
            use_log_sensing: self.use_log_sensing,
            steering_mode: self.steering_mode,
        }
    }

    pub fn sampler(&self) -> FieldSampler {
        FieldSampler::new(self.wall_avoidance_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn diffusion_rate_must_be_in_unit_interval() {
        for value in [0.0, -0.1, 1.5, f32::NAN] {
            let config = SimConfig {
                diffusion_rate: value,
                ..SimConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(SimConfigError::DiffusionRateOutOfRange { .. })
            ));
        }
        let config = SimConfig {
            diffusion_rate: 1.0,
            ..SimConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn depletion_rate_bounds() {
        let config = SimConfig {
            depletion_rate: 1.2,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::DepletionRateOutOfRange { value: 1.2 })
        );
    }

    #[test]
    fn rejects_negative_and_non_finite_parameters() {
        let config = SimConfig {
            movement_speed: -1.0,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::Negative {
                field: "movement_speed",
                value: -1.0
            })
        );
        let config = SimConfig {
            turn_speed: f64::INFINITY,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::NonFinite {
                field: "turn_speed"
            })
        );
    }

    #[test]
    fn rejects_oversized_runs() {
        let config = SimConfig {
            num_agents: SimConfig::MAX_AGENTS + 1,
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::TooManyAgents { .. })
        ));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"diffusion_rate": 0.5, "steering_mode": "gradient_ascent"}"#)
                .unwrap();
        assert!((config.diffusion_rate - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.steering_mode, SteeringMode::GradientAscent);
        assert_eq!(config.seed, SimConfig::default().seed);
    }

    #[test]
    fn agent_params_mirror_config() {
        let config = SimConfig {
            sensor_distance: 2.0,
            use_log_sensing: false,
            ..SimConfig::default()
        };
        let params = config.agent_params();
        assert!((params.sensor_distance - 2.0).abs() < f64::EPSILON);
        assert!(!params.use_log_sensing);
    }
}
