//! World configuration injected into the grids, trajectories and tick loop.

use crate::error::SimError;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for the simulation world.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Playfield width in world units. The grids cover `[0, map_width]`.
    pub map_width: f32,
    /// Playfield height in world units.
    pub map_height: f32,
    /// Fixed timestep in seconds (e.g., 1/60 for 60 Hz).
    pub fixed_timestep: f32,
    /// Largest simulated advance a single tick may make. Homing caches span
    /// exactly this much history.
    pub max_physics_step: f32,
    /// Upper bound on fixed updates run by one `SimWorld::step` call.
    pub max_steps_per_update: u32,
    /// The default collision grid uses cells of
    /// `max(map_width, map_height) / default_grid_divisions`.
    pub default_grid_divisions: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            map_width: 600.0,
            map_height: 700.0,
            fixed_timestep: 1.0 / 60.0,
            max_physics_step: 1.0 / 30.0,
            max_steps_per_update: 4,
            default_grid_divisions: 20,
        }
    }
}

impl SimConfig {
    /// Parse and validate a configuration from JSON. Missing fields take
    /// their default values.
    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a simulation.
    pub fn validate(&self) -> Result<(), SimError> {
        if !(self.map_width > 0.0 && self.map_height > 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "map size must be positive, got {}x{}",
                self.map_width, self.map_height
            )));
        }
        if !(self.fixed_timestep > 0.0) {
            return Err(SimError::InvalidConfig(
                "fixed_timestep must be positive".to_string(),
            ));
        }
        if self.max_physics_step < self.fixed_timestep {
            return Err(SimError::InvalidConfig(format!(
                "max_physics_step ({}) is shorter than fixed_timestep ({})",
                self.max_physics_step, self.fixed_timestep
            )));
        }
        if self.max_steps_per_update == 0 || self.default_grid_divisions == 0 {
            return Err(SimError::InvalidConfig(
                "max_steps_per_update and default_grid_divisions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Cell size of the default collision grid.
    pub fn default_cell_size(&self) -> f32 {
        self.map_width.max(self.map_height) / self.default_grid_divisions as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json_str(r#"{ "map_width": 400.0 }"#).unwrap();
        assert_eq!(config.map_width, 400.0);
        assert_eq!(config.map_height, SimConfig::default().map_height);
    }

    #[test]
    fn test_rejects_step_bound_below_timestep() {
        let result = SimConfig::from_json_str(
            r#"{ "fixed_timestep": 0.1, "max_physics_step": 0.05 }"#,
        );
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let result = SimConfig::from_json_str("{ map_width: ");
        assert!(matches!(result, Err(SimError::ConfigParse(_))));
    }

    #[test]
    fn test_default_cell_size_uses_larger_dimension() {
        let config = SimConfig {
            map_width: 400.0,
            map_height: 800.0,
            default_grid_divisions: 10,
            ..Default::default()
        };
        assert!((config.default_cell_size() - 80.0).abs() < 0.001);
    }
}
