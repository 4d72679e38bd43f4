//! Error types for the simulation core.

use bevy_ecs::entity::Entity;
use thiserror::Error;

/// Errors surfaced by the public simulation API.
#[derive(Debug, Error)]
pub enum SimError {
    /// The configuration JSON could not be parsed.
    #[error("failed to parse simulation config: {0}")]
    ConfigParse(#[from] serde_json::Error),
    /// The configuration parsed but holds values the core cannot run with.
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
}

/// Anomalies a homing trajectory can hit while stepping forward.
///
/// These are recoverable: the caller logs them and falls back to a
/// zero-displacement result for that evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum HomingError {
    /// The homing target is no longer present in the registry.
    #[error("homing target {0:?} is no longer valid")]
    InvalidTarget(Entity),
    /// A forward evaluation jumped further than the cache can cover.
    #[error("forward step of {step}s exceeds the physics step bound of {max}s")]
    StepTooLarge { step: f32, max: f32 },
}
