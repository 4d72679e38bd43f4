//! Danmaku Sim - Bullet-Hell Simulation Core
//!
//! A deterministic, fixed-timestep simulation of bullets, enemies, the player
//! and collectibles. Uses `bevy_ecs` for the entity-component-system
//! architecture and `glam` for vector math.
//!
//! Positions come from composable parametric trajectories
//! ([`trajectory::MovablePoint`]) driven by a per-entity [`path::PathDriver`];
//! collisions are found through uniform spatial hash grids rebuilt every
//! tick.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod path;
pub mod registry;
pub mod spatial;
pub mod systems;
pub mod trajectory;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::SimConfig;
pub use error::{HomingError, SimError};
pub use path::{PathChange, PathDriver};
pub use registry::{EntityRegistry, PositionSnapshot};
pub use spatial::SpatialHashGrid;
pub use systems::*;
pub use trajectory::{MovablePoint, TimeFunction};
pub use world::{EntityKind, EntitySnapshot, Snapshot};
