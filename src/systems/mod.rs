//! ECS Systems for the bullet-hell simulation core.
//!
//! Systems contain the game logic that operates on components.
//!
//! ## Tick Order
//!
//! Every system runs on one thread in a strict chain; see `SimWorld` for the
//! schedule.
//!
//! **Stage 1 (Paths)** - Advance trajectories:
//! - `registry_snapshot_system` - Captures start-of-tick positions
//! - `path_system` - Advances every `PathDriver`
//!
//! **Stage 2 (Lifetimes)**:
//! - `despawn_timer_system` - Expires timed entities
//! - `pierce_cooldown_system` - Decays pierce cooldowns
//!
//! **Stage 3 (Collision)** - Rebuild grids, then resolve:
//! - `collision_grid_update_system`
//! - `collision_system`
//! - `collectible_grid_update_system`
//! - `collectible_system`
//!
//! **Stage 4 (Cleanup)**:
//! - `enemy_death_system` - Marks dead enemies
//! - `despawn_system` - Removes everything marked `Despawn`

pub mod collectible;
pub mod collision;
pub mod lifetime;
pub mod movement;

pub use collectible::*;
pub use collision::*;
pub use lifetime::*;
pub use movement::*;
