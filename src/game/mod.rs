//! Entity/physics engine and the fixed-rate orchestration step.
//!
//! All functions here are total over the current entity set; the only
//! fallible operation in the whole module tree is race setup.

pub mod collision;
pub mod entities;
pub mod events;
pub mod physics;
pub mod state;
pub mod tick;

pub use collision::{collect_power_up, overlapping_obstacles, overlapping_power_ups, resolve_collision};
pub use entities::{Obstacle, ObstacleKind, PowerUp, PowerUpKind, SpawnConfig};
pub use events::GameEvent;
pub use state::{RacePhase, RaceState, RenderSnapshot};
pub use tick::{apply_input, tick, RaceConfig, TickResult};
