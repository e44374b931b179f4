//! Game Events
//!
//! Events generated while a race runs, drained by the controller each
//! tick for rendering, sound, and battle-mode side effects.

use serde::{Deserialize, Serialize};

use crate::game::entities::{ObstacleKind, PowerUpKind};
use crate::typing::GameReport;

/// Something observable happened in the simulation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// The first keystroke landed; the race clock is running.
    RaceStarted,

    /// A mistyped keystroke spawned a penalty obstacle.
    ObstacleSpawned {
        /// Entity id, unique within the session.
        id: u32,
        /// Visual variant.
        kind: ObstacleKind,
    },

    /// A power-up appeared ahead of the car.
    PowerUpSpawned {
        /// Entity id, unique within the session.
        id: u32,
        /// Effect variant.
        kind: PowerUpKind,
    },

    /// The car hit an obstacle without a shield.
    Crashed {
        /// The obstacle that was hit.
        obstacle_id: u32,
    },

    /// A shield absorbed an obstacle hit.
    ShieldDeflected {
        /// The obstacle that was deflected.
        obstacle_id: u32,
    },

    /// The car collected a power-up and its effect applied.
    PowerUpCollected {
        /// The collected entity.
        id: u32,
        /// Effect variant.
        kind: PowerUpKind,
    },

    /// The target text was fully typed.
    RaceFinished {
        /// The finalized performance report.
        report: GameReport,
    },
}
