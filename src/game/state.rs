//! Race State
//!
//! The full mutable state of one race: typing engine, entity sets, car
//! dynamics, and the pending event queue. Entities are owned exclusively
//! here; the renderer only ever sees cloned snapshots.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::game::entities::{Obstacle, PowerUp};
use crate::game::events::GameEvent;
use crate::typing::{GameReport, RaceSetupError, RaceStats, TypingEngine};

/// Lifecycle phase of a race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    /// Text loaded, waiting for the first keystroke.
    Idle,
    /// Clock running, orchestration loop active.
    Playing,
    /// Target fully typed; report finalized.
    Finished,
}

/// Complete simulation state for one race.
#[derive(Debug)]
pub struct RaceState {
    /// Current lifecycle phase.
    pub phase: RacePhase,
    /// Keystroke timing and accuracy tracking.
    pub typing: TypingEngine,
    /// Active obstacles, oldest first.
    pub obstacles: Vec<Obstacle>,
    /// Active power-ups, oldest first.
    pub power_ups: Vec<PowerUp>,
    /// Car speed; non-negative, eased toward a WPM-derived target.
    pub speed: f32,
    /// One-shot crash protection.
    pub has_shield: bool,
    /// Stats readout, recomputed every tick.
    pub stats: RaceStats,
    /// Final report, set exactly once at completion.
    pub report: Option<GameReport>,
    next_obstacle_id: u32,
    next_power_up_id: u32,
    rng: StdRng,
    events: Vec<GameEvent>,
}

impl RaceState {
    /// Create a race over `target` with an entropy-seeded RNG.
    pub fn new(target: &str) -> Result<Self, RaceSetupError> {
        Ok(Self::build(TypingEngine::new(target)?, StdRng::from_entropy()))
    }

    /// Create a race with a fixed RNG seed, for reproducible tests.
    pub fn with_seed(target: &str, seed: u64) -> Result<Self, RaceSetupError> {
        Ok(Self::build(TypingEngine::new(target)?, StdRng::seed_from_u64(seed)))
    }

    fn build(typing: TypingEngine, rng: StdRng) -> Self {
        let remaining = typing.target_len() as u32;
        Self {
            phase: RacePhase::Idle,
            typing,
            obstacles: Vec::new(),
            power_ups: Vec::new(),
            speed: 0.0,
            has_shield: false,
            stats: RaceStats {
                remaining_chars: remaining,
                ..RaceStats::default()
            },
            report: None,
            next_obstacle_id: 0,
            next_power_up_id: 0,
            rng,
            events: Vec::new(),
        }
    }

    /// Allocate the next obstacle id. Never reused within a session.
    pub(crate) fn next_obstacle_id(&mut self) -> u32 {
        let id = self.next_obstacle_id;
        self.next_obstacle_id += 1;
        id
    }

    /// Allocate the next power-up id. Never reused within a session.
    pub(crate) fn next_power_up_id(&mut self) -> u32 {
        let id = self.next_power_up_id;
        self.next_power_up_id += 1;
        id
    }

    /// Mutable access to the race RNG.
    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Queue an event for the next drain.
    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Drain all queued events in emission order.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Whether the orchestration loop should be running.
    pub fn is_active(&self) -> bool {
        self.phase == RacePhase::Playing
    }

    /// Read-only view for the rendering layer.
    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            phase: self.phase,
            obstacles: self.obstacles.clone(),
            power_ups: self.power_ups.clone(),
            has_shield: self.has_shield,
            speed: self.speed,
            stats: self.stats,
            input_len: self.typing.input_len(),
        }
    }
}

/// Per-tick read-only snapshot handed to the (external) renderer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderSnapshot {
    /// Current lifecycle phase.
    pub phase: RacePhase,
    /// Obstacles to draw.
    pub obstacles: Vec<Obstacle>,
    /// Power-ups to draw.
    pub power_ups: Vec<PowerUp>,
    /// Whether the shield aura is up.
    pub has_shield: bool,
    /// Current car speed.
    pub speed: f32,
    /// Stats panel values.
    pub stats: RaceStats,
    /// Caret position within the target text.
    pub input_len: usize,
}
