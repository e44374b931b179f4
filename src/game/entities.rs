//! Track Entities
//!
//! Obstacles and power-ups: ephemeral entities with monotonically
//! assigned ids, a scalar position along the track axis, and a one-way
//! consumed flag. Spawn logic lives here; per-tick motion lives in
//! [`crate::game::physics`].

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::events::GameEvent;
use crate::game::state::RaceState;

/// Visual variant of an obstacle. Uniform 50/50 pick at spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    /// A rock on the road.
    Rock,
    /// A traffic cone.
    Cone,
}

/// Effect variant of a power-up. Spawn is biased 60/40 toward nitro.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    /// Instant +50 speed boost.
    Nitro,
    /// One-shot crash protection.
    Shield,
}

/// A penalty obstacle scrolling toward the car.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Obstacle {
    /// Session-unique id, never reused.
    pub id: u32,
    /// Position along the track axis.
    pub x: f32,
    /// Visual variant.
    pub kind: ObstacleKind,
    /// Set once on first collision resolution; idempotency guard.
    pub hit: bool,
}

/// A collectible power-up scrolling toward the car.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PowerUp {
    /// Session-unique id, never reused.
    pub id: u32,
    /// Position along the track axis.
    pub x: f32,
    /// Effect variant.
    pub kind: PowerUpKind,
    /// Set once on collection; culled on the next advance.
    pub collected: bool,
}

/// Spawn-placement tuning.
#[derive(Clone, Debug)]
pub struct SpawnConfig {
    /// Track position where new entities appear, ahead of the car.
    pub spawn_x: f32,
    /// Extra random forward offset applied to power-ups.
    pub power_up_jitter: f32,
    /// Entities behind this position are culled.
    pub cull_x: f32,
    /// Probability that a spawned power-up is nitro (rest are shields).
    pub nitro_weight: f64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            spawn_x: 1200.0,
            power_up_jitter: 200.0,
            cull_x: -100.0,
            nitro_weight: 0.6,
        }
    }
}

/// Spawn a penalty obstacle at the fixed forward offset.
///
/// Triggered by mistake events only; obstacles have no time-based
/// auto-spawn. Returns the new entity's id.
pub fn spawn_obstacle(state: &mut RaceState, config: &SpawnConfig) -> u32 {
    let id = state.next_obstacle_id();
    let kind = if state.rng_mut().gen_bool(0.5) {
        ObstacleKind::Rock
    } else {
        ObstacleKind::Cone
    };

    state.obstacles.push(Obstacle {
        id,
        x: config.spawn_x,
        kind,
        hit: false,
    });
    state.push_event(GameEvent::ObstacleSpawned { id, kind });
    id
}

/// Spawn a power-up at a jittered forward offset.
///
/// The orchestration loop owns the probability roll and the speed gate;
/// this function always spawns. Returns the new entity's id.
pub fn spawn_power_up(state: &mut RaceState, config: &SpawnConfig) -> u32 {
    let id = state.next_power_up_id();
    let jitter = state.rng_mut().gen_range(0.0..config.power_up_jitter);
    let kind = if state.rng_mut().gen_bool(config.nitro_weight) {
        PowerUpKind::Nitro
    } else {
        PowerUpKind::Shield
    };

    state.power_ups.push(PowerUp {
        id,
        x: config.spawn_x + jitter,
        kind,
        collected: false,
    });
    state.push_event(GameEvent::PowerUpSpawned { id, kind });
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> RaceState {
        RaceState::with_seed("hello world", 42).unwrap()
    }

    #[test]
    fn test_obstacle_ids_monotonic() {
        let mut state = test_state();
        let config = SpawnConfig::default();

        let a = spawn_obstacle(&mut state, &config);
        let b = spawn_obstacle(&mut state, &config);
        let c = spawn_obstacle(&mut state, &config);
        assert!(a < b && b < c);
        assert_eq!(state.obstacles.len(), 3);
    }

    #[test]
    fn test_obstacle_spawns_at_forward_offset() {
        let mut state = test_state();
        let config = SpawnConfig::default();

        spawn_obstacle(&mut state, &config);
        let obstacle = &state.obstacles[0];
        assert_eq!(obstacle.x, config.spawn_x);
        assert!(!obstacle.hit);
    }

    #[test]
    fn test_power_up_jitter_within_bounds() {
        let mut state = test_state();
        let config = SpawnConfig::default();

        for _ in 0..20 {
            spawn_power_up(&mut state, &config);
        }
        for power_up in &state.power_ups {
            assert!(power_up.x >= config.spawn_x);
            assert!(power_up.x < config.spawn_x + config.power_up_jitter);
            assert!(!power_up.collected);
        }
    }

    #[test]
    fn test_spawns_emit_events() {
        let mut state = test_state();
        let config = SpawnConfig::default();

        spawn_obstacle(&mut state, &config);
        spawn_power_up(&mut state, &config);

        let events = state.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], GameEvent::ObstacleSpawned { .. }));
        assert!(matches!(events[1], GameEvent::PowerUpSpawned { .. }));
    }
}
