//! Track Motion and Speed Dynamics
//!
//! Per-tick entity advancement/culling and the asymmetric speed easing
//! that makes deceleration punchy while acceleration stays smooth.

use crate::game::entities::SpawnConfig;
use crate::game::state::RaceState;

/// Base scroll distance per tick before the speed contribution.
pub const BASE_SCROLL: f32 = 2.0;

/// Scroll distance gained per unit of speed.
pub const SCROLL_PER_SPEED: f32 = 0.15;

/// Gap above target beyond which the fast decay kicks in.
pub const FAST_DECAY_GAP: f32 = 40.0;

/// Multiplier applied per tick during sharp deceleration.
pub const FAST_DECAY_FACTOR: f32 = 0.92;

/// Fraction of the remaining gap closed per tick during normal easing.
pub const EASE_FACTOR: f32 = 0.15;

/// Shift every active entity backward and cull what fell off the track.
///
/// Consumed power-ups are dropped immediately regardless of position;
/// hit obstacles keep scrolling until they cross the cull threshold so
/// the renderer can show the wreckage.
pub fn advance_entities(state: &mut RaceState, config: &SpawnConfig) {
    let move_amount = BASE_SCROLL + state.speed * SCROLL_PER_SPEED;
    let cull_x = config.cull_x;

    for obstacle in &mut state.obstacles {
        obstacle.x -= move_amount;
    }
    state.obstacles.retain(|o| o.x > cull_x);

    for power_up in &mut state.power_ups {
        power_up.x -= move_amount;
    }
    state.power_ups.retain(|p| p.x > cull_x && !p.collected);
}

/// Ease current speed toward `target`.
///
/// Overspeeding the target by more than [`FAST_DECAY_GAP`] (the player
/// stopped typing, or crashed) decays exponentially; otherwise 15% of
/// the remaining gap closes per tick. Speed never goes negative.
pub fn ease_speed(state: &mut RaceState, target: f32) {
    let speed = state.speed;
    state.speed = if speed > target + FAST_DECAY_GAP {
        speed * FAST_DECAY_FACTOR
    } else {
        speed + (target - speed) * EASE_FACTOR
    };
    // Easing converges to a non-negative target from above, but keep the
    // invariant explicit.
    state.speed = state.speed.max(0.0);
}
