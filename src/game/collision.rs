//! Collision and Collection Resolution
//!
//! Overlap detection is a simple 1-D interval test between the car's
//! fixed hitbox and each entity's horizontal span; there is no collision
//! response physics. Resolution is idempotent per entity: the consumed
//! flag makes a second resolution a no-op.

use crate::game::entities::PowerUpKind;
use crate::game::events::GameEvent;
use crate::game::state::RaceState;

/// Fixed screen position of the car along the track axis.
pub const CAR_X: f32 = 150.0;

/// Width of the car hitbox.
pub const CAR_WIDTH: f32 = 120.0;

/// Width of an obstacle's collision span.
pub const OBSTACLE_WIDTH: f32 = 60.0;

/// Width of a power-up's collection span.
pub const POWER_UP_WIDTH: f32 = 40.0;

/// Flat speed penalty for an unshielded crash.
pub const CRASH_SPEED_PENALTY: f32 = 30.0;

/// Instant speed gain from a nitro power-up.
pub const NITRO_BOOST: f32 = 50.0;

/// Half-open 1-D interval overlap test.
#[inline]
pub fn intervals_overlap(a_start: f32, a_end: f32, b_start: f32, b_end: f32) -> bool {
    a_start < b_end && b_start < a_end
}

/// Ids of unconsumed obstacles currently overlapping the car hitbox.
pub fn overlapping_obstacles(state: &RaceState) -> Vec<u32> {
    state
        .obstacles
        .iter()
        .filter(|o| {
            !o.hit && intervals_overlap(CAR_X, CAR_X + CAR_WIDTH, o.x, o.x + OBSTACLE_WIDTH)
        })
        .map(|o| o.id)
        .collect()
}

/// Ids of uncollected power-ups currently overlapping the car hitbox.
pub fn overlapping_power_ups(state: &RaceState) -> Vec<u32> {
    state
        .power_ups
        .iter()
        .filter(|p| {
            !p.collected && intervals_overlap(CAR_X, CAR_X + CAR_WIDTH, p.x, p.x + POWER_UP_WIDTH)
        })
        .map(|p| p.id)
        .collect()
}

/// Resolve a car/obstacle collision.
///
/// An active shield is consumed and deflects the hit with no speed
/// penalty. Otherwise the car loses [`CRASH_SPEED_PENALTY`] speed
/// (floored at zero) and a crash event fires. Unknown or already-hit
/// ids are no-ops.
pub fn resolve_collision(state: &mut RaceState, id: u32) -> Option<GameEvent> {
    let obstacle = state.obstacles.iter_mut().find(|o| o.id == id)?;
    if obstacle.hit {
        return None;
    }
    obstacle.hit = true;

    let event = if state.has_shield {
        state.has_shield = false;
        GameEvent::ShieldDeflected { obstacle_id: id }
    } else {
        state.speed = (state.speed - CRASH_SPEED_PENALTY).max(0.0);
        GameEvent::Crashed { obstacle_id: id }
    };
    state.push_event(event.clone());
    Some(event)
}

/// Resolve a car/power-up overlap.
///
/// Nitro grants an instant flat boost; shield arms the one-shot
/// protection (a redundant pickup while shielded is not an error).
/// Unknown or already-collected ids are no-ops.
pub fn collect_power_up(state: &mut RaceState, id: u32) -> Option<GameEvent> {
    let power_up = state.power_ups.iter_mut().find(|p| p.id == id)?;
    if power_up.collected {
        return None;
    }
    power_up.collected = true;
    let kind = power_up.kind;

    match kind {
        PowerUpKind::Nitro => state.speed += NITRO_BOOST,
        PowerUpKind::Shield => state.has_shield = true,
    }

    let event = GameEvent::PowerUpCollected { id, kind };
    state.push_event(event.clone());
    Some(event)
}
