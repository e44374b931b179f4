//! Orchestration Tick
//!
//! One fixed-rate simulation step, and the input-event path that feeds
//! the typing engine. Tick order is load-bearing: WPM is sampled before
//! the speed target is derived, speed is eased before entities advance,
//! and spawn rolls happen against the post-ease speed.

use std::time::{Duration, Instant};

use rand::Rng;

use crate::game::entities::{spawn_obstacle, spawn_power_up, SpawnConfig};
use crate::game::events::GameEvent;
use crate::game::physics::{advance_entities, ease_speed};
use crate::game::state::{RacePhase, RaceState};
use crate::typing::GameReport;

/// Tuning for the orchestration loop.
#[derive(Clone, Debug)]
pub struct RaceConfig {
    /// Target speed per point of instantaneous WPM.
    pub speed_per_wpm: f32,
    /// Without a correct keystroke for this long, target speed drops to
    /// zero. Deliberately much shorter than the WPM window so the car
    /// stops before the readout catches up.
    pub idle_decay: Duration,
    /// Per-tick power-up spawn probability. Tunable; 0.003 at 60 Hz is
    /// roughly one spawn every 5.5 seconds while moving.
    pub power_up_chance: f64,
    /// Power-ups only spawn above this speed.
    pub power_up_speed_floor: f32,
    /// Entity placement tuning.
    pub spawn: SpawnConfig,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            speed_per_wpm: 1.5,
            idle_decay: Duration::from_millis(400),
            power_up_chance: 0.003,
            power_up_speed_floor: 10.0,
            spawn: SpawnConfig::default(),
        }
    }
}

/// Result of one tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick (including input-path events queued
    /// since the previous tick).
    pub events: Vec<GameEvent>,
    /// Instantaneous WPM sampled at the top of the tick.
    pub instant_wpm: u32,
}

/// Run one simulation tick. No-op unless the race is playing.
pub fn tick(state: &mut RaceState, config: &RaceConfig, now: Instant) -> TickResult {
    let mut result = TickResult::default();
    if state.phase != RacePhase::Playing {
        return result;
    }

    // 1. Instantaneous WPM from the metrics engine.
    let instant_wpm = state.typing.instantaneous_wpm(now);
    result.instant_wpm = instant_wpm;

    // 2. Target speed, zeroed after an idle gap.
    let idle = state
        .typing
        .last_correct_at()
        .map(|t| now.duration_since(t) > config.idle_decay)
        .unwrap_or(true);
    let target_speed = if idle {
        0.0
    } else {
        instant_wpm as f32 * config.speed_per_wpm
    };

    // 3. Ease toward the target.
    ease_speed(state, target_speed);

    // 4. Advance and cull entities at the new speed.
    advance_entities(state, &config.spawn);

    // 5. Probabilistic power-up spawn, gated on meaningful motion.
    if state.speed > config.power_up_speed_floor
        && state.rng_mut().gen_bool(config.power_up_chance)
    {
        spawn_power_up(state, &config.spawn);
    }

    // Refresh the stats readout.
    state.stats = state.typing.trailing_stats(now);

    result.events = state.take_events();
    result
}

/// Feed an input-buffer change into the race.
///
/// Mistakes spawn a penalty obstacle. Completion finalizes the report
/// synchronously against `high_scores` and transitions the race to
/// [`RacePhase::Finished`]; the report is returned exactly once.
pub fn apply_input(
    state: &mut RaceState,
    config: &RaceConfig,
    new_input: &str,
    now: Instant,
    high_scores: &[u32],
) -> Option<GameReport> {
    if state.phase == RacePhase::Finished {
        return None;
    }

    let outcome = state.typing.submit_input(new_input, now);

    if outcome.started {
        state.phase = RacePhase::Playing;
        state.push_event(GameEvent::RaceStarted);
    }

    if outcome.mistake {
        spawn_obstacle(state, &config.spawn);
    }

    state.stats = state.typing.trailing_stats(now);

    if outcome.finished {
        let report = state.typing.finish_report(now, high_scores);
        state.phase = RacePhase::Finished;
        state.report = Some(report.clone());
        state.push_event(GameEvent::RaceFinished {
            report: report.clone(),
        });
        return Some(report);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_tick_noop_when_idle() {
        let mut state = RaceState::with_seed("hello", 1).unwrap();
        let result = tick(&mut state, &RaceConfig::default(), Instant::now());
        assert!(result.events.is_empty());
        assert_eq!(state.speed, 0.0);
    }

    #[test]
    fn test_first_input_starts_race() {
        let base = Instant::now();
        let mut state = RaceState::with_seed("hello", 1).unwrap();
        let config = RaceConfig::default();

        apply_input(&mut state, &config, "h", base, &[]);
        assert_eq!(state.phase, RacePhase::Playing);

        let events = tick(&mut state, &config, at(base, 16)).events;
        assert!(matches!(events[0], GameEvent::RaceStarted));
    }

    #[test]
    fn test_mistake_spawns_obstacle() {
        let base = Instant::now();
        let mut state = RaceState::with_seed("hello", 1).unwrap();
        let config = RaceConfig::default();

        apply_input(&mut state, &config, "x", base, &[]);
        assert_eq!(state.obstacles.len(), 1);
        assert_eq!(state.stats.errors, 1);
    }

    #[test]
    fn test_speed_rises_while_typing() {
        let base = Instant::now();
        let mut state = RaceState::with_seed("abcdefghijklmnop", 1).unwrap();
        let config = RaceConfig::default();

        let mut input = String::new();
        let mut now = base;
        for (i, c) in "abcdefgh".chars().enumerate() {
            input.push(c);
            now = at(base, i as u64 * 100);
            apply_input(&mut state, &config, &input, now, &[]);
            tick(&mut state, &config, now);
        }
        assert!(state.speed > 0.0);
    }

    #[test]
    fn test_idle_decay_zeroes_target_before_wpm_window() {
        let base = Instant::now();
        let mut state = RaceState::with_seed("abcdefghij", 1).unwrap();
        let config = RaceConfig::default();

        apply_input(&mut state, &config, "a", base, &[]);
        apply_input(&mut state, &config, "ab", at(base, 100), &[]);
        state.speed = 60.0;

        // 600ms after the last keystroke: inside the 1.2s WPM window but
        // past the 400ms idle horizon, so WPM is nonzero yet the car
        // must be decelerating toward zero.
        let result = tick(&mut state, &config, at(base, 700));
        assert!(result.instant_wpm > 0);
        assert!(state.speed < 60.0);
    }

    #[test]
    fn test_finish_produces_report_once() {
        let base = Instant::now();
        let mut state = RaceState::with_seed("ab", 1).unwrap();
        let config = RaceConfig::default();

        apply_input(&mut state, &config, "a", base, &[]);
        let report = apply_input(&mut state, &config, "ab", at(base, 200), &[]);
        assert!(report.is_some());
        assert_eq!(state.phase, RacePhase::Finished);

        // Late input after completion is inert.
        let again = apply_input(&mut state, &config, "abc", at(base, 300), &[]);
        assert!(again.is_none());
    }

    #[test]
    fn test_power_up_gated_on_speed_floor() {
        let base = Instant::now();
        let mut state = RaceState::with_seed("abcdefghij", 1).unwrap();
        let mut config = RaceConfig::default();
        config.power_up_chance = 1.0; // force the roll

        apply_input(&mut state, &config, "a", base, &[]);
        state.speed = 5.0;
        tick(&mut state, &config, at(base, 16));
        assert!(state.power_ups.is_empty());

        apply_input(&mut state, &config, "ab", at(base, 30), &[]);
        state.speed = 50.0;
        tick(&mut state, &config, at(base, 48));
        assert_eq!(state.power_ups.len(), 1);
    }
}
