//! Runtime Orchestration
//!
//! One fixed-rate loop drives both solo and battle play. Battle mode is
//! an optional context threaded through the same tick path, never a
//! parallel state machine: each tick advances the race, then (if a
//! session exists) drains relay deliveries against a fresh local
//! snapshot and broadcasts under the outbound throttle.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::game::{apply_input, tick, GameEvent, RaceConfig, RacePhase, RaceState, RenderSnapshot};
use crate::net::{BattleEvent, BattleSession, LocalSnapshot, PlayerInfo, Transport};
use crate::scores::HighScores;
use crate::typing::{GameReport, RaceSetupError};

/// Fixed simulation rate in ticks per second.
pub const TICK_RATE: u32 = 60;

/// Everything one tick produced, handed to the embedding layer.
#[derive(Debug)]
pub struct TickOutput {
    /// Read-only render state after this tick.
    pub snapshot: RenderSnapshot,
    /// Simulation events in emission order.
    pub game_events: Vec<GameEvent>,
    /// Battle-session events, empty in solo play.
    pub battle_events: Vec<BattleEvent>,
    /// Instantaneous WPM sampled at the top of the tick.
    pub instant_wpm: u32,
}

/// The whole game: one race, the persistent score list, and an
/// optional battle session.
pub struct GameCore<T: Transport> {
    name: String,
    race: RaceState,
    config: RaceConfig,
    battle: Option<BattleSession<T>>,
    scores: HighScores,
    last_instant_wpm: u32,
}

impl<T: Transport> GameCore<T> {
    /// Solo game over `target`.
    pub fn solo(name: &str, target: &str, scores: HighScores) -> Result<Self, RaceSetupError> {
        Ok(Self {
            name: name.to_string(),
            race: RaceState::new(target)?,
            config: RaceConfig::default(),
            battle: None,
            scores,
            last_instant_wpm: 0,
        })
    }

    /// Game with an established battle session attached.
    pub fn with_battle(
        name: &str,
        target: &str,
        scores: HighScores,
        battle: BattleSession<T>,
    ) -> Result<Self, RaceSetupError> {
        let mut core = Self::solo(name, target, scores)?;
        core.battle = Some(battle);
        Ok(core)
    }

    /// Replace the current race with a fresh one over `target`.
    pub fn new_race(&mut self, target: &str) -> Result<(), RaceSetupError> {
        self.race = RaceState::new(target)?;
        self.last_instant_wpm = 0;
        Ok(())
    }

    /// Current race state.
    pub fn race(&self) -> &RaceState {
        &self.race
    }

    /// Loop and spawn tuning.
    pub fn config_mut(&mut self) -> &mut RaceConfig {
        &mut self.config
    }

    /// Persistent high-score list.
    pub fn scores(&self) -> &HighScores {
        &self.scores
    }

    /// The battle session, if one is attached.
    pub fn battle(&self) -> Option<&BattleSession<T>> {
        self.battle.as_ref()
    }

    /// Mutable battle session access for discovery and handshakes.
    pub fn battle_mut(&mut self) -> Option<&mut BattleSession<T>> {
        self.battle.as_mut()
    }

    /// The local player's public state as of the last tick.
    pub fn local_player(&self) -> PlayerInfo {
        let id = self
            .battle
            .as_ref()
            .map(|b| b.my_id().to_string())
            .unwrap_or_else(|| "local".to_string());
        PlayerInfo {
            id,
            name: self.name.clone(),
            wpm: self.last_instant_wpm,
            progress: self.race.stats.progress as f32,
            speed: self.race.speed,
            has_shield: self.race.has_shield,
            is_finished: self.race.phase == RacePhase::Finished,
        }
    }

    fn local_snapshot(&self, now: Instant) -> LocalSnapshot {
        LocalSnapshot {
            info: self.local_player(),
            interim_report: self.race.typing.finish_report(now, self.scores.list()),
        }
    }

    /// Feed an input-buffer change into the race.
    ///
    /// On completion the report is recorded into the high-score list
    /// and, in battle mode, sent as the finish signal.
    pub fn submit_input(&mut self, new_input: &str, now: Instant) -> Option<GameReport> {
        let report = apply_input(
            &mut self.race,
            &self.config,
            new_input,
            now,
            self.scores.list(),
        )?;

        self.scores.record(report.net_wpm);

        if let Some(battle) = &mut self.battle {
            let me = PlayerInfo {
                id: battle.my_id().to_string(),
                name: self.name.clone(),
                wpm: self.last_instant_wpm,
                progress: 100.0,
                speed: self.race.speed,
                has_shield: self.race.has_shield,
                is_finished: true,
            };
            let _ = battle.local_finish(&me, &report);
        }

        Some(report)
    }

    /// Challenge the connected opponent over `target`. The local race
    /// is reset to the same text so both clients stand ready.
    pub fn challenge_opponent(&mut self, target: &str) -> Result<(), RaceSetupError> {
        self.new_race(target)?;
        let me = self.local_player();
        if let Some(battle) = &mut self.battle {
            if let Err(e) = battle.send_challenge(&me, target) {
                warn!(error = %e, "challenge not delivered");
            }
        }
        Ok(())
    }

    /// Accept a pending challenge, resetting the race to the agreed
    /// text. Returns the text if a challenge was waiting.
    pub fn accept_challenge(&mut self) -> Result<Option<String>, RaceSetupError> {
        let accepted = self.battle.as_mut().and_then(|b| b.accept_challenge());
        if let Some(text) = &accepted {
            self.new_race(text)?;
        }
        Ok(accepted)
    }

    /// Run one simulation tick and, in battle mode, one sync round.
    pub fn tick_once(&mut self, now: Instant) -> TickOutput {
        let result = tick(&mut self.race, &self.config, now);
        if self.race.is_active() {
            self.last_instant_wpm = result.instant_wpm;
        }

        let mut battle_events = Vec::new();
        if self.battle.is_some() {
            let snapshot = self.local_snapshot(now);
            let me = snapshot.info.clone();
            if let Some(battle) = &mut self.battle {
                battle_events = battle.poll(&snapshot);
                if self.race.is_active() {
                    if let Err(e) = battle.maybe_broadcast(&me, now) {
                        warn!(error = %e, "update broadcast failed");
                    }
                }
            }

            // A completed handshake swaps in the agreed text.
            let started_text = battle_events.iter().find_map(|e| match e {
                BattleEvent::BattleStarted { text } => Some(text.clone()),
                _ => None,
            });
            if let Some(text) = started_text {
                if let Err(e) = self.new_race(&text) {
                    warn!(error = %e, "agreed battle text unusable");
                } else {
                    info!("race reset to agreed battle text");
                }
            }
        }

        TickOutput {
            snapshot: self.race.snapshot(),
            game_events: result.events,
            battle_events,
            instant_wpm: result.instant_wpm,
        }
    }

    /// Render-boundary callback: the renderer detected car/obstacle
    /// overlap for `id`.
    pub fn resolve_collision(&mut self, id: u32) -> Option<GameEvent> {
        crate::game::resolve_collision(&mut self.race, id)
    }

    /// Render-boundary callback: the renderer detected car/power-up
    /// overlap for `id`.
    pub fn collect_power_up(&mut self, id: u32) -> Option<GameEvent> {
        crate::game::collect_power_up(&mut self.race, id)
    }
}

/// Cleanup token for a running race loop. Aborts the task on
/// [`LoopHandle::stop`] or drop; a leaked loop would tick forever.
pub struct LoopHandle {
    handle: JoinHandle<()>,
}

impl LoopHandle {
    /// Stop the loop immediately.
    pub fn stop(&self) {
        self.handle.abort();
    }

    /// Stop the loop and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn the fixed-rate orchestration loop.
///
/// Ticks the shared core at [`TICK_RATE`] and hands every
/// [`TickOutput`] to `on_tick`. Missed ticks are skipped rather than
/// bursted so a stalled embedder cannot cause a catch-up stampede.
pub fn spawn_race_loop<T, F>(core: Arc<Mutex<GameCore<T>>>, mut on_tick: F) -> LoopHandle
where
    T: Transport + Send + 'static,
    F: FnMut(TickOutput) + Send + 'static,
{
    let period = Duration::from_micros(1_000_000 / u64::from(TICK_RATE));
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(rate = TICK_RATE, "race loop running");
        loop {
            ticker.tick().await;
            let output = match core.lock() {
                Ok(mut core) => core.tick_once(Instant::now()),
                Err(_) => {
                    warn!("core mutex poisoned; stopping loop");
                    return;
                }
            };
            on_tick(output);
        }
    });
    LoopHandle { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{LocalRelay, RelayConnection};

    fn solo_core(target: &str) -> GameCore<RelayConnection> {
        GameCore::solo("Tester", target, HighScores::default()).unwrap()
    }

    #[test]
    fn test_solo_tick_produces_snapshot() {
        let mut core = solo_core("hello world");
        let base = Instant::now();
        let _ = core.submit_input("h", base);

        let output = core.tick_once(base + Duration::from_millis(16));
        assert_eq!(output.snapshot.phase, RacePhase::Playing);
        assert!(output.battle_events.is_empty());
        assert!(output
            .game_events
            .iter()
            .any(|e| matches!(e, GameEvent::RaceStarted)));
    }

    #[test]
    fn test_completion_records_high_score() {
        let mut core = solo_core("ab");
        let base = Instant::now();
        let _ = core.submit_input("a", base);
        let report = core
            .submit_input("ab", base + Duration::from_millis(500))
            .expect("completion yields a report");
        assert!(report.is_new_record);
        assert_eq!(core.scores().best(), Some(report.net_wpm));
    }

    #[test]
    fn test_battle_handshake_resets_race_text() {
        let relay = LocalRelay::new();
        let mut host_session = BattleSession::new(relay.connect(), "Host");
        let mut guest_session = BattleSession::new(relay.connect(), "Guest");
        host_session.connect().unwrap();
        guest_session.connect().unwrap();
        let host_id = host_session.my_id().to_string();
        guest_session.connect_to_peer(&host_id).unwrap();

        let mut host =
            GameCore::with_battle("Host", "placeholder", HighScores::default(), host_session)
                .unwrap();
        let mut guest =
            GameCore::with_battle("Guest", "placeholder", HighScores::default(), guest_session)
                .unwrap();

        let base = Instant::now();
        host.tick_once(base); // absorb guest's presence

        host.challenge_opponent("agreed words").unwrap();
        guest.tick_once(base + Duration::from_millis(16));
        let accepted = guest.accept_challenge().unwrap();
        assert_eq!(accepted.as_deref(), Some("agreed words"));
        assert_eq!(guest.race().typing.target_len(), "agreed words".len());

        let output = host.tick_once(base + Duration::from_millis(32));
        assert!(output
            .battle_events
            .iter()
            .any(|e| matches!(e, BattleEvent::BattleStarted { .. })));
        assert_eq!(host.race().typing.target_len(), "agreed words".len());
    }

    #[test]
    fn test_battle_finish_sends_verdict() {
        let relay = LocalRelay::new();
        let mut host_session = BattleSession::new(relay.connect(), "Host");
        let mut guest_session = BattleSession::new(relay.connect(), "Guest");
        host_session.connect().unwrap();
        guest_session.connect().unwrap();
        let host_id = host_session.my_id().to_string();
        guest_session.connect_to_peer(&host_id).unwrap();

        let mut host =
            GameCore::with_battle("Host", "go", HighScores::default(), host_session).unwrap();
        let mut guest =
            GameCore::with_battle("Guest", "go", HighScores::default(), guest_session).unwrap();

        let base = Instant::now();
        host.tick_once(base);
        host.challenge_opponent("go").unwrap();
        guest.tick_once(base);
        guest.accept_challenge().unwrap();
        host.tick_once(base);

        // Host types the whole text first.
        let _ = host.submit_input("g", base + Duration::from_millis(100));
        let _ = host.submit_input("go", base + Duration::from_millis(300));
        assert!(host.battle().unwrap().is_ended());
        assert!(host.battle().unwrap().result().unwrap().i_won);

        // Guest sees the loss on its next tick.
        let output = guest.tick_once(base + Duration::from_millis(320));
        let lost = output.battle_events.iter().any(
            |e| matches!(e, BattleEvent::BattleEnded(r) if !r.i_won && r.winner.id == host_id),
        );
        assert!(lost);
    }

    #[tokio::test(start_paused = true)]
    async fn test_race_loop_ticks_and_stops() {
        let core = Arc::new(Mutex::new(solo_core("abc")));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = spawn_race_loop(Arc::clone(&core), move |output| {
            let _ = tx.send(output.instant_wpm);
        });

        // Paused time auto-advances, so the first few ticks arrive
        // without real waiting.
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());

        handle.shutdown().await;
    }
}
