//! Battle Session
//!
//! Peer discovery over rendezvous channels, the challenge/accept
//! handshake, live opponent sync with interpolation smoothing, and the
//! finish latch that collapses two independently-simulated races into
//! one verdict.
//!
//! The session never owns simulation state: the controller passes an
//! up-to-date local snapshot into every poll, so receive handling never
//! reads through a stale side-channel.

use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::net::protocol::{
    room_topic, BattleMessage, BattleResult, PlayerInfo, GAME_DATA_EVENT, PLAYER_JOINED_EVENT,
};
use crate::net::relay::{RelayDelivery, Transport, TransportError};
use crate::typing::GameReport;

/// Connection status surfaced to the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Transport handshake in progress.
    Connecting,
    /// Rendezvous channel is live.
    Connected,
    /// Transport failed or credentials are missing; solo play only.
    Offline,
}

/// Sync-layer tuning.
#[derive(Clone, Debug)]
pub struct BattleConfig {
    /// Minimum wall-clock gap between outbound updates.
    pub broadcast_interval: Duration,
    /// Progress delta above which a received update snaps instead of
    /// blending (treated as a correction after packet loss).
    pub snap_threshold: f32,
    /// Fraction of the progress delta applied per received update.
    pub blend_factor: f32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            broadcast_interval: Duration::from_millis(50),
            snap_threshold: 5.0,
            blend_factor: 0.3,
        }
    }
}

/// Up-to-date local state handed to the session on every poll.
#[derive(Clone, Debug)]
pub struct LocalSnapshot {
    /// The local player's current public state.
    pub info: PlayerInfo,
    /// Report computed from current stats; becomes `my_report` if the
    /// opponent's finish arrives before ours.
    pub interim_report: GameReport,
}

/// Events the session emits for the top-level controller.
#[derive(Clone, Debug)]
pub enum BattleEvent {
    /// Transport status changed.
    ConnectionChanged(ConnectionStatus),
    /// A peer appeared on the current channel.
    OpponentJoined(PlayerInfo),
    /// The opponent left the channel.
    OpponentLeft {
        /// Connection id of the departed peer.
        id: String,
    },
    /// A challenge arrived; accept or let it expire locally.
    ChallengeReceived {
        /// The challenger.
        from: PlayerInfo,
        /// Proposed race text.
        text: String,
    },
    /// Handshake completed; both sides race this text.
    BattleStarted {
        /// The agreed race text.
        text: String,
    },
    /// The opponent's cached state changed.
    OpponentUpdated(PlayerInfo),
    /// The opponent's finish arrived after the verdict was already
    /// latched; verdict unchanged.
    OpponentFinished {
        /// Signed finish-time gap in seconds, if both times are known.
        time_diff: Option<f64>,
    },
    /// The verdict latched.
    BattleEnded(BattleResult),
}

/// One client's half of a two-player battle.
pub struct BattleSession<T: Transport> {
    transport: T,
    name: String,
    status: ConnectionStatus,
    /// Topic of the channel currently joined.
    room: Option<String>,
    rx: Option<mpsc::UnboundedReceiver<RelayDelivery>>,
    opponent: Option<PlayerInfo>,
    incoming_challenge: Option<(PlayerInfo, String)>,
    outgoing_challenge: Option<String>,
    battle_text: Option<String>,
    /// The battle-ended latch. Once set, no completion signal can
    /// change the verdict.
    ended: bool,
    result: Option<BattleResult>,
    local_finish_time: Option<i64>,
    opponent_finish_time: Option<i64>,
    opponent_finish_seen: bool,
    last_broadcast: Option<Instant>,
    config: BattleConfig,
}

impl<T: Transport> BattleSession<T> {
    /// Create a session over an established transport connection.
    pub fn new(transport: T, name: &str) -> Self {
        Self::with_config(transport, name, BattleConfig::default())
    }

    /// Create a session with explicit sync tuning.
    pub fn with_config(transport: T, name: &str, config: BattleConfig) -> Self {
        Self {
            transport,
            name: name.to_string(),
            status: ConnectionStatus::Connecting,
            room: None,
            rx: None,
            opponent: None,
            incoming_challenge: None,
            outgoing_challenge: None,
            battle_text: None,
            ended: false,
            result: None,
            local_finish_time: None,
            opponent_finish_time: None,
            opponent_finish_seen: false,
            last_broadcast: None,
            config,
        }
    }

    /// This client's transport-assigned connection id.
    pub fn my_id(&self) -> &str {
        self.transport.client_id()
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Cached (smoothed) opponent state.
    pub fn opponent(&self) -> Option<&PlayerInfo> {
        self.opponent.as_ref()
    }

    /// The agreed race text, once a battle has started.
    pub fn battle_text(&self) -> Option<&str> {
        self.battle_text.as_deref()
    }

    /// Whether the verdict latch is set.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// The latched verdict, if any.
    pub fn result(&self) -> Option<&BattleResult> {
        self.result.as_ref()
    }

    /// Join our own rendezvous channel so peers can find us by id.
    pub fn connect(&mut self) -> Result<(), TransportError> {
        let topic = room_topic(self.transport.client_id());
        self.rx = Some(self.transport.subscribe(&topic));
        if let Err(e) = self.transport.presence_enter(&topic, &self.name) {
            self.status = ConnectionStatus::Offline;
            return Err(e);
        }
        self.room = Some(topic);
        self.status = ConnectionStatus::Connected;
        info!(id = %self.my_id(), "joined own rendezvous channel");
        Ok(())
    }

    /// Leave our channel and join a peer's rendezvous channel by id.
    ///
    /// Announces presence, then lists existing members so the flow
    /// works whichever side arrives first. Returns discovery events.
    pub fn connect_to_peer(&mut self, peer_id: &str) -> Result<Vec<BattleEvent>, TransportError> {
        if peer_id == self.my_id() || peer_id.is_empty() {
            return Ok(Vec::new());
        }

        self.leave_current_room();

        let topic = room_topic(peer_id);
        self.rx = Some(self.transport.subscribe(&topic));
        if let Err(e) = self.transport.presence_enter(&topic, &self.name) {
            self.status = ConnectionStatus::Offline;
            return Err(e);
        }
        self.transport.publish(
            &topic,
            PLAYER_JOINED_EVENT,
            serde_json::json!({ "name": self.name }),
        )?;
        self.room = Some(topic.clone());
        info!(peer = %peer_id, "joined peer rendezvous channel");

        // Whoever was here before us (the host) shows up in the member
        // list rather than as a presence-enter delivery.
        let mut events = Vec::new();
        for member in self.transport.presence_members(&topic) {
            if member.client_id != self.my_id() {
                let joined = PlayerInfo::joining(&member.client_id, &member.name);
                self.opponent = Some(joined.clone());
                events.push(BattleEvent::OpponentJoined(joined));
            }
        }
        Ok(events)
    }

    /// Tear down the current channel and re-establish the rendezvous
    /// channel from scratch. Clears all battle state.
    pub fn reset_connection(&mut self) -> Result<(), TransportError> {
        self.leave_current_room();
        self.opponent = None;
        self.incoming_challenge = None;
        self.outgoing_challenge = None;
        self.battle_text = None;
        self.ended = false;
        self.result = None;
        self.local_finish_time = None;
        self.opponent_finish_time = None;
        self.opponent_finish_seen = false;
        self.last_broadcast = None;
        self.connect()
    }

    fn leave_current_room(&mut self) {
        if let Some(room) = self.room.take() {
            self.transport.presence_leave(&room);
            self.transport.unsubscribe(&room);
        }
        self.rx = None;
    }

    /// Propose a battle over `text`. The challenger generates the text;
    /// the acceptor echoes it back, guaranteeing a shared string.
    pub fn send_challenge(&mut self, local: &PlayerInfo, text: &str) -> Result<(), TransportError> {
        let msg = BattleMessage::Challenge {
            from: local.clone(),
            text: text.to_string(),
        };
        self.publish_game_data(&msg)?;
        self.outgoing_challenge = Some(text.to_string());
        Ok(())
    }

    /// Accept the pending challenge, if any; returns the agreed text.
    ///
    /// Declining is simply never calling this: the challenge expires
    /// locally and no message is sent. The send is fire-and-forget;
    /// the local battle starts even if the accept fails to publish.
    pub fn accept_challenge(&mut self) -> Option<String> {
        let (_, text) = self.incoming_challenge.take()?;
        if let Err(e) = self.publish_game_data(&BattleMessage::Accept { text: text.clone() }) {
            warn!(error = %e, "accept not delivered");
        }
        self.start_battle(&text);
        Some(text)
    }

    /// The pending incoming challenge, if one is waiting.
    pub fn pending_challenge(&self) -> Option<&(PlayerInfo, String)> {
        self.incoming_challenge.as_ref()
    }

    fn start_battle(&mut self, text: &str) {
        self.battle_text = Some(text.to_string());
        self.ended = false;
        self.result = None;
        self.local_finish_time = None;
        self.opponent_finish_time = None;
        self.opponent_finish_seen = false;
        self.last_broadcast = None;
        if let Some(op) = &mut self.opponent {
            op.progress = 0.0;
            op.wpm = 0;
            op.speed = 0.0;
            op.has_shield = false;
            op.is_finished = false;
        }
        info!(chars = text.len(), "battle started");
    }

    /// Broadcast local state if the throttle window has elapsed.
    ///
    /// At most one update per 50ms of wall-clock time regardless of
    /// tick rate. Returns whether an update went out.
    pub fn maybe_broadcast(
        &mut self,
        local: &PlayerInfo,
        now: Instant,
    ) -> Result<bool, TransportError> {
        if self.battle_text.is_none() || self.ended {
            return Ok(false);
        }
        if let Some(last) = self.last_broadcast {
            if now.duration_since(last) < self.config.broadcast_interval {
                return Ok(false);
            }
        }
        let msg = BattleMessage::Update {
            player: local.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };
        self.publish_game_data(&msg)?;
        self.last_broadcast = Some(now);
        Ok(true)
    }

    /// The local player finished the race.
    ///
    /// If the latch is clear this sends `FINISHED`, latches, and
    /// returns the local-win verdict. If the opponent already won, the
    /// report is folded into the stored result for the player's own
    /// stats display and the verdict stands. The send is
    /// fire-and-forget; the latch is set even if the signal fails to
    /// publish.
    pub fn local_finish(
        &mut self,
        local: &PlayerInfo,
        report: &GameReport,
    ) -> Option<BattleResult> {
        if self.battle_text.is_none() {
            return None;
        }
        let finish_time = Utc::now().timestamp_millis();
        self.local_finish_time = Some(finish_time);

        if self.ended {
            // Opponent's verdict already latched; keep our final report
            // without overturning it.
            if let Some(result) = &mut self.result {
                result.my_report = report.clone();
                result.time_diff = signed_time_diff(self.local_finish_time, self.opponent_finish_time);
            }
            return None;
        }

        let mut me = local.clone();
        me.is_finished = true;

        let msg = BattleMessage::Finished {
            player: me.clone(),
            report: report.clone(),
            finish_time,
        };
        if let Err(e) = self.publish_game_data(&msg) {
            warn!(error = %e, "finish signal not delivered");
        }

        self.ended = true;
        let loser = self
            .opponent
            .clone()
            .unwrap_or_else(|| PlayerInfo::joining("unknown", "Opponent"));
        let result = BattleResult {
            winner: me,
            loser,
            my_report: report.clone(),
            i_won: true,
            time_diff: signed_time_diff(self.local_finish_time, self.opponent_finish_time),
        };
        self.result = Some(result.clone());
        info!("local finish accepted as battle verdict");
        Some(result)
    }

    /// Drain pending deliveries and apply them against the given local
    /// snapshot. Called once per tick by the orchestration loop.
    pub fn poll(&mut self, local: &LocalSnapshot) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        let mut deliveries = Vec::new();
        if let Some(rx) = &mut self.rx {
            while let Ok(delivery) = rx.try_recv() {
                deliveries.push(delivery);
            }
        }
        for delivery in deliveries {
            self.handle_delivery(delivery, local, &mut events);
        }
        events
    }

    fn handle_delivery(
        &mut self,
        delivery: RelayDelivery,
        local: &LocalSnapshot,
        events: &mut Vec<BattleEvent>,
    ) {
        match delivery {
            RelayDelivery::PresenceEnter(member) => {
                if member.client_id != self.my_id() {
                    let joined = PlayerInfo::joining(&member.client_id, &member.name);
                    self.opponent = Some(joined.clone());
                    events.push(BattleEvent::OpponentJoined(joined));
                }
            }
            RelayDelivery::PresenceLeave { client_id } => {
                if self.opponent.as_ref().is_some_and(|o| o.id == client_id) {
                    self.opponent = None;
                    events.push(BattleEvent::OpponentLeft { id: client_id });
                }
            }
            RelayDelivery::Message(env) => {
                if env.client_id == self.my_id() {
                    return;
                }
                match env.event.as_str() {
                    PLAYER_JOINED_EVENT => {
                        let name = env
                            .data
                            .get("name")
                            .and_then(|v| v.as_str())
                            .unwrap_or(&env.client_id);
                        let joined = PlayerInfo::joining(&env.client_id, name);
                        self.opponent = Some(joined.clone());
                        events.push(BattleEvent::OpponentJoined(joined));
                    }
                    GAME_DATA_EVENT => match serde_json::from_value::<BattleMessage>(env.data) {
                        Ok(msg) => self.handle_game_data(msg, local, events),
                        Err(e) => warn!(error = %e, "unparseable game-data payload"),
                    },
                    other => debug!(event = other, "ignoring unknown relay event"),
                }
            }
        }
    }

    fn handle_game_data(
        &mut self,
        msg: BattleMessage,
        local: &LocalSnapshot,
        events: &mut Vec<BattleEvent>,
    ) {
        match msg {
            BattleMessage::Challenge { from, text } => {
                debug!(from = %from.id, "challenge received");
                self.incoming_challenge = Some((from.clone(), text.clone()));
                events.push(BattleEvent::ChallengeReceived { from, text });
            }
            BattleMessage::Accept { text } => {
                // Only meaningful if we actually challenged; a stray
                // accept is dropped.
                if self.outgoing_challenge.take().is_some() {
                    self.start_battle(&text);
                    events.push(BattleEvent::BattleStarted { text });
                }
            }
            BattleMessage::Update { player, .. } => {
                self.apply_opponent_update(player);
                if let Some(op) = &self.opponent {
                    events.push(BattleEvent::OpponentUpdated(op.clone()));
                }
            }
            BattleMessage::Finished {
                player,
                finish_time,
                ..
            } => {
                self.handle_opponent_finished(player, finish_time, local, events);
            }
        }
    }

    /// Smooth a received opponent snapshot into the local cache.
    ///
    /// A large progress jump snaps (correction after loss); a small one
    /// blends to hide jitter. Everything else is replaced outright.
    fn apply_opponent_update(&mut self, incoming: PlayerInfo) {
        let held = match &mut self.opponent {
            Some(op) if op.id == incoming.id => op,
            _ => {
                self.opponent = Some(incoming);
                return;
            }
        };

        let delta = incoming.progress - held.progress;
        held.progress = if delta.abs() > self.config.snap_threshold {
            incoming.progress
        } else {
            held.progress + delta * self.config.blend_factor
        };
        held.name = incoming.name;
        held.wpm = incoming.wpm;
        held.speed = incoming.speed;
        held.has_shield = incoming.has_shield;
        held.is_finished = incoming.is_finished;
    }

    fn handle_opponent_finished(
        &mut self,
        player: PlayerInfo,
        finish_time: i64,
        local: &LocalSnapshot,
        events: &mut Vec<BattleEvent>,
    ) {
        if self.opponent_finish_seen {
            // Duplicate delivery; fully inert.
            debug!("duplicate FINISHED ignored");
            return;
        }
        self.opponent_finish_seen = true;
        self.opponent_finish_time = Some(finish_time);

        if self.ended {
            // We already won; the late signal only pins the time gap.
            let time_diff = signed_time_diff(self.local_finish_time, self.opponent_finish_time);
            if let Some(result) = &mut self.result {
                result.time_diff = time_diff;
                result.loser = player;
            }
            events.push(BattleEvent::OpponentFinished { time_diff });
            return;
        }

        // Opponent's finish arrived first: they win, latch now.
        self.ended = true;
        let mut winner = player;
        winner.is_finished = true;
        self.opponent = Some(winner.clone());

        let result = BattleResult {
            winner: winner.clone(),
            loser: local.info.clone(),
            my_report: local.interim_report.clone(),
            i_won: false,
            time_diff: None,
        };
        self.result = Some(result.clone());
        info!(winner = %winner.id, "opponent finish accepted as battle verdict");
        events.push(BattleEvent::BattleEnded(result));
    }

    fn publish_game_data(&mut self, msg: &BattleMessage) -> Result<(), TransportError> {
        let room = match &self.room {
            Some(r) => r.clone(),
            None => return Err(TransportError::Offline),
        };
        let data = serde_json::to_value(msg)?;
        if let Err(e) = self.transport.publish(&room, GAME_DATA_EVENT, data) {
            self.status = ConnectionStatus::Offline;
            return Err(e);
        }
        Ok(())
    }
}

/// `(local - opponent) / 1000` seconds when both finish times are
/// known. Negative when the local player finished first; reported
/// unclamped.
fn signed_time_diff(local_ms: Option<i64>, opponent_ms: Option<i64>) -> Option<f64> {
    match (local_ms, opponent_ms) {
        (Some(local), Some(opponent)) => Some((local - opponent) as f64 / 1000.0),
        _ => None,
    }
}
