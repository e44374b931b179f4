//! Battle Protocol Messages
//!
//! Wire format for the two-player battle mode, carried over a pub/sub
//! relay as JSON. Delivery is best-effort: duplicates and reordering
//! are possible and the receiving side must tolerate both.

use serde::{Deserialize, Serialize};

use crate::typing::GameReport;

/// Relay event name for handshake/sync payloads.
pub const GAME_DATA_EVENT: &str = "game-data";

/// Relay event name announcing a player entering a room.
pub const PLAYER_JOINED_EVENT: &str = "player-joined";

/// Rendezvous channel topic for a given connection id.
pub fn room_topic(client_id: &str) -> String {
    format!("turbo-typer-room:{client_id}")
}

/// Snapshot of one player's public race state.
///
/// The local copy of the *opponent's* info is smoothed on receipt and
/// is never authoritative for the local player's own state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Transport-assigned connection id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Trailing-average WPM.
    pub wpm: u32,
    /// Completion percentage, 0..=100.
    pub progress: f32,
    /// Current car speed.
    pub speed: f32,
    /// Whether the shield is up.
    pub has_shield: bool,
    /// Whether this player has completed the race.
    #[serde(default)]
    pub is_finished: bool,
}

impl PlayerInfo {
    /// A just-connected peer with zeroed race state.
    pub fn joining(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            wpm: 0,
            progress: 0.0,
            speed: 0.0,
            has_shield: false,
            is_finished: false,
        }
    }
}

/// Messages exchanged over the shared room channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleMessage {
    /// Challenger proposes a battle over the given text.
    Challenge {
        /// The challenger's identity.
        from: PlayerInfo,
        /// The race text both sides will type.
        text: String,
    },

    /// Acceptor agrees; echoes the text so both sides race the same
    /// string (the acceptor never generates its own).
    Accept {
        /// The agreed race text.
        text: String,
    },

    /// Periodic live-sync snapshot, throttled sender-side.
    Update {
        /// Sender's current public state.
        player: PlayerInfo,
        /// Sender wall-clock milliseconds.
        timestamp: i64,
    },

    /// Sender finished the race. Exactly one of these is authoritative
    /// per battle; later ones lose to the ended latch.
    Finished {
        /// Sender's final public state.
        player: PlayerInfo,
        /// Sender's final report.
        report: GameReport,
        /// Sender wall-clock milliseconds at completion.
        finish_time: i64,
    },
}

impl BattleMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Outcome of a battle from the local player's point of view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleResult {
    /// Whoever's finish was accepted first.
    pub winner: PlayerInfo,
    /// The other player.
    pub loser: PlayerInfo,
    /// The local player's own report (final or interim at verdict time).
    pub my_report: GameReport,
    /// Whether the local player won.
    pub i_won: bool,
    /// Signed seconds between the two finish times
    /// (`local - opponent`); positive means the local player finished
    /// after the opponent's recorded finish. Never clamped.
    pub time_diff: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::build_report;

    #[test]
    fn test_room_topic_format() {
        assert_eq!(room_topic("abc123"), "turbo-typer-room:abc123");
    }

    #[test]
    fn test_challenge_roundtrip() {
        let msg = BattleMessage::Challenge {
            from: PlayerInfo::joining("peer-1", "Ada"),
            text: "go now".to_string(),
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"challenge\""));

        match BattleMessage::from_json(&json).unwrap() {
            BattleMessage::Challenge { from, text } => {
                assert_eq!(from.name, "Ada");
                assert_eq!(text, "go now");
            }
            other => panic!("wrong message type: {other:?}"),
        }
    }

    #[test]
    fn test_update_roundtrip() {
        let mut player = PlayerInfo::joining("peer-2", "Grace");
        player.progress = 42.5;
        player.wpm = 77;

        let msg = BattleMessage::Update {
            player,
            timestamp: 1_700_000_000_000,
        };
        let parsed = BattleMessage::from_json(&msg.to_json().unwrap()).unwrap();
        match parsed {
            BattleMessage::Update { player, timestamp } => {
                assert_eq!(player.progress, 42.5);
                assert_eq!(timestamp, 1_700_000_000_000);
            }
            other => panic!("wrong message type: {other:?}"),
        }
    }

    #[test]
    fn test_finished_carries_report() {
        let report = build_report(100, 2, 30.0, &[]);
        let msg = BattleMessage::Finished {
            player: PlayerInfo::joining("peer-3", "Linus"),
            report,
            finish_time: 123_456,
        };
        let parsed = BattleMessage::from_json(&msg.to_json().unwrap()).unwrap();
        match parsed {
            BattleMessage::Finished { report, .. } => {
                assert_eq!(report.errors, 2);
            }
            other => panic!("wrong message type: {other:?}"),
        }
    }

    #[test]
    fn test_is_finished_defaults_false() {
        // Older clients omit the flag.
        let json = r#"{"id":"x","name":"n","wpm":0,"progress":0.0,"speed":0.0,"has_shield":false}"#;
        let info: PlayerInfo = serde_json::from_str(json).unwrap();
        assert!(!info.is_finished);
    }
}
