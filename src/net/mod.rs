//! Networking: wire protocol, pub/sub relay transport, and the battle
//! session state machine.
//!
//! Everything here rides on top of the [`Transport`] trait so the
//! battle logic is testable against the in-process [`LocalRelay`]
//! while a hosted pub/sub relay slots in behind the same seam.

pub mod battle;
pub mod protocol;
pub mod relay;

pub use battle::{
    BattleConfig, BattleEvent, BattleSession, ConnectionStatus, LocalSnapshot,
};
pub use protocol::{
    room_topic, BattleMessage, BattleResult, PlayerInfo, GAME_DATA_EVENT, PLAYER_JOINED_EVENT,
};
pub use relay::{
    Envelope, LocalRelay, PresenceMember, RelayConnection, RelayDelivery, Transport,
    TransportError,
};

/// Environment variable holding the relay API key.
pub const RELAY_KEY_ENV: &str = "TURBO_TYPER_RELAY_KEY";

/// Relay credentials resolved from the environment.
///
/// A missing key is not an error: the game runs solo with battle mode
/// reported as offline.
#[derive(Clone, Debug, Default)]
pub struct TransportConfig {
    /// Relay API key, if configured.
    pub api_key: Option<String>,
}

impl TransportConfig {
    /// Read relay credentials from `TURBO_TYPER_RELAY_KEY`.
    pub fn from_env() -> Self {
        let api_key = std::env::var(RELAY_KEY_ENV).ok().filter(|k| !k.is_empty());
        Self { api_key }
    }

    /// Whether battle mode can come online at all.
    pub fn battle_available(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_disables_battle() {
        let config = TransportConfig { api_key: None };
        assert!(!config.battle_available());
    }

    #[test]
    fn test_present_key_enables_battle() {
        let config = TransportConfig {
            api_key: Some("key".into()),
        };
        assert!(config.battle_available());
    }
}
