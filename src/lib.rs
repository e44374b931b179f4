//! # Turbo Typer Core
//!
//! Real-time simulation core for a typing-speed arcade racer: type the
//! target text to accelerate, dodge the obstacles your mistakes spawn,
//! and race a peer over a pub/sub relay.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TURBO TYPER CORE                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  typing/         - Typing-metrics engine                     │
//! │  ├── engine.rs   - Keystroke window, error/finish tracking   │
//! │  └── report.rs   - WPM math, ranks, final reports            │
//! │                                                              │
//! │  game/           - Entity/physics engine                     │
//! │  ├── state.rs    - Race state and render snapshots           │
//! │  ├── entities.rs - Obstacle/power-up spawning                │
//! │  ├── physics.rs  - Scroll advance and speed easing           │
//! │  ├── collision.rs- Interval overlap, crash/collect paths     │
//! │  ├── tick.rs     - One fixed-rate simulation step            │
//! │  └── events.rs   - Simulation event stream                   │
//! │                                                              │
//! │  net/            - Battle mode (best-effort, peer-to-peer)   │
//! │  ├── protocol.rs - Wire messages and rendezvous topics       │
//! │  ├── relay.rs    - Transport seam + in-process relay         │
//! │  └── battle.rs   - Handshake, sync smoothing, finish latch   │
//! │                                                              │
//! │  corpus.rs       - Race text pools by difficulty             │
//! │  scores.rs       - Persistent top-5 high scores              │
//! │  runtime.rs      - 60 Hz orchestration loop                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consensus Model
//!
//! There is no authoritative server. Each client simulates its own
//! race; battle mode exchanges best-effort state updates and settles
//! the verdict with a first-`FINISHED`-wins latch on each side. Once a
//! client latches, no later signal can overturn its verdict.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod corpus;
pub mod game;
pub mod net;
pub mod runtime;
pub mod scores;
pub mod typing;

// Re-export commonly used types
pub use game::{GameEvent, RaceConfig, RacePhase, RaceState, RenderSnapshot};
pub use net::{BattleEvent, BattleSession, ConnectionStatus, LocalRelay, PlayerInfo, Transport};
pub use runtime::{spawn_race_loop, GameCore, LoopHandle, TickOutput, TICK_RATE};
pub use scores::HighScores;
pub use typing::{GameReport, RaceStats, Rank, TypingEngine};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
