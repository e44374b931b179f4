//! Typing metrics: keystroke timing, accuracy, and final reports.
//!
//! This half of the simulation never fails; malformed race setup (an
//! empty target) is rejected when the engine is built, not handled later.

pub mod engine;
pub mod report;

pub use engine::{InputOutcome, RaceSetupError, TypingEngine, WPM_WINDOW};
pub use report::{
    accuracy_percent, build_report, rank_for, GameReport, RaceStats, Rank, HISTORY_SIZE,
};
