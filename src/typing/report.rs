//! Race Statistics and Final Reports
//!
//! Derived typing metrics: the per-tick `RaceStats` readout and the
//! once-per-race `GameReport` with its letter rank.

use serde::{Deserialize, Serialize};

/// Characters per "word" for WPM purposes (standard typing convention).
pub const CHARS_PER_WORD: f64 = 5.0;

/// Minimum race duration in seconds used for report math.
///
/// Guards against division blow-up when a race finishes near-instantly
/// (automated or adversarial input).
pub const MIN_DURATION_SECS: f64 = 0.1;

/// Number of scores kept in the high-score history.
pub const HISTORY_SIZE: usize = 5;

/// Letter rank awarded for a finished race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rank {
    /// 80+ net WPM at 98%+ accuracy.
    S,
    /// 60+ net WPM at 95%+ accuracy.
    A,
    /// 40+ net WPM at 90%+ accuracy.
    B,
    /// Everything that isn't S/A/B/D.
    C,
    /// Under 20 net WPM.
    D,
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Rank::S => "S",
            Rank::A => "A",
            Rank::B => "B",
            Rank::C => "C",
            Rank::D => "D",
        };
        f.write_str(s)
    }
}

/// Assign a rank from final net WPM and accuracy.
///
/// Thresholds are evaluated S -> A -> B -> D in that order; the first
/// match wins and everything else is C.
pub fn rank_for(net_wpm: u32, accuracy: u32) -> Rank {
    if net_wpm >= 80 && accuracy >= 98 {
        Rank::S
    } else if net_wpm >= 60 && accuracy >= 95 {
        Rank::A
    } else if net_wpm >= 40 && accuracy >= 90 {
        Rank::B
    } else if net_wpm < 20 {
        Rank::D
    } else {
        Rank::C
    }
}

/// Live typing statistics, recomputed every orchestration tick.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RaceStats {
    /// Trailing-average WPM since the first keystroke.
    pub wpm: u32,
    /// Accuracy percentage over the full target text, clamped to 0..=100.
    pub accuracy: u32,
    /// Mistyped-keystroke counter. Never decreases within a race.
    pub errors: u32,
    /// Completion percentage, 0..=100.
    pub progress: u32,
    /// Characters of the target still untyped.
    pub remaining_chars: u32,
}

impl Default for RaceStats {
    fn default() -> Self {
        Self {
            wpm: 0,
            accuracy: 100,
            errors: 0,
            progress: 0,
            remaining_chars: 0,
        }
    }
}

/// Accuracy over the whole target: `(target_len - errors) / target_len`.
///
/// Clamped at zero; an error count beyond the target length cannot go
/// negative.
pub fn accuracy_percent(target_len: usize, errors: u32) -> u32 {
    if target_len == 0 {
        return 100;
    }
    let correct = (target_len as f64 - f64::from(errors)).max(0.0);
    (correct / target_len as f64 * 100.0).round() as u32
}

/// Final performance report, built exactly once when a race completes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameReport {
    /// Gross WPM minus the error penalty, floored at zero.
    pub net_wpm: u32,
    /// Final accuracy percentage.
    pub accuracy: u32,
    /// Race duration in seconds (one decimal, floored at 0.1).
    pub time_seconds: f64,
    /// Total mistyped keystrokes.
    pub errors: u32,
    /// Letter rank for this run.
    pub rank: Rank,
    /// Whether this run beat the previous best net WPM.
    pub is_new_record: bool,
    /// Best net WPM including this run.
    pub high_score: u32,
    /// Top scores (descending) including this run, at most [`HISTORY_SIZE`].
    pub history: Vec<u32>,
}

/// Build the final report for a completed (or interim) race.
///
/// `high_scores` is the persisted top list *before* this run; the report
/// carries the merged history but does not write it anywhere.
pub fn build_report(
    target_len: usize,
    errors: u32,
    duration_secs: f64,
    high_scores: &[u32],
) -> GameReport {
    let duration_secs = duration_secs.max(MIN_DURATION_SECS);
    let duration_mins = duration_secs / 60.0;

    let gross_wpm = ((target_len as f64 / CHARS_PER_WORD) / duration_mins).round() as u32;
    let error_penalty = (f64::from(errors) / duration_mins).round() as u32;
    let net_wpm = gross_wpm.saturating_sub(error_penalty);

    let accuracy = accuracy_percent(target_len, errors);

    let previous_best = high_scores.first().copied().unwrap_or(0);
    let is_new_record = net_wpm > previous_best;

    let mut history: Vec<u32> = high_scores.to_vec();
    history.push(net_wpm);
    history.sort_unstable_by(|a, b| b.cmp(a));
    history.truncate(HISTORY_SIZE);

    GameReport {
        net_wpm,
        accuracy,
        time_seconds: (duration_secs * 10.0).round() / 10.0,
        errors,
        rank: rank_for(net_wpm, accuracy),
        is_new_record,
        high_score: history[0],
        history,
    }
}
