//! Typing Metrics Engine
//!
//! Converts raw input-buffer deltas into timing and accuracy statistics.
//! The engine only ever looks at the newest character of the buffer:
//! input is assumed append-only except for backspace, which shrinks the
//! buffer and is accepted without re-validating earlier characters.
//!
//! All methods take an explicit `now` so callers (and tests) control the
//! clock; the engine never reads system time itself.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::typing::report::{
    accuracy_percent, build_report, GameReport, RaceStats, CHARS_PER_WORD,
};

/// Rolling window for instantaneous WPM.
pub const WPM_WINDOW: Duration = Duration::from_millis(1200);

/// Outcome of feeding one input-buffer change to the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputOutcome {
    /// This change was the first keystroke of the race.
    pub started: bool,
    /// The appended character did not match the target.
    pub mistake: bool,
    /// The buffer now covers the whole target; the race is complete.
    pub finished: bool,
}

/// Errors rejected at race setup. The engine itself cannot fail once built.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RaceSetupError {
    /// An empty target text would make every metric degenerate.
    #[error("target text is empty")]
    EmptyTarget,
}

/// Tracks keystrokes against a target string and derives WPM/accuracy.
#[derive(Clone, Debug)]
pub struct TypingEngine {
    target: Vec<char>,
    input_len: usize,
    errors: u32,
    started_at: Option<Instant>,
    last_correct_at: Option<Instant>,
    /// Timestamps of recent *correct* keystrokes, oldest first.
    key_history: VecDeque<Instant>,
    finished: bool,
}

impl TypingEngine {
    /// Create an engine for one race over `target`.
    pub fn new(target: &str) -> Result<Self, RaceSetupError> {
        if target.is_empty() {
            return Err(RaceSetupError::EmptyTarget);
        }
        Ok(Self {
            target: target.chars().collect(),
            input_len: 0,
            errors: 0,
            started_at: None,
            last_correct_at: None,
            key_history: VecDeque::new(),
            finished: false,
        })
    }

    /// Length of the target text in characters.
    pub fn target_len(&self) -> usize {
        self.target.len()
    }

    /// Current input-buffer length in characters.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Mistyped keystrokes so far. Monotonic within a race.
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// Whether the race has completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Timestamp of the most recent correct keystroke, if any.
    pub fn last_correct_at(&self) -> Option<Instant> {
        self.last_correct_at
    }

    /// Whether the first keystroke has landed.
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Feed the full input buffer after a change.
    ///
    /// Only the newest character is validated. A shrinking buffer is a
    /// backspace and is accepted as-is. Completion fires exactly when the
    /// buffer length reaches the target length; this is the sole
    /// race-completion trigger.
    pub fn submit_input(&mut self, new_input: &str, now: Instant) -> InputOutcome {
        let mut outcome = InputOutcome::default();
        if self.finished {
            return outcome;
        }

        if self.started_at.is_none() {
            self.started_at = Some(now);
            outcome.started = true;
        }

        let new_len = new_input.chars().count();

        // Backspace (strictly shrinking): accept without re-validation.
        // An equal-length change is a replacement and revalidates the
        // newest character.
        if new_len < self.input_len {
            self.input_len = new_len;
            return outcome;
        }

        let typed = match new_input.chars().last() {
            Some(c) => c,
            None => return outcome,
        };
        let expected = self.target.get(new_len - 1);

        if expected == Some(&typed) {
            self.key_history.push_back(now);
            self.last_correct_at = Some(now);
        } else {
            self.errors += 1;
            outcome.mistake = true;
        }

        self.input_len = new_len;

        if self.input_len == self.target.len() {
            self.finished = true;
            outcome.finished = true;
        }

        outcome
    }

    /// WPM over the trailing [`WPM_WINDOW`], pruning stale entries.
    ///
    /// Returns 0 when the race is not active.
    pub fn instantaneous_wpm(&mut self, now: Instant) -> u32 {
        if self.started_at.is_none() || self.finished {
            return 0;
        }

        while let Some(&oldest) = self.key_history.front() {
            if now.duration_since(oldest) >= WPM_WINDOW {
                self.key_history.pop_front();
            } else {
                break;
            }
        }

        let window_secs = WPM_WINDOW.as_secs_f64();
        let keystrokes = self.key_history.len() as f64;
        ((keystrokes / CHARS_PER_WORD) * (60.0 / window_secs)).round() as u32
    }

    /// Running average stats since the first keystroke.
    pub fn trailing_stats(&self, now: Instant) -> RaceStats {
        let wpm = match self.started_at {
            Some(start) => {
                let mins = now.duration_since(start).as_secs_f64() / 60.0;
                if mins > 0.0 {
                    ((self.input_len as f64 / CHARS_PER_WORD) / mins).round() as u32
                } else {
                    0
                }
            }
            None => 0,
        };

        let target_len = self.target.len();
        RaceStats {
            wpm,
            accuracy: accuracy_percent(target_len, self.errors),
            errors: self.errors,
            progress: (self.input_len as f64 / target_len as f64 * 100.0).round() as u32,
            remaining_chars: (target_len - self.input_len.min(target_len)) as u32,
        }
    }

    /// Build the final [`GameReport`] against the given high-score list.
    ///
    /// Valid at any time; authoritative once [`Self::is_finished`] is
    /// true. Duration runs from the first keystroke, floored at 0.1s.
    pub fn finish_report(&self, now: Instant, high_scores: &[u32]) -> GameReport {
        let duration = self
            .started_at
            .map(|start| now.duration_since(start).as_secs_f64())
            .unwrap_or(0.0);
        build_report(self.target.len(), self.errors, duration, high_scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::report::Rank;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_rejects_empty_target() {
        assert_eq!(TypingEngine::new("").unwrap_err(), RaceSetupError::EmptyTarget);
    }

    #[test]
    fn test_correct_chars_advance_without_errors() {
        let base = Instant::now();
        let mut engine = TypingEngine::new("cat").unwrap();

        assert!(engine.submit_input("c", at(base, 0)).started);
        assert!(!engine.submit_input("ca", at(base, 300)).mistake);
        let outcome = engine.submit_input("cat", at(base, 600));
        assert!(outcome.finished);
        assert_eq!(engine.errors(), 0);
    }

    #[test]
    fn test_mismatch_counts_error_not_timestamp() {
        let base = Instant::now();
        let mut engine = TypingEngine::new("cat").unwrap();

        engine.submit_input("c", at(base, 0));
        let outcome = engine.submit_input("cx", at(base, 100));
        assert!(outcome.mistake);
        assert_eq!(engine.errors(), 1);

        // Only the correct keystroke is in the window.
        assert_eq!(engine.instantaneous_wpm(at(base, 200)), 10);
    }

    #[test]
    fn test_backspace_accepted_errors_monotonic() {
        let base = Instant::now();
        let mut engine = TypingEngine::new("cat").unwrap();

        engine.submit_input("c", at(base, 0));
        engine.submit_input("cx", at(base, 100));
        assert_eq!(engine.errors(), 1);

        let outcome = engine.submit_input("c", at(base, 200));
        assert!(!outcome.mistake);
        assert_eq!(engine.errors(), 1);
        assert_eq!(engine.input_len(), 1);

        engine.submit_input("ca", at(base, 300));
        assert_eq!(engine.errors(), 1);
    }

    #[test]
    fn test_equal_length_change_revalidates_last_char() {
        let base = Instant::now();
        let mut engine = TypingEngine::new("cat").unwrap();

        engine.submit_input("c", at(base, 0));
        assert_eq!(engine.errors(), 0);

        // Replacing the last character in place is not a backspace;
        // the new character is validated.
        let outcome = engine.submit_input("x", at(base, 100));
        assert!(outcome.mistake);
        assert_eq!(engine.errors(), 1);
        assert_eq!(engine.input_len(), 1);

        let outcome = engine.submit_input("c", at(base, 200));
        assert!(!outcome.mistake);
        assert_eq!(engine.errors(), 1);
    }

    #[test]
    fn test_progress_monotonic_while_typing_forward() {
        let base = Instant::now();
        let mut engine = TypingEngine::new("abcdefghij").unwrap();

        let mut last_progress = 0;
        let mut input = String::new();
        for (i, c) in "abcdefghij".chars().enumerate() {
            input.push(c);
            engine.submit_input(&input, at(base, i as u64 * 100));
            let stats = engine.trailing_stats(at(base, i as u64 * 100));
            assert!(stats.progress >= last_progress);
            last_progress = stats.progress;
        }
        assert_eq!(last_progress, 100);
    }

    #[test]
    fn test_instantaneous_wpm_window_pruning() {
        let base = Instant::now();
        let mut engine = TypingEngine::new("abcdef").unwrap();

        engine.submit_input("a", at(base, 0));
        engine.submit_input("ab", at(base, 100));
        engine.submit_input("abc", at(base, 200));

        // Three keystrokes inside the window: (3/5) * 50 = 30 WPM.
        assert_eq!(engine.instantaneous_wpm(at(base, 300)), 30);

        // 1.25s in: the first keystroke has aged out, two remain.
        assert_eq!(engine.instantaneous_wpm(at(base, 1250)), 20);

        // At 1300ms the 100ms keystroke is exactly window-aged and is
        // pruned as well, leaving one.
        assert_eq!(engine.instantaneous_wpm(at(base, 1300)), 10);

        // Long pause empties the window entirely.
        assert_eq!(engine.instantaneous_wpm(at(base, 5000)), 0);
    }

    #[test]
    fn test_wpm_zero_before_start_and_after_finish() {
        let base = Instant::now();
        let mut engine = TypingEngine::new("ab").unwrap();
        assert_eq!(engine.instantaneous_wpm(base), 0);

        engine.submit_input("a", at(base, 0));
        engine.submit_input("ab", at(base, 100));
        assert!(engine.is_finished());
        assert_eq!(engine.instantaneous_wpm(at(base, 200)), 0);
    }

    #[test]
    fn test_input_ignored_after_finish() {
        let base = Instant::now();
        let mut engine = TypingEngine::new("ab").unwrap();
        engine.submit_input("a", at(base, 0));
        engine.submit_input("ab", at(base, 100));

        let outcome = engine.submit_input("abc", at(base, 200));
        assert_eq!(outcome, InputOutcome::default());
        assert_eq!(engine.input_len(), 2);
    }

    #[test]
    fn test_clean_race_report() {
        // "cat" typed correctly with 300ms between keystrokes.
        let base = Instant::now();
        let mut engine = TypingEngine::new("cat").unwrap();

        engine.submit_input("c", at(base, 0));
        engine.submit_input("ca", at(base, 300));
        let outcome = engine.submit_input("cat", at(base, 600));
        assert!(outcome.finished);

        let report = engine.finish_report(at(base, 600), &[]);
        assert_eq!(report.errors, 0);
        assert_eq!(report.accuracy, 100);
        assert!(report.net_wpm > 0);
        // 0.6s for 0.6 words = 60 WPM -> A at 100% accuracy.
        assert_eq!(report.net_wpm, 60);
        assert_eq!(report.rank, Rank::A);
    }

    #[test]
    fn test_stats_before_first_keystroke() {
        let engine = TypingEngine::new("hello").unwrap();
        let stats = engine.trailing_stats(Instant::now());
        assert_eq!(stats.wpm, 0);
        assert_eq!(stats.accuracy, 100);
        assert_eq!(stats.progress, 0);
        assert_eq!(stats.remaining_chars, 5);
    }
}
