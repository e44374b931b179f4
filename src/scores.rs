//! High-Score Persistence
//!
//! A top-5 list of net WPM scores, descending, stored as a small JSON
//! file. The simulation core only consumes this to compute
//! `is_new_record` and to populate report history; everything else is
//! presentation.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::typing::HISTORY_SIZE;

/// Failures loading or saving the score file.
#[derive(Debug, thiserror::Error)]
pub enum ScoreStoreError {
    /// Filesystem error.
    #[error("score file I/O: {0}")]
    Io(#[from] io::Error),
    /// The file exists but is not a valid score list.
    #[error("score file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Top net-WPM scores, best first.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HighScores {
    scores: Vec<u32>,
}

impl HighScores {
    /// An empty score list.
    pub fn new() -> Self {
        Self::default()
    }

    /// The scores, best first.
    pub fn list(&self) -> &[u32] {
        &self.scores
    }

    /// The current best, if any race has been recorded.
    pub fn best(&self) -> Option<u32> {
        self.scores.first().copied()
    }

    /// Record a finished race; keeps the list sorted and truncated.
    ///
    /// Returns whether the score beat the previous best.
    pub fn record(&mut self, net_wpm: u32) -> bool {
        let is_record = net_wpm > self.best().unwrap_or(0);
        self.scores.push(net_wpm);
        self.scores.sort_unstable_by(|a, b| b.cmp(a));
        self.scores.truncate(HISTORY_SIZE);
        is_record
    }

    /// Load scores from `path`. A missing file is an empty list.
    pub fn load(path: &Path) -> Result<Self, ScoreStoreError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let scores: Vec<u32> = serde_json::from_str(&contents)?;
                Ok(Self { scores })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save scores to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ScoreStoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(&self.scores)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_top_five_descending() {
        let mut scores = HighScores::new();
        for wpm in [40, 80, 20, 60, 100, 50, 90] {
            scores.record(wpm);
        }
        assert_eq!(scores.list(), &[100, 90, 80, 60, 50]);
    }

    #[test]
    fn test_record_flags_new_best_only() {
        let mut scores = HighScores::new();
        assert!(scores.record(50));
        assert!(!scores.record(50));
        assert!(!scores.record(30));
        assert!(scores.record(51));
    }

    #[test]
    fn test_missing_file_is_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let scores = HighScores::load(&dir.path().join("none.json")).unwrap();
        assert!(scores.list().is_empty());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores/highscores.json");

        let mut scores = HighScores::new();
        scores.record(72);
        scores.record(65);
        scores.save(&path).unwrap();

        let loaded = HighScores::load(&path).unwrap();
        assert_eq!(loaded.list(), &[72, 65]);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("highscores.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            HighScores::load(&path),
            Err(ScoreStoreError::Corrupt(_))
        ));
    }
}
