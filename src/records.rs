//! Best-time records per difficulty
//!
//! Persisted through the key-value store; keeps the best time, play counts
//! and the most recent completions for each difficulty label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::persistence::{KeyValueStore, load_json, save_json};
use crate::settings::Difficulty;

/// Recent completions kept per difficulty
pub const MAX_RECENT_TIMES: usize = 10;

/// A single completion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub elapsed_ms: f64,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

/// Stats for one difficulty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DifficultyRecord {
    pub best_ms: Option<f64>,
    pub games_started: u32,
    pub games_completed: u32,
    /// Newest first
    #[serde(default)]
    pub recent: Vec<TimeEntry>,
}

/// Best times keyed by difficulty label
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BestTimes {
    pub records: BTreeMap<String, DifficultyRecord>,
}

impl BestTimes {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "maze_best_times";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, difficulty: Difficulty) -> Option<&DifficultyRecord> {
        self.records.get(difficulty.as_str())
    }

    fn entry(&mut self, difficulty: Difficulty) -> &mut DifficultyRecord {
        self.records
            .entry(difficulty.as_str().to_string())
            .or_default()
    }

    /// Best time for a difficulty
    pub fn best(&self, difficulty: Difficulty) -> Option<f64> {
        self.record(difficulty).and_then(|r| r.best_ms)
    }

    /// Count a started game
    pub fn record_start(&mut self, difficulty: Difficulty) {
        self.entry(difficulty).games_started += 1;
    }

    /// Record a completion; returns true for a new best
    pub fn record_completion(
        &mut self,
        difficulty: Difficulty,
        elapsed_ms: f64,
        timestamp: f64,
    ) -> bool {
        if !elapsed_ms.is_finite() || elapsed_ms < 0.0 {
            log::warn!("Ignoring invalid completion time {}", elapsed_ms);
            return false;
        }

        let record = self.entry(difficulty);
        record.games_completed += 1;
        record.recent.insert(0, TimeEntry { elapsed_ms, timestamp });
        record.recent.truncate(MAX_RECENT_TIMES);

        let is_best = record.best_ms.is_none_or(|best| elapsed_ms < best);
        if is_best {
            record.best_ms = Some(elapsed_ms);
            log::info!(
                "New best on {}: {}",
                difficulty.as_str(),
                format_time(elapsed_ms)
            );
        }
        is_best
    }

    /// Check if the records are empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn load(store: &dyn KeyValueStore) -> Self {
        match load_json::<BestTimes>(store, Self::STORAGE_KEY) {
            Some(times) => {
                log::info!("Loaded best times for {} difficulties", times.records.len());
                times
            }
            None => {
                log::info!("No best times found, starting fresh");
                Self::new()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        save_json(store, Self::STORAGE_KEY, self)?;
        log::info!("Best times saved");
        Ok(())
    }
}

/// Format milliseconds as `m:ss.cc`
pub fn format_time(elapsed_ms: f64) -> String {
    let total_cs = (elapsed_ms.max(0.0) / 10.0).floor() as u64;
    let minutes = total_cs / 6000;
    let seconds = (total_cs / 100) % 60;
    let centis = total_cs % 100;
    format!("{}:{:02}.{:02}", minutes, seconds, centis)
}
