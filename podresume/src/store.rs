//! Durable map from episode URL to playback position
//!
//! The whole store is one flat JSON object on disk, written via a temporary
//! file in the same directory followed by an atomic rename, so no reader
//! ever observes a half-written document. Disk writes are rate-limited;
//! completion and removal force an immediate write.
//!
//! Persistence failures are logged and the store keeps working in memory;
//! they are never surfaced to the caller.

use crate::error::Result;
use crate::position::PlaybackPosition;
use chrono::Utc;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Policy knobs for the resume store
#[derive(Debug, Clone)]
pub struct ResumeConfig {
    /// Minimum interval between unforced disk writes
    pub save_interval: Duration,
    /// Positions below this many seconds are not persisted at all
    pub min_save_progress: f64,
    /// Completion ratio at or above which an episode counts as finished
    pub completion_threshold: f64,
    /// Entry cap; least-recently-played entries are evicted beyond it
    pub max_positions: usize,
    /// Minimum saved position for resume to be offered
    pub min_resume_position: f64,
    /// Maximum age of a position for resume to be offered
    pub max_resume_age_days: i64,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            save_interval: Duration::from_secs(30),
            min_save_progress: 5.0,
            completion_threshold: 0.95,
            max_positions: 1000,
            min_resume_position: 30.0,
            max_resume_age_days: 30,
        }
    }
}

/// Aggregate listening statistics over the stored positions
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResumeStatistics {
    pub total_episodes: usize,
    pub completed_episodes: usize,
    pub in_progress_episodes: usize,
    pub total_listening_hours: f64,
    pub total_play_count: u64,
    pub most_played_episode: Option<String>,
    pub most_played_count: u32,
}

struct Inner {
    positions: HashMap<String, PlaybackPosition>,
    last_save: Option<Instant>,
}

/// Persistent playback position store
pub struct ResumeStore {
    path: PathBuf,
    config: ResumeConfig,
    inner: Mutex<Inner>,
}

impl ResumeStore {
    /// Open (or create) a store backed by the given file
    ///
    /// A missing or unreadable file yields an empty store; only failure to
    /// create the parent directory is an error.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_config(path, ResumeConfig::default())
    }

    /// Open a store with custom policy knobs
    pub fn with_config<P: AsRef<Path>>(path: P, config: ResumeConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
                info!("Created resume store directory: {}", parent.display());
            }
        }

        let positions = load_positions(&path);
        info!(
            positions = positions.len(),
            "Resume store opened: {}",
            path.display()
        );

        Ok(Self {
            path,
            config,
            inner: Mutex::new(Inner {
                positions,
                last_save: None,
            }),
        })
    }

    /// The store policy in effect
    pub fn config(&self) -> &ResumeConfig {
        &self.config
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a progress report for an episode
    ///
    /// Ignored below `min_save_progress` so brief previews leave no trace.
    /// Creates the record (play count 1) or updates it in place without
    /// touching the play count. Triggers a rate-limited disk write.
    pub fn update_position(&self, url: &str, title: &str, position: f64, duration: f64) {
        if position < self.config.min_save_progress {
            return;
        }

        let completion = completion_ratio(position, duration);
        let now = Utc::now().to_rfc3339();

        let mut inner = self.lock();
        match inner.positions.get_mut(url) {
            Some(existing) => {
                existing.episode_title = title.to_string();
                existing.position_seconds = position;
                existing.duration_seconds = duration;
                existing.completion_percentage = completion;
                existing.last_played = now;
            }
            None => {
                inner.positions.insert(
                    url.to_string(),
                    PlaybackPosition {
                        episode_url: url.to_string(),
                        episode_title: title.to_string(),
                        position_seconds: position,
                        duration_seconds: duration,
                        last_played: now,
                        play_count: 1,
                        completion_percentage: completion,
                    },
                );
            }
        }

        self.evict_locked(&mut inner);
        self.save_locked(&mut inner, false);
    }

    /// Note that a known episode started playing again (bumps play count)
    pub fn start_episode(&self, url: &str) {
        let mut inner = self.lock();
        if let Some(position) = inner.positions.get_mut(url) {
            position.play_count += 1;
            debug!(
                play_count = position.play_count,
                "Episode restarted: {}", position.episode_title
            );
        }
    }

    /// Force the completion ratio to 1.0 and write through immediately
    pub fn mark_completed(&self, url: &str) {
        let mut inner = self.lock();
        if let Some(position) = inner.positions.get_mut(url) {
            position.completion_percentage = 1.0;
            position.last_played = Utc::now().to_rfc3339();
            info!("Episode completed: {}", position.episode_title);
            self.save_locked(&mut inner, true);
        }
    }

    /// Remove a saved position; returns whether one existed
    pub fn remove_position(&self, url: &str) -> bool {
        let mut inner = self.lock();
        let removed = inner.positions.remove(url).is_some();
        if removed {
            self.save_locked(&mut inner, true);
        }
        removed
    }

    /// Raw lookup, ignoring resume eligibility
    pub fn get_position(&self, url: &str) -> Option<PlaybackPosition> {
        self.lock().positions.get(url).cloned()
    }

    /// The saved position, but only when resume should be offered
    pub fn get_resume_position(&self, url: &str) -> Option<PlaybackPosition> {
        let inner = self.lock();
        inner
            .positions
            .get(url)
            .filter(|p| p.should_resume(&self.config))
            .cloned()
    }

    /// Most recently played positions, newest first
    pub fn recently_played(&self, limit: usize) -> Vec<PlaybackPosition> {
        let mut positions: Vec<_> = self.lock().positions.values().cloned().collect();
        sort_by_recency(&mut positions);
        positions.truncate(limit);
        positions
    }

    /// Unfinished, still-resumable positions, newest first
    pub fn in_progress(&self) -> Vec<PlaybackPosition> {
        let mut positions: Vec<_> = self
            .lock()
            .positions
            .values()
            .filter(|p| {
                !p.is_completed(self.config.completion_threshold) && p.should_resume(&self.config)
            })
            .cloned()
            .collect();
        sort_by_recency(&mut positions);
        positions
    }

    /// Aggregate listening statistics
    pub fn statistics(&self) -> ResumeStatistics {
        let inner = self.lock();
        let positions = &inner.positions;

        let completed = positions
            .values()
            .filter(|p| p.is_completed(self.config.completion_threshold))
            .count();
        let in_progress = positions
            .values()
            .filter(|p| {
                !p.is_completed(self.config.completion_threshold) && p.should_resume(&self.config)
            })
            .count();
        let listening_seconds: f64 = positions.values().map(|p| p.position_seconds).sum();
        let most_played = positions.values().max_by_key(|p| p.play_count);

        ResumeStatistics {
            total_episodes: positions.len(),
            completed_episodes: completed,
            in_progress_episodes: in_progress,
            total_listening_hours: listening_seconds / 3600.0,
            total_play_count: positions.values().map(|p| u64::from(p.play_count)).sum(),
            most_played_episode: most_played.map(|p| p.episode_title.clone()),
            most_played_count: most_played.map(|p| p.play_count).unwrap_or(0),
        }
    }

    /// Number of stored positions
    pub fn len(&self) -> usize {
        self.lock().positions.len()
    }

    /// Whether the store holds no positions
    pub fn is_empty(&self) -> bool {
        self.lock().positions.is_empty()
    }

    /// Write the store to disk now, bypassing the rate limit
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.lock();
        self.write_locked(&mut inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-update; the map itself is
        // still structurally valid, so keep serving it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict_locked(&self, inner: &mut Inner) {
        if inner.positions.len() <= self.config.max_positions {
            return;
        }

        let mut positions: Vec<_> = inner.positions.values().cloned().collect();
        sort_by_recency(&mut positions);
        positions.truncate(self.config.max_positions);

        let removed = inner.positions.len() - positions.len();
        inner.positions = positions
            .into_iter()
            .map(|p| (p.episode_url.clone(), p))
            .collect();

        info!(removed, "Evicted least-recently-played resume positions");
    }

    /// Rate-limited save; persistence failures are logged, never propagated
    fn save_locked(&self, inner: &mut Inner, force: bool) {
        if !force {
            if let Some(last_save) = inner.last_save {
                if last_save.elapsed() < self.config.save_interval {
                    return;
                }
            }
        }

        if let Err(err) = self.write_locked(inner) {
            warn!("Failed to save resume store: {err}");
        }
    }

    /// Write-then-rename so readers never see a partial document
    fn write_locked(&self, inner: &mut Inner) -> Result<()> {
        let json = serde_json::to_string_pretty(&inner.positions)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        inner.last_save = Some(Instant::now());
        debug!(
            positions = inner.positions.len(),
            "Saved resume store to {}",
            self.path.display()
        );
        Ok(())
    }
}

fn completion_ratio(position: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        (position / duration).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Newest first; falls back to lexical timestamp ordering when either side
/// fails to parse, so malformed rows still get a stable total order
fn sort_by_recency(positions: &mut [PlaybackPosition]) {
    positions.sort_by(|a, b| match (a.parsed_last_played(), b.parsed_last_played()) {
        (Some(a_time), Some(b_time)) => b_time.cmp(&a_time),
        _ => b.last_played.cmp(&a.last_played),
    });
}

/// Tolerant load: unreadable file or malformed entries degrade to fewer
/// positions, never to an error
fn load_positions(path: &Path) -> HashMap<String, PlaybackPosition> {
    if !path.exists() {
        return HashMap::new();
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!("Failed to read resume store {}: {err}", path.display());
            return HashMap::new();
        }
    };

    let document: HashMap<String, serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(document) => document,
        Err(err) => {
            warn!("Failed to parse resume store {}: {err}", path.display());
            return HashMap::new();
        }
    };

    let mut positions = HashMap::with_capacity(document.len());
    for (url, value) in document {
        match serde_json::from_value::<PlaybackPosition>(value) {
            Ok(position) => {
                positions.insert(url, position);
            }
            Err(err) => {
                warn!("Skipping malformed resume entry for {url}: {err}");
            }
        }
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_ratio_clamps() {
        assert_eq!(completion_ratio(450.0, 1800.0), 0.25);
        assert_eq!(completion_ratio(2000.0, 1800.0), 1.0);
        assert_eq!(completion_ratio(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_sort_by_recency_with_malformed_timestamps() {
        let make = |url: &str, last_played: &str| PlaybackPosition {
            episode_url: url.into(),
            episode_title: url.into(),
            position_seconds: 100.0,
            duration_seconds: 200.0,
            last_played: last_played.into(),
            play_count: 1,
            completion_percentage: 0.5,
        };

        let mut positions = vec![
            make("a", "zzz-not-a-date"),
            make("b", "2024-05-01T00:00:00+00:00"),
            make("c", "2024-06-01T00:00:00+00:00"),
        ];
        sort_by_recency(&mut positions);

        // The malformed row sorts lexically against the parsed ones and the
        // order stays total and stable
        let urls: Vec<_> = positions.iter().map(|p| p.episode_url.as_str()).collect();
        assert_eq!(urls, ["a", "c", "b"]);
    }
}
