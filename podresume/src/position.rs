//! Saved playback position records

use crate::store::ResumeConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One saved playback position, keyed by episode URL in the store
///
/// Field names match the on-disk JSON document exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub episode_url: String,
    pub episode_title: String,
    pub position_seconds: f64,
    pub duration_seconds: f64,
    /// RFC 3339 timestamp; foreign data may not parse, which disables resume
    pub last_played: String,
    pub play_count: u32,
    /// Derived position/duration, clamped to [0, 1]
    pub completion_percentage: f64,
}

impl PlaybackPosition {
    /// Whether the episode counts as finished under the given threshold
    pub fn is_completed(&self, completion_threshold: f64) -> bool {
        self.completion_percentage >= completion_threshold
    }

    /// Resume eligibility against the store policy, evaluated at `now`
    ///
    /// Requires enough progress, not-yet-completed, and a parseable,
    /// recent-enough `last_played`. An unparsable timestamp means "do not
    /// resume" rather than "resume anyway".
    pub fn should_resume_at(&self, now: DateTime<Utc>, config: &ResumeConfig) -> bool {
        if self.position_seconds < config.min_resume_position {
            return false;
        }

        if self.is_completed(config.completion_threshold) {
            return false;
        }

        match self.parsed_last_played() {
            Some(last_played) => {
                now.signed_duration_since(last_played)
                    <= chrono::Duration::days(config.max_resume_age_days)
            }
            None => false,
        }
    }

    /// Resume eligibility evaluated now
    pub fn should_resume(&self, config: &ResumeConfig) -> bool {
        self.should_resume_at(Utc::now(), config)
    }

    /// Saved position as "MM:SS" for display
    pub fn resume_time_formatted(&self) -> String {
        let total = self.position_seconds.max(0.0) as u64;
        format!("{:02}:{:02}", total / 60, total % 60)
    }

    pub(crate) fn parsed_last_played(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.last_played)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(pos: f64, ratio: f64, last_played: &str) -> PlaybackPosition {
        PlaybackPosition {
            episode_url: "https://x/1.mp3".into(),
            episode_title: "Ep1".into(),
            position_seconds: pos,
            duration_seconds: 1800.0,
            last_played: last_played.into(),
            play_count: 1,
            completion_percentage: ratio,
        }
    }

    #[test]
    fn test_completed_episodes_never_resume() {
        let config = ResumeConfig::default();
        let now = Utc::now();
        let p = position(900.0, 0.95, &now.to_rfc3339());
        assert!(!p.should_resume_at(now, &config));

        let p = position(900.0, 0.94, &now.to_rfc3339());
        assert!(p.should_resume_at(now, &config));
    }

    #[test]
    fn test_short_progress_never_resumes() {
        let config = ResumeConfig::default();
        let now = Utc::now();
        let p = position(29.0, 0.02, &now.to_rfc3339());
        assert!(!p.should_resume_at(now, &config));
    }

    #[test]
    fn test_stale_positions_never_resume() {
        let config = ResumeConfig::default();
        let now = Utc::now();
        let old = now - chrono::Duration::days(31);
        let p = position(450.0, 0.25, &old.to_rfc3339());
        assert!(!p.should_resume_at(now, &config));
    }

    #[test]
    fn test_unparsable_timestamp_fails_safe() {
        let config = ResumeConfig::default();
        let p = position(450.0, 0.25, "sometime last week");
        assert!(!p.should_resume_at(Utc::now(), &config));
    }

    #[test]
    fn test_resume_time_formatted() {
        let now = Utc::now().to_rfc3339();
        assert_eq!(position(450.0, 0.25, &now).resume_time_formatted(), "07:30");
        assert_eq!(position(-3.0, 0.0, &now).resume_time_formatted(), "00:00");
    }
}
