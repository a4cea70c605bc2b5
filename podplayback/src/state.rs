//! Session state snapshots

use serde::Serialize;

/// Playback rates the session will accept, in cycling order
pub const SUPPORTED_RATES: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// Default output volume for a fresh session
pub const DEFAULT_VOLUME: f64 = 0.7;

/// Whether `rate` is one of [`SUPPORTED_RATES`]
pub fn is_supported_rate(rate: f64) -> bool {
    SUPPORTED_RATES.iter().any(|r| (r - rate).abs() < f64::EPSILON)
}

/// A point-in-time snapshot of the session
///
/// `generation` identifies which play/stop request the rest of the fields
/// belong to. A snapshot taken before an operation and compared after it
/// tells the caller whether anything happened in between.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    /// Monotonic request counter, bumped by every play and stop
    pub generation: u64,
    pub is_playing: bool,
    pub is_paused: bool,
    pub is_loading: bool,
    pub position_seconds: u64,
    pub duration_seconds: u64,
    pub volume: f64,
    pub playback_rate: f64,
    pub current_url: Option<String>,
    pub current_title: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState {
            generation: 0,
            is_playing: false,
            is_paused: false,
            is_loading: false,
            position_seconds: 0,
            duration_seconds: 0,
            volume: DEFAULT_VOLUME,
            playback_rate: 1.0,
            current_url: None,
            current_title: None,
        }
    }
}

impl PlaybackState {
    /// Whether a play request is loading or playing under this generation
    pub fn is_active(&self) -> bool {
        self.is_loading || self.is_playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_rates() {
        assert!(is_supported_rate(1.0));
        assert!(is_supported_rate(0.5));
        assert!(is_supported_rate(2.0));
        assert!(!is_supported_rate(1.3));
        assert!(!is_supported_rate(0.0));
    }

    #[test]
    fn test_default_state_is_idle() {
        let state = PlaybackState::default();
        assert!(!state.is_active());
        assert_eq!(state.volume, DEFAULT_VOLUME);
        assert_eq!(state.playback_rate, 1.0);
    }
}
