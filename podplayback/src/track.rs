//! Playable track records

use podfeed::Episode;
use serde::{Deserialize, Serialize};

/// One playable item, normalized from a feed episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub url: String,
    /// Parsed duration in seconds, 0 when the feed gave none or garbage
    pub duration_seconds: u64,
}

impl Track {
    pub fn new(title: impl Into<String>, url: impl Into<String>, duration_seconds: u64) -> Self {
        Track {
            title: title.into(),
            url: url.into(),
            duration_seconds,
        }
    }

    /// Duration as "HH:MM:SS", or "MM:SS" under an hour
    pub fn duration_formatted(&self) -> String {
        let total = self.duration_seconds;
        if total >= 3600 {
            format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
        } else {
            format!("{:02}:{:02}", total / 60, total % 60)
        }
    }
}

impl From<&Episode> for Track {
    fn from(episode: &Episode) -> Self {
        Track {
            title: episode.title.clone(),
            url: episode.audio_url.clone(),
            duration_seconds: episode
                .duration
                .as_deref()
                .map(parse_duration_seconds)
                .unwrap_or(0),
        }
    }
}

/// Parse a feed duration string into seconds
///
/// Feeds publish "HH:MM:SS", "MM:SS", or a bare seconds count, with no
/// consistency between shows. Anything unrecognizable parses as 0 rather
/// than failing the track.
pub fn parse_duration_seconds(raw: &str) -> u64 {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    let numbers: Option<Vec<u64>> = parts.iter().map(|p| p.trim().parse::<u64>().ok()).collect();

    match numbers.as_deref() {
        Some([h, m, s]) => h * 3600 + m * 60 + s,
        Some([m, s]) => m * 60 + s,
        Some([s]) => *s,
        _ => 0,
    }
}
