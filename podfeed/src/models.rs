//! Data model for parsed feeds
//!
//! An [`Episode`] is immutable once parsed; the raw `published` and
//! `duration` strings are kept exactly as the feed supplied them, with no
//! guarantee that they parse as dates or durations.

use serde::{Deserialize, Serialize};

/// One playable episode extracted from a feed item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Episode title
    pub title: String,

    /// Publication date, raw feed-supplied string
    #[serde(default)]
    pub published: String,

    /// Episode summary or description
    #[serde(default)]
    pub summary: String,

    /// Audio enclosure URL (always present; items without one are dropped)
    pub audio_url: String,

    /// Raw duration string, e.g. "01:02:03" or "3723"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// A fetched podcast: channel metadata plus its playable episodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Podcast {
    /// Channel title
    pub title: String,

    /// The feed URL this podcast was fetched from
    pub feed_url: String,

    /// Channel description
    #[serde(default)]
    pub description: String,

    /// Episodes in feed order (most feeds list newest first)
    pub episodes: Vec<Episode>,
}

impl Podcast {
    /// Number of playable episodes
    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    /// First episode in feed order, if any
    pub fn latest_episode(&self) -> Option<&Episode> {
        self.episodes.first()
    }
}
