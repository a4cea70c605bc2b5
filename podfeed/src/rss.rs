//! Event-based RSS parsing
//!
//! Extracts channel metadata and per-item episode records from an RSS
//! document. Items without an audio enclosure are dropped rather than
//! reported as errors; only a feed with zero playable items is an error.

use crate::error::{Error, Result};
use crate::models::{Episode, Podcast};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

/// Accumulates fields for the item currently being parsed
#[derive(Debug, Default)]
struct ItemDraft {
    title: Option<String>,
    published: Option<String>,
    description: Option<String>,
    itunes_summary: Option<String>,
    audio_url: Option<String>,
    duration: Option<String>,
}

impl ItemDraft {
    /// Finish the item; `None` when no playable audio URL was found
    fn into_episode(self) -> Option<Episode> {
        let audio_url = self.audio_url?;
        let summary = self.description.or(self.itunes_summary).unwrap_or_default();
        Some(Episode {
            title: self
                .title
                .unwrap_or_else(|| "Unknown Episode".to_string())
                .trim()
                .to_string(),
            published: self.published.unwrap_or_default().trim().to_string(),
            summary: summary.trim().to_string(),
            audio_url: audio_url.trim().to_string(),
            duration: self.duration.map(|d| d.trim().to_string()),
        })
    }
}

/// Parse an RSS document into a [`Podcast`]
///
/// Returns [`Error::NoEpisodes`] if no item carried a playable audio URL.
pub fn parse_feed(xml: &str, feed_url: &str) -> Result<Podcast> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();

    let mut channel_title: Option<String> = None;
    let mut channel_description: Option<String> = None;
    let mut episodes: Vec<Episode> = Vec::new();

    let mut in_item = false;
    // <image> carries its own <title>/<description>; keep it out of the channel fields
    let mut in_image = false;
    let mut current_tag: Option<String> = None;
    let mut text = String::new();
    let mut draft = ItemDraft::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "item" | "entry" => {
                        in_item = true;
                        draft = ItemDraft::default();
                        current_tag = None;
                    }
                    "image" => {
                        in_image = true;
                        current_tag = None;
                    }
                    "enclosure" | "media:content" => {
                        if in_item && draft.audio_url.is_none() {
                            draft.audio_url = audio_url_from_attrs(&e);
                        }
                        current_tag = None;
                    }
                    _ => {
                        current_tag = Some(name);
                        text.clear();
                    }
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if in_item
                    && draft.audio_url.is_none()
                    && matches!(name.as_str(), "enclosure" | "media:content")
                {
                    draft.audio_url = audio_url_from_attrs(&e);
                }
            }
            Event::Text(e) => {
                if current_tag.is_some() {
                    let chunk = e
                        .decode()
                        .map_err(|err| Error::parse(err.to_string()))?;
                    text.push_str(&chunk);
                }
            }
            Event::CData(e) => {
                if current_tag.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "item" | "entry" => {
                        if let Some(episode) = std::mem::take(&mut draft).into_episode() {
                            episodes.push(episode);
                        } else {
                            debug!("Dropping feed item without audio enclosure");
                        }
                        in_item = false;
                    }
                    "image" => {
                        in_image = false;
                    }
                    _ => {
                        if current_tag.as_deref() == Some(name.as_str()) {
                            let value = std::mem::take(&mut text);
                            if in_item {
                                assign_item_field(&mut draft, &name, value);
                            } else if !in_image {
                                assign_channel_field(
                                    &mut channel_title,
                                    &mut channel_description,
                                    &name,
                                    value,
                                );
                            }
                        }
                    }
                }
                current_tag = None;
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    if episodes.is_empty() {
        return Err(Error::NoEpisodes);
    }

    debug!(
        episodes = episodes.len(),
        "Parsed feed {}",
        channel_title.as_deref().unwrap_or("<untitled>")
    );

    Ok(Podcast {
        title: channel_title.unwrap_or_else(|| "Unknown Podcast".to_string()),
        feed_url: feed_url.to_string(),
        description: channel_description.unwrap_or_default(),
        episodes,
    })
}

fn assign_item_field(draft: &mut ItemDraft, tag: &str, value: String) {
    match tag {
        "title" => draft.title = Some(value),
        "pubDate" | "published" => draft.published = Some(value),
        "description" => draft.description = Some(value),
        "itunes:summary" => draft.itunes_summary = Some(value),
        "itunes:duration" => draft.duration = Some(value),
        _ => {}
    }
}

fn assign_channel_field(
    title: &mut Option<String>,
    description: &mut Option<String>,
    tag: &str,
    value: String,
) {
    // First occurrence wins; keeps nested oddities from clobbering the channel
    match tag {
        "title" if title.is_none() => *title = Some(value),
        "description" if description.is_none() => *description = Some(value),
        _ => {}
    }
}

/// Extract a playable audio URL from enclosure/media:content attributes
///
/// The MIME type must mention audio; enclosures without a type are dropped.
fn audio_url_from_attrs(e: &BytesStart) -> Option<String> {
    let mut url: Option<String> = None;
    let mut mime: Option<String> = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"url" | b"href" => url = Some(String::from_utf8_lossy(&attr.value).into_owned()),
            b"type" => mime = Some(String::from_utf8_lossy(&attr.value).to_lowercase()),
            _ => {}
        }
    }

    match mime {
        Some(kind) if kind.contains("audio") => url,
        _ => None,
    }
}
