//!
//! src/types.rs  Andrew Belles  Oct 19th, 2026
//!
//! Request scoped records that flow through a conversion
//!

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Spotify,
    Qobuz
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::Qobuz   => "qobuz"
        }
    }

    /// The service a link from `self` gets converted to
    pub fn counterpart(self) -> Platform {
        match self {
            Platform::Spotify => Platform::Qobuz,
            Platform::Qobuz   => Platform::Spotify
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Spotify => f.write_str("Spotify"),
            Platform::Qobuz   => f.write_str("Qobuz")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Track,
    Album,
    Artist,
    Playlist
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Track    => "track",
            ContentType::Album    => "album",
            ContentType::Artist   => "artist",
            ContentType::Playlist => "playlist"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    pub platform: Platform,
    pub content_type: ContentType,
    pub raw_url: String
}

/// Body returned by the oEmbed endpoints. Neither service guarantees a
/// field, unknown keys are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OembedRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub playlist_name: Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Metadata {
    Track {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        artist: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        album: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>
    },
    Album {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        artist: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        release_date: Option<NaiveDate>
    },
    Artist {
        name: String
    },
    Playlist {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner: Option<String>
    }
}

impl Metadata {
    pub fn content_type(&self) -> ContentType {
        match self {
            Metadata::Track { .. }    => ContentType::Track,
            Metadata::Album { .. }    => ContentType::Album,
            Metadata::Artist { .. }   => ContentType::Artist,
            Metadata::Playlist { .. } => ContentType::Playlist
        }
    }

    /// Title for tracks and albums, name for artists and playlists
    pub fn headline(&self) -> &str {
        match self {
            Metadata::Track { title, .. } | Metadata::Album { title, .. } => title,
            Metadata::Artist { name } | Metadata::Playlist { name, .. } => name
        }
    }

    pub fn artist(&self) -> Option<&str> {
        match self {
            Metadata::Track { artist, .. } | Metadata::Album { artist, .. } =>
                artist.as_deref(),
            Metadata::Artist { name } => Some(name),
            Metadata::Playlist { .. } => None
        }
    }
}

/// Release dates come as `YYYY-MM-DD`, `YYYY-MM` or `YYYY` depending on
/// how precisely the service knows them. Partial dates start the period.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    match raw.len() {
        10 => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok(),
        7  => NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok(),
        4  => raw.parse::<i32>().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
        _  => None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub encoded: String
}

/// A concrete item found on the target platform's catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub metadata: Metadata,
    pub link: Option<String>
}

/// 0..=100, constructed through `Confidence::new` which clamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(u8);

impl Confidence {
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Target side lookup. Present only on scored conversions, flattened into
/// `ConversionResult` so a bare conversion carries none of these keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetMatch {
    pub target_metadata: Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    pub confidence: Confidence
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub request_id: uuid::Uuid,
    pub source: LinkReference,
    pub target_platform: Platform,
    pub query: String,
    pub target_url: String,
    pub source_metadata: Metadata,
    #[serde(flatten)]
    pub matched: Option<TargetMatch>,
    pub converted_at: DateTime<Utc>
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_clamps_to_hundred() {
        assert_eq!(Confidence::new(250).value(), 100);
        assert_eq!(Confidence::new(40).value(), 40);
    }

    #[test]
    fn oembed_record_ignores_unknown_fields() {
        let body = r#"{
            "html": "<iframe></iframe>",
            "width": 456,
            "title": "Song X",
            "provider_name": "Spotify",
            "thumbnail_url": "https://i.scdn.co/image/x",
            "type": "rich"
        }"#;
        let record: OembedRecord = serde_json::from_str(body).unwrap();
        assert_eq!(record.title.as_deref(), Some("Song X"));
        assert!(record.author_name.is_none());
        assert!(record.playlist_name.is_none());
    }

    #[test]
    fn metadata_is_tagged_by_content_type() {
        let meta = Metadata::Artist { name: "Prince".to_string() };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "artist");
        assert_eq!(json["name"], "Prince");
        assert_eq!(meta.content_type(), ContentType::Artist);
    }

    #[test]
    fn release_dates_of_any_precision() {
        assert_eq!(parse_release_date("1984-06-25"), NaiveDate::from_ymd_opt(1984, 6, 25));
        assert_eq!(parse_release_date("1984-06"), NaiveDate::from_ymd_opt(1984, 6, 1));
        assert_eq!(parse_release_date("1984"), NaiveDate::from_ymd_opt(1984, 1, 1));
        assert_eq!(parse_release_date("June 1984"), None);
        assert_eq!(parse_release_date(""), None);
    }

    #[test]
    fn album_release_date_serializes_as_plain_date() {
        let meta = Metadata::Album {
            title: "Purple Rain".to_string(),
            artist: None,
            release_date: NaiveDate::from_ymd_opt(1984, 6, 25)
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["release_date"], "1984-06-25");
        assert!(json.get("artist").is_none());
    }

    #[test]
    fn counterpart_flips_platform() {
        assert_eq!(Platform::Spotify.counterpart(), Platform::Qobuz);
        assert_eq!(Platform::Qobuz.counterpart(), Platform::Spotify);
    }
}
