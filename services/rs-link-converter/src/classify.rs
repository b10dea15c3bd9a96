//!
//! src/classify.rs  Andrew Belles  Oct 19th, 2026
//!
//! Decides which service a link belongs to and what kind of item it
//! points at. No I/O happens here.
//!

use crate::errors::ConvertError;
use crate::types::{ContentType, LinkReference, Platform};

const SPOTIFY_HOST: &str = "spotify.com";
const QOBUZ_HOST: &str = "qobuz.com";

/// Classify a raw user supplied link.
///
/// Blank input is rejected before anything else. The platform is the host
/// marker that occurs first in the string, matched without regard to case.
/// Content type falls back to `Track` when no path segment or query hint
/// names one.
pub fn classify(input: &str) -> Result<LinkReference, ConvertError> {
    let raw = input.trim();
    if raw.is_empty() {
        return Err(ConvertError::InvalidLink("no link provided".to_string()));
    }

    let lowered = raw.to_ascii_lowercase();
    let platform = detect_platform(&lowered).ok_or_else(|| ConvertError::InvalidLink(
        format!("{raw} is not a Spotify or Qobuz link")
    ))?;

    Ok(LinkReference {
        platform,
        content_type: detect_content_type(&lowered),
        raw_url: raw.to_string()
    })
}

fn detect_platform(lowered: &str) -> Option<Platform> {
    let spotify = lowered.find(SPOTIFY_HOST);
    let qobuz = lowered.find(QOBUZ_HOST);
    match (spotify, qobuz) {
        (Some(s), Some(q)) if q < s => Some(Platform::Qobuz),
        (Some(_), _) => Some(Platform::Spotify),
        (None, Some(_)) => Some(Platform::Qobuz),
        (None, None) => None
    }
}

fn kind_token(token: &str) -> Option<ContentType> {
    match token {
        "track" | "tracks" => Some(ContentType::Track),
        "album" | "albums" => Some(ContentType::Album),
        // qobuz store pages list artists under /interpreter/
        "artist" | "artists" | "interpreter" => Some(ContentType::Artist),
        "playlist" | "playlists" => Some(ContentType::Playlist),
        _ => None
    }
}

fn detect_content_type(lowered: &str) -> ContentType {
    let segment = lowered
        .split(|c| matches!(c, '/' | '?' | '&' | '=' | '#' | ':'))
        .find_map(kind_token);

    match segment {
        Some(kind) => kind,
        None if lowered.contains("playlist") => ContentType::Playlist,
        None => ContentType::Track
    }
}

/// Catalog id of the linked item: the last path segment after the one
/// naming its content type. Store pages put a slug in between
/// (`/us-en/album/purple-rain-prince/0093624908`), share links do not.
pub fn item_id(link: &LinkReference) -> Option<String> {
    let path = link.raw_url.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let at = segments.iter()
        .position(|s| kind_token(&s.to_ascii_lowercase()) == Some(link.content_type))?;
    segments[at + 1..].last().map(|s| s.to_string())
}
