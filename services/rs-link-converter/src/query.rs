//!
//! src/query.rs  Andrew Belles  Oct 19th, 2026
//!
//! Turns a fetched oEmbed record into the search text used on the
//! other service, and into that service's search url. Pure functions.
//!

use crate::config::SearchConfig;
use crate::errors::ConvertError;
use crate::types::{ContentType, LinkReference, Metadata, OembedRecord, Platform, SearchQuery};

fn usable(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Picks the field to search on and percent encodes it.
///
/// Playlists use `playlist_name` when the endpoint actually sent one,
/// everything else (and playlists without it) uses `title`.
pub fn build_query(record: &OembedRecord, link: &LinkReference) ->
    Result<SearchQuery, ConvertError> {

    let preferred = match link.content_type {
        ContentType::Playlist => usable(&record.playlist_name),
        _ => None
    };

    let text = preferred
        .or_else(|| usable(&record.title))
        .ok_or_else(|| ConvertError::QueryExtraction(
            format!("{} metadata has no title", link.platform)
        ))?;

    Ok( SearchQuery {
        text: text.to_string(),
        encoded: urlencoding::encode(text).into_owned()
    })
}

/// Maps the raw record onto the metadata variant of the link's content type
pub fn source_metadata(record: &OembedRecord, link: &LinkReference, query: &SearchQuery)
    -> Metadata {
    let author = usable(&record.author_name).map(str::to_string);
    match link.content_type {
        ContentType::Track => Metadata::Track {
            title: query.text.clone(),
            artist: author,
            album: None,
            duration_ms: None
        },
        ContentType::Album => Metadata::Album {
            title: query.text.clone(),
            artist: author,
            release_date: None
        },
        ContentType::Artist => Metadata::Artist { name: query.text.clone() },
        ContentType::Playlist => Metadata::Playlist {
            name: query.text.clone(),
            owner: author
        }
    }
}

/// Search page of the counterpart service, returned with that platform
pub fn target_url(source: Platform, query: &SearchQuery, cfg: &SearchConfig) ->
    (Platform, String) {
    let target = source.counterpart();
    let url = match target {
        Platform::Qobuz => format!(
            "{}{}/search?q={}",
            cfg.qobuz_search, cfg.qobuz_store_locale, query.encoded
        ),
        Platform::Spotify => format!("{}{}", cfg.spotify_search, query.encoded)
    };
    (target, url)
}
