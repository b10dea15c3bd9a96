//!
//! src/catalog.rs  Andrew Belles  Oct 19th, 2026
//!
//! Catalog api access for both services. On the source side it reads the
//! full metadata of the linked item, on the target side it searches for
//! the same item and keeps the first hit that verifies against it.
//! Only built when the service's app credentials are configured.
//!

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, header, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::classify::item_id;
use crate::config::{HttpConfig, QobuzCatalogConfig, SpotifyCatalogConfig};
use crate::errors::{ConvertError, ServiceError};
use crate::fetch::{base_client, send_json};
use crate::types::{
    Candidate, ContentType, LinkReference, Metadata, Platform, parse_release_date
};

pub const DURATION_TOLERANCE_MS: u64 = 3000;
pub const RELEASE_TOLERANCE_DAYS: i64 = 30;

#[async_trait]
pub trait CandidateResolver: Send + Sync {
    /// Service the catalog belongs to
    fn platform(&self) -> Platform;

    /// Full metadata of a link on this service. `Ok(None)` when the link
    /// carries no item id or the catalog entry has no title.
    async fn describe(&self, link: &LinkReference) -> Result<Option<Metadata>, ConvertError>;

    /// `Ok(None)` when no search hit verifies against `original`
    async fn resolve(&self, original: &Metadata) -> Result<Option<Candidate>, ConvertError>;
}

/// Same item on both services: equal title or name ignoring case. Tracks
/// must also run within 3 s of each other and albums be released within
/// 30 days, whenever both sides know the value.
pub fn verified(original: &Metadata, candidate: &Metadata) -> bool {
    if original.content_type() != candidate.content_type()
        || original.headline().to_lowercase() != candidate.headline().to_lowercase() {
        return false;
    }
    match (original, candidate) {
        (
            Metadata::Track { duration_ms: Some(a), .. },
            Metadata::Track { duration_ms: Some(b), .. }
        ) => a.abs_diff(*b) < DURATION_TOLERANCE_MS,
        (
            Metadata::Album { release_date: Some(a), .. },
            Metadata::Album { release_date: Some(b), .. }
        ) => (*a - *b).num_days().abs() < RELEASE_TOLERANCE_DAYS,
        _ => true
    }
}

/// First hit, in search rank order, that verifies
pub fn pick_candidate(original: &Metadata, candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates.into_iter().find(|c| verified(original, &c.metadata))
}

fn url_error(platform: Platform, e: url::ParseError) -> ConvertError {
    ConvertError::MetadataFetch { platform, reason: format!("bad catalog url: {e}") }
}

///
/// Spotify web api, client credentials flow
///

const TOKEN_TTL_DEFAULT: u64 = 3600;
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant
}

impl CachedToken {
    fn live(&self) -> Option<String> {
        (Instant::now() < self.expires_at).then(|| self.access_token.clone())
    }
}

#[derive(Deserialize)]
struct SpotifyNamed {
    name: String
}

#[derive(Deserialize)]
struct SpotifyOwner {
    display_name: Option<String>
}

#[derive(Deserialize)]
struct SpotifyExternalUrls {
    spotify: Option<String>
}

/// Shape shared by search hits and `/v1/{type}s/{id}` lookups
#[derive(Deserialize)]
struct SpotifyItem {
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyNamed>,
    #[serde(default)]
    album: Option<SpotifyNamed>,
    #[serde(default)]
    owner: Option<SpotifyOwner>,
    #[serde(default)]
    external_urls: Option<SpotifyExternalUrls>,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    release_date: Option<String>
}

#[derive(Deserialize, Default)]
struct SpotifyPage {
    // playlist searches can contain null entries
    #[serde(default)]
    items: Vec<Option<SpotifyItem>>
}

#[derive(Deserialize)]
struct SpotifySearch {
    tracks: Option<SpotifyPage>,
    albums: Option<SpotifyPage>,
    artists: Option<SpotifyPage>,
    playlists: Option<SpotifyPage>
}

impl SpotifySearch {
    fn into_page(self, kind: ContentType) -> SpotifyPage {
        let page = match kind {
            ContentType::Track    => self.tracks,
            ContentType::Album    => self.albums,
            ContentType::Artist   => self.artists,
            ContentType::Playlist => self.playlists
        };
        page.unwrap_or_default()
    }
}

impl SpotifyItem {
    fn into_candidate(self, kind: ContentType) -> Candidate {
        let link = self.external_urls.and_then(|u| u.spotify);
        let first_artist = self.artists.into_iter().next().map(|a| a.name);
        let metadata = match kind {
            ContentType::Track => Metadata::Track {
                title: self.name,
                artist: first_artist,
                album: self.album.map(|a| a.name),
                duration_ms: self.duration_ms
            },
            ContentType::Album => Metadata::Album {
                title: self.name,
                artist: first_artist,
                release_date: self.release_date.as_deref().and_then(parse_release_date)
            },
            ContentType::Artist => Metadata::Artist { name: self.name },
            ContentType::Playlist => Metadata::Playlist {
                name: self.name,
                owner: self.owner.and_then(|o| o.display_name)
            }
        };
        Candidate { metadata, link }
    }
}

/// Field filtered search text, artist filter dropped when unknown
pub fn spotify_search_text(original: &Metadata) -> String {
    match original {
        Metadata::Track { title, artist: Some(artist), .. } =>
            format!("track:{title} artist:{artist}"),
        Metadata::Track { title, artist: None, .. } => format!("track:{title}"),
        Metadata::Album { title, artist: Some(artist), .. } =>
            format!("album:{title} artist:{artist}"),
        Metadata::Album { title, artist: None, .. } => format!("album:{title}"),
        Metadata::Artist { name } => format!("artist:{name}"),
        Metadata::Playlist { name, .. } => name.clone()
    }
}

#[derive(Clone, Debug)]
pub struct SpotifyCatalog {
    pub http: Client,
    pub cfg: SpotifyCatalogConfig,
    token: Arc<RwLock<Option<CachedToken>>>
}

impl SpotifyCatalog {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyCatalogConfig) ->
        Result<Self, ServiceError> {
        let http = base_client(http_config)?;
        Ok( Self::with_client(http, cfg.clone()) )
    }

    pub fn with_client(http: Client, cfg: SpotifyCatalogConfig) -> Self {
        Self { http, cfg, token: Arc::new(RwLock::new(None)) }
    }

    pub fn token_request(&self) -> RequestBuilder {
        self.http
            .post(self.cfg.token_url.clone())
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
    }

    /// Cached access token, refreshed a minute before it expires
    async fn bearer(&self) -> Result<String, ConvertError> {
        if let Some(token) = self.token.read().await.as_ref().and_then(CachedToken::live) {
            return Ok(token);
        }

        let mut slot = self.token.write().await;
        // another request may have refreshed while we waited
        if let Some(token) = slot.as_ref().and_then(CachedToken::live) {
            return Ok(token);
        }

        let fresh: TokenResponse = send_json(Platform::Spotify, self.token_request()).await?;
        let ttl = Duration::from_secs(fresh.expires_in.unwrap_or(TOKEN_TTL_DEFAULT))
            .saturating_sub(TOKEN_REFRESH_MARGIN);
        debug!(platform = "spotify", ttl_secs = ttl.as_secs(), "catalog.token");

        *slot = Some(CachedToken {
            access_token: fresh.access_token.clone(),
            expires_at: Instant::now() + ttl
        });
        Ok(fresh.access_token)
    }

    /// GET /v1/search?type=...&q=...&limit=
    pub fn search(&self, kind: ContentType, query: &str, bearer: &str) ->
        Result<RequestBuilder, ConvertError> {
        let url = self.cfg.api_base.join("search")
            .map_err(|e| url_error(Platform::Spotify, e))?;
        let limit = self.cfg.search_limit.to_string();
        Ok( self.http.get(url).bearer_auth(bearer).query(&[
            ("type", kind.as_str()),
            ("q", query),
            ("limit", limit.as_str())
        ]))
    }

    /// GET /v1/{type}s/{id}
    pub fn lookup(&self, kind: ContentType, id: &str, bearer: &str) ->
        Result<RequestBuilder, ConvertError> {
        let url = self.cfg.api_base.join(&format!("{}s/{id}", kind.as_str()))
            .map_err(|e| url_error(Platform::Spotify, e))?;
        Ok( self.http.get(url).bearer_auth(bearer) )
    }
}

#[async_trait]
impl CandidateResolver for SpotifyCatalog {
    fn platform(&self) -> Platform {
        Platform::Spotify
    }

    async fn describe(&self, link: &LinkReference) -> Result<Option<Metadata>, ConvertError> {
        let Some(id) = item_id(link) else {
            return Ok(None);
        };
        let kind = link.content_type;
        let bearer = self.bearer().await?;
        debug!(platform = "spotify", kind = kind.as_str(), id = %id, "catalog.lookup");

        let item: SpotifyItem = send_json(
            Platform::Spotify,
            self.lookup(kind, &id, &bearer)?
        ).await?;
        Ok(Some(item.into_candidate(kind).metadata))
    }

    async fn resolve(&self, original: &Metadata) -> Result<Option<Candidate>, ConvertError> {
        let bearer = self.bearer().await?;

        let kind = original.content_type();
        let text = spotify_search_text(original);
        debug!(platform = "spotify", kind = kind.as_str(), query = %text, "catalog.search");

        let search: SpotifySearch = send_json(
            Platform::Spotify,
            self.search(kind, &text, &bearer)?
        ).await?;

        let candidates = search.into_page(kind).items
            .into_iter()
            .flatten()
            .map(|item| item.into_candidate(kind))
            .collect();
        Ok(pick_candidate(original, candidates))
    }
}

///
/// Qobuz catalog api, app id only
///

#[derive(Deserialize)]
struct QobuzNamed {
    name: String
}

#[derive(Deserialize)]
struct QobuzTitled {
    title: String
}

/// Shape shared by search hits and `/{type}/get` lookups
#[derive(Deserialize)]
struct QobuzItem {
    // numeric for tracks, string for albums
    #[serde(default)]
    id: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    performer: Option<QobuzNamed>,
    #[serde(default)]
    artist: Option<QobuzNamed>,
    #[serde(default)]
    album: Option<QobuzTitled>,
    #[serde(default)]
    owner: Option<QobuzNamed>,
    // seconds
    #[serde(default)]
    duration: Option<u64>,
    #[serde(default)]
    release_date_original: Option<String>,
    // unix seconds
    #[serde(default)]
    released_at: Option<i64>
}

#[derive(Deserialize, Default)]
struct QobuzPage {
    #[serde(default)]
    items: Vec<QobuzItem>
}

#[derive(Deserialize)]
struct QobuzSearch {
    tracks: Option<QobuzPage>,
    albums: Option<QobuzPage>,
    artists: Option<QobuzPage>,
    playlists: Option<QobuzPage>
}

impl QobuzSearch {
    fn into_page(self, kind: ContentType) -> QobuzPage {
        let page = match kind {
            ContentType::Track    => self.tracks,
            ContentType::Album    => self.albums,
            ContentType::Artist   => self.artists,
            ContentType::Playlist => self.playlists
        };
        page.unwrap_or_default()
    }
}

impl QobuzItem {
    fn id_string(&self) -> Option<String> {
        match &self.id {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None
        }
    }

    fn release_date(&self) -> Option<NaiveDate> {
        self.release_date_original
            .as_deref()
            .and_then(parse_release_date)
            .or_else(|| self.released_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|d| d.date_naive()))
    }

    fn into_candidate(self, kind: ContentType) -> Option<Candidate> {
        let link = self.id_string()
            .map(|id| format!("https://open.qobuz.com/{}/{id}", kind.as_str()));
        let release_date = self.release_date();
        let metadata = match kind {
            ContentType::Track => Metadata::Track {
                title: self.title?,
                artist: self.performer.or(self.artist).map(|a| a.name),
                album: self.album.map(|a| a.title),
                duration_ms: self.duration.map(|secs| secs * 1000)
            },
            ContentType::Album => Metadata::Album {
                title: self.title?,
                artist: self.artist.map(|a| a.name),
                release_date
            },
            ContentType::Artist => Metadata::Artist { name: self.name? },
            ContentType::Playlist => Metadata::Playlist {
                name: self.name.or(self.title)?,
                owner: self.owner.map(|o| o.name)
            }
        };
        Some(Candidate { metadata, link })
    }
}

pub fn qobuz_search_text(original: &Metadata) -> String {
    match original {
        Metadata::Track { title, artist: Some(artist), .. }
        | Metadata::Album { title, artist: Some(artist), .. } => format!("{title} {artist}"),
        Metadata::Track { title, .. } | Metadata::Album { title, .. } => title.clone(),
        Metadata::Artist { name } | Metadata::Playlist { name, .. } => name.clone()
    }
}

#[derive(Clone, Debug)]
pub struct QobuzCatalog {
    pub http: Client,
    pub cfg: QobuzCatalogConfig
}

impl QobuzCatalog {
    pub fn new(http_config: &HttpConfig, cfg: &QobuzCatalogConfig) ->
        Result<Self, ServiceError> {
        let http = base_client(http_config)?;
        Ok( Self::with_client(http, cfg.clone()) )
    }

    pub fn with_client(http: Client, cfg: QobuzCatalogConfig) -> Self {
        Self { http, cfg }
    }

    /// GET /api.json/0.2/{type}/search?query=...&limit=&app_id=
    pub fn search(&self, kind: ContentType, query: &str) ->
        Result<RequestBuilder, ConvertError> {
        let url = self.cfg.api_base.join(&format!("{}/search", kind.as_str()))
            .map_err(|e| url_error(Platform::Qobuz, e))?;
        let limit = self.cfg.search_limit.to_string();
        Ok( self.http.get(url).query(&[
            ("query", query),
            ("limit", limit.as_str()),
            ("app_id", self.cfg.app_id.as_str())
        ]))
    }

    /// GET /api.json/0.2/{type}/get?{type}_id=...&app_id=
    pub fn lookup(&self, kind: ContentType, id: &str) -> Result<RequestBuilder, ConvertError> {
        let url = self.cfg.api_base.join(&format!("{}/get", kind.as_str()))
            .map_err(|e| url_error(Platform::Qobuz, e))?;
        let id_param = format!("{}_id", kind.as_str());
        Ok( self.http.get(url).query(&[
            (id_param.as_str(), id),
            ("app_id", self.cfg.app_id.as_str())
        ]))
    }
}

#[async_trait]
impl CandidateResolver for QobuzCatalog {
    fn platform(&self) -> Platform {
        Platform::Qobuz
    }

    async fn describe(&self, link: &LinkReference) -> Result<Option<Metadata>, ConvertError> {
        let Some(id) = item_id(link) else {
            return Ok(None);
        };
        let kind = link.content_type;
        debug!(platform = "qobuz", kind = kind.as_str(), id = %id, "catalog.lookup");

        let item: QobuzItem = send_json(Platform::Qobuz, self.lookup(kind, &id)?).await?;
        Ok(item.into_candidate(kind).map(|c| c.metadata))
    }

    async fn resolve(&self, original: &Metadata) -> Result<Option<Candidate>, ConvertError> {
        let kind = original.content_type();
        let text = qobuz_search_text(original);
        debug!(platform = "qobuz", kind = kind.as_str(), query = %text, "catalog.search");

        let search: QobuzSearch = send_json(Platform::Qobuz, self.search(kind, &text)?).await?;

        let candidates = search.into_page(kind).items
            .into_iter()
            .filter_map(|item| item.into_candidate(kind))
            .collect();
        Ok(pick_candidate(original, candidates))
    }
}
