//!
//! src/converter.rs  Andrew Belles  Oct 19th, 2026
//!
//! The one conversion pipeline. Both the cli and the http handler call
//! into `Converter`, nothing about classification or scoring lives
//! anywhere else.
//!
//!   classify -> fetch -> build query -> assemble
//!                                    -> describe -> resolve -> score -> assemble
//!
//! Each stage either hands its output forward or ends the request with
//! a `ConvertError`. There is no partial result.
//!

use std::sync::Arc;

use chrono::Utc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::catalog::{CandidateResolver, QobuzCatalog, SpotifyCatalog};
use crate::classify::classify;
use crate::config::{AppConfig, SearchConfig};
use crate::errors::{ConvertError, ServiceError};
use crate::fetch::{MetadataSource, OembedClient};
use crate::query::{build_query, source_metadata, target_url};
use crate::scoring::score;
use crate::types::{
    Candidate, ConversionResult, LinkReference, Metadata, Platform, SearchQuery, TargetMatch
};

/// Packages every stage's output into the response object. No side effects.
pub fn assemble(
    request_id: Uuid,
    source: LinkReference,
    query: SearchQuery,
    target: (Platform, String),
    source_metadata: Metadata,
    matched: Option<TargetMatch>
) -> ConversionResult {
    let (target_platform, target_url) = target;
    ConversionResult {
        request_id,
        source,
        target_platform,
        query: query.text,
        target_url,
        source_metadata,
        matched,
        converted_at: Utc::now()
    }
}

/// Scores a resolved candidate against the source's metadata
pub fn match_candidate(original: &Metadata, candidate: Candidate) -> TargetMatch {
    let confidence = score(original, &candidate.metadata);
    TargetMatch {
        target_metadata: candidate.metadata,
        target_link: candidate.link,
        confidence
    }
}

#[derive(Clone)]
pub struct Converter {
    source: Arc<dyn MetadataSource>,
    resolvers: Vec<Arc<dyn CandidateResolver>>,
    search: SearchConfig
}

impl Converter {
    pub fn new(
        source: Arc<dyn MetadataSource>,
        resolvers: Vec<Arc<dyn CandidateResolver>>,
        search: SearchConfig
    ) -> Self {
        Self { source, resolvers, search }
    }

    /// Wires the http clients described by the loaded config
    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let source = Arc::new(OembedClient::new(&cfg.http, &cfg.oembed)?);

        let mut resolvers: Vec<Arc<dyn CandidateResolver>> = Vec::new();
        if let Some(spotify) = &cfg.catalog.spotify {
            resolvers.push(Arc::new(SpotifyCatalog::new(&cfg.http, spotify)?));
        }
        if let Some(qobuz) = &cfg.catalog.qobuz {
            resolvers.push(Arc::new(QobuzCatalog::new(&cfg.http, qobuz)?));
        }

        info!(
            resolvers = ?resolvers.iter().map(|r| r.platform().as_str()).collect::<Vec<_>>(),
            "converter.ready"
        );
        Ok( Self::new(source, resolvers, cfg.search.clone()) )
    }

    fn resolver(&self, platform: Platform) -> Option<&Arc<dyn CandidateResolver>> {
        self.resolvers.iter().find(|r| r.platform() == platform)
    }

    /// Search url only, no confidence claim
    pub async fn convert(&self, link: &str) -> Result<ConversionResult, ConvertError> {
        self.run(link, false).await
    }

    /// Also looks up a concrete candidate on the target service and scores
    /// it. Degrades to a bare result when that service has no resolver.
    pub async fn convert_scored(&self, link: &str) -> Result<ConversionResult, ConvertError> {
        self.run(link, true).await
    }

    async fn run(&self, link: &str, resolve: bool) -> Result<ConversionResult, ConvertError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("convert", request_id = %request_id, resolve);

        async move {
            info!("convert.start");
            let result = self.pipeline(request_id, link, resolve).await;
            match &result {
                Ok(r) => info!(
                    source = r.source.platform.as_str(),
                    kind = r.source.content_type.as_str(),
                    target_url = %r.target_url,
                    confidence = r.matched.as_ref().map(|m| m.confidence.value()),
                    "convert.done"
                ),
                Err(e) => warn!(kind = e.kind(), error = %e, "convert.failed")
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn pipeline(&self, request_id: Uuid, link: &str, resolve: bool) ->
        Result<ConversionResult, ConvertError> {

        let link = classify(link)?;
        debug!(
            platform = link.platform.as_str(),
            kind = link.content_type.as_str(),
            "convert.classified"
        );

        let record = self.source.fetch(&link).await?;
        let query = build_query(&record, &link)?;
        let mut original = source_metadata(&record, &link, &query);
        let target = target_url(link.platform, &query, &self.search);
        debug!(query = %query.text, target_url = %target.1, "convert.query");

        let matched = if resolve {
            if let Some(described) = self.describe_source(&link).await? {
                original = described;
            }
            self.resolve_target(target.0, &original).await?
        } else {
            None
        };

        Ok( assemble(request_id, link, query, target, original, matched) )
    }

    /// Catalog metadata of the source item, which unlike oEmbed carries the
    /// artist, duration and release date. None without a source catalog.
    async fn describe_source(&self, link: &LinkReference) ->
        Result<Option<Metadata>, ConvertError> {

        let Some(resolver) = self.resolver(link.platform) else {
            return Ok(None);
        };
        let described = resolver.describe(link)
            .await?
            .filter(|m| m.content_type() == link.content_type);
        debug!(described = described.is_some(), "convert.source.described");
        Ok(described)
    }

    async fn resolve_target(&self, platform: Platform, original: &Metadata) ->
        Result<Option<TargetMatch>, ConvertError> {

        let Some(resolver) = self.resolver(platform) else {
            warn!(target_platform = platform.as_str(), "convert.resolver.missing");
            return Ok(None);
        };

        let candidate = resolver.resolve(original)
            .await?
            .ok_or(ConvertError::CandidateNotFound { platform })?;

        let matched = match_candidate(original, candidate);
        debug!(confidence = matched.confidence.value(), "convert.scored");
        Ok(Some(matched))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::types::{ContentType, OembedRecord};

    /// Returns a canned outcome and counts calls
    struct StubSource {
        outcome: Result<OembedRecord, ConvertError>,
        calls: AtomicUsize
    }

    impl StubSource {
        fn record(title: Option<&str>, author: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                outcome: Ok(OembedRecord {
                    title: title.map(str::to_string),
                    author_name: author.map(str::to_string),
                    ..OembedRecord::default()
                }),
                calls: AtomicUsize::new(0)
            })
        }

        fn failing(err: ConvertError) -> Arc<Self> {
            Arc::new(Self { outcome: Err(err), calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MetadataSource for StubSource {
        async fn fetch(&self, _link: &LinkReference) -> Result<OembedRecord, ConvertError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    struct StubResolver {
        platform: Platform,
        candidate: Option<Candidate>,
        described: Option<Metadata>,
        describes: AtomicUsize
    }

    #[async_trait]
    impl CandidateResolver for StubResolver {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn describe(&self, _link: &LinkReference) -> Result<Option<Metadata>, ConvertError> {
            self.describes.fetch_add(1, Ordering::SeqCst);
            Ok(self.described.clone())
        }

        async fn resolve(&self, _original: &Metadata) -> Result<Option<Candidate>, ConvertError> {
            Ok(self.candidate.clone())
        }
    }

    fn stub(
        platform: Platform,
        candidate: Option<Metadata>,
        described: Option<Metadata>
    ) -> Arc<StubResolver> {
        Arc::new(StubResolver {
            platform,
            candidate: candidate.map(|metadata| Candidate {
                metadata,
                link: Some("https://open.qobuz.com/track/1".to_string())
            }),
            described,
            describes: AtomicUsize::new(0)
        })
    }

    fn resolver(platform: Platform, candidate: Option<Metadata>) -> Arc<dyn CandidateResolver> {
        stub(platform, candidate, None)
    }

    fn converter(source: Arc<StubSource>, resolvers: Vec<Arc<dyn CandidateResolver>>) -> Converter {
        Converter::new(source, resolvers, SearchConfig::default())
    }

    fn track(title: &str, artist: &str) -> Metadata {
        Metadata::Track {
            title: title.to_string(),
            artist: Some(artist.to_string()),
            album: None,
            duration_ms: None
        }
    }

    #[tokio::test]
    async fn spotify_track_becomes_qobuz_search() {
        let source = StubSource::record(Some("Song X"), Some("Band Y"));
        let result = converter(source.clone(), Vec::new())
            .convert("https://open.spotify.com/track/abc")
            .await
            .unwrap();

        assert_eq!(result.source.platform, Platform::Spotify);
        assert_eq!(result.source.content_type, ContentType::Track);
        assert_eq!(result.target_platform, Platform::Qobuz);
        assert_eq!(result.query, "Song X");
        assert_eq!(result.target_url, "https://www.qobuz.com/us-en/search?q=Song%20X");
        assert!(result.matched.is_none());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn qobuz_album_becomes_spotify_search() {
        let source = StubSource::record(Some("Purple Rain"), None);
        let result = converter(source, Vec::new())
            .convert("https://open.qobuz.com/album/0060253780804")
            .await
            .unwrap();

        assert_eq!(result.target_platform, Platform::Spotify);
        assert_eq!(result.target_url, "https://open.spotify.com/search/Purple%20Rain");
        assert_eq!(
            result.source_metadata,
            Metadata::Album {
                title: "Purple Rain".to_string(),
                artist: None,
                release_date: None
            }
        );
    }

    #[tokio::test]
    async fn empty_input_never_reaches_the_network() {
        let source = StubSource::record(Some("Song X"), None);
        let conv = converter(source.clone(), Vec::new());

        for input in ["", "   "] {
            let err = conv.convert(input).await.unwrap_err();
            assert!(matches!(err, ConvertError::InvalidLink(_)));
        }
        let err = conv.convert("https://example.com/track/1").await.unwrap_err();
        assert!(matches!(err, ConvertError::InvalidLink(_)));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_terminal() {
        let source = StubSource::failing(ConvertError::MetadataFetch {
            platform: Platform::Qobuz,
            reason: "endpoint answered 503 Service Unavailable".to_string()
        });
        let err = converter(source.clone(), Vec::new())
            .convert("https://open.qobuz.com/track/1")
            .await
            .unwrap_err();

        assert!(matches!(err, ConvertError::MetadataFetch { platform: Platform::Qobuz, .. }));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn missing_title_cannot_be_converted() {
        for title in [None, Some("")] {
            let source = StubSource::record(title, Some("Band Y"));
            let err = converter(source, Vec::new())
                .convert("https://open.spotify.com/track/abc")
                .await
                .unwrap_err();
            assert!(matches!(err, ConvertError::QueryExtraction(_)));
        }
    }

    #[tokio::test]
    async fn scored_conversion_full_match() {
        let source = StubSource::record(Some("Song X"), Some("Band Y"));
        let conv = converter(source, vec![
            resolver(Platform::Qobuz, Some(track("Song X", "Band Y")))
        ]);

        let result = conv.convert_scored("https://open.spotify.com/track/abc").await.unwrap();
        let matched = result.matched.unwrap();
        assert_eq!(matched.confidence.value(), 100);
        assert_eq!(matched.target_metadata, track("Song X", "Band Y"));
        assert_eq!(matched.target_link.as_deref(), Some("https://open.qobuz.com/track/1"));
    }

    #[tokio::test]
    async fn scored_conversion_title_only() {
        let source = StubSource::record(Some("Song X"), Some("Band Y"));
        let conv = converter(source, vec![
            resolver(Platform::Qobuz, Some(track("Song X", "Someone Else")))
        ]);

        let result = conv.convert_scored("https://open.spotify.com/track/abc").await.unwrap();
        assert_eq!(result.matched.unwrap().confidence.value(), 80);
    }

    #[tokio::test]
    async fn artist_case_difference_scores_hundred() {
        let source = StubSource::record(Some("Prince"), None);
        let conv = converter(source, vec![
            resolver(Platform::Spotify, Some(Metadata::Artist { name: "prince".to_string() }))
        ]);

        let result = conv.convert_scored("https://open.qobuz.com/artist/36819").await.unwrap();
        assert_eq!(result.matched.unwrap().confidence.value(), 100);
    }

    #[tokio::test]
    async fn playlists_score_at_the_default() {
        let source = StubSource::record(Some("Late Night Jazz"), None);
        let conv = converter(source, vec![
            resolver(Platform::Qobuz, Some(Metadata::Playlist {
                name: "Late Night Jazz".to_string(),
                owner: None
            }))
        ]);

        let result = conv.convert_scored("https://open.spotify.com/playlist/xyz").await.unwrap();
        assert_eq!(result.source.content_type, ContentType::Playlist);
        assert_eq!(result.matched.unwrap().confidence.value(), 60);
    }

    #[tokio::test]
    async fn empty_catalog_search_is_not_found() {
        let source = StubSource::record(Some("Song X"), None);
        let conv = converter(source, vec![resolver(Platform::Qobuz, None)]);

        let err = conv.convert_scored("https://open.spotify.com/track/abc").await.unwrap_err();
        assert_eq!(err, ConvertError::CandidateNotFound { platform: Platform::Qobuz });
    }

    #[tokio::test]
    async fn missing_resolver_degrades_to_bare_result() {
        let source = StubSource::record(Some("Song X"), None);
        // resolver exists, but for the wrong side
        let conv = converter(source, vec![
            resolver(Platform::Spotify, Some(track("Song X", "Band Y")))
        ]);

        let result = conv.convert_scored("https://open.spotify.com/track/abc").await.unwrap();
        assert!(result.matched.is_none());
    }

    #[tokio::test]
    async fn scored_conversion_reads_source_from_catalog() {
        // spotify oEmbed carries no author, the catalog does
        let source = StubSource::record(Some("Song X"), None);
        let spotify = stub(Platform::Spotify, None, Some(track("Song X", "Band Y")));
        let conv = converter(source, vec![
            spotify.clone() as Arc<dyn CandidateResolver>,
            resolver(Platform::Qobuz, Some(track("Song X", "Band Y")))
        ]);

        let result = conv.convert_scored("https://open.spotify.com/track/abc").await.unwrap();
        assert_eq!(result.source_metadata, track("Song X", "Band Y"));
        assert_eq!(result.matched.unwrap().confidence.value(), 100);
        assert_eq!(result.query, "Song X");
        assert_eq!(spotify.describes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn catalog_description_of_another_kind_is_ignored() {
        let source = StubSource::record(Some("Song X"), Some("Band Y"));
        let spotify = stub(
            Platform::Spotify,
            None,
            Some(Metadata::Artist { name: "Band Y".to_string() })
        );
        let conv = converter(source, vec![
            spotify as Arc<dyn CandidateResolver>,
            resolver(Platform::Qobuz, Some(track("Song X", "Band Y")))
        ]);

        let result = conv.convert_scored("https://open.spotify.com/track/abc").await.unwrap();
        assert_eq!(result.source_metadata, track("Song X", "Band Y"));
    }

    #[tokio::test]
    async fn bare_conversion_never_asks_the_catalog() {
        let source = StubSource::record(Some("Song X"), None);
        let spotify = stub(Platform::Spotify, None, Some(track("Song X", "Band Y")));
        let result = converter(source, vec![spotify.clone() as Arc<dyn CandidateResolver>])
            .convert("https://open.spotify.com/track/abc")
            .await
            .unwrap();

        assert_eq!(spotify.describes.load(Ordering::SeqCst), 0);
        assert_eq!(
            result.source_metadata,
            Metadata::Track {
                title: "Song X".to_string(),
                artist: None,
                album: None,
                duration_ms: None
            }
        );
    }

    #[tokio::test]
    async fn bare_result_serializes_without_confidence() {
        let source = StubSource::record(Some("Song X"), None);
        let result = converter(source, Vec::new())
            .convert("https://open.spotify.com/track/abc")
            .await
            .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("confidence").is_none());
        assert!(json.get("target_metadata").is_none());
        assert_eq!(json["target_platform"], "qobuz");
        assert_eq!(json["source"]["content_type"], "track");
    }

    #[tokio::test]
    async fn scored_result_serializes_flat() {
        let source = StubSource::record(Some("Song X"), Some("Band Y"));
        let conv = converter(source, vec![
            resolver(Platform::Qobuz, Some(track("Song X", "Band Y")))
        ]);
        let result = conv.convert_scored("https://open.spotify.com/track/abc").await.unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["confidence"], 100);
        assert_eq!(json["target_metadata"]["type"], "track");
        assert_eq!(json["target_link"], "https://open.qobuz.com/track/1");
    }

    #[tokio::test]
    async fn same_link_same_query() {
        let source = StubSource::record(Some("Song X"), None);
        let conv = converter(source, Vec::new());
        let a = conv.convert("https://open.spotify.com/track/abc").await.unwrap();
        let b = conv.convert("https://open.spotify.com/track/abc").await.unwrap();
        assert_eq!(a.target_url, b.target_url);
        assert_ne!(a.request_id, b.request_id);
    }
}
