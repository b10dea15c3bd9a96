//!
//! src/fetch.rs  Andrew Belles  Oct 19th, 2026
//!
//! Defines methods for hitting the public oEmbed endpoints and
//! returning the raw metadata record of a source link. Single shot,
//! a failed fetch is never retried.
//!

use async_trait::async_trait;
use reqwest::{Client, header, redirect, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::{HttpConfig, OembedConfig};
use crate::errors::{ConvertError, ServiceError};
use crate::types::{LinkReference, OembedRecord, Platform};

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder  {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
}

fn client_with_headers(http: &HttpConfig, headers: header::HeaderMap) ->
    Result<Client, ServiceError> {
    client_helper(http)
        .default_headers(headers)
        .build()
        .map_err(|e| ServiceError::Http(format!("build client: {e}")))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, ServiceError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_with_headers(http, h)
}

/// Anything able to describe a classified link. The http client is the
/// only production implementation.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, link: &LinkReference) -> Result<OembedRecord, ConvertError>;
}

#[derive(Clone, Debug)]
pub struct OembedClient {
    pub http: Client,
    pub cfg: OembedConfig
}

impl OembedClient {
    pub fn new(http_config: &HttpConfig, cfg: &OembedConfig) ->
        Result<Self, ServiceError> {

        let http = base_client(http_config)?;
        Ok( Self::with_client(http, cfg.clone()) )
    }

    pub fn with_client(http: Client, cfg: OembedConfig) -> Self {
        Self { http, cfg }
    }

    fn endpoint(&self, platform: Platform) -> &Url {
        match platform {
            Platform::Spotify => &self.cfg.spotify,
            Platform::Qobuz   => &self.cfg.qobuz
        }
    }

    /// GET {oembed}?url=...
    pub fn oembed(&self, link: &LinkReference) -> RequestBuilder {
        self.http
            .get(self.endpoint(link.platform).clone())
            .query(&[("url", link.raw_url.as_str())])
    }
}

#[async_trait]
impl MetadataSource for OembedClient {
    async fn fetch(&self, link: &LinkReference) -> Result<OembedRecord, ConvertError> {
        let platform = link.platform;
        debug!(platform = platform.as_str(), url = %link.raw_url, "oembed.fetch");

        let record: OembedRecord = send_json(platform, self.oembed(link)).await?;

        debug!(
            platform = platform.as_str(),
            title = record.title.as_deref().unwrap_or_default(),
            "oembed.done"
        );
        Ok(record)
    }
}

/// Sends once and decodes a json body. Transport failures and non-success
/// statuses are fetch errors, a body that does not decode is incomplete.
pub(crate) async fn send_json<T: DeserializeOwned>(
    platform: Platform,
    request: RequestBuilder
) -> Result<T, ConvertError> {
    let response = request
        .send()
        .await
        .map_err(|e| ConvertError::fetch(platform, e))?;

    let status = response.status();
    if !status.is_success() {
        warn!(platform = platform.as_str(), status = %status, url = %response.url(), "http.status");
        return Err(ConvertError::MetadataFetch {
            platform,
            reason: format!("endpoint answered {status}")
        });
    }

    let body = response.bytes()
        .await
        .map_err(|e| ConvertError::fetch(platform, e))?;

    serde_json::from_slice::<T>(&body).map_err(|e| {
        warn!(platform = platform.as_str(), error = %e, "http.decode");
        ConvertError::incomplete(platform, e)
    })
}
