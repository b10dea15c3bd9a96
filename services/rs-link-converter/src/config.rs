use url::Url;
use std::{net::SocketAddr, time};
use crate::errors::ServiceError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 5000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 8;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const SPOTIFY_OEMBED_URL: &str = "https://open.spotify.com/oembed";
pub const QOBUZ_OEMBED_URL: &str = "https://www.qobuz.com/api.json/0.2/oembed";
pub const SPOTIFY_SEARCH_URL: &str = "https://open.spotify.com/search/";
pub const QOBUZ_SEARCH_URL: &str = "https://www.qobuz.com/";
pub const QOBUZ_STORE_LOCALE: &str = "us-en";

pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1/";
pub const QOBUZ_API_BASE: &str = "https://www.qobuz.com/api.json/0.2/";
pub const CATALOG_SEARCH_LIMIT: u32 = 5;

pub const BIND_ADDR: &str = "127.0.0.1:8080";

/// Wrapper over env::var to return an invalid enviroment var error
fn env_check(s: &str) -> Result<String, ServiceError> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ServiceError::Config(format!("{s} was not set"))),
    }
}

/// Unset and blank both read as absent
fn env_optional(s: &str) -> Option<String> {
    env_check(s).ok()
}

fn env_or(s: &str, default: &str) -> String {
    env_optional(s).unwrap_or_else(|| default.to_string())
}

fn env_to_millis(s: &str, default: u64) -> Result<time::Duration, ServiceError> {
    match env_optional(s) {
        Some(v) => v.trim().parse::<u64>()
            .map(time::Duration::from_millis)
            .map_err(|e| ServiceError::Config(format!("{s} invalid {e}"))),
        None => Ok(time::Duration::from_millis(default))
    }
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

/// Parses `name` (or its default) and checks scheme and host
fn checked_url(name: &str, default: &str, host: &str) -> Result<Url, ServiceError> {
    let raw = env_or(name, default);
    let url = Url::parse(&raw)
        .map_err(|e| ServiceError::Config(format!("{name} invalid {e}")))?;
    ensure_https(&url).map_err(ServiceError::Config)?;
    ensure_host(&url, host).map_err(ServiceError::Config)?;
    Ok(url)
}

///
/// Public oEmbed endpoints used to describe a source link
///
#[derive(Debug, Clone)]
pub struct OembedConfig {
    pub spotify: Url,
    pub qobuz: Url
}

fn build_oembed() -> Result<OembedConfig, ServiceError> {
    let spotify = checked_url("SPOTIFY_OEMBED_URL", SPOTIFY_OEMBED_URL, "open.spotify.com")?;
    let qobuz   = checked_url("QOBUZ_OEMBED_URL", QOBUZ_OEMBED_URL, "www.qobuz.com")?;
    Ok( OembedConfig { spotify, qobuz } )
}

///
/// Where converted links point: the search page of the other service
///
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub spotify_search: Url,     // query is appended as a path segment
    pub qobuz_search: Url,       // {base}{locale}/search?q=
    pub qobuz_store_locale: String
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            spotify_search: Url::parse(SPOTIFY_SEARCH_URL)
                .expect("SPOTIFY_SEARCH_URL constant is a valid url"),
            qobuz_search: Url::parse(QOBUZ_SEARCH_URL)
                .expect("QOBUZ_SEARCH_URL constant is a valid url"),
            qobuz_store_locale: QOBUZ_STORE_LOCALE.to_string()
        }
    }
}

fn build_search() -> Result<SearchConfig, ServiceError> {
    let mut spotify_search = checked_url(
        "SPOTIFY_SEARCH_URL", SPOTIFY_SEARCH_URL, "open.spotify.com"
    )?;
    let mut qobuz_search = checked_url(
        "QOBUZ_SEARCH_URL", QOBUZ_SEARCH_URL, "www.qobuz.com"
    )?;
    ensure_trailing_slash(&mut spotify_search);
    ensure_trailing_slash(&mut qobuz_search);

    let qobuz_store_locale = env_or("QOBUZ_STORE_LOCALE", QOBUZ_STORE_LOCALE);
    if !qobuz_store_locale.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ServiceError::Config(
            format!("QOBUZ_STORE_LOCALE invalid {qobuz_store_locale}")
        ));
    }

    Ok( SearchConfig { spotify_search, qobuz_search, qobuz_store_locale } )
}

///
/// App level credentials for the optional target side catalog lookup.
/// Missing credentials disable the matching resolver.
///
#[derive(Debug, Clone)]
pub struct SpotifyCatalogConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: Url,
    pub api_base: Url,
    pub search_limit: u32
}

fn build_spotify_catalog() -> Result<Option<SpotifyCatalogConfig>, ServiceError> {
    let (Some(client_id), Some(client_secret)) = (
        env_optional("SPOTIFY_CLIENT_ID"),
        env_optional("SPOTIFY_CLIENT_SECRET")
    ) else {
        return Ok(None);
    };

    let token_url = checked_url("SPOTIFY_TOKEN_URL", SPOTIFY_TOKEN_URL, "accounts.spotify.com")?;
    let mut api_base = checked_url("SPOTIFY_API_BASE", SPOTIFY_API_BASE, "api.spotify.com")?;
    ensure_trailing_slash(&mut api_base);

    Ok(Some( SpotifyCatalogConfig {
        client_id,
        client_secret,
        token_url,
        api_base,
        search_limit: CATALOG_SEARCH_LIMIT
    }))
}

#[derive(Debug, Clone)]
pub struct QobuzCatalogConfig {
    pub app_id: String,
    pub api_base: Url,
    pub search_limit: u32
}

fn build_qobuz_catalog() -> Result<Option<QobuzCatalogConfig>, ServiceError> {
    let Some(app_id) = env_optional("QOBUZ_APP_ID") else {
        return Ok(None);
    };

    let mut api_base = checked_url("QOBUZ_API_BASE", QOBUZ_API_BASE, "www.qobuz.com")?;
    ensure_trailing_slash(&mut api_base);

    Ok(Some( QobuzCatalogConfig { app_id, api_base, search_limit: CATALOG_SEARCH_LIMIT } ))
}

#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    pub spotify: Option<SpotifyCatalogConfig>,
    pub qobuz: Option<QobuzCatalogConfig>
}

///
/// Configuration for Http timeouts, etc. There is no retry config, a failed
/// fetch ends the conversion.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS
        }
    }
}

fn build_http() -> Result<HttpConfig, ServiceError> {
    Ok( HttpConfig {
        timeout: env_to_millis("HTTP_TIMEOUT_MS", HTTP_TIMEOUT)?,
        connect_timeout: env_to_millis("HTTP_CONNECT_TIMEOUT_MS", HTTP_CONNECT_TIMEOUT)?,
        ..HttpConfig::default()
    })
}

///
/// Configuration for the http service
///
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr
}

fn build_server() -> Result<ServerConfig, ServiceError> {
    let raw = env_or("BIND_ADDR", BIND_ADDR);
    let bind_addr = raw.parse::<SocketAddr>()
        .map_err(|e| ServiceError::Config(format!("BIND_ADDR invalid {e}")))?;
    Ok( ServerConfig { bind_addr } )
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<LogFormat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json"   => Some(LogFormat::Json),
            _ => None
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,rs_link_converter=debug,reqwest=warn".to_string(),
            format: LogFormat::Json,
            with_ansi: false,
            include_file_line: true,
            include_target: true
        }
    }
}

fn build_logging() -> Result<LoggingConfig, ServiceError> {
    let format = match env_optional("LOG_FORMAT") {
        None => LogFormat::Json,
        Some(v) => LogFormat::parse(&v)
            .ok_or_else(|| ServiceError::Config(format!("LOG_FORMAT invalid {v}")))?
    };
    Ok( LoggingConfig {
        format,
        with_ansi: format == LogFormat::Pretty,
        ..LoggingConfig::default()
    })
}

///
/// AppConfig which holds everything the converter and its surfaces need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub oembed: OembedConfig,
    pub search: SearchConfig,
    pub catalog: CatalogConfig,
    pub http: HttpConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, ServiceError> {
    dotenvy::dotenv().ok();

    let oembed  = build_oembed()?;
    let search  = build_search()?;
    let catalog = CatalogConfig {
        spotify: build_spotify_catalog()?,
        qobuz:   build_qobuz_catalog()?
    };
    let http    = build_http()?;
    let server  = build_server()?;
    let logging = build_logging()?;

    Ok( AppConfig { oembed, search, catalog, http, server, logging } )
}
