//!
//! src/errors.rs  Andrew Belles  Oct 19th, 2026
//!
//! Defines the error kinds a conversion can end in, and the
//! service level errors raised while starting the converter
//!
//!

use thiserror::Error;

use crate::types::Platform;

/// Terminal outcome of a failed conversion. Every stage of the pipeline
/// returns one of these, nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("invalid link: {0}")]
    InvalidLink(String),
    #[error("could not fetch {platform} metadata: {reason}")]
    MetadataFetch { platform: Platform, reason: String },
    #[error("{platform} returned unusable metadata: {reason}")]
    MetadataIncomplete { platform: Platform, reason: String },
    #[error("could not extract search terms: {0}")]
    QueryExtraction(String),
    #[error("no matching content found on {platform}")]
    CandidateNotFound { platform: Platform },
}

impl ConvertError {
    /// Stable discriminant used in the http error body and in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::InvalidLink(_)             => "invalid_link",
            ConvertError::MetadataFetch { .. }       => "metadata_fetch",
            ConvertError::MetadataIncomplete { .. }  => "metadata_incomplete",
            ConvertError::QueryExtraction(_)         => "query_extraction",
            ConvertError::CandidateNotFound { .. }   => "candidate_not_found",
        }
    }

    /// Maps a transport level failure onto the platform it was talking to
    pub fn fetch(platform: Platform, e: reqwest::Error) -> Self {
        let reason = if e.is_timeout() {
            "request timed out".to_string()
        } else if let Some(status) = e.status() {
            format!("endpoint answered {status}")
        } else {
            e.to_string()
        };
        ConvertError::MetadataFetch { platform, reason }
    }

    pub fn incomplete(platform: Platform, e: serde_json::Error) -> Self {
        ConvertError::MetadataIncomplete { platform, reason: e.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Convert(#[from] ConvertError)
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self { ServiceError::Http(e.to_string()) }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self { ServiceError::Parse(e.to_string()) }
}
