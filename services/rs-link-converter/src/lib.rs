//!
//! src/lib.rs  Andrew Belles  Oct 19th, 2026
//!
//! Converts a Spotify or Qobuz share link into a search link on the
//! other service, optionally scoring a concrete candidate found there
//!
//!

pub mod config;
pub mod errors;
pub mod logging;

pub mod types;
pub mod classify;
pub mod fetch;
pub mod query;
pub mod scoring;
pub mod catalog;
pub mod converter;
pub mod server;

pub use crate::converter::Converter;
pub use crate::errors::{ConvertError, ServiceError};
pub use crate::types::{ConversionResult, Platform};
