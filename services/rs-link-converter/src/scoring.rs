//!
//! src/scoring.rs  Andrew Belles  Oct 19th, 2026
//!
//! Heuristic confidence that a candidate found on the target service is
//! the item the source link points at. Text comparison only, this never
//! claims the two are the same recording.
//!
//! | content        | rule                                   | score |
//! |----------------|----------------------------------------|-------|
//! | track / album  | title exact + artist contained         | 100   |
//! |                | title exact only                       | 80    |
//! |                | artist contained only                  | 60    |
//! |                | neither                                | 40    |
//! | artist         | name exact                             | 100   |
//! |                | name contained                         | 80    |
//! |                | otherwise                              | 50    |
//! | anything else  |                                        | 60    |
//!
//! Exact and contained are both case-insensitive, containment is checked
//! in both directions.
//!

use crate::types::{Confidence, Metadata};

const DEFAULT_SCORE: u8 = 60;

fn same_text(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn contains_either_way(a: &str, b: &str) -> bool {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    a.contains(&b) || b.contains(&a)
}

/// Blank or missing artists never match anything
fn artist_match(original: Option<&str>, candidate: Option<&str>) -> bool {
    match (original, candidate) {
        (Some(a), Some(b)) if !a.trim().is_empty() && !b.trim().is_empty() =>
            contains_either_way(a, b),
        _ => false
    }
}

fn titled_score(title_match: bool, artist_match: bool) -> u8 {
    match (title_match, artist_match) {
        (true, true)   => 100,
        (true, false)  => 80,
        (false, true)  => 60,
        (false, false) => 40
    }
}

fn name_score(original: &str, candidate: &str) -> u8 {
    if same_text(original, candidate) {
        100
    } else if contains_either_way(original, candidate) {
        80
    } else {
        50
    }
}

/// Scores `candidate` against `original`. Total and deterministic.
pub fn score(original: &Metadata, candidate: &Metadata) -> Confidence {
    let value = match (original, candidate) {
        (
            Metadata::Track { title: a, artist: artist_a, .. },
            Metadata::Track { title: b, artist: artist_b, .. }
        ) | (
            Metadata::Album { title: a, artist: artist_a, .. },
            Metadata::Album { title: b, artist: artist_b, .. }
        ) => titled_score(
            same_text(a, b),
            artist_match(artist_a.as_deref(), artist_b.as_deref())
        ),
        (Metadata::Artist { name: a }, Metadata::Artist { name: b }) => name_score(a, b),
        _ => DEFAULT_SCORE
    };
    Confidence::new(value)
}
