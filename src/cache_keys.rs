//! Centralized cache namespaces and key builders
//!
//! All cache keys used by controllers are defined here to prevent
//! duplication and drift between call sites.

use serde::Serialize;

use crate::error::Error;

// Namespaces; bulk-invalidated independently
pub const NS_LEADERBOARD: &str = "leaderboard";

// Leaderboard endpoints
pub const CURRENT_LEADERBOARD: &str = "current";

/// Build a cache key from string parts: `"part1_part2"`.
pub fn build_cache_key(parts: &[&str]) -> String {
    parts.join("_")
}

/// Build a cache key with a structured part. The part goes through
/// `serde_json::to_value` first, which stores object keys in a sorted
/// map, so logically equal requests produce the same key no matter the
/// field declaration order of the caller's type.
pub fn build_cache_key_with<T: Serialize>(
    prefix: &str,
    part: &T,
) -> Result<String, Error> {
    let canonical = serde_json::to_value(part)?;
    Ok(format!("{}_{}", prefix, canonical))
}
