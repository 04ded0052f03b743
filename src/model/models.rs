use std::collections::HashMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Version tag written into every stored snapshot payload so old rows
/// stay interpretable if the payload shape ever changes
pub const SNAPSHOT_SCHEMA_VERSION: i32 = 1;

// =============================================================================
// RACE CONFIGURATION (owned by the race scheduler, archived verbatim)
// =============================================================================

/// A wager race's configuration as the scheduler hands it over.
/// `prize_distribution` maps a rank (as string) to the fraction of the
/// prize pool paid at that rank. Fractions are not validated to sum to
/// one; a mis-configured pool is archived as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceConfig {
    pub name: Option<String>,
    pub prize_pool: BigDecimal,
    pub prize_distribution: HashMap<String, BigDecimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// =============================================================================
// LEADERBOARD
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub uid: String,
    pub username: String,
    pub wagered: BigDecimal,
    pub rank: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Normalized upstream leaderboard response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardData {
    pub entries: Vec<LeaderboardEntry>,
}

/// A leaderboard entry augmented with its computed payout at snapshot
/// time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
    pub prize_won: BigDecimal,
}

// =============================================================================
// RACE SNAPSHOTS
// =============================================================================

/// Envelope for the JSONB payload columns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedPayload<T> {
    pub schema_version: i32,
    pub data: T,
}

impl<T> VersionedPayload<T> {
    pub fn new(data: T) -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            data,
        }
    }
}

/// The write-once archival record of a completed race. No update path
/// exists anywhere: creation is the only mutation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSnapshot {
    pub id: i32,
    pub race_type: String,
    pub race_name: String,
    pub original_race_end_date: DateTime<Utc>,
    pub race_config_data: serde_json::Value,
    pub leaderboard_entries_data: serde_json::Value,
    pub snapshot_taken_at: DateTime<Utc>,
}

/// Insert payload for a race snapshot; the id and the taken-at stamp
/// are assigned by the database
#[derive(Debug, Clone)]
pub struct NewRaceSnapshot {
    pub race_type: String,
    pub race_name: String,
    pub original_race_end_date: DateTime<Utc>,
    pub race_config_data: serde_json::Value,
    pub leaderboard_entries_data: serde_json::Value,
}

/// Lightweight index row for snapshot selectors; excludes the payload
/// columns
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSnapshotSummary {
    pub id: i32,
    pub race_name: String,
    pub original_race_end_date: DateTime<Utc>,
}
