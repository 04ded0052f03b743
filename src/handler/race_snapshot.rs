//! Race snapshot creation
//!
//! Converts a "race just ended" event plus the live leaderboard at that
//! instant into a permanent archival record: the race configuration as
//! it existed at end time and the final standings with computed prize
//! payouts. Called exactly once per race by the race scheduler.

use bigdecimal::{BigDecimal, RoundingMode, Zero as _};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    configuration::{AppState, State},
    error::Error,
    model::{
        LeaderboardEntry, NewRaceSnapshot, RaceConfig, RaceSnapshot,
        SnapshotEntry, VersionedPayload,
    },
};

/// Archive a completed race. The insert is a single atomic call with no
/// internal retry: losing a race's final results silently is worse than
/// a loud failure the scheduler can retry.
pub async fn create_race_snapshot(
    app_state: &AppState<State>,
    race_id: &str,
    original_race_end_date: DateTime<Utc>,
    race_type: &str,
    race_config: &RaceConfig,
    final_leaderboard: &[LeaderboardEntry],
) -> Result<RaceSnapshot, Error> {
    let data = build_snapshot(
        original_race_end_date,
        race_type,
        race_config,
        final_leaderboard,
    )?;

    let snapshot = app_state.database.race_snapshot.insert(data).await?;

    info!(
        race_id = race_id,
        snapshot_id = snapshot.id,
        race_name = snapshot.race_name,
        entries = final_leaderboard.len(),
        "race snapshot created"
    );

    Ok(snapshot)
}

/// Assemble the insert payload: derived name, prize-augmented
/// leaderboard, and both payloads wrapped in a versioned envelope. The
/// config is archived verbatim, including distributions that allocate
/// more than the pool.
pub fn build_snapshot(
    original_race_end_date: DateTime<Utc>,
    race_type: &str,
    race_config: &RaceConfig,
    final_leaderboard: &[LeaderboardEntry],
) -> Result<NewRaceSnapshot, Error> {
    let entries: Vec<SnapshotEntry> = final_leaderboard
        .iter()
        .map(|entry| SnapshotEntry {
            entry: entry.clone(),
            prize_won: compute_prize(race_config, entry.rank),
        })
        .collect();

    Ok(NewRaceSnapshot {
        race_type: race_type.to_owned(),
        race_name: derive_race_name(
            race_config,
            race_type,
            original_race_end_date,
        ),
        original_race_end_date,
        race_config_data: serde_json::to_value(VersionedPayload::new(
            race_config,
        ))?,
        leaderboard_entries_data: serde_json::to_value(
            VersionedPayload::new(&entries),
        )?,
    })
}

/// `"{configured name or race type} - {Month} {Year}"`, from the race's
/// real-world end date
fn derive_race_name(
    race_config: &RaceConfig,
    race_type: &str,
    end_date: DateTime<Utc>,
) -> String {
    let base = race_config.name.as_deref().unwrap_or(race_type);
    format!("{} - {}", base, end_date.format("%B %Y"))
}

/// Payout for a rank: the rank's configured fraction of the prize pool,
/// rounded half-up to two decimals; ranks without a distribution entry
/// win zero
fn compute_prize(race_config: &RaceConfig, rank: i32) -> BigDecimal {
    match race_config.prize_distribution.get(&rank.to_string()) {
        Some(fraction) => (&race_config.prize_pool * fraction)
            .with_scale_round(2, RoundingMode::HalfUp),
        None => BigDecimal::zero().with_scale(2),
    }
}
