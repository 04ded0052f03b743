//! API controller modules

pub mod leaderboard;
pub mod snapshots;
pub mod version;
