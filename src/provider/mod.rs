pub use self::{
    database::DatabasePool, leaderboard::LeaderboardClient,
};

mod database;
mod leaderboard;
