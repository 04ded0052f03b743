use bigdecimal::BigDecimal;
use serde::Deserialize;
use tracing::debug;

use crate::{
    configuration::Config,
    error::Error,
    model::{LeaderboardData, LeaderboardEntry},
};

/// Raw record as the affiliate API returns it; shape owned by the
/// third-party provider
#[derive(Debug, Deserialize)]
struct RawLeaderboardEntry {
    uid: String,
    name: String,
    wagered: BigDecimal,
    #[serde(default)]
    avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLeaderboardResponse {
    results: Vec<RawLeaderboardEntry>,
}

/// Client for the third-party affiliate leaderboard API. The API is
/// slow and rate-limited; every call site goes through the cache.
#[derive(Debug)]
pub struct LeaderboardClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl LeaderboardClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.upstream_timeout))
            .build()?;

        Ok(LeaderboardClient {
            client,
            url: config.leaderboard_api_url.to_owned(),
            api_key: config.leaderboard_api_key.to_owned(),
        })
    }

    /// Fetch the live leaderboard and normalize it: entries sorted by
    /// wagered volume descending, ranks assigned from one
    pub async fn fetch_leaderboard(&self) -> Result<LeaderboardData, Error> {
        debug!("fetching upstream leaderboard");

        let response = self
            .client
            .get(&self.url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json::<RawLeaderboardResponse>()
            .await?;

        Ok(normalize(response.results))
    }
}

fn normalize(mut records: Vec<RawLeaderboardEntry>) -> LeaderboardData {
    records.sort_by(|a, b| b.wagered.cmp(&a.wagered));

    let entries = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| LeaderboardEntry {
            uid: record.uid,
            username: record.name,
            wagered: record.wagered,
            rank: index as i32 + 1,
            avatar_url: record.avatar,
        })
        .collect();

    LeaderboardData { entries }
}
