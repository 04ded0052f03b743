use std::{env, fs, ops::Deref, sync::Arc, time::Duration};

use anyhow::Context as _;

use crate::{
    cache::Cache,
    dao::get_path,
    error::Error,
    model::LeaderboardData,
    provider::{DatabasePool, LeaderboardClient},
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub database: DatabasePool,
    pub leaderboard_cache: Cache<LeaderboardData>,
    pub leaderboard_client: LeaderboardClient,
}

impl State {
    pub async fn new(
        config: Config,
        database: DatabasePool,
    ) -> Result<State, Error> {
        Self::init_migrations(&database).await?;
        let leaderboard_client = LeaderboardClient::new(&config)?;
        Ok(Self {
            config,
            database,
            leaderboard_cache: Cache::new(),
            leaderboard_client,
        })
    }

    async fn init_migrations(database: &DatabasePool) -> Result<(), Error> {
        let files = vec!["race_snapshot.sql"];

        let dir = env!("CARGO_MANIFEST_DIR");

        for file in files {
            let data = fs::read_to_string(get_path(dir, file))
                .with_context(|| format!("missing migration file {}", file))?;
            sqlx::query(data.as_str()).execute(&database.pool).await?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_db_connections: u32,
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub leaderboard_api_url: String,
    pub leaderboard_api_key: String,
    pub upstream_timeout: u64,
    pub leaderboard_cache_ttl: Duration,
}

pub fn get_configuration() -> Result<Config, Error> {
    let database_url = env::var("DATABASE_URL")?;
    let max_db_connections = env::var("MAX_DB_CONNECTIONS")?.parse()?;
    let server_host = env::var("SERVER_HOST")?;
    let port = env::var("PORT")?.parse()?;
    let allowed_origins = env::var("ALLOWED_ORIGINS")?
        .split(',')
        .map(|origin| origin.trim().to_owned())
        .filter(|origin| !origin.is_empty())
        .collect();
    let leaderboard_api_url = env::var("LEADERBOARD_API_URL")?;
    url::Url::parse(&leaderboard_api_url)?;
    let leaderboard_api_key = env::var("LEADERBOARD_API_KEY")?;
    let upstream_timeout = env::var("UPSTREAM_TIMEOUT_IN_SEC")?.parse()?;
    let leaderboard_cache_ttl = Duration::from_secs(
        env::var("LEADERBOARD_CACHE_TTL_IN_SEC")?.parse()?,
    );

    let config = Config {
        database_url,
        max_db_connections,
        server_host,
        port,
        allowed_origins,
        leaderboard_api_url,
        leaderboard_api_key,
        upstream_timeout,
        leaderboard_cache_ttl,
    };

    Ok(config)
}

pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";

    let directory = env!("CARGO_MANIFEST_DIR");
    let path = format!("{}/{}", directory, config_file);

    let config_string = fs::read_to_string(path)?;

    parse_config_string(config_string)?;

    Ok(())
}

fn parse_config_string(config: String) -> Result<(), Error> {
    let params: Vec<Option<(&str, &str)>> = config
        .split('\n')
        .map(|s| {
            let element = s.find('=');
            if let Some(e) = element {
                return Some(s.split_at(e));
            }
            None
        })
        .map(|value| {
            if let Some((k, v)) = value {
                return Some((k, &v[1..]));
            }
            None
        })
        .collect();

    for (key, value) in params.into_iter().flatten() {
        env::set_var(key, value);
    }

    Ok(())
}
