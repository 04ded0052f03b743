use crate::{
    configuration::Config,
    dao::{PoolOption, PoolType},
    error::Error,
    model::{RaceSnapshot, Table},
};

#[derive(Debug)]
pub struct DatabasePool {
    pub race_snapshot: Table<RaceSnapshot>,
    pub pool: PoolType,
}

impl DatabasePool {
    pub async fn new(config: &Config) -> Result<DatabasePool, Error> {
        let pool = PoolOption::new()
            .max_connections(config.max_db_connections)
            .connect(config.database_url.as_str())
            .await?;

        Ok(DatabasePool {
            race_snapshot: Table::new(pool.clone()),
            pool,
        })
    }
}
