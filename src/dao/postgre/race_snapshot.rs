use sqlx::Error;

use crate::model::{
    NewRaceSnapshot, RaceSnapshot, RaceSnapshotSummary, Table,
};

impl Table<RaceSnapshot> {
    /// Single atomic insert; the row's id and taken-at stamp come from
    /// the database. There is deliberately no update counterpart: a
    /// snapshot is write-once.
    pub async fn insert(
        &self,
        data: NewRaceSnapshot,
    ) -> Result<RaceSnapshot, Error> {
        const SQL: &str = r#"
        INSERT INTO race_snapshot (
            race_type,
            race_name,
            original_race_end_date,
            race_config_data,
            leaderboard_entries_data
        )
        VALUES ($1, $2, $3, $4, $5)
        RETURNING
            id,
            race_type,
            race_name,
            original_race_end_date,
            race_config_data,
            leaderboard_entries_data,
            snapshot_taken_at
        "#;

        sqlx::query_as(SQL)
            .bind(&data.race_type)
            .bind(&data.race_name)
            .bind(data.original_race_end_date)
            .bind(&data.race_config_data)
            .bind(&data.leaderboard_entries_data)
            .fetch_one(&self.pool)
            .await
    }

    /// Index rows for a snapshot selector, most recent race first
    pub async fn get_list_by_type(
        &self,
        race_type: &str,
    ) -> Result<Vec<RaceSnapshotSummary>, Error> {
        const SQL: &str = r#"
        SELECT
            id,
            race_name,
            original_race_end_date
        FROM race_snapshot
        WHERE race_type = $1
        ORDER BY original_race_end_date DESC
        "#;

        sqlx::query_as(SQL)
            .bind(race_type)
            .fetch_all(&self.pool)
            .await
    }

    /// Full payload fetch; `None` for an unknown id, never an error
    pub async fn get_by_id(
        &self,
        id: i32,
    ) -> Result<Option<RaceSnapshot>, Error> {
        const SQL: &str = r#"
        SELECT
            id,
            race_type,
            race_name,
            original_race_end_date,
            race_config_data,
            leaderboard_entries_data,
            snapshot_taken_at
        FROM race_snapshot
        WHERE id = $1
        "#;

        sqlx::query_as(SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }
}
