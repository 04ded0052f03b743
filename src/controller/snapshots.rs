use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{
    configuration::{AppState, State},
    error::Error,
};

/// Snapshot index for a race category, most recent first. A missing
/// `type` parameter is rejected with 400 by query extraction before
/// this handler runs.
#[get("/snapshots/list")]
async fn list(
    state: web::Data<AppState<State>>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, Error> {
    let snapshots = state
        .database
        .race_snapshot
        .get_list_by_type(&query.race_type)
        .await?;

    Ok(HttpResponse::Ok().json(snapshots))
}

/// Full archived payload for one snapshot; an unknown id is 404, not
/// an error
#[get("/snapshots/{id}")]
async fn by_id(
    state: web::Data<AppState<State>>,
    path: web::Path<i32>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();

    match state.database.race_snapshot.get_by_id(id).await? {
        Some(snapshot) => {
            Ok(HttpResponse::Ok().json(SnapshotResponse {
                race_config_data: snapshot.race_config_data,
                leaderboard_entries_data: snapshot.leaderboard_entries_data,
            }))
        },
        None => Ok(HttpResponse::NotFound().finish()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub race_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    pub race_config_data: serde_json::Value,
    pub leaderboard_entries_data: serde_json::Value,
}
