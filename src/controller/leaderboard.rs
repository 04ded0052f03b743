use actix_web::{get, web, Responder};

use crate::{
    cache::{with_cache, FetchOptions},
    cache_keys,
    configuration::{AppState, State},
    error::Error,
};

/// Live leaderboard, served through the cache: fresh hits skip the
/// upstream call, expired entries are served stale while one caller
/// refreshes, upstream failures fall back to stale data
#[get("/leaderboard")]
async fn index(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let data = with_cache(
        &state.leaderboard_cache,
        cache_keys::CURRENT_LEADERBOARD,
        || async { state.leaderboard_client.fetch_leaderboard().await },
        FetchOptions {
            namespace: cache_keys::NS_LEADERBOARD,
            ttl: state.config.leaderboard_cache_ttl,
            ..FetchOptions::default()
        },
    )
    .await?;

    Ok(web::Json(data))
}

/// Cache counters for observability
#[get("/leaderboard/cache-stats")]
async fn stats(
    state: web::Data<AppState<State>>,
) -> Result<impl Responder, Error> {
    let stats = state.leaderboard_cache.stats().await;

    Ok(web::Json(serde_json::json!({
        "hits": stats.hits,
        "misses": stats.misses,
        "staleHits": stats.stale_hits,
        "keys": stats.keys,
    })))
}
