pub mod actors;
pub mod genres;
pub mod performances;
pub mod plays;
pub mod reservations;
pub mod theater_halls;
pub mod users;

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::{cache::CacheService, error::ApiError, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    let theater = Router::new()
        .merge(genres::routes())
        .merge(actors::routes())
        .merge(theater_halls::routes())
        .merge(plays::routes())
        .merge(performances::routes())
        .merge(reservations::routes());

    Router::new()
        .nest("/theater", theater)
        .nest("/user", users::routes())
}

fn json_body(status: StatusCode, json: String, cache: &'static str) -> Response {
    let mut response = (status, [(header::CONTENT_TYPE, "application/json")], Body::from(json)).into_response();
    response
        .headers_mut()
        .insert("X-Cache", header::HeaderValue::from_static(cache));
    response
}

/// Serves `key` from the cache, or runs `load`, caches and serves its result.
pub(crate) async fn cached_json<T, F>(cache: &CacheService, key: &str, load: F) -> Result<Response, ApiError>
where
    T: Serialize,
    F: std::future::Future<Output = Result<T, ApiError>>,
{
    if let Some(hit) = cache.get(key).await {
        return Ok(json_body(StatusCode::OK, hit, "HIT"));
    }

    let value = load.await?;
    let json = serde_json::to_string(&value).map_err(|e| ApiError::Internal(e.to_string()))?;
    cache.put(key, &json).await;
    Ok(json_body(StatusCode::OK, json, "MISS"))
}
