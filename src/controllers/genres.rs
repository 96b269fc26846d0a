use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use validator::Validate;

use crate::{
    cache::Resource,
    error::{ApiError, ApiResult},
    extract::AppJson,
    middleware::CatalogAccess,
    models::{genre::NewGenre, Genre},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/genres", get(list_genres).post(create_genre))
}

// GET /api/theater/genres
async fn list_genres(
    State(state): State<Arc<AppState>>,
    _access: CatalogAccess,
) -> ApiResult<impl IntoResponse> {
    let pool = state.db.pool.clone();
    super::cached_json(&state.cache, &Resource::Genres.key("list"), async move {
        Ok::<_, ApiError>(Genre::all(&pool).await?)
    })
    .await
}

// POST /api/theater/genres
async fn create_genre(
    State(state): State<Arc<AppState>>,
    CatalogAccess(user): CatalogAccess,
    AppJson(req): AppJson<NewGenre>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let genre = Genre::create(&state.db.pool, &req)
        .await
        .map_err(|e| ApiError::from_write(e, "name", "genre with this name already exists."))?;

    state.cache.invalidate(&[Resource::Genres, Resource::Plays]).await;
    tracing::info!("Genre {} created by {}", genre.id, user.email);

    Ok((StatusCode::CREATED, Json(genre)))
}
