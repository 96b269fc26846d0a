use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use validator::Validate;

use crate::{
    cache::Resource,
    error::{ApiError, ApiResult},
    extract::AppJson,
    middleware::CatalogAccess,
    models::{
        theater_hall::{NewTheaterHall, TheaterHallView},
        TheaterHall,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/theater_halls", get(list_halls).post(create_hall))
}

async fn list_halls(
    State(state): State<Arc<AppState>>,
    _access: CatalogAccess,
) -> ApiResult<impl IntoResponse> {
    let pool = state.db.pool.clone();
    super::cached_json(&state.cache, &Resource::TheaterHalls.key("list"), async move {
        let halls = TheaterHall::all(&pool).await?;
        Ok::<_, ApiError>(halls.into_iter().map(TheaterHallView::from).collect::<Vec<_>>())
    })
    .await
}

async fn create_hall(
    State(state): State<Arc<AppState>>,
    CatalogAccess(user): CatalogAccess,
    AppJson(req): AppJson<NewTheaterHall>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let hall = TheaterHall::create(&state.db.pool, &req).await?;

    state.cache.invalidate(&[Resource::TheaterHalls]).await;
    tracing::info!("Theater hall {} ({} seats) created by {}", hall.id, hall.capacity(), user.email);

    Ok((StatusCode::CREATED, Json(TheaterHallView::from(hall))))
}
