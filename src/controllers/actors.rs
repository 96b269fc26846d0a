use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use std::sync::Arc;
use validator::Validate;

use crate::{
    cache::Resource,
    error::{ApiError, ApiResult},
    extract::AppJson,
    middleware::CatalogAccess,
    models::{
        actor::{ActorView, NewActor},
        Actor,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/actors", get(list_actors).post(create_actor))
}

async fn list_actors(
    State(state): State<Arc<AppState>>,
    _access: CatalogAccess,
) -> ApiResult<impl IntoResponse> {
    let pool = state.db.pool.clone();
    super::cached_json(&state.cache, &Resource::Actors.key("list"), async move {
        let actors = Actor::all(&pool).await?;
        Ok::<_, ApiError>(actors.into_iter().map(ActorView::from).collect::<Vec<_>>())
    })
    .await
}

async fn create_actor(
    State(state): State<Arc<AppState>>,
    CatalogAccess(user): CatalogAccess,
    AppJson(req): AppJson<NewActor>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let actor = Actor::create(&state.db.pool, &req).await?;

    state.cache.invalidate(&[Resource::Actors]).await;
    tracing::info!("Actor {} created by {}", actor.id, user.email);

    Ok((StatusCode::CREATED, Json(ActorView::from(actor))))
}
