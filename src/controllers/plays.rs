use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    cache::Resource,
    error::{ApiError, ApiResult, FieldErrors},
    extract::{AppJson, AppPath, AppQuery},
    filters::{PlayFilter, PlayQuery},
    middleware::CatalogAccess,
    models::{
        play::{image_file_name, NewPlay, PlayDetailView, PlayImageView, PlayListView, PlayView},
        Actor, Genre, Play,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/plays", get(list_plays).post(create_play))
        .route("/plays/{id}", get(retrieve_play))
        .route("/plays/{id}/upload-image", post(upload_image))
}

/// Posters live under `<media root>/uploads/plays` and are served from `/media`.
const PLAY_IMAGE_DIR: &str = "uploads/plays";

// GET /api/theater/plays?title=hamlet&genres=2,5&actors=2,5
async fn list_plays(
    State(state): State<Arc<AppState>>,
    _access: CatalogAccess,
    AppQuery(params): AppQuery<PlayQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = PlayFilter::try_from(params)?;
    let key = Resource::Plays.key(&filter.cache_key());
    let pool = state.db.pool.clone();

    super::cached_json(&state.cache, &key, async move {
        let plays = Play::list(&pool, &filter).await?;
        Ok::<_, ApiError>(plays.into_iter().map(PlayListView::from).collect::<Vec<_>>())
    })
    .await
}

// GET /api/theater/plays/{id}
async fn retrieve_play(
    State(state): State<Arc<AppState>>,
    _access: CatalogAccess,
    AppPath(id): AppPath<i64>,
) -> ApiResult<impl IntoResponse> {
    let play = Play::find(&state.db.pool, id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(PlayDetailView::from(play)))
}

fn missing_pk_errors(errors: &mut FieldErrors, field: &str, missing: &[i64]) {
    if !missing.is_empty() {
        errors.insert(
            field.to_string(),
            missing
                .iter()
                .map(|id| format!("Invalid pk \"{id}\" - object does not exist."))
                .collect(),
        );
    }
}

// POST /api/theater/plays
async fn create_play(
    State(state): State<Arc<AppState>>,
    CatalogAccess(user): CatalogAccess,
    AppJson(req): AppJson<NewPlay>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let mut errors = FieldErrors::new();
    let genres = NewPlay::unique_ids(&req.genres);
    let actors = NewPlay::unique_ids(&req.actors);
    missing_pk_errors(&mut errors, "genres", &Genre::missing_ids(&state.db.pool, &genres).await?);
    missing_pk_errors(&mut errors, "actors", &Actor::missing_ids(&state.db.pool, &actors).await?);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // a relation deleted between the check and the insert surfaces as an FK violation
    let play = Play::create(&state.db.pool, &req)
        .await
        .map_err(|e| ApiError::from_write(e, "non_field_errors", "Referenced genre or actor no longer exists."))?;

    state.cache.invalidate(&[Resource::Plays]).await;
    tracing::info!("Play {} '{}' created by {}", play.id, play.title, user.email);

    let view = PlayView {
        id: play.id,
        title: play.title,
        description: play.description,
        genres,
        actors,
    };
    Ok((StatusCode::CREATED, Json(view)))
}

/// The `image` part of a multipart body: original file name and contents.
async fn read_image(mut multipart: Multipart) -> ApiResult<(String, Vec<u8>)> {
    let bad_upload = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.body_text());

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        if field.name() != Some("image") {
            continue;
        }
        let is_image = field.content_type().is_some_and(|ct| ct.starts_with("image/"));
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad_upload)?;

        if !is_image {
            return Err(ApiError::field(
                "image",
                "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
            ));
        }
        if bytes.is_empty() {
            return Err(ApiError::field("image", "The submitted file is empty."));
        }
        return Ok((file_name, bytes.to_vec()));
    }

    Err(ApiError::field("image", "No file was submitted."))
}

// POST /api/theater/plays/{id}/upload-image
async fn upload_image(
    State(state): State<Arc<AppState>>,
    CatalogAccess(user): CatalogAccess,
    AppPath(id): AppPath<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let (original, bytes) = read_image(multipart).await?;

    let play = Play::find(&state.db.pool, id).await?.ok_or(ApiError::NotFound)?;

    let dir = std::path::Path::new(&state.config.media.root).join(PLAY_IMAGE_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot create {}: {e}", dir.display())))?;

    let file_name = image_file_name(&play.play.title, &original);
    let target = dir.join(&file_name);
    tokio::fs::write(&target, &bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("cannot write {}: {e}", target.display())))?;

    let image = format!("{PLAY_IMAGE_DIR}/{file_name}");
    let Some(updated) = Play::set_image(&state.db.pool, id, &image).await? else {
        // removed while the upload was running
        let _ = tokio::fs::remove_file(&target).await;
        return Err(ApiError::NotFound);
    };

    state.cache.invalidate(&[Resource::Plays]).await;
    tracing::info!("Image {} uploaded for play {} by {}", image, id, user.email);

    Ok(Json(PlayImageView::from(updated)))
}
