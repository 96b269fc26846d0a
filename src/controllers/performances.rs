use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sqlx::PgConnection;
use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult, FieldErrors},
    extract::{AppJson, AppPath, AppQuery},
    filters::{PerformanceFilter, PerformanceQuery},
    middleware::CatalogAccess,
    models::{
        performance::{NewPerformance, PerformancePatch},
        Performance, PerformanceListItem, Play, TheaterHall,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/performances", get(list_performances).post(create_performance))
        .route(
            "/performances/{id}",
            get(retrieve_performance)
                .put(update_performance)
                .patch(partial_update_performance)
                .delete(delete_performance),
        )
}

/* ---------- helpers ---------- */

/// Field errors for foreign keys that point nowhere.
async fn check_references(conn: &mut PgConnection, req: &NewPerformance) -> ApiResult<()> {
    let mut errors = FieldErrors::new();
    if !Play::exists(&mut *conn, req.play).await? {
        errors.insert(
            "play".to_string(),
            vec![format!("Invalid pk \"{}\" - object does not exist.", req.play)],
        );
    }
    if TheaterHall::find(&mut *conn, req.theater_hall).await?.is_none() {
        errors.insert(
            "theater_hall".to_string(),
            vec![format!("Invalid pk \"{}\" - object does not exist.", req.theater_hall)],
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn reference_gone(err: sqlx::Error) -> ApiError {
    ApiError::from_write(err, "non_field_errors", "Referenced play or hall no longer exists.")
}

/// Shared by PUT and PATCH: `build` turns the locked row into the new values.
/// Moving a performance to another hall is refused while sold places would
/// fall outside it.
async fn save<F>(state: &AppState, id: i64, build: F) -> ApiResult<Performance>
where
    F: FnOnce(&Performance) -> NewPerformance,
{
    let mut tx = state.db.pool.begin().await?;

    let current = Performance::lock(&mut tx, id).await?.ok_or(ApiError::NotFound)?;
    let req = build(&current);
    check_references(&mut tx, &req).await?;

    if req.theater_hall != current.theater_hall_id {
        let hall = TheaterHall::find(&mut *tx, req.theater_hall)
            .await?
            .ok_or_else(|| ApiError::field("theater_hall", "Referenced hall no longer exists."))?;
        Performance::sold_extent(&mut tx, id)
            .await?
            .check_fits(&hall)
            .map_err(ApiError::Validation)?;
    }

    let updated = Performance::update(&mut tx, id, &req)
        .await
        .map_err(reference_gone)?
        .ok_or(ApiError::NotFound)?;
    tx.commit().await?;
    Ok(updated)
}

/* ---------- handlers ---------- */

// GET /api/theater/performances?date=2025-03-14&play=1
async fn list_performances(
    State(state): State<Arc<AppState>>,
    _access: CatalogAccess,
    AppQuery(params): AppQuery<PerformanceQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = PerformanceFilter::try_from(params)?;
    let performances = PerformanceListItem::list(&state.db.pool, &filter).await?;
    Ok(Json(performances))
}

async fn retrieve_performance(
    State(state): State<Arc<AppState>>,
    _access: CatalogAccess,
    AppPath(id): AppPath<i64>,
) -> ApiResult<impl IntoResponse> {
    let detail = Performance::detail(&state.db.pool, id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(detail))
}

async fn create_performance(
    State(state): State<Arc<AppState>>,
    CatalogAccess(user): CatalogAccess,
    AppJson(req): AppJson<NewPerformance>,
) -> ApiResult<impl IntoResponse> {
    let mut conn = state.db.pool.acquire().await?;
    check_references(&mut conn, &req).await?;
    drop(conn);

    let performance = Performance::create(&state.db.pool, &req).await.map_err(reference_gone)?;

    tracing::info!(
        "Performance {} of play {} at {} scheduled by {}",
        performance.id,
        performance.play_id,
        performance.show_time,
        user.email
    );
    Ok((StatusCode::CREATED, Json(performance)))
}

// PUT /api/theater/performances/{id}
async fn update_performance(
    State(state): State<Arc<AppState>>,
    _access: CatalogAccess,
    AppPath(id): AppPath<i64>,
    AppJson(req): AppJson<NewPerformance>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(save(&state, id, |_| req).await?))
}

// PATCH /api/theater/performances/{id}
async fn partial_update_performance(
    State(state): State<Arc<AppState>>,
    _access: CatalogAccess,
    AppPath(id): AppPath<i64>,
    AppJson(patch): AppJson<PerformancePatch>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(save(&state, id, |current| patch.apply(current)).await?))
}

async fn delete_performance(
    State(state): State<Arc<AppState>>,
    CatalogAccess(user): CatalogAccess,
    AppPath(id): AppPath<i64>,
) -> ApiResult<impl IntoResponse> {
    if !Performance::delete(&state.db.pool, id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::warn!("Performance {} deleted by {} together with its tickets", id, user.email);
    Ok(StatusCode::NO_CONTENT)
}
