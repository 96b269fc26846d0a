use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::ApiResult,
    extract::{AppJson, AppQuery},
    filters::{Page, PageQuery},
    middleware::AuthUser,
    models::{
        reservation::{NewReservation, ReservationListView},
        Reservation,
    },
    services::booking,
    AppState,
};

const RESERVATIONS_PATH: &str = "/api/theater/reservations";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/reservations", get(list_reservations).post(create_reservation))
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

// GET /api/theater/reservations?page=2
async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppQuery(params): AppQuery<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let requested = Page::from_query(&params, state.config.pagination.reservations_page_size)?;

    let count = Reservation::count_for_user(&state.db.pool, user.user_id).await?;
    let page = requested.clamp_to(count)?;
    let results = Reservation::page_for_user(&state.db.pool, user.user_id, page.limit(), page.offset()).await?;
    let (previous, next) = page.links(RESERVATIONS_PATH, count);

    Ok(Json(Paginated::<ReservationListView> { count, next, previous, results }))
}

// POST /api/theater/reservations
async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppJson(req): AppJson<NewReservation>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let reservation = booking::reserve(&state.db.pool, user.user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}
