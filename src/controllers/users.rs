use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::{ApiError, ApiResult},
    extract::AppJson,
    middleware::{jwt, AuthUser},
    models::{
        user::{Credentials, UserView},
        User,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(obtain_token))
        .route("/me", get(me))
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access: String,
}

pub fn hash_password(password: &str) -> ApiResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| ApiError::Internal(e.to_string()))
}

// POST /api/user/register
async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<Credentials>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;
    let password_hash = hash_password(&req.password)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash) VALUES (lower($1), $2)
         RETURNING id, email, password_hash, is_staff, is_active, date_joined",
    )
    .bind(req.email.trim())
    .bind(password_hash)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| ApiError::from_write(e, "email", "user with this email already exists."))?;

    tracing::info!("User {} registered", user.id);
    Ok((StatusCode::CREATED, Json(UserView::from(user))))
}

// POST /api/user/token
async fn obtain_token(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<Credentials>,
) -> ApiResult<impl IntoResponse> {
    let user = User::find_active_by_email(req.email.trim(), &state.db.pool)
        .await?
        .filter(|u| u.verify_password(&req.password))
        .ok_or(ApiError::Unauthorized)?;

    let access = jwt::issue(&state.config.jwt, user.id, &user.email, user.is_staff)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(TokenResponse { access }))
}

// GET /api/user/me
async fn me(State(state): State<Arc<AppState>>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    let user = User::find_by_id(user.user_id, &state.db.pool)
        .await?
        .filter(|u| u.is_active)
        .ok_or(ApiError::NotFound)?;
    Ok(Json(UserView::from(user)))
}
