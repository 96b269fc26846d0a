pub mod jwt;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, Method},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::{error::ApiError, models::User, AppState};

#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub is_staff: bool,
}

impl AuthUser {
    async fn from_basic(encoded: &str, state: &AppState) -> Result<Self, ApiError> {
        let decoded = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| ApiError::Unauthorized)?;
        let credentials = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

        // email:password
        let (email, password) = credentials.split_once(':').ok_or(ApiError::Unauthorized)?;

        let user = User::find_active_by_email(email, &state.db.pool)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        if !user.verify_password(password) {
            return Err(ApiError::Unauthorized);
        }

        Ok(AuthUser { user_id: user.id, email: user.email, is_staff: user.is_staff })
    }

    fn from_bearer(token: &str, state: &AppState) -> Result<Self, ApiError> {
        let claims = jwt::verify(&state.config.jwt, token.trim()).map_err(|e| {
            tracing::debug!("rejected bearer token: {}", e);
            ApiError::Unauthorized
        })?;
        Ok(AuthUser { user_id: claims.sub, email: claims.email, is_staff: claims.is_staff })
    }
}

// Authorization: Bearer <jwt> | Basic base64(email:password)
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            AuthUser::from_bearer(token, state)
        } else if let Some(encoded) = auth_header.strip_prefix("Basic ") {
            AuthUser::from_basic(encoded, state).await
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Reads for any authenticated user, writes for staff only.
pub fn admin_or_authenticated_read_only(method: &Method, user: Option<&AuthUser>) -> Result<(), ApiError> {
    match user {
        None => Err(ApiError::Unauthorized),
        Some(_) if is_safe(method) => Ok(()),
        Some(u) if u.is_staff => Ok(()),
        Some(_) => Err(ApiError::Forbidden),
    }
}

/// Extractor applying [`admin_or_authenticated_read_only`] to the request
/// method. Catalog handlers take this instead of a bare [`AuthUser`].
#[derive(Debug, Clone)]
pub struct CatalogAccess(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for CatalogAccess {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        admin_or_authenticated_read_only(&parts.method, Some(&user))?;
        Ok(CatalogAccess(user))
    }
}
