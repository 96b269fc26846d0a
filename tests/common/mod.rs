//! Helpers shared by the router test suites.
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use theater_api::{
    app,
    cache::CacheService,
    config::{
        AppConfig, Config, DatabaseConfig, FeatureFlags, JwtConfig, MediaConfig, PaginationConfig, RedisConfig,
    },
    database::Database,
    middleware::jwt,
    AppState,
};

pub fn test_config(database_url: &str, media_root: &str) -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            rust_log: "theater_api=debug".to_string(),
        },
        database: DatabaseConfig { url: database_url.to_string(), pool_size: 5 },
        redis: RedisConfig { url: None, ttl_seconds: 60 },
        jwt: JwtConfig { secret: "test-secret".to_string(), expires_in_hours: 1 },
        admin: None,
        pagination: PaginationConfig { reservations_page_size: 2 },
        media: MediaConfig { root: media_root.to_string() },
        features: FeatureFlags { enable_cache: false },
    }
}

/// Router over `db` without Redis.
pub fn router(db: Database, config: &Config) -> Router {
    let cache = CacheService::new(None, db.clone(), config.redis.ttl_seconds);
    app(Arc::new(AppState { db, cache, config: config.clone() }))
}

pub fn bearer_for(config: &Config, user_id: i64, email: &str, is_staff: bool) -> String {
    let token = jwt::issue(&config.jwt, user_id, email, is_staff).expect("token");
    format!("Bearer {token}")
}

pub async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

pub async fn send(app: Router, method: Method, uri: &str, auth: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    read_json(app.oneshot(request).await.expect("response")).await
}

/// Multipart body with a single file part.
pub fn multipart_request(uri: &str, auth: &str, part_name: &str, content_type: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--XBOUNDARY\r\n\
         Content-Disposition: form-data; name=\"{part_name}\"; filename=\"poster.png\"\r\n\
         Content-Type: {content_type}\r\n\r\n\
         {content}\r\n\
         --XBOUNDARY--\r\n"
    );
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, auth)
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
        .body(Body::from(body))
        .expect("request")
}
