pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod extract;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod services;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub cache: cache::CacheService,
    pub config: config::Config,
}

impl AppState {
    /// Connects to Postgres, runs migrations, bootstraps the admin account
    /// and, when configured, connects Redis and warms the cache in the
    /// background.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        info!("Database connected");

        db.run_migrations().await?;

        if let Some(admin) = &config.admin {
            let hash = controllers::users::hash_password(&admin.password)
                .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))?;
            db.ensure_admin(&admin.email, &hash).await?;
        }

        let redis = match config.cache_url() {
            Some(url) => match redis_client::RedisClient::new(url).await {
                Ok(redis) => {
                    info!("Redis connected");
                    Some(redis)
                }
                Err(e) => {
                    warn!("Redis unavailable, running without cache: {:?}", e);
                    None
                }
            },
            None => None,
        };

        let cache = cache::CacheService::new(redis, db.clone(), config.redis.ttl_seconds);
        let state = Arc::new(Self { db, cache, config });

        let state_for_bg = state.clone();
        tokio::spawn(async move {
            state_for_bg.cache.warmup_cache().await;
        });

        Ok(state)
    }
}

/// The full HTTP application.
pub fn app(state: Arc<AppState>) -> Router {
    let media = ServeDir::new(&state.config.media.root);

    Router::new()
        .route("/", get(|| async { "Theater API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .nest_service("/media", media)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
