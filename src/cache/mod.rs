use crate::{database::Database, models::{Actor, Genre, TheaterHall}, redis_client::RedisClient};
use tracing::{info, warn};

pub mod catalog;

/// Cached catalog resources; each owns the `theater:<resource>:*` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Genres,
    Actors,
    TheaterHalls,
    Plays,
}

impl Resource {
    pub fn prefix(self) -> &'static str {
        match self {
            Resource::Genres => "theater:genres",
            Resource::Actors => "theater:actors",
            Resource::TheaterHalls => "theater:theater_halls",
            Resource::Plays => "theater:plays",
        }
    }

    pub fn key(self, suffix: &str) -> String {
        format!("{}:{}", self.prefix(), suffix)
    }
}

/// JSON response cache in Redis. Without a connection every lookup misses
/// and every write is a no-op, so handlers never branch on it.
#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    db: Database,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: Option<RedisClient>, db: Database, ttl_seconds: u64) -> Self {
        Self { redis, db, ttl_seconds }
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some()
    }

    // Prime catalog lists at startup
    pub async fn warmup_cache(&self) {
        if !self.is_enabled() {
            info!("Cache disabled, skipping warmup");
            return;
        }
        info!("Starting cache warmup...");

        match Genre::all(&self.db.pool).await {
            Ok(genres) => {
                info!("Loaded {} genres", genres.len());
                self.store_list(Resource::Genres, &genres).await;
            }
            Err(e) => warn!("Warmup: failed to load genres: {:?}", e),
        }

        match Actor::all(&self.db.pool).await {
            Ok(actors) => {
                info!("Loaded {} actors", actors.len());
                let views: Vec<_> = actors.into_iter().map(crate::models::actor::ActorView::from).collect();
                self.store_list(Resource::Actors, &views).await;
            }
            Err(e) => warn!("Warmup: failed to load actors: {:?}", e),
        }

        match TheaterHall::all(&self.db.pool).await {
            Ok(halls) => {
                info!("Loaded {} theater halls", halls.len());
                let views: Vec<_> = halls
                    .into_iter()
                    .map(crate::models::theater_hall::TheaterHallView::from)
                    .collect();
                self.store_list(Resource::TheaterHalls, &views).await;
            }
            Err(e) => warn!("Warmup: failed to load theater halls: {:?}", e),
        }

        info!("Cache warmup done");
    }

    async fn store_list<T: serde::Serialize>(&self, resource: Resource, items: &[T]) {
        match serde_json::to_string(items) {
            Ok(json) => self.put(&resource.key("list"), &json).await,
            Err(e) => warn!("Failed to serialize {} for cache: {:?}", resource.prefix(), e),
        }
    }
}
