use crate::cache::{CacheService, Resource};
use redis::AsyncCommands;
use tracing::warn;

impl CacheService {
    /// Cached JSON by key. Redis errors are logged and count as a miss.
    pub async fn get(&self, key: &str) -> Option<String> {
        let redis = self.redis.as_ref()?;
        let mut conn = redis.conn.clone();
        let value: redis::RedisResult<Option<String>> = conn.get(key).await;
        match value {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache read failed for {}: {:?}", key, e);
                None
            }
        }
    }

    pub async fn put(&self, key: &str, value: &str) {
        let Some(redis) = self.redis.as_ref() else { return };
        let mut conn = redis.conn.clone();
        let result: Result<(), _> = conn.set_ex(key, value, self.ttl_seconds).await;
        if let Err(e) = result {
            warn!("Cache write failed for {}: {:?}", key, e);
        }
    }

    /// Drops every cached entry of the given resources.
    pub async fn invalidate(&self, resources: &[Resource]) {
        let Some(redis) = self.redis.as_ref() else { return };
        let mut conn = redis.conn.clone();

        for resource in resources {
            let pattern = format!("{}:*", resource.prefix());
            let scanned: redis::RedisResult<Vec<String>> =
                redis::cmd("KEYS").arg(&pattern).query_async(&mut conn).await;
            let keys = match scanned {
                Ok(keys) => keys,
                Err(e) => {
                    warn!("Cache invalidation scan failed for {}: {:?}", pattern, e);
                    continue;
                }
            };
            if keys.is_empty() {
                continue;
            }
            let mut pipe = redis::pipe();
            for key in &keys {
                pipe.del(key);
            }
            let deleted: redis::RedisResult<()> = pipe.query_async(&mut conn).await;
            if let Err(e) = deleted {
                warn!("Cache invalidation failed for {}: {:?}", pattern, e);
            } else {
                tracing::debug!("Invalidated {} cache keys under {}", keys.len(), pattern);
            }
        }
    }
}
