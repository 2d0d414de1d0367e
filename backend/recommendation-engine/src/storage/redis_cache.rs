use super::RecommendationCache;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;

/// Redis key prefixes
const RECOMMENDATIONS_KEY: &str = "recommendations:";
const TRENDING_KEY: &str = "trending:all";

/// `RecommendationCache` backed by Redis: a list per user for precomputed
/// recommendation IDs and one sorted set for trending scores.
pub struct RedisCache {
    client: redis::Client,
    recommendation_ttl_secs: u64,
}

impl RedisCache {
    pub fn new(client: redis::Client, recommendation_ttl_secs: u64) -> Self {
        Self {
            client,
            recommendation_ttl_secs,
        }
    }

    pub fn from_url(url: &str, recommendation_ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(url).context("Invalid Redis URL")?;
        Ok(Self::new(client, recommendation_ttl_secs))
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to get Redis connection")
    }

    fn recommendations_key(user_id: &str) -> String {
        format!("{}{}", RECOMMENDATIONS_KEY, user_id)
    }
}

#[async_trait]
impl RecommendationCache for RedisCache {
    async fn user_recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Option<Vec<String>>> {
        let mut conn = self.connection().await?;
        let key = Self::recommendations_key(user_id);

        let ids: Vec<String> = conn
            .lrange(&key, 0, limit as isize - 1)
            .await
            .context("Failed to read cached recommendations")?;

        if ids.is_empty() {
            return Ok(None);
        }
        Ok(Some(ids))
    }

    async fn set_user_recommendations(&self, user_id: &str, video_ids: &[String]) -> Result<()> {
        let mut conn = self.connection().await?;
        let key = Self::recommendations_key(user_id);

        conn.del::<_, ()>(&key)
            .await
            .context("Failed to clear cached recommendations")?;

        if video_ids.is_empty() {
            return Ok(());
        }

        conn.rpush::<_, _, ()>(&key, video_ids)
            .await
            .context("Failed to store recommendations")?;
        conn.expire::<_, ()>(&key, self.recommendation_ttl_secs as i64)
            .await
            .context("Failed to set recommendation TTL")?;

        Ok(())
    }

    async fn invalidate_user_recommendations(&self, user_id: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(Self::recommendations_key(user_id))
            .await
            .context("Failed to invalidate cached recommendations")?;
        Ok(())
    }

    async fn update_trending_score(&self, video_id: &str, score: f64) -> Result<()> {
        let mut conn = self.connection().await?;
        conn.zadd::<_, _, _, ()>(TRENDING_KEY, video_id, score)
            .await
            .context("Failed to update trending score")?;
        Ok(())
    }

    async fn trending_video_ids(&self, limit: usize) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;

        // ZREVRANGE trending:all 0 {limit-1}
        let ids: Vec<String> = conn
            .zrevrange(TRENDING_KEY, 0, limit as isize - 1)
            .await
            .context("Failed to fetch trending videos from Redis")?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(
            RedisCache::recommendations_key("user123"),
            "recommendations:user123"
        );
    }
}
