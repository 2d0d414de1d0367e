//! Collaborator contracts for the durable store and the key-value cache.
//!
//! Both are injected at engine construction so tests can substitute the
//! in-memory implementations from [`memory`].

mod memory;
mod redis_cache;

pub use memory::{MemoryCache, MemoryStore};
pub use redis_cache::RedisCache;

use crate::models::{
    EngagementCounts, Interaction, PreferenceUpdate, UserPreferences, UserSegment, VideoFeatures,
    VideoRecord,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read/write contract over the durable store. The store is the source of
/// truth; everything the engine keeps in memory is a refreshable copy.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// A user's interactions, newest first, optionally bounded below.
    async fn recent_interactions(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Interaction>>;

    /// A user's like interactions after `since`, newest first.
    async fn liked_interactions_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Interaction>>;

    async fn interaction_count_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u64>;

    /// Per-video view/like/comment/share counts over interactions after
    /// `since`.
    async fn engagement_counts_since(&self, since: DateTime<Utc>)
        -> Result<Vec<EngagementCounts>>;

    /// `(user_id, interaction count)` pairs, most active first.
    async fn most_active_users(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(String, u64)>>;

    /// Random-ish sample of user IDs excluding `exclude_user`.
    async fn sample_user_ids(&self, exclude_user: &str, size: usize) -> Result<Vec<String>>;

    async fn all_user_ids(&self, limit: usize) -> Result<Vec<String>>;

    async fn has_published_videos(&self, user_id: &str) -> Result<bool>;

    async fn find_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>>;

    async fn insert_preferences(&self, preferences: &UserPreferences) -> Result<()>;

    /// Upsert; `None` fields of the update are left untouched.
    async fn update_preferences(&self, user_id: &str, update: &PreferenceUpdate) -> Result<()>;

    /// Full records for the given IDs, in input order; unknown IDs are
    /// omitted.
    async fn videos_by_ids(&self, ids: &[String]) -> Result<Vec<VideoRecord>>;

    /// Videos ordered by trending score, then view count, both descending.
    /// `categories` filters to videos in any of the given categories.
    async fn trending_videos(
        &self,
        categories: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<VideoRecord>>;

    /// Recent videos (last 7 days, at least 1000 views) outside the given
    /// categories, ordered by quality score descending.
    async fn discovery_videos(
        &self,
        exclude_categories: &[String],
        limit: usize,
    ) -> Result<Vec<VideoRecord>>;

    /// Videos with at least `min_views` views created after `since`,
    /// ordered by share count descending.
    async fn viral_videos(
        &self,
        min_views: u64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<VideoRecord>>;

    async fn load_video_features(&self, limit: usize) -> Result<Vec<VideoFeatures>>;

    async fn load_user_segments(&self) -> Result<Vec<UserSegment>>;

    async fn upsert_segment(&self, segment: &UserSegment) -> Result<()>;

    async fn set_trending_score(&self, video_id: &str, score: f64) -> Result<()>;
}

/// Contract over the fast key-value cache. Best effort only; the store
/// remains the source of truth.
#[async_trait]
pub trait RecommendationCache: Send + Sync {
    /// Precomputed recommendation ID list for a user, if one is cached.
    async fn user_recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Option<Vec<String>>>;

    async fn set_user_recommendations(&self, user_id: &str, video_ids: &[String]) -> Result<()>;

    async fn invalidate_user_recommendations(&self, user_id: &str) -> Result<()>;

    async fn update_trending_score(&self, video_id: &str, score: f64) -> Result<()>;

    /// Trending video IDs, highest score first.
    async fn trending_video_ids(&self, limit: usize) -> Result<Vec<String>>;
}
