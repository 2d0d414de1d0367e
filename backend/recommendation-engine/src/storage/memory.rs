//! In-memory `ContentStore` / `RecommendationCache` implementations.
//!
//! Used by the test suites and for embedding the engine without external
//! services. Single-process only; all state lives behind one lock per
//! component.

use super::{ContentStore, RecommendationCache};
use crate::models::{
    EngagementCounts, Interaction, InteractionAction, PreferenceUpdate, UserPreferences,
    UserSegment, VideoFeatures, VideoRecord,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::RwLock;

#[derive(Default)]
struct StoreInner {
    users: Vec<String>,
    interactions: Vec<Interaction>,
    videos: HashMap<String, VideoRecord>,
    video_order: Vec<String>,
    features: HashMap<String, VideoFeatures>,
    segments: HashMap<String, UserSegment>,
    preferences: HashMap<String, UserPreferences>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
    fail_interactions: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: impl Into<String>) {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        let user_id = user_id.into();
        if !inner.users.contains(&user_id) {
            inner.users.push(user_id);
        }
    }

    pub fn add_video(&self, video: VideoRecord) {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        if !inner.videos.contains_key(&video.video_id) {
            inner.video_order.push(video.video_id.clone());
        }
        inner.videos.insert(video.video_id.clone(), video);
    }

    pub fn add_features(&self, features: VideoFeatures) {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        inner.features.insert(features.video_id.clone(), features);
    }

    pub fn add_interaction(&self, interaction: Interaction) {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        inner.interactions.push(interaction);
    }

    pub fn record_interaction(
        &self,
        user_id: &str,
        video_id: &str,
        action: InteractionAction,
        timestamp: DateTime<Utc>,
    ) {
        self.add_interaction(Interaction {
            user_id: user_id.to_string(),
            video_id: video_id.to_string(),
            action,
            timestamp,
        });
    }

    /// Make every interaction query fail until reset. Lets tests drive the
    /// degraded paths.
    pub fn set_fail_interactions(&self, fail: bool) {
        self.fail_interactions.store(fail, AtomicOrdering::SeqCst);
    }

    fn check_interactions_available(&self) -> Result<()> {
        if self.fail_interactions.load(AtomicOrdering::SeqCst) {
            bail!("interaction query failed");
        }
        Ok(())
    }
}

fn sort_desc_by<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn recent_interactions(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Interaction>> {
        self.check_interactions_available()?;
        let inner = self.inner.read().expect("memory store lock poisoned");

        let mut matching: Vec<Interaction> = inner
            .interactions
            .iter()
            .filter(|i| i.user_id == user_id)
            .filter(|i| since.map_or(true, |s| i.timestamp >= s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn liked_interactions_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Interaction>> {
        self.check_interactions_available()?;
        let inner = self.inner.read().expect("memory store lock poisoned");

        let mut matching: Vec<Interaction> = inner
            .interactions
            .iter()
            .filter(|i| {
                i.user_id == user_id
                    && i.action == InteractionAction::Like
                    && i.timestamp >= since
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn interaction_count_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<u64> {
        self.check_interactions_available()?;
        let inner = self.inner.read().expect("memory store lock poisoned");
        Ok(inner
            .interactions
            .iter()
            .filter(|i| i.user_id == user_id && i.timestamp >= since)
            .count() as u64)
    }

    async fn engagement_counts_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<EngagementCounts>> {
        self.check_interactions_available()?;
        let inner = self.inner.read().expect("memory store lock poisoned");

        let mut by_video: HashMap<String, EngagementCounts> = HashMap::new();
        for interaction in inner.interactions.iter().filter(|i| i.timestamp >= since) {
            let counts = by_video
                .entry(interaction.video_id.clone())
                .or_insert_with(|| EngagementCounts {
                    video_id: interaction.video_id.clone(),
                    ..Default::default()
                });
            match interaction.action {
                InteractionAction::View => counts.views += 1,
                InteractionAction::Like => counts.likes += 1,
                InteractionAction::Comment => counts.comments += 1,
                InteractionAction::Share => counts.shares += 1,
                _ => {}
            }
        }

        let mut counts: Vec<EngagementCounts> = by_video.into_values().collect();
        counts.sort_by(|a, b| a.video_id.cmp(&b.video_id));
        Ok(counts)
    }

    async fn most_active_users(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(String, u64)>> {
        self.check_interactions_available()?;
        let inner = self.inner.read().expect("memory store lock poisoned");

        let mut counts: HashMap<String, u64> = HashMap::new();
        for interaction in inner.interactions.iter().filter(|i| i.timestamp >= since) {
            *counts.entry(interaction.user_id.clone()).or_insert(0) += 1;
        }

        let mut active: Vec<(String, u64)> = counts.into_iter().collect();
        active.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        active.truncate(limit);
        Ok(active)
    }

    async fn sample_user_ids(&self, exclude_user: &str, size: usize) -> Result<Vec<String>> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        Ok(inner
            .users
            .iter()
            .filter(|u| u.as_str() != exclude_user)
            .take(size)
            .cloned()
            .collect())
    }

    async fn all_user_ids(&self, limit: usize) -> Result<Vec<String>> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        Ok(inner.users.iter().take(limit).cloned().collect())
    }

    async fn has_published_videos(&self, user_id: &str) -> Result<bool> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        Ok(inner.videos.values().any(|v| v.creator_id == user_id))
    }

    async fn find_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        Ok(inner.preferences.get(user_id).cloned())
    }

    async fn insert_preferences(&self, preferences: &UserPreferences) -> Result<()> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        inner
            .preferences
            .insert(preferences.user_id.clone(), preferences.clone());
        Ok(())
    }

    async fn update_preferences(&self, user_id: &str, update: &PreferenceUpdate) -> Result<()> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        let entry = inner
            .preferences
            .entry(user_id.to_string())
            .or_insert_with(|| UserPreferences {
                user_id: user_id.to_string(),
                categories: Vec::new(),
                hashtags: Vec::new(),
                favorite_creators: Vec::new(),
                avg_duration: 30.0,
            });

        if let Some(categories) = &update.categories {
            entry.categories = categories.clone();
        }
        if let Some(hashtags) = &update.hashtags {
            entry.hashtags = hashtags.clone();
        }
        if let Some(creators) = &update.favorite_creators {
            entry.favorite_creators = creators.clone();
        }
        if let Some(avg_duration) = update.avg_duration {
            entry.avg_duration = avg_duration;
        }
        Ok(())
    }

    async fn videos_by_ids(&self, ids: &[String]) -> Result<Vec<VideoRecord>> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        Ok(ids
            .iter()
            .filter_map(|id| inner.videos.get(id).cloned())
            .collect())
    }

    async fn trending_videos(
        &self,
        categories: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<VideoRecord>> {
        let inner = self.inner.read().expect("memory store lock poisoned");

        let mut videos: Vec<VideoRecord> = inner
            .video_order
            .iter()
            .filter_map(|id| inner.videos.get(id))
            .filter(|v| match categories {
                Some(wanted) if !wanted.is_empty() => v
                    .category
                    .as_ref()
                    .map_or(false, |c| wanted.contains(c)),
                _ => true,
            })
            .cloned()
            .collect();

        videos.sort_by(|a, b| {
            let score_a = a.trending_score.unwrap_or(0.0);
            let score_b = b.trending_score.unwrap_or(0.0);
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.view_count.cmp(&a.view_count))
        });
        videos.truncate(limit);
        Ok(videos)
    }

    async fn discovery_videos(
        &self,
        exclude_categories: &[String],
        limit: usize,
    ) -> Result<Vec<VideoRecord>> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        let cutoff = Utc::now() - Duration::days(7);

        let mut videos: Vec<VideoRecord> = inner
            .video_order
            .iter()
            .filter_map(|id| inner.videos.get(id))
            .filter(|v| {
                v.view_count >= 1000
                    && v.created_at >= cutoff
                    && v.category
                        .as_ref()
                        .map_or(true, |c| !exclude_categories.contains(c))
            })
            .cloned()
            .collect();

        sort_desc_by(&mut videos, |v| v.quality_score.unwrap_or(0.0));
        videos.truncate(limit);
        Ok(videos)
    }

    async fn viral_videos(
        &self,
        min_views: u64,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<VideoRecord>> {
        let inner = self.inner.read().expect("memory store lock poisoned");

        let mut videos: Vec<VideoRecord> = inner
            .video_order
            .iter()
            .filter_map(|id| inner.videos.get(id))
            .filter(|v| v.view_count >= min_views && v.created_at >= since)
            .cloned()
            .collect();

        videos.sort_by(|a, b| b.share_count.cmp(&a.share_count));
        videos.truncate(limit);
        Ok(videos)
    }

    async fn load_video_features(&self, limit: usize) -> Result<Vec<VideoFeatures>> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        let mut features: Vec<VideoFeatures> = inner.features.values().cloned().collect();
        features.sort_by(|a, b| a.video_id.cmp(&b.video_id));
        features.truncate(limit);
        Ok(features)
    }

    async fn load_user_segments(&self) -> Result<Vec<UserSegment>> {
        let inner = self.inner.read().expect("memory store lock poisoned");
        let mut segments: Vec<UserSegment> = inner.segments.values().cloned().collect();
        segments.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(segments)
    }

    async fn upsert_segment(&self, segment: &UserSegment) -> Result<()> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        inner
            .segments
            .insert(segment.user_id.clone(), segment.clone());
        Ok(())
    }

    async fn set_trending_score(&self, video_id: &str, score: f64) -> Result<()> {
        let mut inner = self.inner.write().expect("memory store lock poisoned");
        if let Some(video) = inner.videos.get_mut(video_id) {
            video.trending_score = Some(score);
        }
        Ok(())
    }
}

#[derive(Default)]
struct CacheInner {
    recommendations: HashMap<String, Vec<String>>,
    trending: HashMap<String, f64>,
}

#[derive(Default)]
pub struct MemoryCache {
    inner: RwLock<CacheInner>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecommendationCache for MemoryCache {
    async fn user_recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Option<Vec<String>>> {
        let inner = self.inner.read().expect("memory cache lock poisoned");
        Ok(inner
            .recommendations
            .get(user_id)
            .filter(|ids| !ids.is_empty())
            .map(|ids| ids.iter().take(limit).cloned().collect()))
    }

    async fn set_user_recommendations(&self, user_id: &str, video_ids: &[String]) -> Result<()> {
        let mut inner = self.inner.write().expect("memory cache lock poisoned");
        inner
            .recommendations
            .insert(user_id.to_string(), video_ids.to_vec());
        Ok(())
    }

    async fn invalidate_user_recommendations(&self, user_id: &str) -> Result<()> {
        let mut inner = self.inner.write().expect("memory cache lock poisoned");
        inner.recommendations.remove(user_id);
        Ok(())
    }

    async fn update_trending_score(&self, video_id: &str, score: f64) -> Result<()> {
        let mut inner = self.inner.write().expect("memory cache lock poisoned");
        inner.trending.insert(video_id.to_string(), score);
        Ok(())
    }

    async fn trending_video_ids(&self, limit: usize) -> Result<Vec<String>> {
        let inner = self.inner.read().expect("memory cache lock poisoned");
        let mut scored: Vec<(&String, f64)> =
            inner.trending.iter().map(|(id, &s)| (id, s)).collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(id, _)| id.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, trending: f64, views: u64) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            title: format!("video {}", id),
            thumbnail_url: format!("https://cdn.example/{}.jpg", id),
            duration: 30.0,
            view_count: views,
            like_count: 0,
            share_count: 0,
            creator_id: "creator1".to_string(),
            creator_name: "Creator One".to_string(),
            category: Some("music".to_string()),
            hashtags: Vec::new(),
            quality_score: None,
            trending_score: Some(trending),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_trending_order() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store.add_video(video("a", 10.0, 100));
            store.add_video(video("b", 50.0, 10));
            store.add_video(video("c", 50.0, 500));

            let trending = store.trending_videos(None, 10).await.unwrap();
            let ids: Vec<&str> = trending.iter().map(|v| v.video_id.as_str()).collect();
            // Ties on trending score break by view count.
            assert_eq!(ids, vec!["c", "b", "a"]);
        });
    }

    #[test]
    fn test_videos_by_ids_preserves_order() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store.add_video(video("a", 0.0, 0));
            store.add_video(video("b", 0.0, 0));

            let ids = vec!["b".to_string(), "missing".to_string(), "a".to_string()];
            let videos = store.videos_by_ids(&ids).await.unwrap();
            let got: Vec<&str> = videos.iter().map(|v| v.video_id.as_str()).collect();
            assert_eq!(got, vec!["b", "a"]);
        });
    }

    #[test]
    fn test_cache_trending_order() {
        tokio_test::block_on(async {
            let cache = MemoryCache::new();
            cache.update_trending_score("a", 5.0).await.unwrap();
            cache.update_trending_score("b", 50.0).await.unwrap();

            let ids = cache.trending_video_ids(10).await.unwrap();
            assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
        });
    }

    #[test]
    fn test_preference_upsert_is_partial() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            store
                .insert_preferences(&UserPreferences {
                    user_id: "u1".to_string(),
                    categories: vec!["music".to_string()],
                    hashtags: vec!["#live".to_string()],
                    favorite_creators: Vec::new(),
                    avg_duration: 45.0,
                })
                .await
                .unwrap();

            store
                .update_preferences(
                    "u1",
                    &PreferenceUpdate {
                        categories: Some(vec!["gaming".to_string()]),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            let prefs = store.find_preferences("u1").await.unwrap().unwrap();
            assert_eq!(prefs.categories, vec!["gaming".to_string()]);
            assert_eq!(prefs.hashtags, vec!["#live".to_string()]);
            assert_eq!(prefs.avg_duration, 45.0);
        });
    }
}
