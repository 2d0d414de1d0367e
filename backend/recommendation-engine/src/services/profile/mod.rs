//! Interaction history and preference profile resolution.

use crate::models::{Interaction, PreferenceUpdate, UserPreferences};
use crate::storage::ContentStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const TOP_CATEGORIES: usize = 5;
const TOP_HASHTAGS: usize = 10;
const TOP_CREATORS: usize = 5;
const DEFAULT_AVG_DURATION: f64 = 30.0;

pub struct ProfileResolver {
    store: Arc<dyn ContentStore>,
    history_limit: usize,
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn ContentStore>, history_limit: usize) -> Self {
        Self {
            store,
            history_limit,
        }
    }

    /// A user's most recent interactions, newest first.
    pub async fn user_history(&self, user_id: &str) -> Result<Vec<Interaction>> {
        self.store
            .recent_interactions(user_id, None, self.history_limit)
            .await
    }

    /// Load the user's preference profile, inferring and persisting one
    /// from their history on first access.
    pub async fn user_preferences(&self, user_id: &str) -> Result<UserPreferences> {
        if let Some(preferences) = self.store.find_preferences(user_id).await? {
            return Ok(preferences);
        }

        let history = self.user_history(user_id).await?;
        let inferred = self.infer_preferences(user_id, &history).await?;
        self.store.insert_preferences(&inferred).await?;

        info!(
            user_id,
            categories = inferred.categories.len(),
            "inferred preference profile"
        );
        Ok(inferred)
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        update: &PreferenceUpdate,
    ) -> Result<()> {
        self.store.update_preferences(user_id, update).await
    }

    /// Build a profile from the videos behind the user's history.
    async fn infer_preferences(
        &self,
        user_id: &str,
        history: &[Interaction],
    ) -> Result<UserPreferences> {
        let video_ids: Vec<String> = history.iter().map(|i| i.video_id.clone()).collect();
        let videos = self.store.videos_by_ids(&video_ids).await?;

        let mut categories = FrequencyCounter::new();
        let mut hashtags = FrequencyCounter::new();
        let mut creators = FrequencyCounter::new();
        let mut durations: Vec<f64> = Vec::new();

        for video in &videos {
            if let Some(category) = &video.category {
                categories.add(category);
            }
            for tag in &video.hashtags {
                hashtags.add(tag);
            }
            creators.add(&video.creator_id);
            if video.duration > 0.0 {
                durations.push(video.duration);
            }
        }

        let avg_duration = if durations.is_empty() {
            DEFAULT_AVG_DURATION
        } else {
            durations.iter().sum::<f64>() / durations.len() as f64
        };

        debug!(
            user_id,
            videos = videos.len(),
            avg_duration,
            "preference inference input"
        );

        Ok(UserPreferences {
            user_id: user_id.to_string(),
            categories: categories.top(TOP_CATEGORIES),
            hashtags: hashtags.top(TOP_HASHTAGS),
            favorite_creators: creators.top(TOP_CREATORS),
            avg_duration,
        })
    }
}

/// Frequency counter that ranks by count, breaking ties by first
/// occurrence.
struct FrequencyCounter {
    counts: HashMap<String, u32>,
    order: Vec<String>,
}

impl FrequencyCounter {
    fn new() -> Self {
        Self {
            counts: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn add(&mut self, key: &str) {
        let count = self.counts.entry(key.to_string()).or_insert(0);
        if *count == 0 {
            self.order.push(key.to_string());
        }
        *count += 1;
    }

    fn top(mut self, n: usize) -> Vec<String> {
        // Stable sort keeps first-seen order for equal counts.
        let counts = std::mem::take(&mut self.counts);
        self.order
            .sort_by_key(|key| std::cmp::Reverse(counts.get(key).copied().unwrap_or(0)));
        self.order.truncate(n);
        self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InteractionAction, VideoRecord};
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn video(id: &str, category: &str, creator: &str, duration: f64) -> VideoRecord {
        VideoRecord {
            video_id: id.to_string(),
            title: id.to_string(),
            thumbnail_url: String::new(),
            duration,
            view_count: 0,
            like_count: 0,
            share_count: 0,
            creator_id: creator.to_string(),
            creator_name: creator.to_string(),
            category: Some(category.to_string()),
            hashtags: vec![format!("#{}", category)],
            quality_score: None,
            trending_score: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_frequency_counter_ordering() {
        let mut counter = FrequencyCounter::new();
        for key in ["b", "a", "a", "c", "b", "a"] {
            counter.add(key);
        }
        assert_eq!(counter.top(2), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_frequency_counter_tie_keeps_first_seen() {
        let mut counter = FrequencyCounter::new();
        for key in ["x", "y"] {
            counter.add(key);
        }
        assert_eq!(counter.top(5), vec!["x".to_string(), "y".to_string()]);
    }

    #[tokio::test]
    async fn test_inference_persists_profile() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();

        store.add_video(video("v1", "music", "c1", 20.0));
        store.add_video(video("v2", "music", "c1", 40.0));
        store.add_video(video("v3", "gaming", "c2", 60.0));
        for vid in ["v1", "v2", "v3"] {
            store.record_interaction("u1", vid, InteractionAction::View, now);
        }

        let resolver = ProfileResolver::new(store.clone(), 100);
        let prefs = resolver.user_preferences("u1").await.unwrap();

        assert_eq!(prefs.categories[0], "music");
        assert_eq!(prefs.favorite_creators[0], "c1");
        assert!((prefs.avg_duration - 40.0).abs() < 1e-9);

        // Second call reads the persisted profile instead of re-inferring.
        let stored = store.find_preferences("u1").await.unwrap();
        assert!(stored.is_some());
        let again = resolver.user_preferences("u1").await.unwrap();
        assert_eq!(again.categories, prefs.categories);
    }

    #[tokio::test]
    async fn test_empty_history_defaults() {
        let store = Arc::new(MemoryStore::new());
        let resolver = ProfileResolver::new(store, 100);

        let prefs = resolver.user_preferences("nobody").await.unwrap();
        assert!(prefs.categories.is_empty());
        assert_eq!(prefs.avg_duration, DEFAULT_AVG_DURATION);
    }
}
