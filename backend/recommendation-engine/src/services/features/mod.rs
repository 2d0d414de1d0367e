//! In-memory index of video features and user segments.
//!
//! Both maps are caches of external truth, refreshed wholesale on a timer;
//! a refresh swaps the backing map in a single assignment so concurrent
//! readers never observe a partially loaded map. Segments additionally
//! accept write-through updates from the segmentation sweep.

use crate::models::{Segment, VideoFeatures};
use crate::storage::ContentStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Maximum feature rows held in memory per refresh.
const FEATURE_LOAD_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshStats {
    pub features: usize,
    pub segments: usize,
}

pub struct FeatureIndex {
    features: RwLock<Arc<HashMap<String, Arc<VideoFeatures>>>>,
    segments: RwLock<HashMap<String, Segment>>,
}

impl Default for FeatureIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureIndex {
    pub fn new() -> Self {
        Self {
            features: RwLock::new(Arc::new(HashMap::new())),
            segments: RwLock::new(HashMap::new()),
        }
    }

    /// Reload both maps from the store and swap them in.
    pub async fn refresh(&self, store: &dyn ContentStore) -> Result<RefreshStats> {
        let rows = store.load_video_features(FEATURE_LOAD_LIMIT).await?;
        let features: HashMap<String, Arc<VideoFeatures>> = rows
            .into_iter()
            .map(|f| (f.video_id.clone(), Arc::new(f)))
            .collect();

        let segment_rows = store.load_user_segments().await?;
        let segments: HashMap<String, Segment> = segment_rows
            .into_iter()
            .map(|s| (s.user_id, s.segment))
            .collect();

        let stats = RefreshStats {
            features: features.len(),
            segments: segments.len(),
        };

        *self.features.write().expect("feature index lock poisoned") = Arc::new(features);
        *self.segments.write().expect("feature index lock poisoned") = segments;

        info!(
            features = stats.features,
            segments = stats.segments,
            "feature index refreshed"
        );
        Ok(stats)
    }

    pub fn video(&self, video_id: &str) -> Option<Arc<VideoFeatures>> {
        self.features
            .read()
            .expect("feature index lock poisoned")
            .get(video_id)
            .cloned()
    }

    /// Cheap snapshot of the whole feature map for full scans.
    pub fn snapshot(&self) -> Arc<HashMap<String, Arc<VideoFeatures>>> {
        self.features
            .read()
            .expect("feature index lock poisoned")
            .clone()
    }

    pub fn segment(&self, user_id: &str) -> Option<Segment> {
        self.segments
            .read()
            .expect("feature index lock poisoned")
            .get(user_id)
            .copied()
    }

    /// Write-through used by the segmentation sweep between refreshes.
    pub fn set_segment(&self, user_id: &str, segment: Segment) {
        self.segments
            .write()
            .expect("feature index lock poisoned")
            .insert(user_id.to_string(), segment);
    }

    pub fn len(&self) -> usize {
        self.features
            .read()
            .expect("feature index lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn features(id: &str) -> VideoFeatures {
        VideoFeatures {
            video_id: id.to_string(),
            vector: vec![1.0, 0.0],
            categories: vec!["music".to_string()],
            primary_category: "music".to_string(),
            creator_id: "c1".to_string(),
            age_in_days: 1.0,
            view_count: 100,
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_wholesale() {
        let store = MemoryStore::new();
        store.add_features(features("v1"));

        let index = FeatureIndex::new();
        let stats = index.refresh(&store).await.unwrap();
        assert_eq!(stats.features, 1);
        assert!(index.video("v1").is_some());

        // A later refresh from a store that no longer has v1 drops it.
        let empty_store = MemoryStore::new();
        index.refresh(&empty_store).await.unwrap();
        assert!(index.video("v1").is_none());
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_segment_write_through() {
        let index = FeatureIndex::new();
        assert_eq!(index.segment("u1"), None);

        index.set_segment("u1", Segment::PowerUser);
        assert_eq!(index.segment("u1"), Some(Segment::PowerUser));
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_across_refresh() {
        let store = MemoryStore::new();
        store.add_features(features("v1"));

        let index = FeatureIndex::new();
        index.refresh(&store).await.unwrap();

        let snapshot = index.snapshot();
        index.refresh(&MemoryStore::new()).await.unwrap();

        // The old snapshot still sees the map it was taken from.
        assert!(snapshot.contains_key("v1"));
        assert!(index.is_empty());
    }
}
