//! Batch user segmentation from 30-day activity volume.

use crate::models::{Segment, UserSegment};
use crate::services::features::FeatureIndex;
use crate::storage::ContentStore;
use anyhow::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info};

const ACTIVITY_WINDOW_DAYS: i64 = 30;
const POWER_USER_DAILY_AVERAGE: f64 = 50.0;
const CASUAL_DAILY_AVERAGE: f64 = 5.0;
/// Cap on users processed per sweep.
const USER_SWEEP_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentationStats {
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
}

/// Classification rule: publishing anything makes a creator, otherwise
/// activity volume decides.
pub fn classify(daily_average: f64, has_published: bool) -> Segment {
    if has_published {
        Segment::Creator
    } else if daily_average > POWER_USER_DAILY_AVERAGE {
        Segment::PowerUser
    } else if daily_average < CASUAL_DAILY_AVERAGE {
        Segment::Casual
    } else {
        Segment::Regular
    }
}

pub struct SegmentationService {
    store: Arc<dyn ContentStore>,
    features: Arc<FeatureIndex>,
}

impl SegmentationService {
    pub fn new(store: Arc<dyn ContentStore>, features: Arc<FeatureIndex>) -> Self {
        Self { store, features }
    }

    /// Sweep all users, classify each, and write through to the store and
    /// the feature index. Per-user failures are logged and the sweep
    /// continues.
    pub async fn update_user_segments(&self) -> Result<SegmentationStats> {
        let users = self.store.all_user_ids(USER_SWEEP_LIMIT).await?;
        let mut stats = SegmentationStats::default();

        for user_id in users {
            stats.processed += 1;
            match self.segment_user(&user_id).await {
                Ok(_) => stats.succeeded += 1,
                Err(e) => {
                    stats.failed += 1;
                    error!(user_id = %user_id, error = %e, "failed to segment user");
                }
            }
        }

        info!(
            processed = stats.processed,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "segmentation sweep completed"
        );
        Ok(stats)
    }

    pub async fn segment_user(&self, user_id: &str) -> Result<Segment> {
        let since = Utc::now() - Duration::days(ACTIVITY_WINDOW_DAYS);
        let count = self.store.interaction_count_since(user_id, since).await?;
        let has_published = self.store.has_published_videos(user_id).await?;

        let segment = classify(count as f64 / ACTIVITY_WINDOW_DAYS as f64, has_published);

        self.store
            .upsert_segment(&UserSegment {
                user_id: user_id.to_string(),
                segment,
                updated_at: Utc::now(),
            })
            .await?;
        self.features.set_segment(user_id, segment);

        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InteractionAction, VideoRecord};
    use crate::storage::MemoryStore;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(60.0, false), Segment::PowerUser);
        assert_eq!(classify(1.0, false), Segment::Casual);
        assert_eq!(classify(10.0, false), Segment::Regular);
        // Exactly 50/day is still regular; the threshold is strict.
        assert_eq!(classify(50.0, false), Segment::Regular);
        assert_eq!(classify(5.0, false), Segment::Regular);
    }

    #[test]
    fn test_publishing_wins_over_activity() {
        assert_eq!(classify(60.0, true), Segment::Creator);
        assert_eq!(classify(0.0, true), Segment::Creator);
    }

    #[tokio::test]
    async fn test_sweep_writes_through() {
        let store = Arc::new(MemoryStore::new());
        let features = Arc::new(FeatureIndex::new());
        let now = Utc::now();

        store.add_user("heavy");
        store.add_user("light");

        // 60/day over 30 days for "heavy".
        for _ in 0..1800 {
            store.record_interaction("heavy", "v1", InteractionAction::View, now);
        }
        store.record_interaction("light", "v1", InteractionAction::View, now);

        let service = SegmentationService::new(store.clone(), features.clone());
        let stats = service.update_user_segments().await.unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.failed, 0);
        assert_eq!(features.segment("heavy"), Some(Segment::PowerUser));
        assert_eq!(features.segment("light"), Some(Segment::Casual));

        let stored = store.load_user_segments().await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_uploader_is_creator() {
        let store = Arc::new(MemoryStore::new());
        let features = Arc::new(FeatureIndex::new());

        store.add_user("maker");
        store.add_video(VideoRecord {
            video_id: "v1".to_string(),
            title: String::new(),
            thumbnail_url: String::new(),
            duration: 10.0,
            view_count: 0,
            like_count: 0,
            share_count: 0,
            creator_id: "maker".to_string(),
            creator_name: "maker".to_string(),
            category: None,
            hashtags: Vec::new(),
            quality_score: None,
            trending_score: None,
            created_at: Utc::now(),
        });

        let service = SegmentationService::new(store, features);
        let segment = service.segment_user("maker").await.unwrap();
        assert_eq!(segment, Segment::Creator);
    }
}
