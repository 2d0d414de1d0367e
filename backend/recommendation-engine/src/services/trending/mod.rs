//! Hourly trending aggregate over recent engagement.

use crate::models::EngagementCounts;
use crate::storage::{ContentStore, RecommendationCache};
use anyhow::Result;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

const ENGAGEMENT_WINDOW_HOURS: i64 = 24;

/// Engagement weights for the trending score.
const LIKE_WEIGHT: f64 = 3.0;
const COMMENT_WEIGHT: f64 = 5.0;
const SHARE_WEIGHT: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct TrendingStats {
    pub videos_scored: u32,
    pub failed: u32,
}

/// `views + 3*likes + 5*comments + 10*shares` over the window.
pub fn trending_score(counts: &EngagementCounts) -> f64 {
    counts.views as f64
        + counts.likes as f64 * LIKE_WEIGHT
        + counts.comments as f64 * COMMENT_WEIGHT
        + counts.shares as f64 * SHARE_WEIGHT
}

pub struct TrendingScoreUpdater {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn RecommendationCache>,
}

impl TrendingScoreUpdater {
    pub fn new(store: Arc<dyn ContentStore>, cache: Arc<dyn RecommendationCache>) -> Self {
        Self { store, cache }
    }

    /// Recompute trending scores from the last 24 hours of engagement and
    /// write each through to the store and the cache. Per-video failures
    /// are logged and the pass continues.
    pub async fn update_trending_scores(&self) -> Result<TrendingStats> {
        let since = Utc::now() - Duration::hours(ENGAGEMENT_WINDOW_HOURS);
        let counts = self.store.engagement_counts_since(since).await?;

        let mut stats = TrendingStats::default();
        for entry in counts {
            let score = trending_score(&entry);
            let result = async {
                self.store.set_trending_score(&entry.video_id, score).await?;
                self.cache.update_trending_score(&entry.video_id, score).await
            }
            .await;

            match result {
                Ok(()) => stats.videos_scored += 1,
                Err(e) => {
                    stats.failed += 1;
                    warn!(video_id = %entry.video_id, error = %e, "failed to write trending score");
                }
            }
        }

        info!(
            scored = stats.videos_scored,
            failed = stats.failed,
            "trending scores updated"
        );
        Ok(stats)
    }
}
