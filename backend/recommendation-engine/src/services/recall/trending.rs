use super::{CandidateSource, RecallContext};
use crate::models::{Source, SourceCandidate};
use crate::storage::ContentStore;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Trending recall: videos ordered by the externally maintained trending
/// score, optionally narrowed to the user's preferred categories.
pub struct TrendingSource {
    store: Arc<dyn ContentStore>,
}

impl TrendingSource {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CandidateSource for TrendingSource {
    async fn candidates(&self, ctx: &RecallContext<'_>) -> Result<Vec<SourceCandidate>> {
        let categories = (!ctx.preferences.categories.is_empty())
            .then_some(ctx.preferences.categories.as_slice());

        let videos = self.store.trending_videos(categories, ctx.limit).await?;

        debug!(
            user_id = ctx.user_id,
            candidates = videos.len(),
            filtered = categories.is_some(),
            "trending recall completed"
        );

        Ok(videos
            .into_iter()
            .map(|v| SourceCandidate::new(v.video_id, v.trending_score.unwrap_or(0.0)))
            .collect())
    }

    fn source(&self) -> Source {
        Source::Trending
    }
}
