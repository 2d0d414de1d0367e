use super::{CandidateSource, RecallContext};
use crate::models::{Source, SourceCandidate, VideoFeatures};
use crate::services::features::FeatureIndex;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Pluggable per-video scorer. Anything that maps a feature row to a score
/// in [0, 1] can back the model candidate source; learned models slot in
/// behind this trait without touching the pipeline.
pub trait ModelScorer: Send + Sync {
    fn name(&self) -> &str;
    fn score(&self, features: &VideoFeatures) -> f32;
}

/// Optional fourth candidate source driven by a `ModelScorer`. Only runs
/// when a scorer is injected at engine construction.
pub struct ModelSource {
    features: Arc<FeatureIndex>,
    scorer: Arc<dyn ModelScorer>,
    candidate_multiplier: usize,
}

impl ModelSource {
    pub fn new(
        features: Arc<FeatureIndex>,
        scorer: Arc<dyn ModelScorer>,
        candidate_multiplier: usize,
    ) -> Self {
        Self {
            features,
            scorer,
            candidate_multiplier,
        }
    }
}

#[async_trait]
impl CandidateSource for ModelSource {
    async fn candidates(&self, ctx: &RecallContext<'_>) -> Result<Vec<SourceCandidate>> {
        let snapshot = self.features.snapshot();

        let mut candidates: Vec<SourceCandidate> = snapshot
            .values()
            .map(|f| SourceCandidate::new(f.video_id.clone(), self.scorer.score(f) as f64))
            .collect();

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(ctx.limit * self.candidate_multiplier);

        debug!(
            user_id = ctx.user_id,
            model = self.scorer.name(),
            candidates = candidates.len(),
            "model recall completed"
        );
        Ok(candidates)
    }

    fn source(&self) -> Source {
        Source::Model
    }
}

/// Default scorer: log-scaled popularity blended with an exponential
/// freshness decay. Stands in until a learned model is plugged in.
pub struct EngagementModelScorer;

impl ModelScorer for EngagementModelScorer {
    fn name(&self) -> &str {
        "engagement-heuristic"
    }

    fn score(&self, features: &VideoFeatures) -> f32 {
        let popularity = ((features.view_count as f32).ln_1p() / 20.0).min(1.0);
        let freshness = (-(features.age_in_days as f32) / 7.0).exp();
        0.6 * popularity + 0.4 * freshness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserPreferences;
    use crate::storage::MemoryStore;

    fn features(id: &str, views: u64, age: f64) -> VideoFeatures {
        VideoFeatures {
            video_id: id.to_string(),
            vector: vec![0.0],
            categories: Vec::new(),
            primary_category: "music".to_string(),
            creator_id: "c1".to_string(),
            age_in_days: age,
            view_count: views,
        }
    }

    #[test]
    fn test_heuristic_prefers_popular_and_fresh() {
        let scorer = EngagementModelScorer;
        let hot = scorer.score(&features("a", 1_000_000, 0.5));
        let cold = scorer.score(&features("b", 10, 30.0));
        assert!(hot > cold);
        assert!(hot <= 1.0);
    }

    #[tokio::test]
    async fn test_model_source_ranks_by_scorer() {
        let store = MemoryStore::new();
        store.add_features(features("popular", 500_000, 1.0));
        store.add_features(features("quiet", 50, 20.0));

        let index = Arc::new(FeatureIndex::new());
        index.refresh(&store).await.unwrap();

        let source = ModelSource::new(index, Arc::new(EngagementModelScorer), 3);
        let prefs = UserPreferences {
            user_id: "u1".to_string(),
            categories: Vec::new(),
            hashtags: Vec::new(),
            favorite_creators: Vec::new(),
            avg_duration: 30.0,
        };
        let ctx = RecallContext {
            user_id: "u1",
            history: &[],
            preferences: &prefs,
            limit: 10,
        };

        let candidates = source.candidates(&ctx).await.unwrap();
        assert_eq!(candidates[0].video_id, "popular");
    }
}
