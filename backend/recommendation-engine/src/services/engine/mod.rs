//! Request-path orchestration and the batch operations exposed to the
//! external API layer.

use crate::config::Config;
use crate::error::Result;
use crate::models::{Recommendation, Segment, Source, VideoSummary};
use crate::services::diversity::DiversitySelector;
use crate::services::enrichment::Enricher;
use crate::services::experiments::ExperimentRegistry;
use crate::services::features::FeatureIndex;
use crate::services::profile::ProfileResolver;
use crate::services::ranking::HybridRanker;
use crate::services::recall::{
    gather_candidates, merge_candidates, CandidateSource, CollaborativeSource, ContentBasedSource,
    ModelScorer, ModelSource, RecallContext, TrendingSource,
};
use crate::services::segmentation::{SegmentationService, SegmentationStats};
use crate::services::similarity::cosine_similarity;
use crate::services::trending::{TrendingScoreUpdater, TrendingStats};
use crate::storage::{ContentStore, RecommendationCache};
use chrono::{Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Power users only see trending content younger than this many days.
const POWER_USER_FRESHNESS_DAYS: f64 = 3.0;

/// Viral mix-in thresholds for anonymous sessions.
const VIRAL_MIN_VIEWS: u64 = 100_000;
const VIRAL_WINDOW_DAYS: i64 = 3;
const VIRAL_SCORE_DIVISOR: f64 = 1000.0;

const DISCOVERY_DEFAULT_QUALITY: f64 = 0.5;

/// Outcome of one cache-warming pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarmCacheStats {
    pub users_considered: u32,
    pub warmed: u32,
    pub failed: u32,
}

/// The recommendation engine. All collaborators are injected at
/// construction; one instance serves concurrent requests.
pub struct RecommendationEngine {
    store: Arc<dyn ContentStore>,
    cache: Arc<dyn RecommendationCache>,
    features: Arc<FeatureIndex>,
    profile: ProfileResolver,
    ranker: HybridRanker,
    diversity: DiversitySelector,
    enricher: Enricher,
    experiments: ExperimentRegistry,
    segmentation: SegmentationService,
    trending_updater: TrendingScoreUpdater,
    sources: Vec<Arc<dyn CandidateSource>>,
    config: Config,
}

impl RecommendationEngine {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn RecommendationCache>,
        features: Arc<FeatureIndex>,
        config: Config,
    ) -> Self {
        Self::with_model(store, cache, features, config, None)
    }

    /// Build the engine with an optional pluggable model scorer as a
    /// fourth candidate source.
    pub fn with_model(
        store: Arc<dyn ContentStore>,
        cache: Arc<dyn RecommendationCache>,
        features: Arc<FeatureIndex>,
        config: Config,
        model: Option<Arc<dyn ModelScorer>>,
    ) -> Self {
        let mut sources: Vec<Arc<dyn CandidateSource>> = vec![
            Arc::new(CollaborativeSource::new(store.clone(), &config.recall)),
            Arc::new(ContentBasedSource::new(
                features.clone(),
                config.recall.candidate_multiplier,
            )),
            Arc::new(TrendingSource::new(store.clone())),
        ];
        if let Some(scorer) = model {
            sources.push(Arc::new(ModelSource::new(
                features.clone(),
                scorer,
                config.recall.candidate_multiplier,
            )));
        }

        Self {
            profile: ProfileResolver::new(store.clone(), config.recall.history_limit),
            ranker: HybridRanker::new(config.hybrid.clone(), features.clone()),
            diversity: DiversitySelector::new(&config.diversity),
            enricher: Enricher::new(store.clone()),
            experiments: ExperimentRegistry::new(),
            segmentation: SegmentationService::new(store.clone(), features.clone()),
            trending_updater: TrendingScoreUpdater::new(store.clone(), cache.clone()),
            sources,
            store,
            cache,
            features,
            config,
        }
    }

    pub fn feature_index(&self) -> Arc<FeatureIndex> {
        self.features.clone()
    }

    /// The full personalized pipeline. Any failure inside degrades to
    /// trending recommendations rather than surfacing an error.
    pub async fn get_personalized_recommendations(
        &self,
        user_id: &str,
        limit: usize,
        exclude_viewed: bool,
    ) -> Result<Vec<Recommendation>> {
        match self
            .personalized_pipeline(user_id, limit, exclude_viewed)
            .await
        {
            Ok(recommendations) => Ok(recommendations),
            Err(e) => {
                error!(
                    user_id,
                    error = %e,
                    "personalized pipeline failed, falling back to trending"
                );
                self.get_trending_recommendations(Some(user_id), limit, self.features.segment(user_id))
                    .await
            }
        }
    }

    async fn personalized_pipeline(
        &self,
        user_id: &str,
        limit: usize,
        exclude_viewed: bool,
    ) -> anyhow::Result<Vec<Recommendation>> {
        let history = self.profile.user_history(user_id).await?;
        let preferences = self.profile.user_preferences(user_id).await?;

        let ctx = RecallContext {
            user_id,
            history: &history,
            preferences: &preferences,
            limit,
        };
        let outputs = gather_candidates(&self.sources, &ctx).await;
        let merged = merge_candidates(outputs);

        let segment = self.features.segment(user_id);
        let mut scored = self.ranker.score(merged, segment);

        if exclude_viewed {
            let viewed: HashSet<&str> = history.iter().map(|i| i.video_id.as_str()).collect();
            scored.retain(|c| !viewed.contains(c.candidate.video_id.as_str()));
        }

        let selected = self.diversity.select(scored, limit);
        let recommendations = self.enricher.enrich(&selected).await?;

        info!(
            user_id,
            segment = segment.map(|s| s.as_str()).unwrap_or("unknown"),
            count = recommendations.len(),
            "generated personalized recommendations"
        );
        Ok(recommendations)
    }

    /// Trending recommendations from the cached trending list. Power users
    /// get only fresh entries.
    pub async fn get_trending_recommendations(
        &self,
        user_id: Option<&str>,
        limit: usize,
        segment: Option<Segment>,
    ) -> Result<Vec<Recommendation>> {
        let ids = self.cache.trending_video_ids(limit * 2).await?;
        let videos = self.store.videos_by_ids(&ids).await?;

        let now = Utc::now();
        let recommendations: Vec<Recommendation> = videos
            .into_iter()
            .filter(|v| {
                if segment != Some(Segment::PowerUser) {
                    return true;
                }
                let age_days = (now - v.created_at).num_seconds() as f64 / 86_400.0;
                age_days < POWER_USER_FRESHNESS_DAYS
            })
            .take(limit)
            .map(|v| Recommendation {
                video_id: v.video_id.clone(),
                score: v.trending_score.unwrap_or(0.0),
                sources: vec![Source::Trending],
                video: VideoSummary::from(&v),
                reason: "Trending now".to_string(),
            })
            .collect();

        debug!(
            user_id = user_id.unwrap_or("anonymous"),
            count = recommendations.len(),
            "trending recommendations served"
        );
        Ok(recommendations)
    }

    /// Videos most similar to the target by feature-vector cosine. Empty
    /// when the target has no feature row.
    pub async fn get_similar_videos(
        &self,
        video_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Recommendation>> {
        let Some(target) = self.features.video(video_id) else {
            info!(video_id, "no features for similarity lookup");
            return Ok(Vec::new());
        };

        let threshold = self.config.recall.similar_video_threshold;
        let snapshot = self.features.snapshot();

        let mut similar: Vec<(String, f64)> = snapshot
            .values()
            .filter(|f| f.video_id != video_id)
            .filter_map(|f| {
                let similarity = cosine_similarity(&target.vector, &f.vector);
                (similarity > threshold).then(|| (f.video_id.clone(), similarity as f64))
            })
            .collect();

        similar.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        similar.truncate(limit);

        let ids: Vec<String> = similar.iter().map(|(id, _)| id.clone()).collect();
        let videos = self.store.videos_by_ids(&ids).await?;
        let by_id: std::collections::HashMap<&str, &crate::models::VideoRecord> =
            videos.iter().map(|v| (v.video_id.as_str(), v)).collect();

        debug!(video_id, user_id, count = similar.len(), "similar videos resolved");

        Ok(similar
            .into_iter()
            .filter_map(|(id, score)| {
                by_id.get(id.as_str()).map(|v| Recommendation {
                    video_id: id.clone(),
                    score,
                    sources: vec![Source::Similar],
                    video: VideoSummary::from(*v),
                    reason: "Recommended for you".to_string(),
                })
            })
            .collect())
    }

    /// Quality-ranked recent videos outside the user's usual categories.
    pub async fn get_discovery_recommendations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Recommendation>> {
        let preferences = self.profile.user_preferences(user_id).await?;
        let videos = self
            .store
            .discovery_videos(&preferences.categories, limit)
            .await?;

        Ok(videos
            .into_iter()
            .map(|v| Recommendation {
                video_id: v.video_id.clone(),
                score: v.quality_score.unwrap_or(DISCOVERY_DEFAULT_QUALITY),
                sources: vec![Source::Discovery],
                video: VideoSummary::from(&v),
                reason: "Explore something new".to_string(),
            })
            .collect())
    }

    /// Popular content for sessions without a user: trending mixed with
    /// recent viral videos, deduplicated.
    pub async fn get_anonymous_recommendations(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Recommendation>> {
        let trending = self.get_trending_recommendations(None, limit, None).await?;

        let since = Utc::now() - Duration::days(VIRAL_WINDOW_DAYS);
        let viral = self
            .store
            .viral_videos(VIRAL_MIN_VIEWS, since, limit / 2)
            .await?;

        let viral_recommendations = viral.into_iter().map(|v| Recommendation {
            video_id: v.video_id.clone(),
            score: v.share_count as f64 / VIRAL_SCORE_DIVISOR,
            sources: vec![Source::Viral],
            video: VideoSummary::from(&v),
            reason: "Popular right now".to_string(),
        });

        let mut seen: HashSet<String> = HashSet::new();
        let merged: Vec<Recommendation> = trending
            .into_iter()
            .chain(viral_recommendations)
            .filter(|r| seen.insert(r.video_id.clone()))
            .take(limit)
            .collect();

        debug!(session_id, count = merged.len(), "anonymous recommendations served");
        Ok(merged)
    }

    /// Upsert the user's preference profile and drop their cached
    /// recommendation list.
    pub async fn update_user_preferences(
        &self,
        user_id: &str,
        update: &crate::models::PreferenceUpdate,
    ) -> Result<()> {
        self.profile.update_preferences(user_id, update).await?;

        if let Err(e) = self.cache.invalidate_user_recommendations(user_id).await {
            warn!(user_id, error = %e, "failed to invalidate cached recommendations");
        }

        info!(user_id, "user preferences updated");
        Ok(())
    }

    /// Deterministic experiment variant for the user.
    pub fn get_ab_test_variant(&self, user_id: &str, experiment: &str) -> String {
        self.experiments.variant(user_id, experiment)
    }

    pub async fn update_trending_scores(&self) -> Result<TrendingStats> {
        Ok(self.trending_updater.update_trending_scores().await?)
    }

    pub async fn update_user_segments(&self) -> Result<SegmentationStats> {
        Ok(self.segmentation.update_user_segments().await?)
    }

    /// Precompute recommendations for the most active users of the last 24
    /// hours. Per-user failures are logged and skipped.
    pub async fn warm_cache(&self) -> Result<WarmCacheStats> {
        let since = Utc::now() - Duration::hours(24);
        let active = self
            .store
            .most_active_users(since, self.config.cache.warm_user_limit)
            .await?;

        let mut stats = WarmCacheStats {
            users_considered: active.len() as u32,
            ..Default::default()
        };

        for (user_id, _count) in active {
            let result = self
                .get_personalized_recommendations(
                    &user_id,
                    self.config.cache.warm_recommendation_count,
                    true,
                )
                .await;

            match result {
                Ok(recommendations) => {
                    let ids: Vec<String> = recommendations
                        .into_iter()
                        .map(|r| r.video_id)
                        .collect();
                    match self.cache.set_user_recommendations(&user_id, &ids).await {
                        Ok(()) => stats.warmed += 1,
                        Err(e) => {
                            stats.failed += 1;
                            warn!(user_id = %user_id, error = %e, "failed to store warmed recommendations");
                        }
                    }
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(user_id = %user_id, error = %e, "failed to warm cache for user");
                }
            }
        }

        info!(
            considered = stats.users_considered,
            warmed = stats.warmed,
            failed = stats.failed,
            "cache warming pass completed"
        );
        Ok(stats)
    }
}
