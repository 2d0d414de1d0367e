use super::{CandidateSource, RecallContext};
use crate::config::RecallConfig;
use crate::models::{Source, SourceCandidate};
use crate::services::similarity::cosine_similarity_sparse;
use crate::storage::ContentStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Collaborative filtering over similar users.
///
/// A user's taste is a sparse vector of action-weighted interactions from
/// the last 90 days. Users whose vectors land within cosine >= 0.5 count as
/// similar; their recent likes become candidates, scored by accumulated
/// similarity.
pub struct CollaborativeSource {
    store: Arc<dyn ContentStore>,
    similar_user_limit: usize,
    sample_size: usize,
    min_similarity: f64,
    candidate_multiplier: usize,
}

/// Interaction window for taste vectors.
const VECTOR_WINDOW_DAYS: i64 = 90;
/// Window for similar users' likes.
const LIKE_WINDOW_DAYS: i64 = 30;
/// Likes fetched per similar user.
const LIKES_PER_USER: usize = 20;
/// Cap on interactions folded into one taste vector.
const VECTOR_INTERACTION_LIMIT: usize = 1000;

impl CollaborativeSource {
    pub fn new(store: Arc<dyn ContentStore>, config: &RecallConfig) -> Self {
        Self {
            store,
            similar_user_limit: config.similar_user_limit,
            sample_size: config.similar_user_sample_size,
            min_similarity: config.min_user_similarity,
            candidate_multiplier: config.candidate_multiplier,
        }
    }

    /// Action-weighted sparse interaction vector for one user.
    async fn interaction_vector(&self, user_id: &str) -> Result<HashMap<String, f64>> {
        let since = Utc::now() - Duration::days(VECTOR_WINDOW_DAYS);
        let interactions = self
            .store
            .recent_interactions(user_id, Some(since), VECTOR_INTERACTION_LIMIT)
            .await?;

        let mut vector: HashMap<String, f64> = HashMap::new();
        for interaction in interactions {
            *vector.entry(interaction.video_id).or_insert(0.0) += interaction.action.weight();
        }
        Ok(vector)
    }

    /// Users most similar to the target, `(user_id, similarity)` pairs
    /// sorted descending.
    pub async fn find_similar_users(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<(String, f64)>> {
        let user_vector = self.interaction_vector(user_id).await?;
        if user_vector.is_empty() {
            debug!(user_id, "no interaction vector, skipping similar-user search");
            return Ok(Vec::new());
        }

        let sample = self.store.sample_user_ids(user_id, self.sample_size).await?;

        let mut similar: Vec<(String, f64)> = Vec::new();
        for other_id in sample {
            let other_vector = self.interaction_vector(&other_id).await?;
            let similarity = cosine_similarity_sparse(&user_vector, &other_vector);
            if similarity >= self.min_similarity {
                similar.push((other_id, similarity));
            }
        }

        similar.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        similar.truncate(limit);
        Ok(similar)
    }
}

#[async_trait]
impl CandidateSource for CollaborativeSource {
    async fn candidates(&self, ctx: &RecallContext<'_>) -> Result<Vec<SourceCandidate>> {
        let similar_users = self
            .find_similar_users(ctx.user_id, self.similar_user_limit)
            .await?;

        if similar_users.is_empty() {
            info!(user_id = ctx.user_id, "no similar users found");
            return Ok(Vec::new());
        }

        let like_cutoff = Utc::now() - Duration::days(LIKE_WINDOW_DAYS);
        let mut accumulated: HashMap<String, SourceCandidate> = HashMap::new();

        for (similar_id, similarity) in &similar_users {
            let likes = self
                .store
                .liked_interactions_since(similar_id, like_cutoff, LIKES_PER_USER)
                .await?;

            for like in likes {
                let candidate = accumulated
                    .entry(like.video_id.clone())
                    .or_insert_with(|| SourceCandidate::new(like.video_id.clone(), 0.0));
                candidate.score += similarity;
                candidate.supporters.push(similar_id.clone());
            }
        }

        let mut candidates: Vec<SourceCandidate> = accumulated.into_values().collect();
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(ctx.limit * self.candidate_multiplier);

        info!(
            user_id = ctx.user_id,
            similar_users = similar_users.len(),
            candidates = candidates.len(),
            "collaborative recall completed"
        );
        Ok(candidates)
    }

    fn source(&self) -> Source {
        Source::Collaborative
    }
}
